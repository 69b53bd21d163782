use crate::menu::MenuId;

/// One level of open navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub menu: MenuId,
    /// Index into the menu's entries.
    pub cursor: usize,
    /// Number of visible entries scrolled past the top of the display.
    pub scroll: usize,
}

impl Frame {
    const EMPTY: Frame = Frame {
        menu: MenuId(u16::MAX),
        cursor: 0,
        scroll: 0,
    };

    pub fn new(menu: MenuId) -> Self {
        Self {
            menu,
            cursor: 0,
            scroll: 0,
        }
    }
}

/// Fixed-capacity frame stack; never allocates.
#[derive(Debug, Clone)]
pub struct NavStack<const N: usize> {
    frames: [Frame; N],
    len: usize,
}

impl<const N: usize> NavStack<N> {
    pub const fn new() -> Self {
        Self {
            frames: [Frame::EMPTY; N],
            len: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Hands the frame back when the stack is full.
    pub fn push(&mut self, frame: Frame) -> Result<(), Frame> {
        if self.is_full() {
            return Err(frame);
        }
        self.frames[self.len] = frame;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.frames[self.len])
    }

    pub fn top(&self) -> Option<&Frame> {
        self.as_slice().last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames[..self.len].last_mut()
    }

    pub fn bottom(&self) -> Option<&Frame> {
        self.as_slice().first()
    }

    pub fn contains(&self, menu: MenuId) -> bool {
        self.as_slice().iter().any(|f| f.menu == menu)
    }

    pub fn as_slice(&self) -> &[Frame] {
        &self.frames[..self.len]
    }
}

impl<const N: usize> Default for NavStack<N> {
    fn default() -> Self {
        Self::new()
    }
}
