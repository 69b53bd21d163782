use crate::nav::{Row, ScrollIndicator, Window};
use crate::settings::SettingsStore;

/// Something that can draw the visible window of the top menu.
pub trait Renderer {
    fn render_frame<'w, I>(&mut self, rows: I, indicator: ScrollIndicator)
    where
        I: IntoIterator<Item = Row<'w>>;
}

pub fn render_window<R: Renderer, S: SettingsStore>(renderer: &mut R, window: &Window<'_, S>) {
    renderer.render_frame(window.rows(), window.indicator());
}

/// Lays rows out as fixed-width text lines:
///
/// ```text
///  RTH ALT MODE      EXTRA
/// >RTH ALT           *1200
/// ```
///
/// `>` marks the cursor, `*` an edit in progress, and `^`/`v` lines appear when
/// entries are scrolled out above or below.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    width: usize,
    lines: Vec<String>,
}

impl TextRenderer {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(4),
            lines: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    fn arrow(&self, glyph: char) -> String {
        format!("{glyph:>width$}", width = self.width)
    }

    fn line(&self, row: &Row<'_>) -> String {
        let marker = if row.selected { '>' } else { ' ' };
        let text_room = self.width - 1;

        let Some(value) = row.value else {
            return format!("{marker}{}", clip(row.text, text_room));
        };

        let value = if row.editing {
            format!("*{value}")
        } else {
            value.to_string()
        };
        let value = clip(&value, text_room.saturating_sub(2));
        let value_width = value.chars().count();
        let text_width = text_room.saturating_sub(value_width + 1);
        format!(
            "{marker}{:<text_width$} {value}",
            clip(row.text, text_width)
        )
    }
}

impl Renderer for TextRenderer {
    fn render_frame<'w, I>(&mut self, rows: I, indicator: ScrollIndicator)
    where
        I: IntoIterator<Item = Row<'w>>,
    {
        self.lines.clear();
        if indicator.above {
            self.lines.push(self.arrow('^'));
        }
        for row in rows {
            let line = self.line(&row);
            self.lines.push(line);
        }
        if indicator.below {
            self.lines.push(self.arrow('v'));
        }
    }
}

fn clip(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((at, _)) => &text[..at],
        None => text,
    }
}
