//! Menu descriptors: ordered entry lists plus lifecycle hooks.
//!
//! Descriptors are built once and only read afterwards. Each one carries a guard
//! (tag + checksum) that the engine re-verifies every time it pushes the menu.

use std::borrow::Cow;
use std::fmt;

use bitflags::bitflags;

use crate::error::Violation;
use crate::nav::ExitMode;
use crate::settings::{SettingId, SettingsStore};

/// Stable identifier of a menu inside a [`MenuTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuId(pub u16);

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Static per-entry flags. Runtime visibility comes from
    /// [`crate::nav::Conditions`] on top of these.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EntryFlags: u8 {
        const READ_ONLY = 0b001;
        const HIDDEN    = 0b010;
        const DISABLED  = 0b100;
    }
}

/// Callback attached to a menu (enter/exit/global exit) or an action entry.
pub type MenuHook = fn(&mut HookContext<'_>) -> HookOutcome;

/// What a hook asks the engine to do next. Only honoured for `on_enter` and
/// action entries; exit hooks run during an unwind that is already decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookOutcome {
    #[default]
    Continue,
    ChainBack,
    Exit(ExitMode),
}

/// Everything a hook may touch. Hooks get the menu they belong to and the
/// settings store, nothing global.
pub struct HookContext<'h> {
    pub id: MenuId,
    pub menu: &'h Menu,
    pub depth: usize,
    pub trigger: Option<&'h Entry>,
    pub settings: &'h mut dyn SettingsStore,
}

#[derive(Clone, Copy)]
pub enum EntryKind {
    Label,
    Setting(SettingId),
    Submenu(MenuId),
    Back,
    Info,
    Action(MenuHook),
    End,
}

impl EntryKind {
    fn code(&self) -> u8 {
        match self {
            EntryKind::End => 0,
            EntryKind::Label => 1,
            EntryKind::Setting(_) => 2,
            EntryKind::Submenu(_) => 3,
            EntryKind::Back => 4,
            EntryKind::Info => 5,
            EntryKind::Action(_) => 6,
        }
    }
}

impl fmt::Debug for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Label => f.write_str("Label"),
            EntryKind::Setting(id) => f.debug_tuple("Setting").field(id).finish(),
            EntryKind::Submenu(id) => f.debug_tuple("Submenu").field(id).finish(),
            EntryKind::Back => f.write_str("Back"),
            EntryKind::Info => f.write_str("Info"),
            EntryKind::Action(_) => f.write_str("Action(..)"),
            EntryKind::End => f.write_str("End"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    text: Cow<'static, str>,
    kind: EntryKind,
    flags: EntryFlags,
}

impl Entry {
    pub fn new(text: impl Into<Cow<'static, str>>, kind: EntryKind) -> Self {
        Self {
            text: text.into(),
            kind,
            flags: EntryFlags::empty(),
        }
    }

    pub fn label(text: impl Into<Cow<'static, str>>) -> Self {
        Self::new(text, EntryKind::Label)
    }

    pub fn setting(text: impl Into<Cow<'static, str>>, id: SettingId) -> Self {
        Self::new(text, EntryKind::Setting(id))
    }

    pub fn submenu(text: impl Into<Cow<'static, str>>, menu: MenuId) -> Self {
        Self::new(text, EntryKind::Submenu(menu))
    }

    pub fn back(text: impl Into<Cow<'static, str>>) -> Self {
        Self::new(text, EntryKind::Back)
    }

    pub fn info(text: impl Into<Cow<'static, str>>) -> Self {
        Self::new(text, EntryKind::Info)
    }

    pub fn action(text: impl Into<Cow<'static, str>>, hook: MenuHook) -> Self {
        Self::new(text, EntryKind::Action(hook))
    }

    pub fn end() -> Self {
        Self::new("", EntryKind::End)
    }

    pub fn with_flags(mut self, flags: EntryFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn flags(&self) -> EntryFlags {
        self.flags
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self.kind, EntryKind::End)
    }
}

pub const MENU_TAG: u8 = b'M';

/// Integrity pair stored alongside a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    pub tag: u8,
    pub checksum: u16,
}

impl Guard {
    pub fn compute(name: &str, entries: &[Entry]) -> Self {
        Self {
            tag: MENU_TAG,
            checksum: checksum(name, entries),
        }
    }
}

/// FNV-1a over the name, every entry's kind code and the entry count, folded
/// to 16 bits.
pub fn checksum(name: &str, entries: &[Entry]) -> u16 {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let count = (entries.len() as u32).to_le_bytes();
    let bytes = name
        .bytes()
        .chain(entries.iter().map(|e| e.kind.code()))
        .chain(count);

    let hash = bytes.fold(OFFSET, |h, b| (h ^ u32::from(b)).wrapping_mul(PRIME));
    ((hash >> 16) ^ (hash & 0xffff)) as u16
}

pub struct Menu {
    name: Cow<'static, str>,
    entries: Vec<Entry>,
    guard: Guard,
    on_enter: Option<MenuHook>,
    on_exit: Option<MenuHook>,
    on_global_exit: Option<MenuHook>,
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .field("guard", &self.guard)
            .field("on_enter", &self.on_enter.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .field("on_global_exit", &self.on_global_exit.is_some())
            .finish()
    }
}

impl Menu {
    /// Builds a sealed descriptor. A missing terminator is appended; a
    /// terminator anywhere but last is refused.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        mut entries: Vec<Entry>,
    ) -> Result<Self, Violation> {
        if let Some(index) = entries
            .iter()
            .position(Entry::is_terminator)
            .filter(|&i| i + 1 != entries.len())
        {
            return Err(Violation::MisplacedTerminator { index });
        }
        if !entries.last().is_some_and(Entry::is_terminator) {
            entries.push(Entry::end());
        }

        let name = name.into();
        let guard = Guard::compute(&name, &entries);
        Ok(Self::from_parts(name, entries, guard))
    }

    /// Assembles a descriptor exactly as given, guard included. Nothing is
    /// checked here; the engine verifies the guard when the menu is pushed.
    pub fn from_parts(
        name: impl Into<Cow<'static, str>>,
        entries: Vec<Entry>,
        guard: Guard,
    ) -> Self {
        Self {
            name: name.into(),
            entries,
            guard,
            on_enter: None,
            on_exit: None,
            on_global_exit: None,
        }
    }

    pub fn on_enter(mut self, hook: MenuHook) -> Self {
        self.on_enter = Some(hook);
        self
    }

    pub fn on_exit(mut self, hook: MenuHook) -> Self {
        self.on_exit = Some(hook);
        self
    }

    pub fn on_global_exit(mut self, hook: MenuHook) -> Self {
        self.on_global_exit = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn guard(&self) -> Guard {
        self.guard
    }

    /// All entries, terminator included.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries up to (not including) the first terminator.
    pub fn body(&self) -> &[Entry] {
        let end = self
            .entries
            .iter()
            .position(Entry::is_terminator)
            .unwrap_or(self.entries.len());
        &self.entries[..end]
    }

    pub fn enter_hook(&self) -> Option<MenuHook> {
        self.on_enter
    }

    pub fn exit_hook(&self) -> Option<MenuHook> {
        self.on_exit
    }

    pub fn global_exit_hook(&self) -> Option<MenuHook> {
        self.on_global_exit
    }

    pub fn verify(&self) -> Result<(), Violation> {
        if self.guard.tag != MENU_TAG {
            return Err(Violation::BadTag);
        }
        let expected = checksum(&self.name, &self.entries);
        if self.guard.checksum != expected {
            return Err(Violation::ChecksumMismatch {
                expected,
                found: self.guard.checksum,
            });
        }
        match self.entries.iter().position(Entry::is_terminator) {
            None => Err(Violation::MissingTerminator),
            Some(index) if index + 1 != self.entries.len() => {
                Err(Violation::MisplacedTerminator { index })
            }
            Some(_) => Ok(()),
        }
    }
}

/// Every menu of one topology, addressed by [`MenuId`]. Submenu links are ids,
/// so menus may be inserted in any order and resolved when traversed.
#[derive(Debug, Default)]
pub struct MenuTable {
    menus: Vec<Menu>,
}

impl MenuTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, menu: Menu) -> MenuId {
        let id = MenuId(self.menus.len() as u16);
        self.menus.push(menu);
        id
    }

    pub fn get(&self, id: MenuId) -> Option<&Menu> {
        self.menus.get(usize::from(id.0))
    }

    pub fn find(&self, name: &str) -> Option<MenuId> {
        self.menus
            .iter()
            .position(|m| m.name() == name)
            .map(|i| MenuId(i as u16))
    }

    pub fn iter(&self) -> impl Iterator<Item = (MenuId, &Menu)> {
        self.menus
            .iter()
            .enumerate()
            .map(|(i, m)| (MenuId(i as u16), m))
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }
}
