use crate::menu::{Entry, EntryFlags};

/// Runtime visibility of entries (flight mode, hardware present, ...).
/// Queried on every pass and never cached, so implementations must be cheap
/// and free of side effects.
pub trait Conditions {
    fn is_visible(&self, _entry: &Entry) -> bool {
        true
    }

    fn is_enabled(&self, _entry: &Entry) -> bool {
        true
    }
}

/// Only the static entry flags apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl Conditions for Always {}

/// Hides or disables entries by display text.
#[derive(Debug, Clone, Default)]
pub struct TextConditions {
    hidden: Vec<String>,
    disabled: Vec<String>,
}

impl TextConditions {
    pub fn new(hidden: Vec<String>, disabled: Vec<String>) -> Self {
        Self { hidden, disabled }
    }
}

impl Conditions for TextConditions {
    fn is_visible(&self, entry: &Entry) -> bool {
        !self.hidden.iter().any(|t| t == entry.text())
    }

    fn is_enabled(&self, entry: &Entry) -> bool {
        !self.disabled.iter().any(|t| t == entry.text())
    }
}

/// Drawn on screen: not the terminator and not hidden.
pub(crate) fn shown(entry: &Entry, conditions: &dyn Conditions) -> bool {
    !entry.is_terminator()
        && !entry.flags().contains(EntryFlags::HIDDEN)
        && conditions.is_visible(entry)
}

/// A valid cursor stop: shown and not disabled.
pub(crate) fn selectable(entry: &Entry, conditions: &dyn Conditions) -> bool {
    shown(entry, conditions)
        && !entry.flags().contains(EntryFlags::DISABLED)
        && conditions.is_enabled(entry)
}
