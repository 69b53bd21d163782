use crate::binding::Binding;
use crate::menu::{Entry, EntryFlags, EntryKind, Menu};
use crate::nav::conditions::{selectable, shown, Conditions};
use crate::settings::{FormattedValue, SettingsStore};

/// One drawn line of the visible window.
#[derive(Debug, Clone, Copy)]
pub struct Row<'w> {
    /// Index of the entry inside its menu.
    pub index: usize,
    pub text: &'w str,
    pub kind: EntryKind,
    pub selected: bool,
    pub editable: bool,
    /// The selected setting is being edited.
    pub editing: bool,
    pub enabled: bool,
    pub value: Option<FormattedValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollIndicator {
    pub above: bool,
    pub below: bool,
}

/// Read-only view of the top frame, sized to the display's row capacity.
pub struct Window<'w, S> {
    menu: &'w Menu,
    binding: &'w Binding<S>,
    conditions: &'w dyn Conditions,
    cursor: usize,
    editing: bool,
    start: usize,
    rows: usize,
    total: usize,
}

impl<'w, S: SettingsStore> Window<'w, S> {
    pub(crate) fn new(
        menu: &'w Menu,
        binding: &'w Binding<S>,
        conditions: &'w dyn Conditions,
        cursor: usize,
        scroll: usize,
        editing: bool,
        rows: usize,
    ) -> Self {
        let (start, total) = scroll_for(menu, conditions, cursor, scroll, rows);
        Self {
            menu,
            binding,
            conditions,
            cursor,
            editing,
            start,
            rows: rows.max(1),
            total,
        }
    }

    pub fn menu(&self) -> &'w Menu {
        self.menu
    }

    /// Visible entries scrolled past the top.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Visible entries in the whole menu.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn indicator(&self) -> ScrollIndicator {
        ScrollIndicator {
            above: self.start > 0,
            below: self.start + self.rows < self.total,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'w>> + '_ {
        let (menu, conditions) = (self.menu, self.conditions);
        menu.body()
            .iter()
            .enumerate()
            .filter(move |(_, entry)| shown(entry, conditions))
            .skip(self.start)
            .take(self.rows)
            .map(move |(index, entry)| self.row(index, entry))
    }

    fn row(&self, index: usize, entry: &'w Entry) -> Row<'w> {
        let selected = index == self.cursor;
        let (editable, value) = match entry.kind() {
            EntryKind::Setting(id) => {
                let writable = !entry.flags().contains(EntryFlags::READ_ONLY)
                    && self.binding.store().meta(id).is_some_and(|m| !m.read_only);
                (writable, Some(self.binding.read(id)))
            }
            _ => (false, None),
        };
        let enabled = selectable(entry, self.conditions);
        Row {
            index,
            text: entry.text(),
            kind: entry.kind(),
            selected,
            editable: editable && enabled,
            editing: selected && self.editing,
            enabled,
            value,
        }
    }
}

/// First visible position to draw so the cursor stays on screen, and the
/// count of visible entries. `scroll` is the offset kept from the last pass.
pub(crate) fn scroll_for(
    menu: &Menu,
    conditions: &dyn Conditions,
    cursor: usize,
    scroll: usize,
    rows: usize,
) -> (usize, usize) {
    let rows = rows.max(1);
    let mut total = 0;
    let mut position = None;
    for (index, entry) in menu.body().iter().enumerate() {
        if !shown(entry, conditions) {
            continue;
        }
        if index == cursor {
            position = Some(total);
        }
        total += 1;
    }

    let mut start = scroll;
    if let Some(p) = position {
        if p < start {
            start = p;
        } else if p >= start + rows {
            start = p + 1 - rows;
        }
    }
    (start.min(total.saturating_sub(rows)), total)
}
