//! Stack-based menu navigation.
//!
//! The engine owns a fixed-depth stack of frames and turns gestures into cursor
//! moves, submenu pushes, pops and setting edits. Every entry point runs to
//! completion and reports through an [`Update`]; refused navigation never
//! surfaces as an error to the caller.

mod conditions;
mod input;
mod stack;
mod window;

pub use conditions::{Always, Conditions, TextConditions};
pub use input::Gesture;
pub use stack::{Frame, NavStack};
pub use window::{Row, ScrollIndicator, Window};

use tracing::{debug, warn};

use crate::binding::{Binding, Delta};
use crate::error::{NavError, Rejected};
use crate::menu::{
    Entry, EntryFlags, EntryKind, HookContext, HookOutcome, Menu, MenuHook, MenuId, MenuTable,
};
use crate::settings::{SettingId, SettingsStore};

use conditions::selectable;

pub const DEFAULT_ROWS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitMode {
    /// Leave without persisting.
    #[default]
    Exit,
    /// Commit any open edit and ask the store to persist.
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Inactive,
    Active,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// What changed after one engine call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Update {
    pub redraw: bool,
    /// The last frame was popped; the engine is inactive.
    pub closed: bool,
    pub diagnostic: Option<NavError>,
}

impl Update {
    fn redraw() -> Self {
        Self {
            redraw: true,
            ..Default::default()
        }
    }
}

pub struct Engine<'a, S, const DEPTH: usize = 8> {
    menus: &'a MenuTable,
    binding: Binding<S>,
    stack: NavStack<DEPTH>,
    editing: Option<SettingId>,
    rows: usize,
    last_diagnostic: Option<NavError>,
}

impl<'a, S: SettingsStore, const DEPTH: usize> Engine<'a, S, DEPTH> {
    pub fn new(menus: &'a MenuTable, binding: Binding<S>) -> Self {
        Self {
            menus,
            binding,
            stack: NavStack::new(),
            editing: None,
            rows: DEFAULT_ROWS,
            last_diagnostic: None,
        }
    }

    /// Display row capacity used for scrolling.
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows.max(1);
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn state(&self) -> State {
        if self.stack.is_empty() {
            State::Inactive
        } else if self.editing.is_some() {
            State::Editing
        } else {
            State::Active
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn frames(&self) -> &[Frame] {
        self.stack.as_slice()
    }

    pub fn top(&self) -> Option<Frame> {
        self.stack.top().copied()
    }

    pub fn current_menu(&self) -> Option<&'a Menu> {
        let menus = self.menus;
        self.stack.top().and_then(|f| menus.get(f.menu))
    }

    /// Entry under the cursor, `None` when inactive or the menu has no body.
    pub fn current_entry(&self) -> Option<&'a Entry> {
        let frame = self.stack.top()?;
        self.current_menu()?.body().get(frame.cursor)
    }

    pub fn binding(&self) -> &Binding<S> {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut Binding<S> {
        &mut self.binding
    }

    pub fn into_binding(self) -> Binding<S> {
        self.binding
    }

    pub fn last_diagnostic(&self) -> Option<NavError> {
        self.last_diagnostic
    }

    /// Dispatches one gesture according to the current state.
    pub fn handle(&mut self, gesture: Gesture, conditions: &dyn Conditions) -> Update {
        match (self.state(), gesture) {
            (_, Gesture::ExitAll(mode)) => self.exit_all(mode),
            (State::Inactive, _) => Update::default(),
            (State::Editing, Gesture::Down | Gesture::EditPlus) => self.commute(Delta::Increment),
            (State::Editing, Gesture::Up | Gesture::EditMinus) => self.commute(Delta::Decrement),
            (State::Editing, Gesture::Select | Gesture::Confirm) => self.confirm(),
            (State::Editing, Gesture::Back | Gesture::Cancel) => self.cancel(),
            (State::Active, Gesture::Up) => self.move_cursor(Direction::Up, conditions),
            (State::Active, Gesture::Down) => self.move_cursor(Direction::Down, conditions),
            (State::Active, Gesture::Select) => self.activate(conditions),
            (State::Active, Gesture::Back) => self.pop_frame(None),
            (State::Active, _) => Update::default(),
        }
    }

    pub fn open(&mut self, root: MenuId, conditions: &dyn Conditions) -> Update {
        if self.state() != State::Inactive {
            debug!(menu = %root, "open ignored, navigation already active");
            return Update::default();
        }
        self.last_diagnostic = None;
        self.push(root, None, conditions)
    }

    pub fn move_cursor(&mut self, direction: Direction, conditions: &dyn Conditions) -> Update {
        if self.state() != State::Active {
            return Update::default();
        }
        let Some(menu) = self.current_menu() else {
            return Update::default();
        };
        let rows = self.rows;
        let Some(frame) = self.stack.top_mut() else {
            return Update::default();
        };
        let Some(next) = next_selectable(menu.body(), frame.cursor, direction, conditions) else {
            return Update::default();
        };
        if next == frame.cursor {
            return Update::default();
        }
        frame.cursor = next;
        frame.scroll = window::scroll_for(menu, conditions, next, frame.scroll, rows).0;
        Update::redraw()
    }

    pub fn activate(&mut self, conditions: &dyn Conditions) -> Update {
        if self.state() != State::Active {
            return Update::default();
        }
        let Some(entry) = self.current_entry() else {
            return Update::default();
        };
        if !selectable(entry, conditions) {
            return Update::default();
        }

        match entry.kind() {
            EntryKind::Submenu(child) => self.push(child, Some(entry), conditions),
            EntryKind::Back => self.pop_frame(Some(entry)),
            EntryKind::Setting(id) => {
                debug!(setting = id.0, "editing");
                self.binding.begin(id);
                self.editing = Some(id);
                Update::redraw()
            }
            EntryKind::Action(hook) => {
                let Some(frame) = self.top() else {
                    return Update::default();
                };
                match self.run_hook(hook, frame.menu, Some(entry)) {
                    HookOutcome::Continue => Update::redraw(),
                    HookOutcome::ChainBack => self.pop_frame(Some(entry)),
                    HookOutcome::Exit(mode) => self.exit_all(mode),
                }
            }
            EntryKind::Label | EntryKind::Info | EntryKind::End => Update::default(),
        }
    }

    /// Steps the setting being edited.
    pub fn commute(&mut self, delta: Delta) -> Update {
        let Some(id) = self.editing else {
            return Update::default();
        };
        if self
            .current_entry()
            .is_some_and(|e| e.flags().contains(EntryFlags::READ_ONLY))
        {
            return self.reject(Rejected::ReadOnly);
        }
        match self.binding.modify(id, delta) {
            Ok(_) => Update::redraw(),
            Err(rejected) => self.reject(rejected),
        }
    }

    pub fn confirm(&mut self) -> Update {
        let Some(id) = self.editing.take() else {
            return Update::default();
        };
        debug!(setting = id.0, "edit confirmed");
        match self.binding.commit(id) {
            Ok(()) => Update::redraw(),
            Err(rejected) => Update {
                redraw: true,
                ..self.reject(rejected)
            },
        }
    }

    pub fn cancel(&mut self) -> Update {
        let Some(id) = self.editing.take() else {
            return Update::default();
        };
        debug!(setting = id.0, "edit cancelled");
        self.binding.cancel(id);
        Update::redraw()
    }

    /// Unwinds every frame, innermost `on_exit` first, then the root's
    /// `on_global_exit` once.
    pub fn exit_all(&mut self, mode: ExitMode) -> Update {
        let Some(root) = self.stack.bottom().copied() else {
            return Update::default();
        };
        debug!(?mode, depth = self.stack.len(), "exit all");

        let mut diagnostic = None;
        if let Some(id) = self.editing.take() {
            match mode {
                ExitMode::Save => {
                    if let Err(rejected) = self.binding.commit(id) {
                        diagnostic = Some(NavError::Rejected(rejected));
                    }
                }
                ExitMode::Exit => self.binding.cancel(id),
            }
        }

        while !self.stack.is_empty() {
            self.pop_frame(None);
        }

        if let Some(hook) = self.menus.get(root.menu).and_then(Menu::global_exit_hook) {
            let _ = self.run_hook(hook, root.menu, None);
        }

        if mode == ExitMode::Save {
            if let Err(err) = self.binding.store_mut().save() {
                warn!(%err, "saving settings failed");
                diagnostic = Some(NavError::Rejected(err.into()));
            }
        }

        if diagnostic.is_some() {
            self.last_diagnostic = diagnostic;
        }
        Update {
            redraw: true,
            closed: true,
            diagnostic,
        }
    }

    /// Visible slice of the top frame, `None` when inactive. Pure: the
    /// conditions are evaluated afresh and nothing is stored.
    pub fn window<'w>(&'w self, conditions: &'w dyn Conditions) -> Option<Window<'w, S>> {
        let frame = self.stack.top()?;
        let menu = self.menus.get(frame.menu)?;
        Some(Window::new(
            menu,
            &self.binding,
            conditions,
            frame.cursor,
            frame.scroll,
            self.editing.is_some(),
            self.rows,
        ))
    }

    fn push(
        &mut self,
        id: MenuId,
        trigger: Option<&'a Entry>,
        conditions: &dyn Conditions,
    ) -> Update {
        if self.stack.contains(id) {
            return self.refuse(NavError::CycleDetected { menu: id });
        }
        let menus = self.menus;
        let Some(menu) = menus.get(id) else {
            return self.refuse(NavError::UnknownMenu { menu: id });
        };
        if let Err(violation) = menu.verify() {
            return self.refuse(NavError::StructuralViolation { menu: id, violation });
        }

        let mut frame = Frame::new(id);
        frame.cursor = first_cursor(menu.body(), conditions);
        frame.scroll = window::scroll_for(menu, conditions, frame.cursor, 0, self.rows).0;
        if self.stack.push(frame).is_err() {
            return self.refuse(NavError::DepthExceeded { max: DEPTH });
        }
        debug!(menu = %id, name = menu.name(), depth = self.stack.len(), "menu entered");

        let Some(hook) = menu.enter_hook() else {
            return Update::redraw();
        };
        match self.run_hook(hook, id, trigger) {
            HookOutcome::Continue => Update::redraw(),
            HookOutcome::ChainBack => {
                debug!(menu = %id, "on_enter chained back");
                self.pop_frame(trigger)
            }
            HookOutcome::Exit(mode) => self.exit_all(mode),
        }
    }

    fn pop_frame(&mut self, trigger: Option<&'a Entry>) -> Update {
        let Some(frame) = self.stack.top().copied() else {
            return Update::default();
        };
        if let Some(hook) = self.menus.get(frame.menu).and_then(Menu::exit_hook) {
            let _ = self.run_hook(hook, frame.menu, trigger);
        }
        self.stack.pop();
        debug!(menu = %frame.menu, depth = self.stack.len(), "menu left");
        Update {
            redraw: true,
            closed: self.stack.is_empty(),
            diagnostic: None,
        }
    }

    fn run_hook(&mut self, hook: MenuHook, id: MenuId, trigger: Option<&'a Entry>) -> HookOutcome {
        let menus = self.menus;
        let Some(menu) = menus.get(id) else {
            return HookOutcome::Continue;
        };
        let mut ctx = HookContext {
            id,
            menu,
            depth: self.stack.len(),
            trigger,
            settings: self.binding.store_mut(),
        };
        hook(&mut ctx)
    }

    fn refuse(&mut self, err: NavError) -> Update {
        warn!(%err, "navigation refused");
        self.last_diagnostic = Some(err);
        Update {
            diagnostic: Some(err),
            ..Default::default()
        }
    }

    fn reject(&mut self, rejected: Rejected) -> Update {
        debug!(%rejected, "edit rejected");
        let err = NavError::Rejected(rejected);
        self.last_diagnostic = Some(err);
        Update {
            diagnostic: Some(err),
            ..Default::default()
        }
    }
}

fn first_cursor(body: &[Entry], conditions: &dyn Conditions) -> usize {
    body.iter()
        .position(|e| selectable(e, conditions))
        .or_else(|| body.iter().position(|e| conditions::shown(e, conditions)))
        .unwrap_or(0)
}

/// Next cursor stop in `direction`, wrapping at either end. Returns the
/// current index when it is the only stop, `None` when there is none.
fn next_selectable(
    body: &[Entry],
    cursor: usize,
    direction: Direction,
    conditions: &dyn Conditions,
) -> Option<usize> {
    let n = body.len();
    if n == 0 {
        return None;
    }
    let cursor = cursor.min(n - 1);
    (1..=n)
        .map(|k| match direction {
            Direction::Down => (cursor + k) % n,
            Direction::Up => (cursor + n - k) % n,
        })
        .find(|&i| selectable(&body[i], conditions))
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::binding::WritePolicy;
    use crate::error::Violation;
    use crate::menu::Guard;
    use crate::settings::{MemoryStore, SettingKind, SettingMeta, SettingValue};

    thread_local! {
        static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
        static HIDE_SECOND: Cell<bool> = const { Cell::new(false) };
    }

    fn log(event: &str, ctx: &HookContext<'_>) {
        LOG.with(|l| l.borrow_mut().push(format!("{event}:{}", ctx.menu.name())));
    }

    fn take_log() -> Vec<String> {
        LOG.with(|l| std::mem::take(&mut *l.borrow_mut()))
    }

    fn on_enter(ctx: &mut HookContext<'_>) -> HookOutcome {
        log("enter", ctx);
        HookOutcome::Continue
    }

    fn on_exit(ctx: &mut HookContext<'_>) -> HookOutcome {
        log("exit", ctx);
        HookOutcome::Continue
    }

    fn on_global_exit(ctx: &mut HookContext<'_>) -> HookOutcome {
        log("global", ctx);
        HookOutcome::Continue
    }

    fn refuse_entry(ctx: &mut HookContext<'_>) -> HookOutcome {
        log("enter", ctx);
        HookOutcome::ChainBack
    }

    fn hooked(name: &'static str, entries: Vec<Entry>) -> Menu {
        Menu::new(name, entries)
            .unwrap()
            .on_enter(on_enter)
            .on_exit(on_exit)
            .on_global_exit(on_global_exit)
    }

    /// ROOT: label, submenu A, submenu B, back. A: setting, back. B: submenu C, back.
    /// C: label, back.
    fn topology(store: &mut MemoryStore) -> (MenuTable, MenuId) {
        let x = store.define_enum("x", ["OFF", "ON"], 0);
        let mut table = MenuTable::new();
        let root = MenuId(0);
        let (a, b, c) = (MenuId(1), MenuId(2), MenuId(3));
        table.insert(hooked(
            "ROOT",
            vec![
                Entry::label("-- MAIN --"),
                Entry::submenu("A", a),
                Entry::submenu("B", b),
                Entry::back("EXIT"),
            ],
        ));
        table.insert(hooked("A", vec![Entry::setting("X", x), Entry::back("BACK")]));
        table.insert(hooked("B", vec![Entry::submenu("C", c), Entry::back("BACK")]));
        table.insert(hooked("C", vec![Entry::label("-- C --"), Entry::back("BACK")]));
        (table, root)
    }

    fn engine(table: &MenuTable, store: MemoryStore) -> Engine<'_, MemoryStore, 4> {
        Engine::new(table, Binding::new(store, WritePolicy::Immediate)).with_rows(3)
    }

    #[test]
    fn open_lands_on_first_entry_and_runs_on_enter() {
        let mut store = MemoryStore::new();
        let (table, root) = topology(&mut store);
        let mut nav = engine(&table, store);
        take_log();

        let update = nav.open(root, &Always);
        assert!(update.redraw);
        assert_eq!(nav.state(), State::Active);
        assert_eq!(nav.top().map(|f| f.cursor), Some(0));
        assert_eq!(take_log(), vec!["enter:ROOT"]);

        assert_eq!(nav.open(root, &Always), Update::default());
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn cursor_wraps_and_skips_disabled() {
        let mut store = MemoryStore::new();
        let (table, root) = topology(&mut store);
        let mut nav = engine(&table, store);
        nav.open(root, &Always);

        nav.move_cursor(Direction::Up, &Always);
        assert_eq!(nav.current_entry().map(Entry::text), Some("EXIT"));
        nav.move_cursor(Direction::Down, &Always);
        assert_eq!(nav.current_entry().map(Entry::text), Some("-- MAIN --"));

        let cond = TextConditions::new(vec![], vec!["A".into()]);
        nav.move_cursor(Direction::Down, &cond);
        assert_eq!(nav.current_entry().map(Entry::text), Some("B"));
    }

    #[test]
    fn cursor_holds_when_single_stop_remains() {
        let mut store = MemoryStore::new();
        let (table, root) = topology(&mut store);
        let mut nav = engine(&table, store);
        let cond = TextConditions::new(vec!["A".into(), "B".into(), "EXIT".into()], vec![]);
        nav.open(root, &cond);

        for _ in 0..3 {
            assert!(!nav.move_cursor(Direction::Down, &cond).redraw);
            assert_eq!(nav.top().map(|f| f.cursor), Some(0));
        }
    }

    #[test]
    fn back_restores_parent_frame_verbatim() {
        let mut store = MemoryStore::new();
        let (table, root) = topology(&mut store);
        let mut nav = engine(&table, store);
        nav.open(root, &Always);
        nav.move_cursor(Direction::Down, &Always);
        nav.move_cursor(Direction::Down, &Always);
        let before = nav.frames().to_vec();

        nav.activate(&Always);
        assert_eq!(nav.depth(), 2);
        nav.handle(Gesture::Back, &Always);
        assert_eq!(nav.frames(), before.as_slice());
    }

    #[test]
    fn back_from_root_deactivates_without_global_exit() {
        let mut store = MemoryStore::new();
        let (table, root) = topology(&mut store);
        let mut nav = engine(&table, store);
        nav.open(root, &Always);
        take_log();

        nav.move_cursor(Direction::Up, &Always);
        let update = nav.activate(&Always);
        assert!(update.closed);
        assert_eq!(nav.state(), State::Inactive);
        assert_eq!(take_log(), vec!["exit:ROOT"]);
    }

    #[test]
    fn exit_all_unwinds_innermost_first() {
        let mut store = MemoryStore::new();
        let (table, root) = topology(&mut store);
        let mut nav = engine(&table, store);
        nav.open(root, &Always);
        nav.move_cursor(Direction::Down, &Always);
        nav.move_cursor(Direction::Down, &Always);
        nav.activate(&Always);
        nav.activate(&Always);
        assert_eq!(nav.depth(), 3);
        take_log();

        let update = nav.exit_all(ExitMode::Exit);
        assert!(update.closed);
        assert_eq!(nav.state(), State::Inactive);
        assert_eq!(take_log(), vec!["exit:C", "exit:B", "exit:ROOT", "global:ROOT"]);

        assert_eq!(nav.exit_all(ExitMode::Exit), Update::default());
        assert!(take_log().is_empty());
    }

    #[test]
    fn self_link_is_refused_as_cycle() {
        let mut table = MenuTable::new();
        let a = table.insert(hooked(
            "A",
            vec![Entry::submenu("AGAIN", MenuId(0)), Entry::back("BACK")],
        ));
        let mut nav = engine(&table, MemoryStore::new());
        nav.open(a, &Always);
        take_log();
        let before = nav.frames().to_vec();

        let update = nav.activate(&Always);
        assert_eq!(update.diagnostic, Some(NavError::CycleDetected { menu: a }));
        assert_eq!(nav.frames(), before.as_slice());
        assert_eq!(nav.last_diagnostic(), Some(NavError::CycleDetected { menu: a }));
        assert!(take_log().is_empty());
    }

    #[test]
    fn corrupted_descriptor_is_not_pushed() {
        let mut table = MenuTable::new();
        let entries = vec![Entry::label("X"), Entry::end()];
        let guard = Guard::compute("BAD", &entries);
        let bad = table.insert(Menu::from_parts(
            "BAD",
            entries,
            Guard {
                checksum: guard.checksum ^ 0x5a5a,
                ..guard
            },
        ));
        let root = table.insert(Menu::new("ROOT", vec![Entry::submenu("BAD", bad)]).unwrap());
        let dangling = table.insert(
            Menu::new("DANGLING", vec![Entry::submenu("NOWHERE", MenuId(77))]).unwrap(),
        );

        let mut nav = engine(&table, MemoryStore::new());
        let update = nav.open(bad, &Always);
        assert!(matches!(
            update.diagnostic,
            Some(NavError::StructuralViolation {
                violation: Violation::ChecksumMismatch { .. },
                ..
            })
        ));
        assert_eq!(nav.state(), State::Inactive);

        nav.open(root, &Always);
        nav.activate(&Always);
        assert_eq!(nav.depth(), 1);
        nav.exit_all(ExitMode::Exit);

        nav.open(dangling, &Always);
        let update = nav.activate(&Always);
        assert_eq!(update.diagnostic, Some(NavError::UnknownMenu { menu: MenuId(77) }));
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn depth_limit_refuses_push() {
        let mut table = MenuTable::new();
        for i in 0..3u16 {
            table.insert(
                Menu::new(format!("L{i}"), vec![Entry::submenu("NEXT", MenuId(i + 1))]).unwrap(),
            );
        }
        table.insert(Menu::new("L3", vec![Entry::back("BACK")]).unwrap());
        let mut nav: Engine<'_, MemoryStore, 2> =
            Engine::new(&table, Binding::new(MemoryStore::new(), WritePolicy::Immediate));

        nav.open(MenuId(0), &Always);
        nav.activate(&Always);
        let update = nav.activate(&Always);
        assert_eq!(update.diagnostic, Some(NavError::DepthExceeded { max: 2 }));
        assert_eq!(nav.depth(), 2);
    }

    #[test]
    fn on_enter_chain_back_pops_immediately() {
        let mut table = MenuTable::new();
        let guarded = MenuId(1);
        table.insert(Menu::new("ROOT", vec![Entry::submenu("LOCKED", guarded)]).unwrap());
        table.insert(
            Menu::new("LOCKED", vec![Entry::back("BACK")])
                .unwrap()
                .on_enter(refuse_entry)
                .on_exit(on_exit),
        );
        let mut nav = engine(&table, MemoryStore::new());
        nav.open(MenuId(0), &Always);
        take_log();

        let update = nav.activate(&Always);
        assert!(update.redraw);
        assert!(!update.closed);
        assert_eq!(nav.depth(), 1);
        assert_eq!(take_log(), vec!["enter:LOCKED", "exit:LOCKED"]);
    }

    fn save_and_exit(_ctx: &mut HookContext<'_>) -> HookOutcome {
        HookOutcome::Exit(ExitMode::Save)
    }

    fn bump(ctx: &mut HookContext<'_>) -> HookOutcome {
        let id = SettingId(0);
        if let Some(SettingValue::Int(v)) = ctx.settings.get(id) {
            let _ = ctx.settings.set(id, SettingValue::Int(v + 1));
        }
        HookOutcome::Continue
    }

    #[test]
    fn action_entries_reach_settings_and_can_exit() {
        let mut store = MemoryStore::new();
        let counter = store.define(
            "counter",
            SettingMeta::new(SettingKind::Int { min: 0, max: 9, step: 1 }),
            SettingValue::Int(0),
        );
        let mut table = MenuTable::new();
        let root = table.insert(
            Menu::new(
                "ROOT",
                vec![Entry::action("BUMP", bump), Entry::action("SAVE & EXIT", save_and_exit)],
            )
            .unwrap(),
        );
        let mut nav = engine(&table, store);
        nav.open(root, &Always);

        nav.activate(&Always);
        assert_eq!(nav.binding().store().get(counter), Some(SettingValue::Int(1)));
        nav.move_cursor(Direction::Down, &Always);
        let update = nav.activate(&Always);
        assert!(update.closed);
        assert_eq!(nav.binding().store().save_count(), 1);
    }

    #[test]
    fn editing_routes_directions_to_the_setting() {
        let mut store = MemoryStore::new();
        let (table, root) = topology(&mut store);
        let mut nav = engine(&table, store);
        nav.open(root, &Always);
        nav.move_cursor(Direction::Down, &Always);
        nav.activate(&Always);
        nav.activate(&Always);
        assert_eq!(nav.state(), State::Editing);

        nav.handle(Gesture::Down, &Always);
        assert_eq!(nav.top().map(|f| f.cursor), Some(0));
        assert_eq!(nav.binding().read(SettingId(0)), "ON");

        nav.handle(Gesture::Cancel, &Always);
        assert_eq!(nav.state(), State::Active);
        assert_eq!(nav.binding().read(SettingId(0)), "OFF");
    }

    #[test]
    fn read_only_entry_rejects_edits() {
        let mut store = MemoryStore::new();
        let x = store.define_enum("x", ["OFF", "ON"], 0);
        let mut table = MenuTable::new();
        let root = table.insert(
            Menu::new(
                "ROOT",
                vec![Entry::setting("X", x).with_flags(EntryFlags::READ_ONLY)],
            )
            .unwrap(),
        );
        let mut nav = engine(&table, store);
        nav.open(root, &Always);
        nav.activate(&Always);

        let update = nav.handle(Gesture::EditPlus, &Always);
        assert_eq!(update.diagnostic, Some(NavError::Rejected(Rejected::ReadOnly)));
        assert_eq!(nav.binding().read(x), "OFF");
    }

    struct HideSecond;

    impl Conditions for HideSecond {
        fn is_visible(&self, entry: &Entry) -> bool {
            !(HIDE_SECOND.with(Cell::get) && entry.text() == "A")
        }
    }

    #[test]
    fn conditions_are_reevaluated_every_pass() {
        let mut store = MemoryStore::new();
        let (table, root) = topology(&mut store);
        let mut nav = engine(&table, store);
        nav.open(root, &HideSecond);
        nav.move_cursor(Direction::Down, &HideSecond);
        assert_eq!(nav.current_entry().map(Entry::text), Some("A"));

        HIDE_SECOND.with(|h| h.set(true));
        assert!(!nav.activate(&HideSecond).redraw);
        assert_eq!(nav.depth(), 1);
        let texts: Vec<&str> = nav
            .window(&HideSecond)
            .map(|w| w.rows().map(|r| r.text).collect())
            .unwrap_or_default();
        assert_eq!(texts, vec!["-- MAIN --", "B", "EXIT"]);

        nav.move_cursor(Direction::Down, &HideSecond);
        assert_eq!(nav.current_entry().map(Entry::text), Some("B"));

        HIDE_SECOND.with(|h| h.set(false));
        nav.move_cursor(Direction::Up, &HideSecond);
        assert_eq!(nav.current_entry().map(Entry::text), Some("A"));
    }

    #[test]
    fn window_scrolls_with_cursor() {
        let mut store = MemoryStore::new();
        let (table, root) = topology(&mut store);
        let mut nav = engine(&table, store);
        assert!(nav.window(&Always).is_none());
        nav.open(root, &Always);

        let indicator = nav.window(&Always).map(|w| w.indicator());
        assert_eq!(indicator, Some(ScrollIndicator { above: false, below: true }));

        nav.move_cursor(Direction::Up, &Always);
        let window = nav.window(&Always).unwrap();
        let rows: Vec<(&str, bool)> = window.rows().map(|r| (r.text, r.selected)).collect();
        assert_eq!(rows, vec![("A", false), ("B", false), ("EXIT", true)]);
        assert_eq!(window.indicator(), ScrollIndicator { above: true, below: false });
    }
}
