use std::fmt::Write as _;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Rejected;
use crate::settings::{
    FormattedValue, SettingId, SettingKind, SettingMeta, SettingValue, SettingsStore,
};

/// When edited values reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Every step is written to the store as it happens.
    #[default]
    Immediate,
    /// Steps accumulate in the adapter until `commit`.
    Buffered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy)]
struct EditSession {
    id: SettingId,
    original: Option<SettingValue>,
    pending: Option<SettingValue>,
}

/// Uniform read/step/commit access to typed settings.
#[derive(Debug)]
pub struct Binding<S> {
    store: S,
    policy: WritePolicy,
    edit: Option<EditSession>,
}

impl<S: SettingsStore> Binding<S> {
    pub fn new(store: S, policy: WritePolicy) -> Self {
        Self {
            store,
            policy,
            edit: None,
        }
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Setting with an open edit session, if any.
    pub fn editing(&self) -> Option<SettingId> {
        self.edit.map(|e| e.id)
    }

    pub fn has_pending(&self) -> bool {
        self.edit.is_some_and(|e| e.pending.is_some())
    }

    /// Human-readable value, including any buffered edit. Never fails: without
    /// metadata the raw value is shown, without a value `---`.
    pub fn read(&self, id: SettingId) -> FormattedValue {
        let Some(value) = self.pending_for(id).or_else(|| self.store.get(id)) else {
            return FormattedValue::from_text("---");
        };
        match self.store.meta(id) {
            Some(meta) => format_value(&self.store, id, &meta, &value),
            None => value.raw(),
        }
    }

    /// Opens an edit session, remembering the current value so a cancel can
    /// put it back.
    pub fn begin(&mut self, id: SettingId) {
        if let Some(open) = self.edit {
            if open.id != id && open.pending.is_some() {
                warn!(setting = open.id.0, "dropping buffered edit for another setting");
            }
        }
        self.edit = Some(EditSession {
            id,
            original: self.store.get(id),
            pending: None,
        });
    }

    /// Steps the setting once in `delta`'s direction, clamped to its range.
    pub fn modify(&mut self, id: SettingId, delta: Delta) -> Result<FormattedValue, Rejected> {
        let meta = self.store.meta(id).ok_or(Rejected::Unsupported)?;
        if meta.read_only {
            return Err(Rejected::ReadOnly);
        }
        let current = self
            .pending_for(id)
            .or_else(|| self.store.get(id))
            .ok_or(Rejected::Unsupported)?;
        let next = step(&meta.kind, current, delta)?;

        if self.editing() != Some(id) {
            self.begin(id);
        }
        match self.policy {
            WritePolicy::Immediate => self.store.set(id, next)?,
            WritePolicy::Buffered => {
                if let Some(session) = self.edit.as_mut() {
                    session.pending = Some(next);
                }
            }
        }
        Ok(self.read(id))
    }

    /// Ends the session for `id`, writing a buffered value through.
    pub fn commit(&mut self, id: SettingId) -> Result<(), Rejected> {
        let Some(session) = self.edit.filter(|e| e.id == id) else {
            return Ok(());
        };
        self.edit = None;
        if let Some(value) = session.pending {
            debug!(setting = id.0, "committing buffered edit");
            self.store.set(id, value)?;
        }
        Ok(())
    }

    /// Ends the session for `id` without keeping its changes.
    pub fn cancel(&mut self, id: SettingId) {
        let Some(session) = self.edit.filter(|e| e.id == id) else {
            return;
        };
        self.edit = None;
        if self.policy != WritePolicy::Immediate {
            return;
        }
        let Some(original) = session.original else {
            return;
        };
        if self.store.get(id) != Some(original) {
            if let Err(err) = self.store.set(id, original) {
                warn!(setting = id.0, %err, "could not restore value on cancel");
            }
        }
    }

    fn pending_for(&self, id: SettingId) -> Option<SettingValue> {
        self.edit.filter(|e| e.id == id).and_then(|e| e.pending)
    }
}

fn step(kind: &SettingKind, current: SettingValue, delta: Delta) -> Result<SettingValue, Rejected> {
    match (*kind, current) {
        (SettingKind::Int { min, max, step }, SettingValue::Int(v)) => {
            if step <= 0 || min > max {
                return Err(Rejected::Unsupported);
            }
            let v = v.clamp(min, max);
            let next = match delta {
                Delta::Increment => v.saturating_add(step),
                Delta::Decrement => v.saturating_sub(step),
            };
            Ok(SettingValue::Int(next.clamp(min, max)))
        }
        (
            SettingKind::Float {
                min,
                max,
                step,
                decimals,
            },
            SettingValue::Float(v),
        ) => {
            if !(step > 0.0 && step.is_finite() && min <= max) {
                return Err(Rejected::Unsupported);
            }
            let v = if v.is_finite() { v.clamp(min, max) } else { min };
            let next = match delta {
                Delta::Increment => v + step,
                Delta::Decrement => v - step,
            };
            // keep repeated steps from drifting, never coarser than the step itself
            let scale = 10f32.powi(i32::from(float_precision(decimals, step)));
            Ok(SettingValue::Float(((next * scale).round() / scale).clamp(min, max)))
        }
        (SettingKind::Enum { len }, SettingValue::Int(v)) => {
            if len == 0 {
                return Err(Rejected::Unsupported);
            }
            let last = i32::from(len) - 1;
            let v = v.clamp(0, last);
            let next = match delta {
                Delta::Increment => (v + 1).min(last),
                Delta::Decrement => (v - 1).max(0),
            };
            Ok(SettingValue::Int(next))
        }
        (SettingKind::Bool, SettingValue::Bool(_)) => {
            Ok(SettingValue::Bool(delta == Delta::Increment))
        }
        _ => Err(Rejected::Unsupported),
    }
}

/// Digits needed to show a float setting: the declared `decimals`, raised to
/// the digits of `step` so a single step always changes the value.
fn float_precision(decimals: u8, step: f32) -> u8 {
    let mut digits = 0u8;
    let mut scaled = step.abs();
    while digits < 6 && (scaled - scaled.round()).abs() > 1e-3 * scaled.max(1.0) {
        scaled *= 10.0;
        digits += 1;
    }
    decimals.max(digits)
}

fn format_value<S: SettingsStore>(
    store: &S,
    id: SettingId,
    meta: &SettingMeta,
    value: &SettingValue,
) -> FormattedValue {
    let mut out = FormattedValue::new();
    match (meta.kind, value) {
        (SettingKind::Int { .. }, SettingValue::Int(v)) => {
            let _ = write!(out, "{v}");
        }
        (SettingKind::Float { decimals, step, .. }, SettingValue::Float(v)) => {
            let prec = usize::from(float_precision(decimals, step));
            let _ = write!(out, "{v:.prec$}");
        }
        (SettingKind::Enum { .. }, SettingValue::Int(v)) => {
            let label = u16::try_from(*v).ok().and_then(|i| store.enum_label(id, i));
            match label {
                Some(label) => {
                    let _ = out.write_str(label);
                }
                None => return value.raw(),
            }
        }
        (SettingKind::Bool, SettingValue::Bool(v)) => {
            let _ = out.write_str(if *v { "ON" } else { "OFF" });
        }
        (SettingKind::Text, SettingValue::Text(t)) => return *t,
        _ => return value.raw(),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::settings::MemoryStore;

    fn percent(store: &mut MemoryStore, value: i32) -> SettingId {
        store.define(
            "nav_mc_hover_thr",
            SettingMeta::new(SettingKind::Int { min: 0, max: 100, step: 10 }),
            SettingValue::Int(value),
        )
    }

    #[test]
    fn int_steps_clamp_at_both_ends() {
        let mut store = MemoryStore::new();
        let high = percent(&mut store, 95);
        let low = percent(&mut store, 5);
        let mut binding = Binding::new(store, WritePolicy::Immediate);

        assert_eq!(binding.modify(high, Delta::Increment).unwrap(), "100");
        assert_eq!(binding.modify(high, Delta::Increment).unwrap(), "100");
        assert_eq!(binding.modify(low, Delta::Decrement).unwrap(), "0");
        assert_eq!(binding.store().get(low), Some(SettingValue::Int(0)));
    }

    #[test]
    fn enum_steps_through_labels_without_wrapping() {
        let mut store = MemoryStore::new();
        let tail = store.define_enum("nav_rth_tail_first", ["OFF", "ON"], 0);
        let mut binding = Binding::new(store, WritePolicy::Immediate);

        assert_eq!(binding.read(tail), "OFF");
        assert_eq!(binding.modify(tail, Delta::Increment).unwrap(), "ON");
        assert_eq!(binding.modify(tail, Delta::Increment).unwrap(), "ON");
        assert_eq!(binding.modify(tail, Delta::Decrement).unwrap(), "OFF");
        assert_eq!(binding.modify(tail, Delta::Decrement).unwrap(), "OFF");
    }

    #[test]
    fn float_and_bool_formatting() {
        let mut store = MemoryStore::new();
        let ratio = store.define(
            "nav_fw_pitch2thr",
            SettingMeta::new(SettingKind::Float {
                min: 0.0,
                max: 1.0,
                step: 0.1,
                decimals: 1,
            }),
            SettingValue::Float(0.9),
        );
        let midthr = store.define(
            "nav_use_midthr_for_althold",
            SettingMeta::new(SettingKind::Bool),
            SettingValue::Bool(false),
        );
        let mut binding = Binding::new(store, WritePolicy::Immediate);

        assert_eq!(binding.read(ratio), "0.9");
        assert_eq!(binding.modify(ratio, Delta::Increment).unwrap(), "1.0");
        assert_eq!(binding.modify(ratio, Delta::Increment).unwrap(), "1.0");
        assert_eq!(binding.read(midthr), "OFF");
        assert_eq!(binding.modify(midthr, Delta::Increment).unwrap(), "ON");
    }

    #[test]
    fn float_step_finer_than_decimals_still_moves() {
        let mut store = MemoryStore::new();
        let ratio = store.define(
            "nav_fw_pitch2thr",
            SettingMeta::new(SettingKind::Float {
                min: 0.0,
                max: 2.0,
                step: 0.1,
                decimals: 0,
            }),
            SettingValue::Float(1.0),
        );
        let mut binding = Binding::new(store, WritePolicy::Immediate);

        for _ in 0..5 {
            binding.modify(ratio, Delta::Increment).unwrap();
        }
        assert_eq!(binding.store().get(ratio), Some(SettingValue::Float(1.5)));
        assert_eq!(binding.read(ratio), "1.5");
        assert_eq!(binding.modify(ratio, Delta::Decrement).unwrap(), "1.4");
    }

    #[test]
    fn float_precision_follows_step_digits() {
        assert_eq!(float_precision(0, 0.1), 1);
        assert_eq!(float_precision(0, 0.25), 2);
        assert_eq!(float_precision(0, 5.0), 0);
        assert_eq!(float_precision(2, 0.5), 2);
    }

    #[test]
    fn read_only_and_unsteppable_settings_are_rejected() {
        let mut store = MemoryStore::new();
        let ro = store.define(
            "nav_rth_altitude",
            SettingMeta::new(SettingKind::Int { min: 0, max: 10, step: 1 }).read_only(),
            SettingValue::Int(3),
        );
        let name = store.define(
            "name",
            SettingMeta::new(SettingKind::Text),
            SettingValue::Text(FormattedValue::from_text("QUAD")),
        );
        let no_step = store.define(
            "no_step",
            SettingMeta::new(SettingKind::Int { min: 0, max: 10, step: 0 }),
            SettingValue::Int(3),
        );
        let mut binding = Binding::new(store, WritePolicy::Immediate);

        assert_eq!(binding.modify(ro, Delta::Increment), Err(Rejected::ReadOnly));
        assert_eq!(binding.modify(name, Delta::Increment), Err(Rejected::Unsupported));
        assert_eq!(binding.modify(no_step, Delta::Increment), Err(Rejected::Unsupported));
        assert_eq!(binding.read(ro), "3");
        assert_eq!(binding.read(name), "QUAD");
        assert_eq!(binding.read(SettingId(99)), "---");
    }

    #[test]
    fn buffered_edits_only_land_on_commit() {
        let mut store = MemoryStore::new();
        let id = percent(&mut store, 50);
        let mut binding = Binding::new(store, WritePolicy::Buffered);

        binding.begin(id);
        binding.modify(id, Delta::Increment).unwrap();
        binding.modify(id, Delta::Increment).unwrap();
        assert_eq!(binding.read(id), "70");
        assert!(binding.has_pending());
        assert_eq!(binding.store().get(id), Some(SettingValue::Int(50)));

        binding.commit(id).unwrap();
        assert_eq!(binding.store().get(id), Some(SettingValue::Int(70)));
        assert_eq!(binding.editing(), None);
    }

    #[test]
    fn buffered_cancel_discards() {
        let mut store = MemoryStore::new();
        let id = percent(&mut store, 50);
        let mut binding = Binding::new(store, WritePolicy::Buffered);

        binding.begin(id);
        binding.modify(id, Delta::Decrement).unwrap();
        binding.cancel(id);
        assert_eq!(binding.read(id), "50");
        assert!(!binding.store().is_dirty());
    }

    #[test]
    fn immediate_cancel_restores_original() {
        let mut store = MemoryStore::new();
        let id = percent(&mut store, 50);
        let mut binding = Binding::new(store, WritePolicy::Immediate);

        binding.begin(id);
        binding.modify(id, Delta::Increment).unwrap();
        assert_eq!(binding.store().get(id), Some(SettingValue::Int(60)));
        binding.cancel(id);
        assert_eq!(binding.store().get(id), Some(SettingValue::Int(50)));
    }

    struct BareStore(i32);

    impl SettingsStore for BareStore {
        fn meta(&self, _id: SettingId) -> Option<SettingMeta> {
            None
        }
        fn get(&self, _id: SettingId) -> Option<SettingValue> {
            Some(SettingValue::Int(self.0))
        }
        fn set(&mut self, _id: SettingId, _value: SettingValue) -> Result<(), StoreError> {
            Err(StoreError::ReadOnly)
        }
        fn enum_label(&self, _id: SettingId, _index: u16) -> Option<&str> {
            None
        }
    }

    #[test]
    fn missing_metadata_falls_back_to_raw() {
        let mut binding = Binding::new(BareStore(1234), WritePolicy::Immediate);
        assert_eq!(binding.read(SettingId(0)), "1234");
        assert_eq!(binding.modify(SettingId(0), Delta::Increment), Err(Rejected::Unsupported));
    }
}
