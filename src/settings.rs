use std::fmt::{self, Write as _};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingId(pub u16);

/// Type and bounds of a setting, as reported by its store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingKind {
    Int { min: i32, max: i32, step: i32 },
    Float { min: f32, max: f32, step: f32, decimals: u8 },
    /// Index into a label table of `len` entries; labels come from
    /// [`SettingsStore::enum_label`].
    Enum { len: u16 },
    Bool,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettingMeta {
    pub kind: SettingKind,
    pub read_only: bool,
}

impl SettingMeta {
    pub fn new(kind: SettingKind) -> Self {
        Self {
            kind,
            read_only: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Text(FormattedValue),
}

impl SettingValue {
    /// Renders without any metadata: numbers as numbers, booleans as 0/1.
    pub fn raw(&self) -> FormattedValue {
        let mut out = FormattedValue::new();
        let _ = match self {
            SettingValue::Int(v) => write!(out, "{v}"),
            SettingValue::Float(v) => write!(out, "{v}"),
            SettingValue::Bool(v) => write!(out, "{}", u8::from(*v)),
            SettingValue::Text(t) => out.write_str(t.as_str()),
        };
        out
    }
}

/// Fixed-capacity text buffer for rendered values. Writes past the capacity
/// are truncated on a character boundary, so formatting never allocates.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FormattedValue {
    buf: [u8; FormattedValue::CAPACITY],
    len: u8,
}

impl FormattedValue {
    pub const CAPACITY: usize = 16;

    pub const fn new() -> Self {
        Self {
            buf: [0; Self::CAPACITY],
            len: 0,
        }
    }

    pub fn from_text(text: &str) -> Self {
        let mut out = Self::new();
        let _ = out.write_str(text);
        out
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..usize::from(self.len)]).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for FormattedValue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for FormattedValue {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            let width = ch.len_utf8();
            let at = usize::from(self.len);
            if at + width > Self::CAPACITY {
                break;
            }
            ch.encode_utf8(&mut self.buf[at..at + width]);
            self.len += width as u8;
        }
        Ok(())
    }
}

impl fmt::Display for FormattedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for FormattedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl PartialEq<&str> for FormattedValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Backing storage for settings. The engine only reaches it through
/// [`crate::binding::Binding`] and hook contexts.
pub trait SettingsStore {
    fn meta(&self, id: SettingId) -> Option<SettingMeta>;
    fn get(&self, id: SettingId) -> Option<SettingValue>;
    fn set(&mut self, id: SettingId, value: SettingValue) -> Result<(), StoreError>;
    fn enum_label(&self, id: SettingId, index: u16) -> Option<&str>;

    /// Persists current values. Stores that write through on `set` have
    /// nothing to do here.
    fn save(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredSetting {
    name: String,
    meta: SettingMeta,
    value: SettingValue,
    labels: Vec<String>,
}

/// Named settings held in memory, with type and range checks on `set`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    settings: Vec<StoredSetting>,
    saved: Vec<SettingValue>,
    dirty: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        name: impl Into<String>,
        meta: SettingMeta,
        value: SettingValue,
    ) -> SettingId {
        self.push(name.into(), meta, value, Vec::new())
    }

    pub fn define_enum<I, L>(&mut self, name: impl Into<String>, labels: I, index: u16) -> SettingId
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let meta = SettingMeta::new(SettingKind::Enum {
            len: labels.len() as u16,
        });
        self.push(name.into(), meta, SettingValue::Int(i32::from(index)), labels)
    }

    /// Like [`MemoryStore::define`], with a label table for enum settings.
    pub fn define_labeled(
        &mut self,
        name: impl Into<String>,
        meta: SettingMeta,
        value: SettingValue,
        labels: Vec<String>,
    ) -> SettingId {
        self.push(name.into(), meta, value, labels)
    }

    fn push(
        &mut self,
        name: String,
        meta: SettingMeta,
        value: SettingValue,
        labels: Vec<String>,
    ) -> SettingId {
        let id = SettingId(self.settings.len() as u16);
        self.settings.push(StoredSetting {
            name,
            meta,
            value,
            labels,
        });
        self.saved.push(value);
        id
    }

    pub fn id_of(&self, name: &str) -> Option<SettingId> {
        self.settings
            .iter()
            .position(|s| s.name == name)
            .map(|i| SettingId(i as u16))
    }

    pub fn name_of(&self, id: SettingId) -> Option<&str> {
        self.slot(id).map(|s| s.name.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = SettingId> {
        (0..self.settings.len()).map(|i| SettingId(i as u16))
    }

    /// True when values changed since construction or the last `save`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn saved_value(&self, id: SettingId) -> Option<SettingValue> {
        self.saved.get(usize::from(id.0)).copied()
    }

    fn slot(&self, id: SettingId) -> Option<&StoredSetting> {
        self.settings.get(usize::from(id.0))
    }
}

fn check_value(meta: &SettingMeta, value: &SettingValue) -> Result<(), StoreError> {
    match (meta.kind, value) {
        (SettingKind::Int { min, max, .. }, SettingValue::Int(v)) => {
            if (min..=max).contains(v) {
                Ok(())
            } else {
                Err(StoreError::OutOfRange)
            }
        }
        (SettingKind::Float { min, max, .. }, SettingValue::Float(v)) => {
            if v.is_finite() && (min..=max).contains(v) {
                Ok(())
            } else {
                Err(StoreError::OutOfRange)
            }
        }
        (SettingKind::Enum { len }, SettingValue::Int(v)) => {
            if (0..i32::from(len)).contains(v) {
                Ok(())
            } else {
                Err(StoreError::OutOfRange)
            }
        }
        (SettingKind::Bool, SettingValue::Bool(_))
        | (SettingKind::Text, SettingValue::Text(_)) => Ok(()),
        _ => Err(StoreError::TypeMismatch),
    }
}

impl SettingsStore for MemoryStore {
    fn meta(&self, id: SettingId) -> Option<SettingMeta> {
        self.slot(id).map(|s| s.meta)
    }

    fn get(&self, id: SettingId) -> Option<SettingValue> {
        self.slot(id).map(|s| s.value)
    }

    fn set(&mut self, id: SettingId, value: SettingValue) -> Result<(), StoreError> {
        let slot = self
            .settings
            .get_mut(usize::from(id.0))
            .ok_or(StoreError::UnknownSetting)?;
        if slot.meta.read_only {
            return Err(StoreError::ReadOnly);
        }
        check_value(&slot.meta, &value)?;
        if slot.value != value {
            slot.value = value;
            self.dirty = true;
        }
        Ok(())
    }

    fn enum_label(&self, id: SettingId, index: u16) -> Option<&str> {
        self.slot(id)?
            .labels
            .get(usize::from(index))
            .map(String::as_str)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.saved = self.settings.iter().map(|s| s.value).collect();
        self.dirty = false;
        self.saves += 1;
        Ok(())
    }
}
