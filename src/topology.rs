use std::{collections::HashMap, fmt, fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::menu::{
    Entry, EntryFlags, EntryKind, Guard, HookContext, HookOutcome, Menu, MenuHook, MenuId,
    MenuTable, MENU_TAG,
};
use crate::nav::ExitMode;
use crate::settings::{FormattedValue, MemoryStore, SettingKind, SettingMeta, SettingValue};

#[derive(Debug, Deserialize)]
struct TopologyFile {
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    settings: Vec<SettingDef>,
    menus: Vec<MenuDef>,
}

#[derive(Debug, Deserialize)]
struct SettingDef {
    name: String,
    #[serde(default)]
    read_only: bool,
    #[serde(flatten)]
    kind: SettingKindDef,
}

fn default_step() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum SettingKindDef {
    Int {
        min: i32,
        max: i32,
        #[serde(default = "default_step")]
        step: i32,
        value: i32,
    },
    Float {
        min: f32,
        max: f32,
        step: f32,
        #[serde(default)]
        decimals: u8,
        value: f32,
    },
    Enum {
        values: Vec<String>,
        #[serde(default)]
        value: Option<String>,
    },
    Bool {
        #[serde(default)]
        value: bool,
    },
    Text {
        #[serde(default)]
        value: String,
    },
}

#[derive(Debug, Deserialize)]
struct MenuDef {
    name: String,
    /// Stored checksum; when present it is kept verbatim and checked on push.
    #[serde(default)]
    guard: Option<u16>,
    #[serde(default)]
    on_enter: Option<String>,
    #[serde(default)]
    on_exit: Option<String>,
    #[serde(default)]
    on_global_exit: Option<String>,
    entries: Vec<EntryDef>,
}

#[derive(Debug, Deserialize)]
struct EntryDef {
    #[serde(flatten)]
    kind: EntryKindDef,
    #[serde(default)]
    text: String,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    read_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EntryKindDef {
    Label,
    Info,
    Back,
    End,
    Setting { setting: String },
    Submenu { menu: String },
    Action { action: String },
}

/// Named hooks a topology file may refer to.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, MenuHook>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("HookRegistry").field("hooks", &names).finish()
    }
}

fn hook_exit(_ctx: &mut HookContext<'_>) -> HookOutcome {
    HookOutcome::Exit(ExitMode::Exit)
}

fn hook_save_exit(_ctx: &mut HookContext<'_>) -> HookOutcome {
    HookOutcome::Exit(ExitMode::Save)
}

fn hook_chain_back(_ctx: &mut HookContext<'_>) -> HookOutcome {
    HookOutcome::ChainBack
}

fn hook_trace(ctx: &mut HookContext<'_>) -> HookOutcome {
    tracing::info!(
        menu = ctx.menu.name(),
        depth = ctx.depth,
        trigger = ctx.trigger.map(Entry::text),
        "menu hook"
    );
    HookOutcome::Continue
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `exit`, `save_exit`, `chain_back` and `trace`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("exit", hook_exit);
        registry.register("save_exit", hook_save_exit);
        registry.register("chain_back", hook_chain_back);
        registry.register("trace", hook_trace);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, hook: MenuHook) {
        self.hooks.insert(name.into(), hook);
    }

    pub fn get(&self, name: &str) -> Option<MenuHook> {
        self.hooks.get(name).copied()
    }
}

/// A loaded topology: the menus, an in-memory store seeded with the declared
/// settings, and the root named by the file (if any).
#[derive(Debug)]
pub struct Topology {
    pub menus: MenuTable,
    pub store: MemoryStore,
    pub root: Option<MenuId>,
}

impl Topology {
    pub fn load(path: &Path, hooks: &HookRegistry) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading topology {}", path.display()))?;
        Self::from_json(&text, hooks).with_context(|| format!("loading {}", path.display()))
    }

    pub fn from_json(text: &str, hooks: &HookRegistry) -> Result<Self> {
        let file: TopologyFile = serde_json::from_str(text).context("parsing topology JSON")?;

        let mut store = MemoryStore::new();
        for def in &file.settings {
            if store.id_of(&def.name).is_some() {
                bail!("setting '{}' is declared twice", def.name);
            }
            define_setting(&mut store, def)?;
        }

        let mut ids: HashMap<&str, MenuId> = HashMap::new();
        for (i, def) in file.menus.iter().enumerate() {
            let id = MenuId(u16::try_from(i).context("too many menus")?);
            if ids.insert(def.name.as_str(), id).is_some() {
                bail!("menu '{}' is declared twice", def.name);
            }
        }

        let mut menus = MenuTable::new();
        for def in &file.menus {
            let menu = build_menu(def, &ids, &store, hooks)
                .with_context(|| format!("menu '{}'", def.name))?;
            menus.insert(menu);
        }

        let root = match file.root.as_deref() {
            Some(name) => Some(
                *ids.get(name)
                    .ok_or_else(|| anyhow!("root menu '{name}' is not declared"))?,
            ),
            None => None,
        };

        Ok(Self { menus, store, root })
    }

    /// Picks the root: an explicit name, else the file's root, else the first menu.
    pub fn resolve_root(&self, name: Option<&str>) -> Result<MenuId> {
        if let Some(name) = name {
            return self
                .menus
                .find(name)
                .ok_or_else(|| anyhow!("no menu named '{name}'"));
        }
        if let Some(root) = self.root {
            return Ok(root);
        }
        if self.menus.is_empty() {
            bail!("topology declares no menus");
        }
        Ok(MenuId(0))
    }
}

fn define_setting(store: &mut MemoryStore, def: &SettingDef) -> Result<()> {
    let (kind, value, labels) = match &def.kind {
        SettingKindDef::Int { min, max, step, value } => (
            SettingKind::Int {
                min: *min,
                max: *max,
                step: *step,
            },
            SettingValue::Int(*value),
            Vec::new(),
        ),
        SettingKindDef::Float {
            min,
            max,
            step,
            decimals,
            value,
        } => (
            SettingKind::Float {
                min: *min,
                max: *max,
                step: *step,
                decimals: *decimals,
            },
            SettingValue::Float(*value),
            Vec::new(),
        ),
        SettingKindDef::Enum { values, value } => {
            let index = match value {
                Some(label) => values
                    .iter()
                    .position(|v| v == label)
                    .ok_or_else(|| {
                        anyhow!("setting '{}': '{label}' is not one of its values", def.name)
                    })?,
                None => 0,
            };
            let len = u16::try_from(values.len()).context("enum table too large")?;
            (
                SettingKind::Enum { len },
                SettingValue::Int(i32::try_from(index)?),
                values.clone(),
            )
        }
        SettingKindDef::Bool { value } => {
            (SettingKind::Bool, SettingValue::Bool(*value), Vec::new())
        }
        SettingKindDef::Text { value } => (
            SettingKind::Text,
            SettingValue::Text(FormattedValue::from_text(value)),
            Vec::new(),
        ),
    };

    let mut meta = SettingMeta::new(kind);
    if def.read_only {
        meta = meta.read_only();
    }
    store.define_labeled(def.name.clone(), meta, value, labels);
    Ok(())
}

fn build_menu(
    def: &MenuDef,
    ids: &HashMap<&str, MenuId>,
    store: &MemoryStore,
    hooks: &HookRegistry,
) -> Result<Menu> {
    let hook = |name: &Option<String>| -> Result<Option<MenuHook>> {
        name.as_deref()
            .map(|n| hooks.get(n).ok_or_else(|| anyhow!("unknown hook '{n}'")))
            .transpose()
    };

    let mut entries = Vec::with_capacity(def.entries.len() + 1);
    for entry in &def.entries {
        let kind = match &entry.kind {
            EntryKindDef::Label => EntryKind::Label,
            EntryKindDef::Info => EntryKind::Info,
            EntryKindDef::Back => EntryKind::Back,
            EntryKindDef::End => EntryKind::End,
            EntryKindDef::Setting { setting } => EntryKind::Setting(
                store
                    .id_of(setting)
                    .ok_or_else(|| {
                        anyhow!("'{}' refers to unknown setting '{setting}'", entry.text)
                    })?,
            ),
            EntryKindDef::Submenu { menu } => EntryKind::Submenu(
                *ids.get(menu.as_str())
                    .ok_or_else(|| anyhow!("'{}' links to unknown menu '{menu}'", entry.text))?,
            ),
            EntryKindDef::Action { action } => EntryKind::Action(
                hooks
                    .get(action)
                    .ok_or_else(|| anyhow!("'{}' uses unknown action '{action}'", entry.text))?,
            ),
        };

        let mut flags = EntryFlags::empty();
        flags.set(EntryFlags::HIDDEN, entry.hidden);
        flags.set(EntryFlags::DISABLED, entry.disabled);
        flags.set(EntryFlags::READ_ONLY, entry.read_only);
        entries.push(Entry::new(entry.text.clone(), kind).with_flags(flags));
    }

    let mut menu = match def.guard {
        Some(checksum) => {
            if !entries.iter().any(Entry::is_terminator) {
                entries.push(Entry::end());
            }
            let guard = Guard {
                tag: MENU_TAG,
                checksum,
            };
            Menu::from_parts(def.name.clone(), entries, guard)
        }
        None => Menu::new(def.name.clone(), entries).map_err(|v| anyhow!("{v}"))?,
    };

    if let Some(h) = hook(&def.on_enter)? {
        menu = menu.on_enter(h);
    }
    if let Some(h) = hook(&def.on_exit)? {
        menu = menu.on_exit(h);
    }
    if let Some(h) = hook(&def.on_global_exit)? {
        menu = menu.on_global_exit(h);
    }
    Ok(menu)
}
