use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::binding::WritePolicy;
use crate::nav::DEFAULT_ROWS;

pub const DEFAULT_COLUMNS: usize = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Display row capacity.
    #[serde(default)]
    pub rows: Option<usize>,

    #[serde(default)]
    pub columns: Option<usize>,

    #[serde(default)]
    pub write_policy: Option<WritePolicy>,

    /// Topology file used when `--topology` is not given.
    #[serde(default)]
    pub topology: Option<PathBuf>,

    #[serde(default)]
    pub root: Option<String>,
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub rows: Option<usize>,
    pub columns: Option<usize>,
    pub write_policy: Option<WritePolicy>,
    pub topology: Option<PathBuf>,
    pub root: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub rows: usize,
    pub columns: usize,
    pub write_policy: WritePolicy,
    pub topology: Option<PathBuf>,
    pub root: Option<String>,
}

pub fn load_optional() -> Result<Option<Config>> {
    let Some(path) = resolve_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(&path).with_context(|| format!("reading config {}", path.display()))?;
    let cfg: Config =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(Some(cfg))
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("CMSNAV_CONFIG") {
        if !p.trim().is_empty() {
            return Some(PathBuf::from(p));
        }
    }

    let local = PathBuf::from("cmsnav.json");
    if local.exists() {
        return Some(local);
    }

    if let Some(appdata) = env::var_os("APPDATA") {
        return Some(PathBuf::from(appdata).join("cmsnav").join("config.json"));
    }

    if let Some(home) = env::var_os("HOME") {
        return Some(PathBuf::from(home).join(".config").join("cmsnav").join("config.json"));
    }

    None
}

pub fn resolve(config: Option<&Config>, overrides: Overrides) -> ResolvedConfig {
    let file = config.cloned().unwrap_or_default();
    ResolvedConfig {
        rows: overrides.rows.or(file.rows).unwrap_or(DEFAULT_ROWS).max(1),
        columns: overrides.columns.or(file.columns).unwrap_or(DEFAULT_COLUMNS),
        write_policy: overrides
            .write_policy
            .or(file.write_policy)
            .unwrap_or_default(),
        topology: overrides.topology.or(file.topology),
        root: overrides.root.or(file.root),
    }
}
