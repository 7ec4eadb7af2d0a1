use std::path::{Path, PathBuf};

use hostbridge_core::BridgeConfig;
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = ".hostbridge";
const CONFIG_FILE: &str = "config.toml";

/// Contents of a config.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// The configuration in effect, and where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub bridge: BridgeConfig,
    /// None when built-in defaults are used.
    pub source: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Apply command-line overrides on top of the file.
    pub fn with_overrides(mut self, timeout_ms: Option<u64>, no_timeout: bool) -> Self {
        if no_timeout {
            self.bridge.default_timeout_ms = None;
        } else if let Some(ms) = timeout_ms {
            self.bridge.default_timeout_ms = Some(ms);
        }
        self
    }
}

/// Resolve the configuration: an explicit file, else `.hostbridge/config.toml`
/// in the current directory or a parent, else the user config dir, else defaults.
pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return load(path);
    }
    let cwd = std::env::current_dir()?;
    let found = find_project_config(&cwd).or_else(|| user_config_path().filter(|p| p.exists()));
    match found {
        Some(path) => load(&path),
        None => Ok(ResolvedConfig {
            bridge: BridgeConfig::default(),
            source: None,
        }),
    }
}

/// Walk up from `start` looking for `.hostbridge/config.toml`.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("hostbridge").join(CONFIG_FILE))
}

pub fn load(path: &Path) -> anyhow::Result<ResolvedConfig> {
    let content = std::fs::read_to_string(path)?;
    let file: ConfigFile =
        toml::from_str(&content).map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(ResolvedConfig {
        bridge: file.bridge,
        source: Some(path.to_path_buf()),
    })
}
