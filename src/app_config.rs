use config::{Config, File as ConfigFile};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::Result;

fn default_max_name_attempts() -> u32 {
    10_000
}

/// Settings read from an optional `Config.toml` next to the binary.
/// Everything has a usable default so the file may be absent entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Glob patterns excluded from every scan.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Per-category extension overrides, e.g. `images = ["jpg", "png"]`.
    /// Categories not listed keep their built-in extension sets.
    #[serde(default)]
    pub categories: HashMap<String, Vec<String>>,

    /// Cap on conflict-name probes before the run is aborted.
    #[serde(default = "default_max_name_attempts")]
    pub max_name_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            ignore_patterns: Vec::new(),
            categories: HashMap::new(),
            max_name_attempts: default_max_name_attempts(),
        }
    }
}

pub fn load_configuration() -> Result<AppConfig> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .build()?;
    Ok(builder.try_deserialize::<AppConfig>()?)
}
