use std::path::Path;

use ps1_memcard::CardOptions;
use serde::{Deserialize, Serialize};

use crate::Error;

pub const CONFIG_FILE_NAME: &str = "ps1mc.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub card: CardOptions,
    #[serde(default)]
    pub icon: IconConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct IconConfig {
    #[serde(default = "default_scale")]
    pub scale: u32,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
        }
    }
}

fn default_scale() -> u32 {
    1
}

impl Config {
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Read `explicit` if given, else `ps1mc.toml` in `dir` if present, else
/// the defaults.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<Config, Error> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if !candidate.is_file() {
                return Ok(Config::default());
            }
            candidate
        }
    };

    let str = std::fs::read_to_string(&path)?;
    let config = toml::from_str::<Config>(&str).map_err(|e| Error::ConfigError(e.to_string()))?;
    if config.icon.scale == 0 {
        return Err(Error::ConfigError("icon.scale must be at least 1".to_string()));
    }
    Ok(config)
}
