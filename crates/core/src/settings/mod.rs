//! User-facing configuration.
//!
//! Settings are read from a TOML file with kebab-case keys. Every section and
//! every key is optional; missing values fall back to their defaults.
//!
//! ```toml
//! [logging]
//! enabled = true
//! level = "info"
//! max-files = 3
//! directory = "logs"
//!
//! [navigation]
//! switched-back-event = "view_switched_back"
//! ```

use crate::view::SWITCHED_BACK_EVENT;
use anyhow::{Context, Error};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingSettings {
    pub enabled: bool,
    /// Filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Number of run logs to keep, `0` keeps them all.
    pub max_files: usize,
    /// Relative to the current working directory.
    pub directory: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            enabled: true,
            level: "info".to_string(),
            max_files: 3,
            directory: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NavigationSettings {
    /// Name under which stacks publish their pop notifications.
    pub switched_back_event: String,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        NavigationSettings {
            switched_back_event: SWITCHED_BACK_EVENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub logging: LoggingSettings,
    pub navigation: NavigationSettings,
}

impl Settings {
    /// Loads the settings stored at `path`.
    ///
    /// A missing file yields the defaults. An unreadable or malformed file is
    /// an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings, Error> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("can't read settings {}", path.display()))
            }
        };

        Settings::parse(&text).with_context(|| format!("can't parse settings {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Settings, Error> {
        toml::from_str(text).context("invalid settings")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let text = toml::to_string(self).context("can't serialize settings")?;
        fs::write(path, text).with_context(|| format!("can't write settings {}", path.display()))
    }
}
