use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::template::{Template, DEFAULT_TEMPLATE};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub template: String,
    pub tick_period_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            tick_period_ms: 1000,
        }
    }
}

impl Config {
    /// Checks the stored values and turns them into runtime settings.
    pub fn validate(&self) -> Result<Settings> {
        if self.tick_period_ms == 0 {
            return Err(Error::InvalidPeriod);
        }
        if self.tick_period_ms % 1000 != 0 {
            return Err(Error::UnalignedPeriod(self.tick_period_ms));
        }
        Ok(Settings {
            template: Template::parse(&self.template)?,
            period: Duration::from_millis(self.tick_period_ms),
        })
    }
}

/// Validated configuration used by the running app
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub template: Template,
    pub period: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            template: Template::default(),
            period: crate::timer_state::ONE_SECOND,
        }
    }
}

impl From<&Settings> for Config {
    fn from(s: &Settings) -> Self {
        Self {
            template: s.template.to_string(),
            tick_period_ms: s.period.as_millis() as u64,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "livetick") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("livetick_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring unreadable config {}: {e}", self.path.display()),
            },
            Err(e) => log::debug!("no config at {}: {e}", self.path.display()),
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
