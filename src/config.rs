use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".breadcrumb";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_ANALYTICS_EPOCH: &str = "2020-01-01";
pub const DEFAULT_CHECKBOX_COUNT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub state_path: PathBuf,
    pub api_port: u16,
    /// Start of the "all time" analytics window, `YYYY-MM-DD`.
    pub analytics_epoch: String,
    pub default_checkbox_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            db_path: root.join("db").join("tracker.db"),
            state_path: root.join("state.json"),
            api_port: 7180,
            analytics_epoch: DEFAULT_ANALYTICS_EPOCH.to_string(),
            default_checkbox_count: DEFAULT_CHECKBOX_COUNT,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }

        Ok(())
    }

    pub fn parse_analytics_epoch(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.analytics_epoch, "%Y-%m-%d").with_context(|| {
            format!(
                "Invalid analytics_epoch: {}. Example: 2020-01-01",
                self.analytics_epoch
            )
        })
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "state_path" => {
                self.state_path = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "analytics_epoch" => {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| anyhow!("analytics_epoch must be YYYY-MM-DD"))?;
                self.analytics_epoch = value.to_string();
            }
            "default_checkbox_count" => {
                let parsed = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("default_checkbox_count must be a number"))?;
                if parsed == 0 {
                    bail!("default_checkbox_count must be at least 1");
                }
                self.default_checkbox_count = parsed;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, state_path|state.path, api_port|api.port, analytics_epoch|analytics.epoch, default_checkbox_count|checkboxes.default_count"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "state_path" => Some(self.state_path.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "analytics_epoch" => Some(self.analytics_epoch.clone()),
            "default_checkbox_count" => Some(self.default_checkbox_count.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "state_path" | "state.path" => "state_path",
        "api_port" | "api.port" => "api_port",
        "analytics_epoch" | "analytics.epoch" => "analytics_epoch",
        "default_checkbox_count" | "checkboxes.default_count" => "default_checkbox_count",
        _ => key,
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
