use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: &str = "44322";

const CONFIG_DIR: &str = "nanochat";
const CONFIG_FILE: &str = "config.toml";

/// User settings persisted as TOML with PascalCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    pub username: String,
    pub buffer_add_sep: String,
    pub clear_buffer_on_send: bool,
    pub default_host: String,
    pub default_port: String,
    /// Sent right after connecting; `%name` is replaced with the username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_msg: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            buffer_add_sep: " ".to_string(),
            clear_buffer_on_send: true,
            default_host: DEFAULT_HOST.to_string(),
            default_port: DEFAULT_PORT.to_string(),
            entry_msg: None,
        }
    }
}

/// Values taken from the command line in place of the persisted ones.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub username: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        config.username = config.username.trim().to_string();
        Ok(config)
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(username) = overrides.username {
            self.username = username.trim().to_string();
        }
        if let Some(host) = overrides.host {
            self.default_host = host;
        }
        if let Some(port) = overrides.port {
            self.default_port = port;
        }
        self
    }

    /// The entry message with `%name` substituted, if one is configured.
    pub fn entry_message(&self) -> Option<String> {
        self.entry_msg
            .as_deref()
            .filter(|template| !template.is_empty())
            .map(|template| template.replace("%name", &self.username))
    }
}

/// `<config dir>/nanochat/config.toml`, using `~/.config` on macOS too.
pub fn default_path() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|home| home.join(".config"))
    } else {
        dirs::config_dir()
    };
    let base = base.ok_or_else(|| anyhow!("could not determine the user config directory"))?;
    Ok(base.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Reads the config at `path`, writing the defaults there first if it does not exist.
pub fn load_or_create(path: &Path) -> Result<Config> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create config directory '{}'", dir.display()))?;
    }

    if !path.exists() {
        let config = Config::default();
        let encoded = toml::to_string(&config)?;
        fs::write(path, encoded)
            .with_context(|| format!("cannot create config file '{}'", path.display()))?;
        info!(path = %path.display(), "wrote default config");
        return Ok(config);
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot open config file '{}'", path.display()))?;
    Config::from_toml(&text).with_context(|| format!("invalid config file '{}'", path.display()))
}
