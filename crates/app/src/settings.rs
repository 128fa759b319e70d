//! Application settings.
//!
//! Read from `settings.toml` (or the file named by `PACKDESK_CONFIG`), then
//! overridden by `PACKDESK__<SECTION>__<KEY>` environment variables:
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [server]
//! port = 3000
//! database = { sqlite = "./packdesk.db" }
//! admin_username = "admin"
//! admin_password = "change-me"
//!
//! [dashboard]
//! data_dir = "./data"
//! ```

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_ENV: &str = "PACKDESK_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "settings";

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Dashboard {
    pub data_dir: PathBuf,
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    pub dashboard: Option<Dashboard>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(&file, Environment::with_prefix("PACKDESK").separator("__"))
    }

    fn from_sources(file: &str, env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}
