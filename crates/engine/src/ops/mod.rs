use std::path::PathBuf;

use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;

use crate::{DashboardExporter, DataProbe, EngineError, ResultEngine, settings};

mod credits;
mod dashboard;
mod layouts;
mod packs;
mod settings_ops;
mod support;

pub use credits::{DownloadReceipt, UsageLicense};
pub use settings_ops::parse_threshold;
pub use support::{SUPPORT_PAGE_SIZE, SupportListParams, SupportPage, SupportSort};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// In-memory copy of the admin settings. Every write goes to the
/// `settings` table first.
#[derive(Debug)]
pub(crate) struct SettingsCache {
    support_threshold: i64,
    default_language: Option<String>,
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    dashboard: Option<DashboardExporter>,
    settings: Mutex<SettingsCache>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn database(&self) -> &DatabaseConnection {
        &self.database
    }

    fn exporter(&self) -> ResultEngine<&DashboardExporter> {
        self.dashboard
            .as_ref()
            .ok_or_else(|| EngineError::Unavailable("data directory not configured".to_string()))
    }
}

fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    data_dir: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
    probe: Option<DataProbe>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Directory holding the dashboard data (`datasources.json`, `files/`...).
    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> EngineBuilder {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Parent directory of `dashboard_exports`. Defaults to the system temp dir.
    pub fn temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> EngineBuilder {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    /// Use a custom probe instead of the one derived from `data_dir`.
    pub fn probe(mut self, probe: DataProbe) -> EngineBuilder {
        self.probe = Some(probe);
        self
    }

    /// Construct `Engine`, loading the settings cache from the database.
    pub async fn build(self) -> ResultEngine<Engine> {
        let probe = self.probe.or_else(|| self.data_dir.map(DataProbe::new));
        let temp_dir = self.temp_dir.unwrap_or_else(std::env::temp_dir);
        let dashboard = probe.map(|probe| DashboardExporter::new(probe, &temp_dir));

        let cache = settings_ops::load_cache(&self.database).await?;
        tracing::debug!(
            "engine settings loaded: threshold={}, language={:?}",
            cache.support_threshold,
            cache.default_language
        );

        Ok(Engine {
            database: self.database,
            dashboard,
            settings: Mutex::new(cache),
        })
    }
}

impl Default for SettingsCache {
    fn default() -> Self {
        Self {
            support_threshold: settings::DEFAULT_SUPPORT_THRESHOLD,
            default_language: None,
        }
    }
}
