//! Data presence probe.
//!
//! Answers "does this dashboard component have anything to show?" from
//! filesystem evidence under the data directory:
//!
//! ```text
//! datasources.json                  metrics, table
//! insights.json                     insights
//! images/ charts/ visualizations/   image (first file wins)
//! files/ user_requests/             file_download
//! ```
//!
//! A JSON file counts as non-empty when it is larger than three bytes
//! (more than `[]` or `[\n]`).

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{ComponentKind, FileService, ResultEngine};

pub(crate) const DATASOURCES_FILE: &str = "datasources.json";
pub(crate) const INSIGHTS_FILE: &str = "insights.json";
pub(crate) const IMAGE_DIRS: [&str; 3] = ["images", "charts", "visualizations"];

/// Tells whether the datasource catalog has any entries.
pub trait DataSourceCatalog: Send + Sync {
    fn has_entries(&self) -> ResultEngine<bool>;
}

/// Tells whether any downloadable file exists.
pub trait FileCatalog: Send + Sync {
    fn has_files(&self) -> ResultEngine<bool>;
}

/// Catalog backed by `datasources.json` in the data directory.
#[derive(Clone, Debug)]
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(DATASOURCES_FILE),
        }
    }
}

impl DataSourceCatalog for JsonFileCatalog {
    fn has_entries(&self) -> ResultEngine<bool> {
        json_has_content(&self.path)
    }
}

fn json_has_content(path: &Path) -> ResultEngine<bool> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.is_file() && metadata.len() > 3),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

#[derive(Clone)]
pub struct DataProbe {
    data_dir: PathBuf,
    datasources: Arc<dyn DataSourceCatalog>,
    files: Arc<dyn FileCatalog>,
}

impl std::fmt::Debug for DataProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataProbe")
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}

impl DataProbe {
    /// Probe wired to `datasources.json` and a [`FileService`] rooted at
    /// `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            datasources: Arc::new(JsonFileCatalog::new(&data_dir)),
            files: Arc::new(FileService::new(data_dir.clone())),
            data_dir,
        }
    }

    pub fn with_collaborators(
        data_dir: impl Into<PathBuf>,
        datasources: Arc<dyn DataSourceCatalog>,
        files: Arc<dyn FileCatalog>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            datasources,
            files,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn check_component_has_data(
        &self,
        kind: ComponentKind,
        _instance_id: &str,
    ) -> ResultEngine<bool> {
        match kind {
            ComponentKind::Metrics | ComponentKind::Table => self.datasources.has_entries(),
            ComponentKind::Image => Ok(!self.image_files(1)?.is_empty()),
            ComponentKind::Insights => json_has_content(&self.data_dir.join(INSIGHTS_FILE)),
            ComponentKind::FileDownload => self.files.has_files(),
        }
    }

    /// Same as [`Self::check_component_has_data`] with a textual type.
    pub fn check(&self, kind: &str, instance_id: &str) -> ResultEngine<bool> {
        self.check_component_has_data(kind.parse()?, instance_id)
    }

    /// Checks many `(instance_id, type)` pairs at once.
    ///
    /// The datasource catalog is consulted at most once per call and its
    /// answer shared by every `metrics`/`table` entry. A failing entry
    /// (unknown type, I/O error) is reported as `false`.
    pub fn batch_check<'a, I>(&self, components: I) -> HashMap<String, bool>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut datasources: Option<bool> = None;
        let mut results = HashMap::new();

        for (instance_id, kind) in components {
            let checked = kind.parse::<ComponentKind>().and_then(|kind| {
                if kind.uses_datasources() {
                    if let Some(cached) = datasources {
                        return Ok(cached);
                    }
                    let found = self.datasources.has_entries().unwrap_or_else(|err| {
                        tracing::warn!("datasource catalog check failed: {err}");
                        false
                    });
                    datasources = Some(found);
                    Ok(found)
                } else {
                    self.check_component_has_data(kind, instance_id)
                }
            });
            let has_data = checked.unwrap_or_else(|err| {
                tracing::warn!("component {instance_id} ({kind}) check failed: {err}");
                false
            });
            results.insert(instance_id.to_string(), has_data);
        }

        results
    }

    /// Names of the image files, in directory order, at most `limit`.
    pub(crate) fn image_files(&self, limit: usize) -> ResultEngine<Vec<String>> {
        let mut names = Vec::new();
        for dir in IMAGE_DIRS {
            let entries = match fs::read_dir(self.data_dir.join(dir)) {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            for entry in entries {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    continue;
                }
                names.push(format!("{dir}/{}", entry.file_name().to_string_lossy()));
                if names.len() >= limit {
                    return Ok(names);
                }
            }
        }
        Ok(names)
    }
}
