//! Downloadable files kept under the dashboard data directory.
//!
//! Each category maps to one sub-directory:
//!
//! | category | directory |
//! |---|---|
//! | `all_files` | `files/` |
//! | `user_request_related` | `user_requests/` |

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::UNIX_EPOCH,
};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, probe::FileCatalog};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    AllFiles,
    UserRequestRelated,
}

impl FileCategory {
    pub const ALL: [FileCategory; 2] = [Self::AllFiles, Self::UserRequestRelated];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllFiles => "all_files",
            Self::UserRequestRelated => "user_request_related",
        }
    }

    fn dir_name(self) -> &'static str {
        match self {
            Self::AllFiles => "files",
            Self::UserRequestRelated => "user_requests",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all_files" => Ok(Self::AllFiles),
            "user_request_related" => Ok(Self::UserRequestRelated),
            other => Err(EngineError::InvalidInput(format!(
                "invalid file category: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Equal to the file name.
    pub id: String,
    pub name: String,
    pub size: u64,
    /// Modification time, milliseconds since epoch.
    pub created_at: i64,
    pub category: FileCategory,
    pub download_url: String,
}

#[derive(Clone, Debug)]
pub struct FileService {
    data_dir: PathBuf,
}

impl FileService {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn category_dir(&self, category: FileCategory) -> PathBuf {
        self.data_dir.join(category.dir_name())
    }

    /// Lists the regular files of a category. A missing directory is empty.
    pub fn files_by_category(&self, category: FileCategory) -> ResultEngine<Vec<FileInfo>> {
        let entries = match fs::read_dir(self.category_dir(category)) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let created_at = metadata
                .modified()
                .ok()
                .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                .map(|elapsed| elapsed.as_millis() as i64)
                .unwrap_or_default();
            files.push(FileInfo {
                download_url: format!("/files/download/{name}"),
                id: name.clone(),
                name,
                size: metadata.len(),
                created_at,
                category,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Returns `true` if either category holds at least one file.
    pub fn has_files(&self) -> ResultEngine<bool> {
        for category in FileCategory::ALL {
            if !self.files_by_category(category)?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Resolves a file id to its path, looking in every category.
    pub fn download_path(&self, file_id: &str) -> ResultEngine<PathBuf> {
        validate_file_id(file_id)?;
        FileCategory::ALL
            .into_iter()
            .map(|category| self.category_dir(category).join(file_id))
            .find(|path| path.is_file())
            .ok_or_else(|| EngineError::KeyNotFound(format!("file {file_id}")))
    }
}

fn validate_file_id(file_id: &str) -> ResultEngine<()> {
    let path = Path::new(file_id);
    let single_component = path.components().count() == 1
        && path.file_name().is_some_and(|name| name == file_id);
    if file_id.is_empty() || file_id.contains(['/', '\\']) || !single_component {
        return Err(EngineError::InvalidInput(format!("invalid file id: {file_id}")));
    }
    Ok(())
}

impl FileCatalog for FileService {
    fn has_files(&self) -> ResultEngine<bool> {
        FileService::has_files(self)
    }
}
