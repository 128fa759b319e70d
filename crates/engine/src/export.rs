//! Dashboard export pipeline.
//!
//! `filter -> gate -> collect -> emit -> manifest`: components without data
//! are dropped, the rest are written to
//! `<export_dir>/dashboard_export_<user>_<YYYYMMDD_HHMMSS>.<ext>`.

use std::{
    collections::HashSet,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    ComponentKind, EngineError, FileCategory, FileService, LayoutConfiguration, LayoutItem,
    ResultEngine,
    probe::{DATASOURCES_FILE, DataProbe, INSIGHTS_FILE},
};

/// Sub-directory of the temp dir receiving export artifacts.
pub const EXPORT_DIR_NAME: &str = "dashboard_exports";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    /// Text placeholder, not a real spreadsheet.
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "json" => Ok(Self::Json),
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            other => Err(EngineError::InvalidInput(format!(
                "unsupported export format: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub layout_config: LayoutConfiguration,
    pub format: String,
    #[serde(default)]
    pub user_id: String,
}

/// Manifest of a written export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub file_path: String,
    pub included_components: Vec<String>,
    pub excluded_components: Vec<String>,
    pub total_components: usize,
    pub exported_at: String,
    pub format: ExportFormat,
}

#[derive(Clone, Copy, Debug, Serialize)]
struct Position {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComponentData {
    id: String,
    #[serde(rename = "type")]
    kind: ComponentKind,
    instance_idx: u32,
    position: Position,
    data: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocument<'a> {
    exported_at: &'a str,
    components: &'a [ComponentData],
    total_count: usize,
    format: ExportFormat,
}

#[derive(Clone, Debug)]
pub struct DashboardExporter {
    probe: DataProbe,
    files: FileService,
    export_dir: PathBuf,
}

impl DashboardExporter {
    /// `temp_dir` is the parent of the `dashboard_exports` directory.
    pub fn new(probe: DataProbe, temp_dir: impl AsRef<Path>) -> Self {
        Self {
            files: FileService::new(probe.data_dir()),
            export_dir: temp_dir.as_ref().join(EXPORT_DIR_NAME),
            probe,
        }
    }

    pub fn probe(&self) -> &DataProbe {
        &self.probe
    }

    pub fn files(&self) -> &FileService {
        &self.files
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn export(&self, request: &ExportRequest) -> ResultEngine<ExportResult> {
        self.export_at(request, Utc::now())
    }

    /// Runs the pipeline with a fixed clock.
    pub fn export_at(
        &self,
        request: &ExportRequest,
        now: DateTime<Utc>,
    ) -> ResultEngine<ExportResult> {
        if request.user_id.is_empty() {
            return Err(EngineError::InvalidInput("userId is required".to_string()));
        }
        let items = &request.layout_config.items;
        if items.is_empty() {
            return Err(EngineError::InvalidInput(
                "layout configuration must contain at least one item".to_string(),
            ));
        }
        let format: ExportFormat = request.format.parse()?;

        let kept = self.filter_empty_components(items);
        if kept.is_empty() {
            return Err(EngineError::NoExportableComponents);
        }

        let components: Vec<ComponentData> = kept
            .into_iter()
            .filter_map(|item| match self.collect(item) {
                Ok(data) => Some(ComponentData {
                    id: item.i.clone(),
                    kind: item.kind,
                    instance_idx: item.instance_idx,
                    position: Position {
                        x: item.x,
                        y: item.y,
                        w: item.w,
                        h: item.h,
                    },
                    data,
                }),
                Err(err) => {
                    tracing::warn!("dropping component {} from export: {err}", item.i);
                    None
                }
            })
            .collect();
        if components.is_empty() {
            return Err(EngineError::NoExportableComponents);
        }

        let exported_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        fs::create_dir_all(&self.export_dir)?;
        let path = self.export_dir.join(format!(
            "dashboard_export_{}_{}.{}",
            sanitize_file_part(&request.user_id),
            now.format("%Y%m%d_%H%M%S"),
            format.as_str()
        ));
        match format {
            ExportFormat::Json => write_json(&path, &components, &exported_at)?,
            ExportFormat::Csv => write_csv(&path, &components)?,
            ExportFormat::Xlsx => write_xlsx_placeholder(&path, &components, &exported_at)?,
        }

        let included: HashSet<&str> = components.iter().map(|c| c.id.as_str()).collect();
        let excluded_components = items
            .iter()
            .filter(|item| !included.contains(item.i.as_str()))
            .map(|item| item.i.clone())
            .collect();
        let result = ExportResult {
            file_path: path.to_string_lossy().into_owned(),
            included_components: components.into_iter().map(|c| c.id).collect(),
            excluded_components,
            total_components: items.len(),
            exported_at,
            format,
        };
        tracing::info!(
            "exported {} of {} components for {} to {}",
            result.included_components.len(),
            result.total_components,
            request.user_id,
            result.file_path
        );
        Ok(result)
    }

    /// Keeps the items with data, preserving their order.
    pub fn filter_empty_components<'a>(&self, items: &'a [LayoutItem]) -> Vec<&'a LayoutItem> {
        let checks = self
            .probe
            .batch_check(items.iter().map(|item| (item.i.as_str(), item.kind.as_str())));
        items
            .iter()
            .filter(|item| checks.get(&item.i).copied().unwrap_or(false))
            .collect()
    }

    fn collect(&self, item: &LayoutItem) -> ResultEngine<Value> {
        let data = match item.kind {
            ComponentKind::Metrics | ComponentKind::Table => json!({
                "instanceId": item.i,
                "source": DATASOURCES_FILE,
            }),
            ComponentKind::Insights => json!({
                "instanceId": item.i,
                "source": INSIGHTS_FILE,
            }),
            ComponentKind::Image => json!({
                "instanceId": item.i,
                "images": self.probe.image_files(usize::MAX)?,
            }),
            ComponentKind::FileDownload => {
                let mut files = Vec::new();
                for category in FileCategory::ALL {
                    files.extend(self.files.files_by_category(category)?);
                }
                json!({ "instanceId": item.i, "files": files })
            }
        };
        Ok(data)
    }
}

fn sanitize_file_part(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn write_json(path: &Path, components: &[ComponentData], exported_at: &str) -> ResultEngine<()> {
    let document = JsonDocument {
        exported_at,
        components,
        total_count: components.len(),
        format: ExportFormat::Json,
    };
    let body = serde_json::to_vec_pretty(&document)
        .map_err(|err| EngineError::InternalInvariant(format!("failed to encode export: {err}")))?;
    fs::write(path, body)?;
    Ok(())
}

fn write_csv(path: &Path, components: &[ComponentData]) -> ResultEngine<()> {
    let csv_err = |err: csv::Error| EngineError::Unavailable(format!("failed to write csv: {err}"));
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)
        .map_err(csv_err)?;
    writer
        .write_record([
            "Component ID",
            "Type",
            "Instance Index",
            "X",
            "Y",
            "Width",
            "Height",
        ])
        .map_err(csv_err)?;
    for component in components {
        writer
            .write_record([
                component.id.clone(),
                component.kind.to_string(),
                component.instance_idx.to_string(),
                component.position.x.to_string(),
                component.position.y.to_string(),
                component.position.w.to_string(),
                component.position.h.to_string(),
            ])
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx_placeholder(
    path: &Path,
    components: &[ComponentData],
    exported_at: &str,
) -> ResultEngine<()> {
    let mut body = format!(
        "XLSX Export Placeholder\nExported at: {exported_at}\nComponents: {}\n\n",
        components.len()
    );
    for component in components {
        let Position { x, y, w, h } = component.position;
        body.push_str(&format!(
            "Component: {} (Type: {})\nPosition: x={x}, y={y}, w={w}, h={h}\n\n",
            component.id, component.kind
        ));
    }
    fs::write(path, body)?;
    Ok(())
}
