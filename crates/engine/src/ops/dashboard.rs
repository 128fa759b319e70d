use std::{collections::HashMap, path::PathBuf};

use chrono::{DateTime, Utc};

use crate::{
    ComponentKind, ExportRequest, ExportResult, FileCategory, FileInfo, ResultEngine,
};

use super::Engine;

/// Filesystem-backed operations. They block, so async callers should run
/// them on a blocking thread.
impl Engine {
    pub fn check_component_has_data(&self, kind: &str, instance_id: &str) -> ResultEngine<bool> {
        let kind: ComponentKind = kind.parse()?;
        self.exporter()?
            .probe()
            .check_component_has_data(kind, instance_id)
    }

    /// Maps every instance id to whether it has data; never fails per entry.
    pub fn batch_check_has_data(
        &self,
        components: &HashMap<String, String>,
    ) -> ResultEngine<HashMap<String, bool>> {
        Ok(self
            .exporter()?
            .probe()
            .batch_check(components.iter().map(|(id, kind)| (id.as_str(), kind.as_str()))))
    }

    pub fn export_dashboard(&self, request: &ExportRequest) -> ResultEngine<ExportResult> {
        self.exporter()?.export(request)
    }

    pub fn export_dashboard_at(
        &self,
        request: &ExportRequest,
        now: DateTime<Utc>,
    ) -> ResultEngine<ExportResult> {
        self.exporter()?.export_at(request, now)
    }

    pub fn files_by_category(&self, category: FileCategory) -> ResultEngine<Vec<FileInfo>> {
        self.exporter()?.files().files_by_category(category)
    }

    pub fn file_download_path(&self, file_id: &str) -> ResultEngine<PathBuf> {
        self.exporter()?.files().download_path(file_id)
    }
}
