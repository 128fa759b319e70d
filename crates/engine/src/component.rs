//! Dashboard component kinds.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// The closed set of tiles a dashboard layout can place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Metrics,
    Table,
    Image,
    Insights,
    FileDownload,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 5] = [
        Self::Metrics,
        Self::Table,
        Self::Image,
        Self::Insights,
        Self::FileDownload,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metrics => "metrics",
            Self::Table => "table",
            Self::Image => "image",
            Self::Insights => "insights",
            Self::FileDownload => "file_download",
        }
    }

    /// `metrics` and `table` both read from the datasource catalog.
    pub fn uses_datasources(self) -> bool {
        matches!(self, Self::Metrics | Self::Table)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "metrics" => Ok(Self::Metrics),
            "table" => Ok(Self::Table),
            "image" => Ok(Self::Image),
            "insights" => Ok(Self::Insights),
            "file_download" => Ok(Self::FileDownload),
            other => Err(EngineError::UnsupportedComponentType(other.to_string())),
        }
    }
}
