//! Dashboard layouts.
//!
//! A `LayoutConfiguration` is stored once per user in `layout_configs`; the
//! items are serialized as JSON in the `layout_data` column
//! (`{"items": [...]}`).

use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{ComponentKind, EngineError, ResultEngine};

/// Number of columns of the dashboard grid.
pub const GRID_COLUMNS: u32 = 24;

/// One grid-placed component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    /// Instance identifier, unique within a layout (e.g. `table-0`).
    pub i: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
    #[serde(default)]
    pub r#static: bool,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default)]
    pub instance_idx: u32,
}

impl LayoutItem {
    fn placed(
        kind: ComponentKind,
        (x, y, w, h): (u32, u32, u32, u32),
        (min_w, min_h): (u32, u32),
    ) -> Self {
        Self {
            i: format!("{}-0", kind.as_str()),
            x,
            y,
            w,
            h,
            min_w: Some(min_w),
            min_h: Some(min_h),
            max_w: None,
            max_h: None,
            r#static: false,
            kind,
            instance_idx: 0,
        }
    }

    /// Returns `true` if the two rectangles share any cell.
    pub fn overlaps(&self, other: &LayoutItem) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    /// Returns `true` if the item has a positive size, fits in the grid and
    /// respects its own minimum size.
    pub fn is_well_formed(&self) -> bool {
        self.w > 0
            && self.h > 0
            && self.x + self.w <= GRID_COLUMNS
            && self.min_w.is_none_or(|min| min > 0 && self.w >= min)
            && self.min_h.is_none_or(|min| min > 0 && self.h >= min)
    }
}

/// The complete dashboard layout of a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfiguration {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub items: Vec<LayoutItem>,
    /// Milliseconds since epoch.
    #[serde(default)]
    pub created_at: i64,
    /// Milliseconds since epoch.
    #[serde(default)]
    pub updated_at: i64,
}

impl LayoutConfiguration {
    /// The layout used when a user never saved one.
    ///
    /// Five non-overlapping tiles on the 24-column grid, one per component
    /// kind.
    pub fn default_layout() -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: "default".to_string(),
            user_id: String::new(),
            is_locked: false,
            items: vec![
                LayoutItem::placed(ComponentKind::Metrics, (0, 0, 8, 4), (4, 2)),
                LayoutItem::placed(ComponentKind::Table, (0, 4, 16, 8), (8, 6)),
                LayoutItem::placed(ComponentKind::Image, (16, 0, 8, 6), (4, 4)),
                LayoutItem::placed(ComponentKind::Insights, (16, 6, 8, 6), (4, 4)),
                LayoutItem::placed(ComponentKind::FileDownload, (0, 12, 24, 6), (8, 4)),
            ],
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the first pair of overlapping items, if any.
    pub fn find_overlap(&self) -> Option<(&LayoutItem, &LayoutItem)> {
        self.items.iter().enumerate().find_map(|(idx, a)| {
            self.items[idx + 1..]
                .iter()
                .find(|b| a.overlaps(b))
                .map(|b| (a, b))
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LayoutData {
    pub items: Vec<LayoutItem>,
}

pub(crate) fn encode_items(items: &[LayoutItem]) -> ResultEngine<String> {
    serde_json::to_string(&LayoutData {
        items: items.to_vec(),
    })
    .map_err(|err| EngineError::InternalInvariant(format!("failed to serialize layout: {err}")))
}

pub(crate) fn decode_items(raw: &str) -> ResultEngine<Vec<LayoutItem>> {
    serde_json::from_str::<LayoutData>(raw)
        .map(|data| data.items)
        .map_err(|err| EngineError::InternalInvariant(format!("failed to decode layout: {err}")))
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "layout_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub user_id: String,
    pub is_locked: bool,
    pub layout_data: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for LayoutConfiguration {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            items: decode_items(&model.layout_data)?,
            id: model.id,
            user_id: model.user_id,
            is_locked: model.is_locked,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
