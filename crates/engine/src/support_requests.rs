//! Storefront support requests and their review lifecycle.
//!
//! ```text
//! pending --approve--> approved --disable--> disabled
//!                         ^                     |
//!                         +------reenable-------+
//! ```

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use sea_orm::{FromQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportStatus {
    Pending,
    Approved,
    Disabled,
}

impl SupportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Disabled => "disabled",
        }
    }

    /// Pending and approved requests block a new application.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl fmt::Display for SupportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportStatus {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "disabled" => Ok(Self::Disabled),
            other => Err(EngineError::InvalidInput(format!(
                "invalid support status: {other}"
            ))),
        }
    }
}

/// Admin review actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupportAction {
    Approve,
    Disable { reason: String },
    Reenable,
}

impl SupportAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Disable { .. } => "disable",
            Self::Reenable => "reenable",
        }
    }

    /// Target status when applied to `from`, or `None` if not allowed.
    pub fn transition(&self, from: SupportStatus) -> Option<SupportStatus> {
        match (self, from) {
            (Self::Approve, SupportStatus::Pending) => Some(SupportStatus::Approved),
            (Self::Disable { .. }, SupportStatus::Approved) => Some(SupportStatus::Disabled),
            (Self::Reenable, SupportStatus::Disabled) => Some(SupportStatus::Approved),
            _ => None,
        }
    }
}

/// A support request as shown in the admin list, joined with its user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportRequest {
    pub id: i64,
    pub storefront_id: i64,
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub software_name: String,
    pub store_name: String,
    pub welcome_message: String,
    pub status: SupportStatus,
    pub disable_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "storefront_support_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub storefront_id: i64,
    pub user_id: i64,
    pub software_name: String,
    pub store_name: String,
    pub welcome_message: String,
    pub status: String,
    pub disable_reason: Option<String>,
    pub reviewed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::storefronts::Entity",
        from = "Column::StorefrontId",
        to = "super::storefronts::Column::Id"
    )]
    Storefront,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Row shape of the joined admin list query.
#[derive(Debug, FromQueryResult)]
pub(crate) struct SupportRow {
    pub id: i64,
    pub storefront_id: i64,
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub software_name: String,
    pub store_name: String,
    pub welcome_message: String,
    pub status: String,
    pub disable_reason: Option<String>,
    pub reviewed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl TryFrom<SupportRow> for SupportRequest {
    type Error = EngineError;

    fn try_from(row: SupportRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            EngineError::InternalInvariant(format!(
                "support request {} has status {}",
                row.id, row.status
            ))
        })?;
        Ok(Self {
            id: row.id,
            storefront_id: row.storefront_id,
            user_id: row.user_id,
            username: row.username,
            display_name: row.display_name,
            software_name: row.software_name,
            store_name: row.store_name,
            welcome_message: row.welcome_message,
            status,
            disable_reason: row.disable_reason,
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
