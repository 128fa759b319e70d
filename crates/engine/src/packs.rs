//! Pack listings and their pricing rules.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Credits, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    Free,
    PerUse,
    Subscription,
    /// Legacy mode: still charged on download, no longer accepted on publish.
    TimeLimited,
}

impl PricingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::PerUse => "per_use",
            Self::Subscription => "subscription",
            Self::TimeLimited => "time_limited",
        }
    }
}

impl TryFrom<&str> for PricingMode {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "free" => Ok(Self::Free),
            "per_use" => Ok(Self::PerUse),
            "subscription" => Ok(Self::Subscription),
            "time_limited" => Ok(Self::TimeLimited),
            other => Err(EngineError::InvalidInput(format!(
                "invalid pricing mode: {other}"
            ))),
        }
    }
}

/// Checks the price of a pack against its pricing mode at publish time.
///
/// - `free`: any price.
/// - `per_use`: `1..=100` credits.
/// - `subscription`: `100..=1000` credits.
/// - anything else is rejected.
pub fn validate_pricing(mode: &str, credits_price: i64) -> ResultEngine<PricingMode> {
    match mode {
        "free" => Ok(PricingMode::Free),
        "per_use" if (1..=100).contains(&credits_price) => Ok(PricingMode::PerUse),
        "per_use" => Err(EngineError::InvalidInput(
            "credits_price must be between 1 and 100 for per_use mode".to_string(),
        )),
        "subscription" if (100..=1000).contains(&credits_price) => Ok(PricingMode::Subscription),
        "subscription" => Err(EngineError::InvalidInput(
            "credits_price must be between 100 and 1000 for subscription mode".to_string(),
        )),
        _ => Err(EngineError::InvalidInput(
            "pricing_mode must be 'free', 'per_use', or 'subscription'".to_string(),
        )),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackStatus {
    Published,
    Delisted,
}

impl PackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Delisted => "delisted",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackListing {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub pricing_mode: PricingMode,
    /// Whole credits.
    pub credits_price: i64,
    pub payload_bytes: i64,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
}

impl PackListing {
    /// Amount debited for one download; zero for free packs.
    pub fn download_price(&self) -> Credits {
        if self.pricing_mode == PricingMode::Free {
            Credits::ZERO
        } else {
            Credits::whole(self.credits_price)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pack_listings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub pricing_mode: String,
    pub credits_price: i64,
    pub status: String,
    pub payload_ref: Option<String>,
    pub payload_bytes: i64,
    pub download_count: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id"
    )]
    Author,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PackListing {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        if model.credits_price < 0 {
            return Err(EngineError::InternalInvariant(format!(
                "pack {} has a negative price",
                model.id
            )));
        }
        Ok(Self {
            id: model.id,
            author_id: model.author_id,
            name: model.name,
            pricing_mode: PricingMode::try_from(model.pricing_mode.as_str())?,
            credits_price: model.credits_price,
            payload_bytes: model.payload_bytes,
            download_count: model.download_count,
            created_at: model.created_at,
        })
    }
}
