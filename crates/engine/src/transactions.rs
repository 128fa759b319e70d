//! Credits ledger rows.
//!
//! Every balance change writes one signed row: debits (downloads) are
//! negative, purchases are positive.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Credits, EngineError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Download,
    Purchase,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Purchase => "purchase",
        }
    }
}

impl TryFrom<&str> for TransactionType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "download" => Ok(Self::Download),
            "purchase" => Ok(Self::Purchase),
            other => Err(EngineError::InternalInvariant(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditsTransaction {
    pub id: i64,
    pub user_id: i64,
    pub listing_id: Option<i64>,
    pub transaction_type: TransactionType,
    pub amount: Credits,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "credits_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub listing_id: Option<i64>,
    pub transaction_type: String,
    pub amount: i64,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
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
        belongs_to = "super::packs::Entity",
        from = "Column::ListingId",
        to = "super::packs::Column::Id"
    )]
    Listing,
}

impl Related<super::packs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Listing.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for CreditsTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            listing_id: model.listing_id,
            transaction_type: TransactionType::try_from(model.transaction_type.as_str())?,
            amount: Credits::new(model.amount),
            description: model.description,
            created_at: model.created_at,
        })
    }
}
