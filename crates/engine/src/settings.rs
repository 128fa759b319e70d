//! Key/value rows of the `settings` table.

use sea_orm::entity::prelude::*;

pub(crate) const SUPPORT_THRESHOLD_KEY: &str = "support_sales_threshold";
pub(crate) const DEFAULT_LANGUAGE_KEY: &str = "default_language";

/// Threshold used until an admin sets one.
pub const DEFAULT_SUPPORT_THRESHOLD: i64 = 1000;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
