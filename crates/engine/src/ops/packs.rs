use chrono::Utc;
use sea_orm::{
    ActiveValue, JoinType, QueryFilter, QuerySelect, RelationTrait, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{
    Credits, EngineError, PackListing, PackStatus, ResultEngine, TransactionType, packs,
    transactions, validate_pricing,
};

use super::{Engine, credits::require_user, normalize_required, with_tx};

impl Engine {
    /// Publish a pack for `author_id`. `credits_price` is in whole credits.
    pub async fn publish_pack(
        &self,
        author_id: i64,
        name: &str,
        pricing_mode: &str,
        credits_price: i64,
    ) -> ResultEngine<PackListing> {
        let name = normalize_required(name, "pack name")?;
        if credits_price < 0 {
            return Err(EngineError::InvalidInput(
                "credits_price must not be negative".to_string(),
            ));
        }
        let mode = validate_pricing(pricing_mode, credits_price)?;

        let listing = with_tx!(self, |db_tx| {
            require_user(&db_tx, author_id).await?;
            let model = packs::ActiveModel {
                author_id: ActiveValue::Set(author_id),
                name: ActiveValue::Set(name),
                pricing_mode: ActiveValue::Set(mode.as_str().to_string()),
                credits_price: ActiveValue::Set(credits_price),
                status: ActiveValue::Set(PackStatus::Published.as_str().to_string()),
                payload_ref: ActiveValue::Set(None),
                payload_bytes: ActiveValue::Set(0),
                download_count: ActiveValue::Set(0),
                created_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            }
            .insert(&db_tx)
            .await?;
            PackListing::try_from(model)
        })?;

        tracing::info!(
            "pack {} published by user {author_id} ({}, {} credits)",
            listing.id,
            mode.as_str(),
            credits_price
        );
        Ok(listing)
    }

    /// Returns a pack regardless of its status.
    pub async fn pack(&self, pack_id: i64) -> ResultEngine<PackListing> {
        let model = packs::Entity::find_by_id(pack_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("pack {pack_id}")))?;
        PackListing::try_from(model)
    }

    /// Hide a pack from downloads.
    pub async fn delist_pack(&self, pack_id: i64) -> ResultEngine<()> {
        let result = packs::Entity::update_many()
            .col_expr(
                packs::Column::Status,
                Expr::value(PackStatus::Delisted.as_str()),
            )
            .filter(packs::Column::Id.eq(pack_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(format!("pack {pack_id}")));
        }
        Ok(())
    }

    /// Lifetime sales of an author: the credits debited for downloads of
    /// their packs.
    pub async fn total_sales(&self, author_id: i64) -> ResultEngine<Credits> {
        let amounts: Vec<i64> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::Amount)
            .join(JoinType::InnerJoin, transactions::Relation::Listing.def())
            .filter(packs::Column::AuthorId.eq(author_id))
            .filter(transactions::Column::TransactionType.eq(TransactionType::Download.as_str()))
            .into_tuple()
            .all(&self.database)
            .await?;
        Ok(Credits::new(amounts.into_iter().map(i64::abs).sum()))
    }
}
