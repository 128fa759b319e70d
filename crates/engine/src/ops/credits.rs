use chrono::{DateTime, Months, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    Credits, CreditsTransaction, EngineError, PackListing, PackStatus, PricingMode,
    ResultEngine, TransactionType, User, packs, transactions, users,
};

use super::{Engine, normalize_optional_text, normalize_required, with_tx};

/// License handed to the client together with a paid download.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLicense {
    pub listing_id: i64,
    pub pack_name: String,
    pub pricing_model: PricingMode,
    pub remaining_uses: u32,
    pub total_uses: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub subscription_months: u32,
}

impl UsageLicense {
    fn for_listing(listing: &PackListing, now: DateTime<Utc>) -> Self {
        let mut license = Self {
            listing_id: listing.id,
            pack_name: listing.name.clone(),
            pricing_model: listing.pricing_mode,
            remaining_uses: 0,
            total_uses: 0,
            expires_at: None,
            subscription_months: 0,
        };
        match listing.pricing_mode {
            PricingMode::PerUse => {
                license.remaining_uses = 1;
                license.total_uses = 1;
            }
            PricingMode::Subscription => {
                license.expires_at = now.checked_add_months(Months::new(1));
                license.subscription_months = 1;
            }
            PricingMode::Free | PricingMode::TimeLimited => {}
        }
        license
    }
}

/// Outcome of an accepted download.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReceipt {
    pub allowed: bool,
    pub charged: Credits,
    pub remaining_balance: Credits,
    /// `None` for free packs.
    pub usage_license: Option<UsageLicense>,
}

impl Engine {
    pub async fn create_user(
        &self,
        username: &str,
        display_name: &str,
        email: Option<&str>,
    ) -> ResultEngine<User> {
        let username = normalize_required(username, "username")?;
        let display_name = normalize_required(display_name, "display name")?;
        let email = normalize_optional_text(email);

        let user = with_tx!(self, |db_tx| {
            let exists = users::Entity::find()
                .filter(users::Column::Username.eq(username.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(username));
            }
            let model = users::ActiveModel {
                username: ActiveValue::Set(username.clone()),
                display_name: ActiveValue::Set(display_name),
                email: ActiveValue::Set(email),
                credits_balance: ActiveValue::Set(0),
                created_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            }
            .insert(&db_tx)
            .await?;
            Ok::<_, EngineError>(User::from(model))
        })?;

        tracing::info!("user {} created with id {}", user.username, user.id);
        Ok(user)
    }

    pub async fn user(&self, user_id: i64) -> ResultEngine<User> {
        users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .map(User::from)
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))
    }

    pub async fn balance(&self, user_id: i64) -> ResultEngine<Credits> {
        Ok(self.user(user_id).await?.credits_balance)
    }

    /// Add credits to a user, recording a `purchase` row. Returns the new
    /// balance.
    pub async fn purchase_credits(&self, user_id: i64, amount: Credits) -> ResultEngine<Credits> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidInput(
                "purchase amount must be positive".to_string(),
            ));
        }

        let balance = with_tx!(self, |db_tx| {
            require_user(&db_tx, user_id).await?;
            users::Entity::update_many()
                .col_expr(
                    users::Column::CreditsBalance,
                    Expr::col(users::Column::CreditsBalance).add(amount.cents()),
                )
                .filter(users::Column::Id.eq(user_id))
                .exec(&db_tx)
                .await?;
            transactions::ActiveModel {
                user_id: ActiveValue::Set(user_id),
                listing_id: ActiveValue::Set(None),
                transaction_type: ActiveValue::Set(TransactionType::Purchase.as_str().to_string()),
                amount: ActiveValue::Set(amount.cents()),
                description: ActiveValue::Set(Some(format!("Purchase {amount} credits"))),
                created_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            }
            .insert(&db_tx)
            .await?;
            Ok::<_, EngineError>(Credits::new(require_user(&db_tx, user_id).await?.credits_balance))
        })?;

        tracing::info!("user {user_id} purchased {amount} credits, balance {balance}");
        Ok(balance)
    }

    /// Ledger of a user, newest first.
    pub async fn list_transactions(&self, user_id: i64) -> ResultEngine<Vec<CreditsTransaction>> {
        require_user(&self.database, user_id).await?;
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(CreditsTransaction::try_from)
            .collect()
    }

    /// Charge `user_id` for one download of `pack_id`.
    ///
    /// Free packs (or a zero price) only bump the download counter. Paid packs
    /// debit the price and write a negative `download` row in the same
    /// transaction; the debit is conditional on the balance still covering
    /// the price, so concurrent downloads can never overdraw the account.
    ///
    /// The counter bump is the first statement of the transaction, so the
    /// write lock is held before anything is read.
    pub async fn charge_for_download(
        &self,
        user_id: i64,
        pack_id: i64,
    ) -> ResultEngine<DownloadReceipt> {
        let now = Utc::now();

        let (listing, charged, balance) = with_tx!(self, |db_tx| {
            let claimed = packs::Entity::update_many()
                .col_expr(
                    packs::Column::DownloadCount,
                    Expr::col(packs::Column::DownloadCount).add(1),
                )
                .filter(packs::Column::Id.eq(pack_id))
                .filter(packs::Column::Status.eq(PackStatus::Published.as_str()))
                .exec(&db_tx)
                .await?;
            if claimed.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(format!("pack {pack_id}")));
            }

            let listing = require_published_pack(&db_tx, pack_id).await?;
            let user = require_user(&db_tx, user_id).await?;
            let balance = Credits::new(user.credits_balance);
            let price = listing.download_price();

            if !price.is_zero() {
                if balance < price {
                    tracing::warn!(
                        "download of pack {pack_id} refused for user {user_id}: balance {balance}, price {price}"
                    );
                    return Err(EngineError::InsufficientBalance {
                        required: price,
                        balance,
                    });
                }

                let debit = users::Entity::update_many()
                    .col_expr(
                        users::Column::CreditsBalance,
                        Expr::col(users::Column::CreditsBalance).sub(price.cents()),
                    )
                    .filter(users::Column::Id.eq(user_id))
                    .filter(users::Column::CreditsBalance.gte(price.cents()))
                    .exec(&db_tx)
                    .await?;
                if debit.rows_affected == 0 {
                    tracing::warn!("download of pack {pack_id} lost a balance race for user {user_id}");
                    return Err(EngineError::InsufficientBalance {
                        required: price,
                        balance,
                    });
                }

                transactions::ActiveModel {
                    user_id: ActiveValue::Set(user_id),
                    listing_id: ActiveValue::Set(Some(pack_id)),
                    transaction_type: ActiveValue::Set(
                        TransactionType::Download.as_str().to_string(),
                    ),
                    amount: ActiveValue::Set(-price.cents()),
                    description: ActiveValue::Set(Some(format!("Download pack: {}", listing.name))),
                    created_at: ActiveValue::Set(now),
                    ..Default::default()
                }
                .insert(&db_tx)
                .await?;
            }

            let remaining = Credits::new(require_user(&db_tx, user_id).await?.credits_balance);
            if remaining.is_negative() {
                return Err(EngineError::InternalInvariant(format!(
                    "user {user_id} balance went negative"
                )));
            }
            Ok::<_, EngineError>((listing, price, remaining))
        })?;

        tracing::info!(
            "user {user_id} downloaded pack {pack_id}, charged {charged}, balance {balance}"
        );
        Ok(DownloadReceipt {
            allowed: true,
            usage_license: (!charged.is_zero()).then(|| UsageLicense::for_listing(&listing, now)),
            charged,
            remaining_balance: balance,
        })
    }
}

pub(super) async fn require_user<C>(db: &C, user_id: i64) -> ResultEngine<users::Model>
where
    C: ConnectionTrait,
{
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))
}

async fn require_published_pack(
    db_tx: &DatabaseTransaction,
    pack_id: i64,
) -> ResultEngine<PackListing> {
    let model = packs::Entity::find_by_id(pack_id)
        .filter(packs::Column::Status.eq(PackStatus::Published.as_str()))
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("pack {pack_id}")))?;
    PackListing::try_from(model)
}
