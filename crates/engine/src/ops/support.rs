use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, JoinType, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ResultEngine, Storefront, SupportAction, SupportRequest, SupportStatus,
    storefronts,
    support_requests::{self, SupportRow},
    users,
};

use super::{Engine, credits::require_user, normalize_required, with_tx};

/// Rows per page of the admin list.
pub const SUPPORT_PAGE_SIZE: u64 = 50;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportSort {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SupportSort {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" | "desc" => Ok(Self::Desc),
            "asc" => Ok(Self::Asc),
            other => Err(EngineError::InvalidInput(format!(
                "sort_order must be 'asc' or 'desc', got {other}"
            ))),
        }
    }
}

/// Filters of the admin support list. Empty strings count as unset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SupportListParams {
    /// 1-based; `None` and `0` mean the first page.
    pub page: Option<u64>,
    pub status: Option<String>,
    /// Substring of the store name, username or display name. Case folding
    /// is ASCII-only, like SQLite's `LOWER()`.
    pub search: Option<String>,
    /// `YYYY-MM-DD`, from 00:00:00.
    pub date_from: Option<String>,
    /// `YYYY-MM-DD`, up to 23:59:59.
    pub date_to: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportPage {
    pub items: Vec<SupportRequest>,
    /// Matching rows across all pages.
    pub total: u64,
    pub page: u64,
}

/// Validated form of [`SupportListParams`].
#[derive(Debug)]
struct SupportQuery {
    page: u64,
    status: Option<SupportStatus>,
    search: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    sort: SupportSort,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_day(value: &str, field: &str, time: NaiveTime) -> ResultEngine<DateTime<Utc>> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|day| day.and_time(time).and_utc())
        .map_err(|_| EngineError::InvalidInput(format!("{field} must be YYYY-MM-DD, got {value}")))
}

impl TryFrom<&SupportListParams> for SupportQuery {
    type Error = EngineError;

    fn try_from(params: &SupportListParams) -> Result<Self, Self::Error> {
        let status = non_empty(&params.status).map(str::parse).transpose()?;
        let sort = non_empty(&params.sort_order).unwrap_or_default().parse()?;

        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)
            .ok_or_else(|| EngineError::InternalInvariant("invalid end of day".to_string()))?;
        let from = non_empty(&params.date_from)
            .map(|day| parse_day(day, "date_from", NaiveTime::MIN))
            .transpose()?;
        let to = non_empty(&params.date_to)
            .map(|day| parse_day(day, "date_to", end_of_day))
            .transpose()?;
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(EngineError::InvalidInput(
                "date_from must not be after date_to".to_string(),
            ));
        }

        Ok(Self {
            page: params.page.filter(|page| *page > 0).unwrap_or(1),
            status,
            search: non_empty(&params.search).map(str::to_ascii_lowercase),
            from,
            to,
            sort,
        })
    }
}

/// `%` and `_` in the keyword match themselves.
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn joined_requests() -> Select<support_requests::Entity> {
    support_requests::Entity::find()
        .select_only()
        .columns([
            support_requests::Column::Id,
            support_requests::Column::StorefrontId,
            support_requests::Column::UserId,
            support_requests::Column::SoftwareName,
            support_requests::Column::StoreName,
            support_requests::Column::WelcomeMessage,
            support_requests::Column::Status,
            support_requests::Column::DisableReason,
            support_requests::Column::ReviewedAt,
            support_requests::Column::CreatedAt,
            support_requests::Column::UpdatedAt,
        ])
        .column_as(users::Column::Username, "username")
        .column_as(users::Column::DisplayName, "display_name")
        .join(JoinType::InnerJoin, support_requests::Relation::User.def())
}

fn apply_filters(
    mut select: Select<support_requests::Entity>,
    query: &SupportQuery,
) -> Select<support_requests::Entity> {
    if let Some(status) = query.status {
        select = select.filter(support_requests::Column::Status.eq(status.as_str()));
    }
    if let Some(from) = query.from {
        select = select.filter(support_requests::Column::CreatedAt.gte(from));
    }
    if let Some(to) = query.to {
        select = select.filter(support_requests::Column::CreatedAt.lte(to));
    }
    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        let matches = |column: &str| {
            Expr::cust_with_values(
                format!("LOWER({column}) LIKE ? ESCAPE '\\'"),
                [pattern.clone()],
            )
        };
        select = select.filter(
            Condition::any()
                .add(matches("storefront_support_requests.store_name"))
                .add(matches("users.username"))
                .add(matches("users.display_name")),
        );
    }
    select
}

async fn require_request(
    db_tx: &DatabaseTransaction,
    request_id: i64,
) -> ResultEngine<support_requests::Model> {
    support_requests::Entity::find_by_id(request_id)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("support request {request_id}")))
}

impl Engine {
    /// One page of support requests, filtered and sorted by creation time.
    ///
    /// Every parameter is validated before the database is touched.
    pub async fn list_support_requests(
        &self,
        params: &SupportListParams,
    ) -> ResultEngine<SupportPage> {
        let query = SupportQuery::try_from(params)?;
        let select = apply_filters(joined_requests(), &query);

        let total = select.clone().count(&self.database).await?;

        let order = match query.sort {
            SupportSort::Asc => Order::Asc,
            SupportSort::Desc => Order::Desc,
        };
        // Pages past the `i64` row range are empty.
        let offset = (query.page - 1)
            .checked_mul(SUPPORT_PAGE_SIZE)
            .filter(|offset| i64::try_from(*offset).is_ok());
        let rows = match offset {
            Some(offset) => {
                select
                    .order_by(support_requests::Column::CreatedAt, order.clone())
                    .order_by(support_requests::Column::Id, order)
                    .limit(SUPPORT_PAGE_SIZE)
                    .offset(offset)
                    .into_model::<SupportRow>()
                    .all(&self.database)
                    .await?
            }
            None => Vec::new(),
        };

        let items = rows
            .into_iter()
            .map(SupportRequest::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        tracing::debug!(
            "support list page {} returned {} of {total} rows",
            query.page,
            items.len()
        );
        Ok(SupportPage {
            items,
            total,
            page: query.page,
        })
    }

    pub async fn support_request(&self, request_id: i64) -> ResultEngine<SupportRequest> {
        let row = joined_requests()
            .filter(support_requests::Column::Id.eq(request_id))
            .into_model::<SupportRow>()
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("support request {request_id}")))?;
        SupportRequest::try_from(row)
    }

    pub async fn create_storefront(
        &self,
        user_id: i64,
        store_slug: &str,
        store_name: &str,
    ) -> ResultEngine<Storefront> {
        let store_slug = normalize_required(store_slug, "store slug")?.to_lowercase();
        if !store_slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(EngineError::InvalidInput(format!(
                "store slug may only contain letters, digits and '-': {store_slug}"
            )));
        }
        let store_name = normalize_required(store_name, "store name")?;

        let storefront = with_tx!(self, |db_tx| {
            require_user(&db_tx, user_id).await?;
            let taken = storefronts::Entity::find()
                .filter(storefronts::Column::StoreSlug.eq(store_slug.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if taken {
                return Err(EngineError::ExistingKey(store_slug));
            }
            let model = storefronts::ActiveModel {
                user_id: ActiveValue::Set(user_id),
                store_slug: ActiveValue::Set(store_slug.clone()),
                store_name: ActiveValue::Set(store_name),
                created_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            }
            .insert(&db_tx)
            .await?;
            Ok::<_, EngineError>(Storefront::from(model))
        })?;

        tracing::info!(
            "storefront {} created for user {user_id}",
            storefront.store_slug
        );
        Ok(storefront)
    }

    /// File a support request for a storefront the user owns.
    ///
    /// The owner's lifetime sales must reach the support threshold, and the
    /// storefront must not already have a pending or approved request.
    pub async fn apply_for_support(
        &self,
        user_id: i64,
        storefront_id: i64,
        software_name: &str,
        welcome_message: &str,
    ) -> ResultEngine<SupportRequest> {
        let software_name = normalize_required(software_name, "software name")?;
        let welcome_message = welcome_message.trim().to_string();

        let total_sales = self.total_sales(user_id).await?;
        let threshold = self.support_threshold().await;
        if !self.is_eligible_for_support(total_sales).await {
            return Err(EngineError::InvalidInput(format!(
                "total sales {total_sales} below support threshold {threshold}"
            )));
        }

        let request_id = with_tx!(self, |db_tx| {
            let storefront = storefronts::Entity::find_by_id(storefront_id)
                .filter(storefronts::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("storefront {storefront_id}")))?;

            let active = support_requests::Entity::find()
                .filter(support_requests::Column::StorefrontId.eq(storefront_id))
                .filter(support_requests::Column::Status.is_in([
                    SupportStatus::Pending.as_str(),
                    SupportStatus::Approved.as_str(),
                ]))
                .one(&db_tx)
                .await?;
            if let Some(active) = active {
                return Err(EngineError::ExistingKey(format!(
                    "support request {} for storefront {storefront_id}",
                    active.id
                )));
            }

            let now = Utc::now();
            let model = support_requests::ActiveModel {
                storefront_id: ActiveValue::Set(storefront_id),
                user_id: ActiveValue::Set(user_id),
                software_name: ActiveValue::Set(software_name),
                store_name: ActiveValue::Set(storefront.store_name),
                welcome_message: ActiveValue::Set(welcome_message),
                status: ActiveValue::Set(SupportStatus::Pending.as_str().to_string()),
                disable_reason: ActiveValue::Set(None),
                reviewed_at: ActiveValue::Set(None),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            }
            .insert(&db_tx)
            .await?;
            Ok::<_, EngineError>(model.id)
        })?;

        tracing::info!("support request {request_id} filed for storefront {storefront_id}");
        self.support_request(request_id).await
    }

    /// Apply an admin action to a support request.
    pub async fn review_support_request(
        &self,
        request_id: i64,
        action: SupportAction,
    ) -> ResultEngine<SupportRequest> {
        let reason = match &action {
            SupportAction::Disable { reason } => {
                Some(normalize_required(reason, "disable reason")?)
            }
            SupportAction::Approve | SupportAction::Reenable => None,
        };

        with_tx!(self, |db_tx| {
            let current = require_request(&db_tx, request_id).await?;
            let from: SupportStatus = current.status.parse().map_err(|_| {
                EngineError::InternalInvariant(format!(
                    "support request {request_id} has status {}",
                    current.status
                ))
            })?;
            let to = action.transition(from).ok_or_else(|| {
                EngineError::InvalidTransition(format!(
                    "cannot {} a {from} support request",
                    action.name()
                ))
            })?;

            let now = Utc::now();
            let result = support_requests::Entity::update_many()
                .col_expr(support_requests::Column::Status, Expr::value(to.as_str()))
                .col_expr(support_requests::Column::DisableReason, Expr::value(reason))
                .col_expr(support_requests::Column::ReviewedAt, Expr::value(now))
                .col_expr(support_requests::Column::UpdatedAt, Expr::value(now))
                .filter(support_requests::Column::Id.eq(request_id))
                .filter(support_requests::Column::Status.eq(from.as_str()))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::InvalidTransition(format!(
                    "support request {request_id} changed concurrently"
                )));
            }
            Ok::<_, EngineError>(())
        })?;

        tracing::info!("support request {request_id}: {}", action.name());
        self.support_request(request_id).await
    }

    pub async fn approve_support_request(&self, request_id: i64) -> ResultEngine<SupportRequest> {
        self.review_support_request(request_id, SupportAction::Approve)
            .await
    }

    pub async fn disable_support_request(
        &self,
        request_id: i64,
        reason: &str,
    ) -> ResultEngine<SupportRequest> {
        self.review_support_request(
            request_id,
            SupportAction::Disable {
                reason: reason.to_string(),
            },
        )
        .await
    }

    pub async fn reenable_support_request(
        &self,
        request_id: i64,
    ) -> ResultEngine<SupportRequest> {
        self.review_support_request(request_id, SupportAction::Reenable)
            .await
    }
}
