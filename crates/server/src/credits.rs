//! Credits API endpoints.

use api_types::credits::{
    Balance, DownloadResponse, PurchaseRequest, TransactionList, TransactionView,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue},
};
use axum_extra::TypedHeader;
use engine::{Credits, CreditsTransaction};

use crate::{
    ServerError,
    server::{JsonBody, ServerState, UserIdHeader},
};

static USAGE_LICENSE_HEADER: HeaderName = HeaderName::from_static("x-usage-license");

fn transaction_view(tx: CreditsTransaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        listing_id: tx.listing_id,
        transaction_type: tx.transaction_type.as_str().to_string(),
        amount: tx.amount.to_string(),
        description: tx.description,
        created_at: tx.created_at,
    }
}

pub async fn balance(
    TypedHeader(UserIdHeader(user_id)): TypedHeader<UserIdHeader>,
    State(state): State<ServerState>,
) -> Result<Json<Balance>, ServerError> {
    let balance = state.engine.balance(user_id).await?;
    Ok(Json(Balance {
        user_id,
        balance: balance.to_string(),
    }))
}

pub async fn purchase(
    TypedHeader(UserIdHeader(user_id)): TypedHeader<UserIdHeader>,
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<PurchaseRequest>,
) -> Result<Json<Balance>, ServerError> {
    let amount: Credits = payload.amount.parse()?;
    let balance = state.engine.purchase_credits(user_id, amount).await?;
    Ok(Json(Balance {
        user_id,
        balance: balance.to_string(),
    }))
}

pub async fn transactions(
    TypedHeader(UserIdHeader(user_id)): TypedHeader<UserIdHeader>,
    State(state): State<ServerState>,
) -> Result<Json<TransactionList>, ServerError> {
    let transactions = state
        .engine
        .list_transactions(user_id)
        .await?
        .into_iter()
        .map(transaction_view)
        .collect();
    Ok(Json(TransactionList { transactions }))
}

/// JSON with every non-ASCII character written as a `\uXXXX` escape, so the
/// text is a valid header value and still parses to the same document.
fn ascii_json(value: &impl serde::Serialize) -> serde_json::Result<String> {
    let raw = serde_json::to_string(value)?;
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(escaped)
}

/// Charges the pack price and hands back the usage license in
/// `X-Usage-License` and in the body. 402 when the balance does not cover it.
pub async fn download_pack(
    TypedHeader(UserIdHeader(user_id)): TypedHeader<UserIdHeader>,
    State(state): State<ServerState>,
    Path(pack_id): Path<i64>,
) -> Result<(HeaderMap, Json<DownloadResponse>), ServerError> {
    let receipt = state.engine.charge_for_download(user_id, pack_id).await?;

    let mut headers = HeaderMap::new();
    let mut usage_license = None;
    if let Some(license) = receipt.usage_license.as_ref() {
        match ascii_json(license)
            .ok()
            .and_then(|raw| HeaderValue::from_str(&raw).ok())
        {
            Some(value) => {
                headers.insert(USAGE_LICENSE_HEADER.clone(), value);
            }
            None => tracing::error!("usage license for pack {pack_id} could not be encoded"),
        }
        usage_license = serde_json::to_value(license).ok();
    }

    Ok((
        headers,
        Json(DownloadResponse {
            allowed: receipt.allowed,
            charged: receipt.charged.to_string(),
            remaining_balance: receipt.remaining_balance.to_string(),
            usage_license,
        }),
    ))
}
