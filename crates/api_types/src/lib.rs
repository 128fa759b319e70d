//! Request and response bodies shared by the HTTP server and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod layout {
    use super::*;

    /// Query string of `/layout`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct LayoutQuery {
        #[serde(default)]
        pub user: String,
    }
}

pub mod component {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HasData {
        pub instance_id: String,
        pub has_data: bool,
    }
}

pub mod files {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct FilesQuery {
        /// `all_files` (default) or `user_request_related`.
        pub category: Option<String>,
    }
}

pub mod credits {
    use super::*;

    /// Amounts travel as decimal strings (`"12.50"`).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseRequest {
        pub amount: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Balance {
        pub user_id: i64,
        pub balance: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: i64,
        pub listing_id: Option<i64>,
        pub transaction_type: String,
        pub amount: String,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionList {
        pub transactions: Vec<TransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DownloadResponse {
        pub allowed: bool,
        pub charged: String,
        pub remaining_balance: String,
        /// Same license as the `X-Usage-License` header; absent for free packs.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub usage_license: Option<serde_json::Value>,
    }
}

pub mod support {
    use super::*;

    /// Query string of the admin list. Every field stays textual so that
    /// malformed values reach the engine and come back as 400s.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SupportListQuery {
        pub page: Option<String>,
        pub status: Option<String>,
        pub search: Option<String>,
        pub date_from: Option<String>,
        pub date_to: Option<String>,
        pub sort_order: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SupportRequestView {
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
        pub reviewed_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SupportListResponse {
        pub items: Vec<SupportRequestView>,
        pub total: u64,
        pub page: u64,
        pub page_size: u64,
    }

    /// Accepts `{"threshold": 7}` as well as `{"threshold": "7"}`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ThresholdUpdate {
        #[serde(default)]
        pub threshold: serde_json::Value,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ThresholdResponse {
        pub threshold: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisableRequest {
        pub reason: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SupportApply {
        pub storefront_id: i64,
        pub software_name: String,
        #[serde(default)]
        pub welcome_message: String,
    }
}

pub mod settings {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Language {
        pub language: Option<String>,
    }
}
