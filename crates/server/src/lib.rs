use axum::{Json, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{AdminCredentials, ServerState, router, run, run_with_listener, spawn_with_listener};

mod credits;
mod dashboard;
mod layout;
mod server;
mod support;

pub mod types {
    pub mod layout {
        pub use api_types::layout::LayoutQuery;
        pub use engine::{LayoutConfiguration, LayoutItem};
    }

    pub mod dashboard {
        pub use api_types::component::HasData;
        pub use api_types::files::FilesQuery;
        pub use engine::{ExportRequest, ExportResult, FileInfo};
    }

    pub mod credits {
        pub use api_types::credits::{
            Balance, DownloadResponse, PurchaseRequest, TransactionList, TransactionView,
        };
        pub use engine::UsageLicense;
    }

    pub mod support {
        pub use api_types::settings::Language;
        pub use api_types::support::{
            DisableRequest, SupportApply, SupportListQuery, SupportListResponse,
            SupportRequestView, ThresholdResponse, ThresholdUpdate,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidInput(_)
        | EngineError::UnsupportedComponentType(_)
        | EngineError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
        EngineError::NoExportableComponents => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Database(_) | EngineError::InternalInvariant(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::InternalInvariant(msg) => {
            tracing::error!("internal invariant violated: {msg}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Generic(rejection.body_text())
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
