use axum::{
    Json, Router,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, Error as AxumError, Header, authorization::Basic},
};

use axum::extract::rejection::JsonRejection;
use std::sync::Arc;

use crate::{ServerError, credits, dashboard, layout, support};
use engine::{Engine, EngineError};

static USER_ID_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-user-id");

/// Credentials guarding the `/admin` routes.
#[derive(Clone, Debug)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    /// `None` locks every admin route.
    pub admin: Option<AdminCredentials>,
}

impl ServerState {
    pub fn new(engine: Engine, admin: Option<AdminCredentials>) -> Self {
        Self {
            engine: Arc::new(engine),
            admin,
        }
    }
}

/// `TypedHeader` for the caller's user id.
///
/// Credit and storefront requests must carry an "x-user-id" entry.
#[derive(Debug)]
pub(crate) struct UserIdHeader(pub i64);

impl Header for UserIdHeader {
    fn name() -> &'static axum::http::HeaderName {
        &USER_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let Ok(value) = value.trim().parse() else {
            return Err(AxumError::invalid());
        };

        Ok(UserIdHeader(value))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        let as_string = self.0.to_string();
        match axum::http::HeaderValue::from_str(&as_string) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-user-id header"),
        }
    }
}

/// `Json` body whose rejections go through [`ServerError`].
///
/// Malformed bodies and unknown enum tags such as a component `type` answer
/// 400 instead of axum's 422.
#[derive(Debug)]
pub(crate) struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

async fn admin_auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.admin.as_ref() else {
        tracing::warn!("admin request rejected: no admin credentials configured");
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    if auth_header.username() != expected.username || auth_header.password() != expected.password
    {
        tracing::warn!("admin request rejected for {}", auth_header.username());
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

/// Runs a filesystem-bound engine call off the async workers.
pub(crate) async fn blocking<T, F>(state: &ServerState, f: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce(&Engine) -> Result<T, EngineError> + Send + 'static,
{
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|err| EngineError::InternalInvariant(format!("blocking task failed: {err}")))?
        .map_err(ServerError::from)
}

fn admin_router(state: ServerState) -> Router<ServerState> {
    Router::new()
        .route("/storefront-support/list", get(support::list))
        .route("/storefront-support/set-threshold", post(support::set_threshold))
        .route("/storefront-support/get-threshold", get(support::get_threshold))
        .route("/storefront-support/{id}/approve", post(support::approve))
        .route("/storefront-support/{id}/disable", post(support::disable))
        .route("/storefront-support/{id}/reenable", post(support::reenable))
        .route(
            "/settings/language",
            get(support::get_language).post(support::set_language),
        )
        .route_layer(middleware::from_fn_with_state(state, admin_auth))
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/export", post(dashboard::export))
        .route("/layout", get(layout::load).post(layout::save))
        .route("/layout/default", get(layout::default_layout))
        .route("/components/has-data", post(dashboard::batch_has_data))
        .route(
            "/components/{kind}/{instance_id}/has-data",
            get(dashboard::has_data),
        )
        .route("/files", get(dashboard::list_files))
        .route("/files/download/{id}", get(dashboard::download_file))
        .route("/download/{pack_id}", get(credits::download_pack))
        .route("/credits/balance", get(credits::balance))
        .route("/credits/purchase", post(credits::purchase))
        .route("/credits/transactions", get(credits::transactions))
        .route("/storefront-support/apply", post(support::apply))
        .nest("/admin/api", admin_router(state.clone()))
        .with_state(state)
}

pub async fn run(engine: Engine, admin: Option<AdminCredentials>) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, admin, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    admin: Option<AdminCredentials>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(ServerState::new(engine, admin))).await
}

pub fn spawn_with_listener(
    engine: Engine,
    admin: Option<AdminCredentials>,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, admin, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
