use crate::{api::email::EmailSender, wash::WashStore};
use anyhow::Result;
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request},
    routing::get,
    Json, Router,
};
use chrono::FixedOffset;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub mod email;
mod error;
pub(crate) mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;
pub mod types;

pub use error::ApiError;
pub use openapi::openapi;

/// Shared handler state.
pub struct AppState {
    store: Arc<dyn WashStore>,
    email: Option<Arc<dyn EmailSender>>,
    offset: FixedOffset,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn WashStore>,
        email: Option<Arc<dyn EmailSender>>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            email,
            offset,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn WashStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn email(&self) -> Option<&Arc<dyn EmailSender>> {
        self.email.as_ref()
    }

    /// Offset used to render dates and bucket reports by day.
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// The complete application: documented routes, `/openapi.json` and middleware.
pub fn app(state: Arc<AppState>) -> Router {
    let (router, openapi) = router().split_for_parts();

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        // reflect the caller's origin
        .allow_origin(AllowOrigin::mirror_request());

    router
        .route(
            "/openapi.json",
            get(move || {
                let doc = openapi.clone();
                async move { Json(doc) }
            }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state)),
        )
}

/// Start the server on `port` and run until Ctrl-C.
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    serve(listener, state, shutdown_signal()).await
}

/// Serve the application on an already bound listener until `shutdown` resolves.
/// # Errors
/// Return error if the server fails
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
