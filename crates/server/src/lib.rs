#![forbid(unsafe_code)]

//! HTTP surface of the transformer QC tracker.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
mod routes;
pub mod state;

pub use auth::{CurrentUser, USER_HEADER};
pub use config::{Backend, Cli, ConfigError, ServerConfig};
pub use error::{ApiError, StartupError};
pub use state::{AppState, Services};

use axum::Router;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::middleware::{Next, from_fn};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use tracing::Instrument;

// Room for multipart boundaries and the text parts around the file.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit =
        usize::try_from(state.max_upload_bytes().saturating_add(MULTIPART_OVERHEAD))
            .unwrap_or(usize::MAX);

    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/login", post(routes::session::login))
        .route("/customers", get(routes::session::customers))
        .route(
            "/transformers",
            get(routes::transformers::list).post(routes::transformers::create),
        )
        .route(
            "/transformers/{id}",
            put(routes::transformers::update).delete(routes::transformers::delete),
        )
        .route("/bom/upload", post(routes::attachments::upload_bom))
        .route(
            "/bom/{key}",
            get(routes::attachments::list_boms).delete(routes::attachments::delete_bom),
        )
        .route("/document/upload", post(routes::attachments::upload_document))
        .route(
            "/document/{key}",
            get(routes::attachments::list_documents).delete(routes::attachments::delete_document),
        )
        .route("/download/{filename}", get(routes::attachments::download))
        .route("/checklist/save", post(routes::checklist::save))
        .route(
            "/checklist/production/save",
            post(routes::checklist::save_production),
        )
        .route("/checklist/unlock", post(routes::checklist::unlock))
        .route(
            "/checklist/clear/{stage}/{wo}",
            delete(routes::checklist::clear),
        )
        .route("/checklist/{stage}/{wo}", get(routes::checklist::list))
        .layer(from_fn(request_span))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn request_span(request: Request<Body>, next: Next) -> Response {
    let span = tracing::info_span!(
        "http.request",
        method = %request.method(),
        route = %request.uri().path(),
    );
    async move {
        let response = next.run(request).await;
        tracing::debug!(status = response.status().as_u16(), "request finished");
        response
    }
    .instrument(span)
    .await
}

/// Binds, serves until ctrl-c, then drains in-flight requests.
pub async fn serve(config: ServerConfig) -> Result<(), StartupError> {
    let state = AppState::open(&config)?;
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
