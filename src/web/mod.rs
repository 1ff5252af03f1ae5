use crate::db::Database;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Path as AxumPath},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use rust_embed::Embed;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

mod accounts;
pub mod auth;
mod bulk;
mod errors;
mod forms;
mod handlers;
mod media;
mod templates;

pub use errors::AppError;

/// Largest accepted request body (multipart uploads included).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    /// Directory uploaded images are stored under and served from.
    pub media_root: PathBuf,
}

impl AppState {
    pub fn new(db: Database, media_root: PathBuf) -> Self {
        AppState {
            db: Arc::new(Mutex::new(db)),
            media_root,
        }
    }

    /// Lock the database for the duration of a handler's store calls.
    pub(crate) fn db(&self) -> Result<MutexGuard<'_, Database>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
    }
}

/// Where and how the server listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub media_root: PathBuf,
}

/// Embedded static assets (stylesheet, bulk-action script) compiled into the binary.
#[derive(Embed)]
#[folder = "static/"]
struct StaticAssets;

/// Serve embedded static files at /static/{path}.
async fn static_handler(AxumPath(path): AxumPath<String>) -> Response {
    match StaticAssets::get(&path) {
        Some(content) => {
            let mime = if path.ends_with(".js") {
                "application/javascript"
            } else if path.ends_with(".css") {
                "text/css"
            } else {
                "application/octet-stream"
            };
            ([(header::CONTENT_TYPE, mime)], content.data).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Build the axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let media = ServeDir::new(&state.media_root);
    Router::new()
        .route("/", get(handlers::task_list))
        .route("/task/{id}", get(handlers::task_detail))
        .route(
            "/task-create",
            get(handlers::task_create_form).post(handlers::task_create),
        )
        .route(
            "/task-update/{id}",
            get(handlers::task_update_form).post(handlers::task_update),
        )
        .route(
            "/task-delete/{id}",
            get(handlers::task_delete_confirm).post(handlers::task_delete),
        )
        .route(
            "/bulk-delete",
            post(bulk::bulk_delete).fallback(bulk::wrong_method),
        )
        .route(
            "/bulk-update",
            post(bulk::bulk_update).fallback(bulk::wrong_method),
        )
        .route("/login", get(accounts::login_form).post(accounts::login))
        .route(
            "/register",
            get(accounts::register_form).post(accounts::register),
        )
        .route("/logout", any(accounts::logout))
        .route("/static/{*path}", get(static_handler))
        .nest_service("/media", media)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve on Ctrl-C so in-flight requests can finish.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Start the web server against the database at `db_path`.
pub async fn serve(db_path: &std::path::Path, config: ServerConfig) -> anyhow::Result<()> {
    let db = Database::open(db_path)?;
    db.migrate()?;
    let purged = db.purge_expired_sessions()?;
    if purged > 0 {
        tracing::info!(purged, "removed expired sessions");
    }

    tokio::fs::create_dir_all(&config.media_root).await?;
    let state = AppState::new(db, config.media_root.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}:{}: {e}", config.host, config.port))?;
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!(
        %addr,
        db = %db_path.display(),
        media = %config.media_root.display(),
        "taskdesk listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
