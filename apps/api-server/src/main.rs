//! api-server — HTTP API for managing movie records.
//!
//! Exposes five CRUD endpoints under `/movies` and supports local dev with:
//! - Storage: in-memory, SQLite (default, `sqlite` feature) or DynamoDB
//!   (`dynamo` feature), chosen by `STORAGE_PROVIDER`.
//! - Failure rendering: normalized (default) or legacy via `ERROR_RESPONSES`.
//! - CORS: configurable via CORS_ALLOW_ORIGIN (origin string).
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # with Dynamo adapter enabled (requires env vars)
//! STORAGE_PROVIDER=dynamo DYNAMO_TABLE_MOVIES=movies \
//!   cargo run -p api-server --features dynamo
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;
mod error;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::HeaderValue;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use domain::adapters::memory_repo::InMemoryRepo;
use domain::service::MovieService;
use domain::validate::{FilterInput, MovieInput, YearValue};
use domain::{CoreError, Movie, MovieFilter, MovieId, MovieRepository, NewMovie};
use http_common::{Endpoint, ErrorStyle};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::ApiError;

// Local repo abstraction supporting memory, sqlite or dynamo (feature-gated).
enum RepoKind {
    Memory(InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteRepo),
    #[cfg(feature = "dynamo")]
    Dynamo(aws_dynamo::DynamoRepo),
}

#[derive(Clone)]
struct AnyRepo {
    kind: Arc<RepoKind>,
}

impl AnyRepo {
    fn memory() -> Self {
        Self {
            kind: Arc::new(RepoKind::Memory(InMemoryRepo::new())),
        }
    }

    #[cfg(feature = "sqlite")]
    fn sqlite(path: &std::path::Path) -> Result<Self, CoreError> {
        Ok(Self {
            kind: Arc::new(RepoKind::Sqlite(
                sqlite_adapter::SqliteRepo::open_creating_dirs(path)?,
            )),
        })
    }

    #[cfg(feature = "dynamo")]
    async fn dynamo(table: &str) -> Self {
        let tables = aws_dynamo::DynamoTables::new(table);
        Self {
            kind: Arc::new(RepoKind::Dynamo(aws_dynamo::DynamoRepo::new(tables).await)),
        }
    }
}

impl MovieRepository for AnyRepo {
    async fn create(&self, movie: NewMovie) -> Result<Movie, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.create(movie).await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.create(movie).await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.create(movie).await,
        }
    }

    async fn get(&self, id: &MovieId) -> Result<Option<Movie>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.get(id).await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.get(id).await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.get(id).await,
        }
    }

    async fn find(&self, filter: &MovieFilter) -> Result<Vec<Movie>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.find(filter).await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.find(filter).await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.find(filter).await,
        }
    }

    async fn replace(&self, id: &MovieId, movie: NewMovie) -> Result<u64, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.replace(id, movie).await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.replace(id, movie).await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.replace(id, movie).await,
        }
    }

    async fn delete(&self, id: &MovieId) -> Result<u64, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.delete(id).await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.delete(id).await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.delete(id).await,
        }
    }

    async fn close(&self) -> Result<(), CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.close().await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.close().await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.close().await,
        }
    }
}

#[derive(Clone)]
struct AppState {
    movies: Arc<MovieService<AnyRepo>>,
    error_style: ErrorStyle,
}

impl AppState {
    fn new(repo: AnyRepo, error_style: ErrorStyle) -> Self {
        Self {
            movies: Arc::new(MovieService::new(repo)),
            error_style,
        }
    }
}

#[tokio::main]
async fn main() {
    load_dotenv();

    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    info!("{}", domain::about());
    cfg.warn_if_unusual();

    let repo = match build_repo(&cfg).await {
        Ok(r) => r,
        Err(e) => {
            error!(err = %e, provider = ?cfg.storage_provider, "failed to open store");
            std::process::exit(1);
        }
    };
    info!(provider = ?cfg.storage_provider, "store opened");
    let state = AppState::new(repo, cfg.error_style);

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    let app = router(state.clone()).layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    info!(%addr, "api-server listening");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(err = %e, "server error");
    }

    match state.movies.close().await {
        Ok(()) => info!("store closed"),
        Err(e) => error!(err = %e, "failed to close store"),
    }
}

/// Load .env from the working directory or the nearest ancestor that has one.
fn load_dotenv() {
    let Ok(cwd) = std::env::current_dir() else {
        return;
    };
    // Tracing is not installed yet; config errors go to stderr as well.
    if let Err((path, e)) = load_dotenv_from_ancestors(&cwd) {
        eprintln!("failed to load {}: {}", path.display(), e);
    }
}

/// Load the first `.env` found walking up from `start`; returns its path.
fn load_dotenv_from_ancestors(
    start: &std::path::Path,
) -> Result<Option<PathBuf>, (PathBuf, dotenvy::Error)> {
    for dir in start.ancestors() {
        let env_path = dir.join(".env");
        if env_path.is_file() {
            return match dotenvy::from_path(&env_path) {
                Ok(()) => Ok(Some(env_path)),
                Err(e) => Err((env_path, e)),
            };
        }
    }
    Ok(None)
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(err = %e, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(err = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct a repository instance based on config and feature flags.
async fn build_repo(cfg: &config::Config) -> Result<AnyRepo, CoreError> {
    match cfg.storage_provider {
        config::StorageProvider::Memory => Ok(AnyRepo::memory()),
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => AnyRepo::sqlite(&cfg.db_path),
        #[cfg(feature = "dynamo")]
        config::StorageProvider::Dynamo => {
            let table = cfg.dynamo_table.as_deref().ok_or_else(|| {
                CoreError::Repository("DYNAMO_TABLE_MOVIES not set".into())
            })?;
            Ok(AnyRepo::dynamo(table).await)
        }
        #[allow(unreachable_patterns)]
        ref other => Err(CoreError::Repository(format!(
            "storage provider {:?} not compiled in",
            other
        ))),
    }
}

fn router(state: AppState) -> Router {
    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route(
            "/movies/:id",
            get(get_movie).put(replace_movie).delete(delete_movie),
        )
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .with_state(state)
}

/// `year` may be sent as a JSON number or as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum YearField {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
struct MovieReq {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<YearField>,
    #[serde(default)]
    language: Option<String>,
}

impl From<MovieReq> for MovieInput {
    fn from(req: MovieReq) -> Self {
        MovieInput {
            title: req.title,
            year: req.year.map(|y| match y {
                YearField::Number(n) => YearValue::Number(n),
                YearField::Text(s) => YearValue::Text(s),
            }),
            language: req.language,
        }
    }
}

#[derive(Deserialize)]
struct ListQuery {
    title: Option<String>,
    year: Option<String>,
    language: Option<String>,
}

impl From<ListQuery> for FilterInput {
    fn from(q: ListQuery) -> Self {
        FilterInput {
            title: q.title,
            year: q.year,
            language: q.language,
        }
    }
}

#[derive(Serialize)]
struct MovieOut {
    id: String,
    title: String,
    year: i32,
    language: String,
}

impl From<Movie> for MovieOut {
    fn from(m: Movie) -> Self {
        MovieOut {
            id: m.id.as_str().to_string(),
            title: m.title,
            year: m.year,
            language: m.language,
        }
    }
}

async fn create_movie(
    State(state): State<AppState>,
    payload: Result<Json<MovieReq>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(p) => p,
        Err(rej) => {
            return ApiError::Malformed(rej.body_text()).respond(Endpoint::Create, state.error_style)
        }
    };
    match state.movies.create(body.into()).await {
        Ok(movie) => {
            info!(id = %movie.id, "create ok");
            (StatusCode::CREATED, Json(MovieOut::from(movie))).into_response()
        }
        Err(e) => ApiError::from(e).respond(Endpoint::Create, state.error_style),
    }
}

async fn get_movie(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    let Path(id) = match path {
        Ok(p) => p,
        Err(rej) => {
            return ApiError::Malformed(rej.body_text()).respond(Endpoint::GetOne, state.error_style)
        }
    };
    match state.movies.get(&id).await {
        Ok(Some(movie)) => (StatusCode::OK, Json(MovieOut::from(movie))).into_response(),
        Ok(None) => {
            info!(%id, "get 404");
            ApiError::NotFound.respond(Endpoint::GetOne, state.error_style)
        }
        Err(e) => ApiError::from(e).respond(Endpoint::GetOne, state.error_style),
    }
}

async fn list_movies(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Response {
    let Query(q) = match query {
        Ok(q) => q,
        Err(rej) => {
            return ApiError::Malformed(rej.body_text()).respond(Endpoint::List, state.error_style)
        }
    };
    match state.movies.find(q.into()).await {
        Ok(movies) => {
            let out: Vec<MovieOut> = movies.into_iter().map(MovieOut::from).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => ApiError::from(e).respond(Endpoint::List, state.error_style),
    }
}

async fn replace_movie(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<MovieReq>, JsonRejection>,
) -> Response {
    let Path(id) = match path {
        Ok(p) => p,
        Err(rej) => {
            return ApiError::Malformed(rej.body_text())
                .respond(Endpoint::Replace, state.error_style)
        }
    };
    let Json(body) = match payload {
        Ok(p) => p,
        Err(rej) => {
            return ApiError::Malformed(rej.body_text())
                .respond(Endpoint::Replace, state.error_style)
        }
    };
    match state.movies.replace(&id, body.into()).await {
        Ok((0, _)) => {
            info!(%id, "replace 404");
            ApiError::NotFound.respond(Endpoint::Replace, state.error_style)
        }
        Ok((_, movie)) => {
            info!(id = %movie.id, "replace ok");
            (StatusCode::OK, Json(MovieOut::from(movie))).into_response()
        }
        Err(e) => ApiError::from(e).respond(Endpoint::Replace, state.error_style),
    }
}

async fn delete_movie(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    let Path(id) = match path {
        Ok(p) => p,
        Err(rej) => {
            return ApiError::Malformed(rej.body_text()).respond(Endpoint::Delete, state.error_style)
        }
    };
    match state.movies.delete(&id).await {
        Ok(0) => {
            info!(%id, "delete 404");
            ApiError::NotFound.respond(Endpoint::Delete, state.error_style)
        }
        Ok(_) => {
            info!(%id, "delete ok");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => ApiError::from(e).respond(Endpoint::Delete, state.error_style),
    }
}
