use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::compare::engine::{BackstopCliEngine, EngineOptions, SharedDiffEngine};
use crate::compare::report::PUBLIC_MOUNT;
use crate::compare::service::CompareService;
use crate::sitemap::{HttpSitemapFetcher, SharedSitemapFetcher};

/// Matches the 1 MiB request-body ceiling of the original API.
pub const JSON_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub compare: CompareService,
    pub sitemaps: SharedSitemapFetcher,
}

/// Default wiring: the real engine CLI and a real HTTP fetcher.
pub fn build_router(data_root: PathBuf) -> Router {
    let engine: SharedDiffEngine = Arc::new(BackstopCliEngine::new(EngineOptions::default()));
    let sitemaps: SharedSitemapFetcher = Arc::new(HttpSitemapFetcher::new());
    build_router_with(CompareService::new(engine, data_root), sitemaps)
}

/// Wiring with injected collaborators, used by tests to swap in fakes.
pub fn build_router_with(compare: CompareService, sitemaps: SharedSitemapFetcher) -> Router {
    let report_files = ServeDir::new(compare.data_root().to_path_buf());
    let state = AppState { compare, sitemaps };

    Router::new()
        .route("/api/compare", post(crate::api::compare::run_compare_handler))
        .route("/api/tests/all", get(crate::api::compare::list_tests_handler))
        .route(
            "/api/test/sitemap",
            post(crate::api::sitemap::sitemap_diff_handler),
        )
        .nest_service(PUBLIC_MOUNT, report_files)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, data_root: PathBuf) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(bind = %addr, data_root = %data_root.display(), "starting visreg-backend-core HTTP surface");
    let app = build_router(data_root);
    axum::serve(listener, app).await
}
