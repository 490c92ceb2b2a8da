use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod branding;
pub mod ops;
pub mod props;
pub mod settings;

/// Directories served as static files.
#[derive(Debug, Clone)]
pub struct StaticDirs {
    pub frontend_dir: String,
    pub storage_root: String,
    pub storage_prefix: String,
}

impl StaticDirs {
    pub fn from_config(storage: &configs::StorageConfig) -> Self {
        Self {
            frontend_dir: "frontend".into(),
            storage_root: storage.root.clone(),
            storage_prefix: storage.public_url_prefix.clone(),
        }
    }
}

/// Build the full application router: API, stored assets, ops endpoints and frontend.
pub fn build_router(state: AppState, dirs: &StaticDirs, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/api/settings", get(settings::get_settings).post(settings::post_settings))
        .route(
            "/api/settings/branding",
            post(branding::post_branding).layer(DefaultBodyLimit::max(branding::MAX_REQUEST_BYTES)),
        )
        .route("/api/shared-props", get(props::get_shared_props));

    let ops = Router::new()
        .route("/health", get(ops::health))
        .route("/metrics", get(ops::metrics));

    let mut router = Router::new().merge(api).merge(ops);
    // an absolute (CDN) prefix means assets are served elsewhere
    if dirs.storage_prefix.starts_with('/') {
        router = router.nest_service(&dirs.storage_prefix, ServeDir::new(&dirs.storage_root));
    }

    router
        .fallback_service(ServeDir::new(&dirs.frontend_dir))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
