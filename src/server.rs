use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::browse::{browse_requests, BrowseSession};
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::mood::MoodClassifier;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<dyn CatalogClient>,
    pub classifier: Arc<dyn MoodClassifier>,
    pub browse: Arc<BrowseSession>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<dyn CatalogClient>,
        classifier: Arc<dyn MoodClassifier>,
    ) -> Self {
        let requests = browse_requests(catalog.clone(), &config.browse.genres);
        Self {
            config: Arc::new(config),
            catalog,
            classifier,
            browse: Arc::new(BrowseSession::new(requests)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/browse", get(crate::api::get_browse))
        .route("/api/browse/refresh", post(crate::api::refresh_browse))
        .route("/api/genres", get(crate::api::list_genres))
        .route("/api/search", get(crate::api::search_movies))
        .route("/api/movie/:id", get(crate::api::get_movie))
        .route("/api/mood", post(crate::api::post_mood))
        .route("/api/mood/:label", get(crate::api::get_mood_suggestions));

    let mut router = Router::new()
        .route("/robots.txt", get(robots_txt_handler))
        .merge(api_routes)
        .fallback(fallback_handler);

    if let Some(ref appdir) = state.config.appdir {
        router = router.fallback_service(ServeDir::new(appdir));
    }

    router
        .layer(axum::middleware::from_fn(crate::middleware::normalize_path))
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn robots_txt_handler() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

async fn fallback_handler(req: Request<axum::body::Body>) -> impl IntoResponse {
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}
