//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::analysis::analyze_video;
use crate::handlers::cache::{cache_stats, clear_cache};
use crate::handlers::chat::chat;
use crate::handlers::costs::{get_budget_status, get_costs, reset_costs};
use crate::handlers::health::health;
use crate::handlers::image::generate_image;
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/analyze", post(analyze_video))
        .route("/chat", post(chat))
        .route("/generate-image", post(generate_image))
        // Cost tracking
        .route("/costs", get(get_costs))
        .route("/costs/reset", post(reset_costs))
        .route("/costs/budget", get(get_budget_status))
        // Cache management
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(clear_cache));

    let max_body_size = state.config.max_body_size;
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .with_state(state)
}

/// CORS layer from the configured origin list. `*` opens everything.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}
