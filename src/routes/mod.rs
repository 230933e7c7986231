// Route definitions

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

mod ai_search;
mod api;

pub fn create_router(app_state: AppState) -> Router {
    // Structured catalog endpoints
    let cars_router = Router::new()
        .route("/search", get(api::search_cars))
        .route("/facets", get(api::get_facets))
        .route("/autocomplete", get(api::autocomplete))
        .route("/:id", get(api::get_car));

    // LLM-assisted endpoints, each with a deterministic fallback
    let ai_router = Router::new()
        .route("/", post(ai_search::ai_search))
        .route("/parse", post(ai_search::parse_query))
        .route("/compare", post(ai_search::compare_cars));

    let api_router = Router::new()
        .route("/health", get(api::health))
        .nest("/cars", cars_router)
        .nest("/ai-search", ai_router);

    Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
