// Handlers for structured catalog endpoints

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{ApiResponse, AutocompleteParams, SearchParams},
    AppState,
};

const MAX_AUTOCOMPLETE_LIMIT: usize = 50;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthStatus {
    status: &'static str,
    listings: usize,
    llm_enabled: bool,
}

pub async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("[HANDLER] /api/health - Request received.");
    Json(ApiResponse::ok(HealthStatus {
        status: "ok",
        listings: app_state.engine.len(),
        llm_enabled: app_state.settings.llm.enabled,
    }))
}

pub async fn search_cars(
    State(app_state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("[HANDLER] /api/cars/search - Request received with params: {:?}", params);

    let normalized = app_state.normalizer.normalize(&params)?;
    let results = app_state.cache.get_or_search(
        &app_state.engine,
        &normalized.filter,
        normalized.page,
        normalized.page_size,
    );

    tracing::info!(
        "[HANDLER] /api/cars/search - Returning {} of {} hits (page {}/{}).",
        results.hits.len(),
        results.total,
        results.page,
        results.total_pages
    );
    Ok(Json(ApiResponse::ok(results)))
}

pub async fn get_facets(
    State(app_state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("[HANDLER] /api/cars/facets - Request received.");
    let normalized = app_state.normalizer.normalize(&params)?;
    let facets = app_state.engine.facets(&normalized.filter);
    Ok(Json(ApiResponse::ok(facets)))
}

pub async fn autocomplete(
    State(app_state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Result<impl IntoResponse, AppError> {
    let prefix = params.q.unwrap_or_default();
    tracing::info!("[HANDLER] /api/cars/autocomplete - Request received for prefix: '{}'", prefix);

    let limit = match params.limit.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        None => app_state.settings.search.autocomplete_limit,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| AppError::validation(format!("limit must be a non-negative integer, got '{}'", raw)))?,
    };
    let suggestions = app_state
        .engine
        .autocomplete(&prefix, limit.min(MAX_AUTOCOMPLETE_LIMIT));

    tracing::debug!("[HANDLER] /api/cars/autocomplete - {} suggestions.", suggestions.len());
    Ok(Json(ApiResponse::ok(suggestions)))
}

pub async fn get_car(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("[HANDLER] /api/cars/:id - Request received for id: {}", id);
    let car = app_state
        .catalog
        .listing_by_id(&id)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("Car '{}' not found", id)))?;
    Ok(Json(ApiResponse::ok(car)))
}
