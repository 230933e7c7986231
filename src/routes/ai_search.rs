// Handlers for natural-language search, recommendations and comparisons

use axum::{
    extract::{rejection::JsonRejection, Json as JsonExtract, State},
    response::{IntoResponse, Json},
};

use crate::{
    error::AppError,
    models::{AiSearchResponse, ApiResponse, CarListing, CompareRequest, NaturalLanguageRequest},
    recommend::CANDIDATE_POOL,
    AppState,
};

// Malformed bodies get the same envelope as every other validation failure
fn body<T>(payload: Result<JsonExtract<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|JsonExtract(value)| value)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

pub async fn ai_search(
    State(app_state): State<AppState>,
    payload: Result<JsonExtract<NaturalLanguageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let request = body(payload)?;
    tracing::info!("[HANDLER] /api/ai-search - Request received for query: {:?}", request.query);

    let settings = &app_state.settings.search;
    let page = request.page.unwrap_or(1);
    let page_size = request.size.unwrap_or(settings.default_page_size);
    if page == 0 {
        return Err(AppError::validation("page must be 1 or greater"));
    }
    if page_size == 0 || page_size > settings.max_page_size {
        return Err(AppError::validation(format!(
            "size must be between 1 and {}",
            settings.max_page_size
        )));
    }

    let parsed = app_state.parser.parse(&request.query).await?;
    tracing::info!(
        "[HANDLER] /api/ai-search - Parsed via {:?} (confidence {:.2}): {}",
        parsed.source,
        parsed.confidence,
        parsed.explanation
    );

    let results = app_state
        .cache
        .get_or_search(&app_state.engine, &parsed.filter, page, page_size);
    let top: Vec<CarListing> = app_state
        .engine
        .ranked(&parsed.filter)
        .into_iter()
        .take(CANDIDATE_POOL)
        .cloned()
        .collect();
    let recommendation = app_state.recommender.recommend(&request.query, &top).await;

    tracing::info!(
        "[HANDLER] /api/ai-search - {} total hits, {} recommendations (AI curated: {}).",
        results.total,
        recommendation.recommendations.len(),
        recommendation.ai_curated
    );
    Ok(Json(ApiResponse::ok(AiSearchResponse {
        parsed,
        results,
        recommendation,
    })))
}

pub async fn parse_query(
    State(app_state): State<AppState>,
    payload: Result<JsonExtract<NaturalLanguageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let request = body(payload)?;
    tracing::info!("[HANDLER] /api/ai-search/parse - Request received for query: {:?}", request.query);
    let parsed = app_state.parser.parse(&request.query).await?;
    Ok(Json(ApiResponse::ok(parsed)))
}

pub async fn compare_cars(
    State(app_state): State<AppState>,
    payload: Result<JsonExtract<CompareRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let request = body(payload)?;
    tracing::info!(
        "[HANDLER] /api/ai-search/compare - Request received for {} vs {}",
        request.car1_id,
        request.car2_id
    );
    let comparison = app_state
        .comparer
        .compare(app_state.catalog.as_ref(), &request.car1_id, &request.car2_id)
        .await?;
    Ok(Json(ApiResponse::ok(comparison)))
}
