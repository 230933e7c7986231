// Router-level tests: requests go through the full axum stack via oneshot.

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

use carsearch_rust::{
    catalog::InMemoryCatalog,
    config::Settings,
    create_router,
    llm::{DisabledLlmClient, LlmClient},
    AppState,
};

struct CannedLlm(&'static str);

#[async_trait]
impl LlmClient for CannedLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

fn app_with(llm: Arc<dyn LlmClient>) -> Router {
    let catalog = InMemoryCatalog::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog.json"))
        .expect("bundled catalog loads");
    let state = AppState::new(Settings::default(), Arc::new(catalog), llm);
    create_router(state)
}

fn app() -> Router {
    app_with(Arc::new(DisabledLlmClient))
}

async fn get(app: Router, uri: &str) -> Result<(StatusCode, Value)> {
    let response = app
        .oneshot(Request::builder().method("GET").uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

async fn post(app: Router, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
        )
        .await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn hit_ids(results: &Value) -> Vec<String> {
    results["hits"]
        .as_array()
        .map(|hits| hits.iter().filter_map(|h| h["id"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[test]
fn test_state_serves_lookups_from_the_catalog() {
    let catalog = InMemoryCatalog::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog.json"))
        .expect("bundled catalog loads");
    let state = AppState::new(Settings::default(), Arc::new(catalog), Arc::new(DisabledLlmClient));
    assert_eq!(state.catalog.listings().len(), state.engine.len());
    assert_eq!(state.catalog.listing_by_id("creta").map(|l| l.name.as_str()), Some("Creta"));
    assert!(state.catalog.listing_by_id("amaze").is_none());
}

#[tokio::test]
async fn test_health_reports_catalog_size() -> Result<()> {
    let (status, body) = get(app(), "/api/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["listings"], json!(19));
    assert_eq!(body["data"]["llmEnabled"], json!(false));
    Ok(())
}

#[tokio::test]
async fn test_structured_search_filters_and_sorts() -> Result<()> {
    let (status, body) = get(
        app(),
        "/api/cars/search?bodyTypes=sedan&transmissions=DCT&sortBy=price&sortOrder=desc",
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(hit_ids(data), vec!["verna", "slavia"]);
    assert_eq!(data["total"], json!(2));
    assert_eq!(data["totalPages"], json!(1));
    Ok(())
}

#[tokio::test]
async fn test_search_pagination_past_end() -> Result<()> {
    let (status, body) = get(app(), "/api/cars/search?page=5&size=10").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hits"], json!([]));
    assert_eq!(body["data"]["total"], json!(19));
    assert_eq!(body["data"]["totalPages"], json!(2));
    Ok(())
}

#[tokio::test]
async fn test_search_validation_errors_use_envelope() -> Result<()> {
    for uri in [
        "/api/cars/search?priceMin=abc",
        "/api/cars/search?priceMin=2000000&priceMax=100000",
        "/api/cars/search?fuelTypes=steam",
        "/api/cars/search?size=1000",
    ] {
        let (status, body) = get(app(), uri).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
        assert!(body.get("data").is_none());
    }
    Ok(())
}

#[tokio::test]
async fn test_text_search_ranks_by_relevance() -> Result<()> {
    let (_, body) = get(app(), "/api/cars/search?q=nexon").await?;
    let ids = hit_ids(&body["data"]);
    assert_eq!(&ids[..2], ["nexon", "nexon-ev"]);
    Ok(())
}

#[tokio::test]
async fn test_facets_relax_their_own_dimension() -> Result<()> {
    let (status, body) = get(app(), "/api/cars/facets?brands=Hyundai").await?;
    assert_eq!(status, StatusCode::OK);
    let facets = &body["data"];
    // Every active brand is still offered
    assert_eq!(facets["brands"].as_array().map(Vec::len), Some(8));
    assert_eq!(
        facets["bodyTypes"],
        json!([
            {"value": "Hatchback", "count": 1},
            {"value": "SUV", "count": 1},
            {"value": "Sedan", "count": 1}
        ])
    );
    assert_eq!(facets["priceRanges"].as_array().map(Vec::len), Some(5));
    Ok(())
}

#[tokio::test]
async fn test_autocomplete_prefix() -> Result<()> {
    let (status, body) = get(app(), "/api/cars/autocomplete?q=Sw").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!(["Swift", "Swift Dzire"]));

    let (status, _) = get(app(), "/api/cars/autocomplete?q=Sw&limit=many").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_get_car_by_id() -> Result<()> {
    let (status, body) = get(app(), "/api/cars/land-cruiser").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], json!(21_000_000));

    let (status, body) = get(app(), "/api/cars/amaze").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    Ok(())
}

#[tokio::test]
async fn test_ai_search_falls_back_without_llm() -> Result<()> {
    let (status, body) = post(
        app(),
        "/api/ai-search",
        json!({"query": "SUV with sunroof and automatic under 15 lakhs"}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];

    assert_eq!(data["parsed"]["source"], json!("fallback"));
    assert_eq!(
        data["parsed"]["filter"],
        json!({
            "budget": {"min": 0, "max": 1500000},
            "bodyType": ["SUV"],
            "transmission": ["Automatic", "AMT", "CVT", "DCT"],
            "features": ["Sunroof"]
        })
    );
    assert_eq!(data["results"]["total"], json!(7));
    for hit in data["results"]["hits"].as_array().into_iter().flatten() {
        assert_eq!(hit["bodyType"], json!("SUV"));
        assert!(hit["price"].as_u64().is_some_and(|p| p <= 1_500_000));
    }

    let recommendation = &data["recommendation"];
    assert_eq!(recommendation["aiCurated"], json!(false));
    assert_eq!(recommendation["recommendations"].as_array().map(Vec::len), Some(5));
    assert_eq!(recommendation["alternatives"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_ai_search_uses_llm_when_available() -> Result<()> {
    // The same canned reply serves both the parse and the recommendation prompt
    let llm = CannedLlm(
        r#"{"bodyType": ["Sedan"], "transmission": ["DCT"], "sortBy": "price",
            "explanation": "Sedans with a dual clutch gearbox", "confidence": 0.9,
            "recommendations": ["slavia"], "alternatives": ["verna"]}"#,
    );
    let (status, body) = post(
        app_with(Arc::new(llm)),
        "/api/ai-search",
        json!({"query": "cheapest sedan with a DCT", "size": 5}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["parsed"]["source"], json!("ai"));
    assert_eq!(hit_ids(&data["results"]), vec!["slavia", "verna"]);
    assert_eq!(data["results"]["pageSize"], json!(5));
    assert_eq!(data["recommendation"]["aiCurated"], json!(true));
    assert_eq!(data["recommendation"]["recommendations"][0]["id"], json!("slavia"));
    assert_eq!(data["recommendation"]["alternatives"][0]["id"], json!("verna"));
    Ok(())
}

#[tokio::test]
async fn test_ai_search_rejects_bad_queries() -> Result<()> {
    let long_query = "a".repeat(501);
    for body in [json!({"query": "   "}), json!({"query": long_query}), json!({"text": "suv"})] {
        let (status, response) = post(app(), "/api/ai-search/parse", body).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["success"], json!(false));
    }
    Ok(())
}

#[tokio::test]
async fn test_parse_endpoint_returns_filter_only() -> Result<()> {
    let (status, body) = post(app(), "/api/ai-search/parse", json!({"query": "7 seater diesel"})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["filter"], json!({"fuelType": ["Diesel"], "seating": 7}));
    assert_eq!(body["data"]["confidence"], json!(0.6));
    Ok(())
}

#[tokio::test]
async fn test_compare_endpoint() -> Result<()> {
    let (status, body) = post(
        app(),
        "/api/ai-search/compare",
        json!({"car1Id": "creta", "car2Id": "seltos"}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["car1"]["name"], json!("Creta"));
    assert_eq!(body["data"]["car2"]["name"], json!("Seltos"));
    assert_eq!(body["data"]["aiGenerated"], json!(false));
    assert!(body["data"]["highlights"].as_array().is_some_and(|h| !h.is_empty()));

    let (status, _) = post(
        app(),
        "/api/ai-search/compare",
        json!({"car1Id": "creta", "car2Id": "creta"}),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        app(),
        "/api/ai-search/compare",
        json!({"car1Id": "creta", "car2Id": "amaze"}),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
