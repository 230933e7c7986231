// Car catalog search service: structured and natural-language search,
// facets, autocomplete, recommendations and comparisons over an in-memory catalog.

use axum::extract::FromRef;
use std::{sync::Arc, time::Duration};

pub mod cache;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod llm;
pub mod models;
pub mod nl_parser;
pub mod normalizer;
pub mod recommend;
pub mod routes;
pub mod search;

use crate::{
    cache::SearchCache,
    catalog::CatalogStore,
    compare::Comparer,
    config::Settings,
    llm::LlmClient,
    nl_parser::NaturalLanguageParser,
    normalizer::QueryNormalizer,
    recommend::Recommender,
    search::SearchEngine,
};

pub use routes::create_router;

// Shared, read-only per request. Everything is behind Arc so cloning per handler is cheap.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub catalog: Arc<dyn CatalogStore>,
    pub engine: Arc<SearchEngine>,
    pub normalizer: Arc<QueryNormalizer>,
    pub parser: Arc<NaturalLanguageParser>,
    pub recommender: Arc<Recommender>,
    pub comparer: Arc<Comparer>,
    pub cache: SearchCache,
}

impl AppState {
    /// Builds the index and every service from a loaded catalog.
    /// The LLM client is injected so tests can swap in canned responses.
    pub fn new(settings: Settings, catalog: Arc<dyn CatalogStore>, llm: Arc<dyn LlmClient>) -> Self {
        let engine = SearchEngine::from_catalog(catalog.as_ref());
        let timeout = Duration::from_secs(settings.llm.timeout_secs.max(1));

        let mut brands: Vec<String> = Vec::new();
        for listing in catalog.listings() {
            if !brands.iter().any(|b| b.eq_ignore_ascii_case(&listing.brand_name)) {
                brands.push(listing.brand_name.clone());
            }
        }

        Self {
            normalizer: Arc::new(QueryNormalizer::new(&settings.search, catalog.listings())),
            parser: Arc::new(NaturalLanguageParser::new(llm.clone(), timeout, brands)),
            recommender: Arc::new(Recommender::new(llm.clone(), timeout)),
            comparer: Arc::new(Comparer::new(llm, timeout)),
            cache: SearchCache::from_settings(&settings.search),
            engine: Arc::new(engine),
            catalog,
            settings: Arc::new(settings),
        }
    }
}
