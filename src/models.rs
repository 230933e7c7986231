// Catalog records, the canonical filter contract, and API request/response shapes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- Catalog records (as stored by the admin console) ---

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub status: Option<String>, // "active" / "inactive"
    pub ranking: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CarModel {
    pub id: String,
    pub name: String,
    pub brand_id: String,
    pub body_type: String,
    pub sub_body_type: Option<String>,
    pub seating_capacity: u32,
    pub starting_price: Option<u64>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_popular: bool,
    pub popular_rank: Option<u32>,
    pub launch_date: Option<NaiveDate>,
    pub description: Option<String>,
    #[serde(default)]
    pub key_features: Vec<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub name: String,
    pub price: u64,
    pub fuel_type: String,
    pub transmission: String,
    pub mileage: Option<f64>,
    #[serde(default)]
    pub key_features: Vec<String>,
}

// Searchable projection of a model, denormalized with its brand
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CarListing {
    pub id: String,
    pub name: String,
    pub brand_id: String,
    pub brand_name: String,
    pub body_type: String,
    pub sub_body_type: Option<String>,
    #[serde(default)]
    pub fuel_types: Vec<String>,
    #[serde(default)]
    pub transmissions: Vec<String>,
    pub seating_capacity: u32,
    // Whole rupees
    #[serde(alias = "startingPrice")]
    pub price: u64,
    // km/l; None means unknown, never zero
    pub mileage: Option<f64>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_popular: bool,
    pub popular_rank: Option<u32>,
    pub launch_date: Option<NaiveDate>,
    pub description: Option<String>,
    #[serde(default)]
    pub key_features: Vec<String>,
}

// --- Canonical filter ---

/// Inclusive price range in whole rupees. `max: None` is unbounded.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    #[serde(default)]
    pub min: u64,
    pub max: Option<u64>,
}

impl Budget {
    /// Returns `None` when the bounds are inverted.
    pub fn new(min: u64, max: Option<u64>) -> Option<Self> {
        match max {
            Some(max) if min > max => None,
            _ => Some(Self { min, max }),
        }
    }

    pub fn contains(&self, price: u64) -> bool {
        price >= self.min && self.max.is_none_or(|max| price <= max)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Price,
    Mileage,
    Popularity,
}

impl SortBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "price" => Some(SortBy::Price),
            "mileage" => Some(SortBy::Mileage),
            "popularity" | "popular" => Some(SortBy::Popularity),
            _ => None,
        }
    }

    // Cheapest first, most efficient first, lowest rank first
    pub fn natural_order(&self) -> SortOrder {
        match self {
            SortBy::Price | SortBy::Popularity => SortOrder::Asc,
            SortBy::Mileage => SortOrder::Desc,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Normalized description of what the user wants. Built once per request
/// by either the structured normalizer or the natural-language parser.
/// Empty vectors mean "no constraint" on that dimension.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fuel_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transmission: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brand: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seating: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_popular: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_query: Option<String>,
}

impl CanonicalFilter {
    /// True when nothing narrows or orders the result set.
    pub fn is_empty(&self) -> bool {
        *self == CanonicalFilter::default()
    }
}

// --- Inbound requests ---

// Structured search parameters, kept as raw strings so bad numbers become
// validation errors with a readable message instead of extractor rejections.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub q: Option<String>,
    pub brands: Option<String>,
    pub body_types: Option<String>,
    pub fuel_types: Option<String>,
    pub transmissions: Option<String>,
    pub features: Option<String>,
    pub price_min: Option<String>,
    pub price_max: Option<String>,
    pub seating: Option<String>,
    pub is_new: Option<String>,
    pub is_popular: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NaturalLanguageRequest {
    pub query: String,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub car1_id: String,
    pub car2_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AutocompleteParams {
    pub q: Option<String>,
    pub limit: Option<String>,
}

// --- Outbound responses ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub hits: Vec<CarListing>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FacetBucket {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriceBucket {
    pub label: String,
    pub min: u64,
    pub max: Option<u64>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    pub brands: Vec<FacetBucket>,
    pub body_types: Vec<FacetBucket>,
    pub fuel_types: Vec<FacetBucket>,
    pub transmissions: Vec<FacetBucket>,
    pub price_ranges: Vec<PriceBucket>,
    pub seating: Vec<FacetBucket>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParseSource {
    Ai,
    Fallback,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    pub filter: CanonicalFilter,
    pub explanation: String,
    pub confidence: f32,
    pub suggestions: Vec<String>,
    pub source: ParseSource,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub recommendations: Vec<CarListing>,
    pub alternatives: Vec<CarListing>,
    pub explanation: String,
    pub ai_curated: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub car1: CarListing,
    pub car2: CarListing,
    pub summary: String,
    pub highlights: Vec<String>,
    pub ai_generated: bool,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AiSearchResponse {
    pub parsed: ParsedQuery,
    pub results: SearchResults,
    pub recommendation: Recommendation,
}

// Envelope wrapping every API response
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
