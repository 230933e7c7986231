//! Natural-language query parsing.
//!
//! Free text becomes a [`CanonicalFilter`] through an LLM prompt when one is
//! available. Any LLM failure (error, timeout, unparseable output) degrades
//! to a deterministic keyword scan; callers always get a result.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::{sync::Arc, time::Duration};

use crate::error::{AppError, AppResult};
use crate::lexicon::{self, normalize_text};
use crate::llm::{complete_with_timeout, extract_json, LlmClient};
use crate::models::{Budget, CanonicalFilter, ParseSource, ParsedQuery, SortBy};

pub const MAX_QUERY_CHARS: usize = 500;
/// Confidence reported by the keyword fallback, signalling reduced trust.
pub const FALLBACK_CONFIDENCE: f32 = 0.6;
const DEFAULT_AI_CONFIDENCE: f32 = 0.85;
const MAX_SUGGESTIONS: usize = 3;

const LAKH: f64 = 100_000.0;
const CRORE: f64 = 10_000_000.0;

static RANGE_BETWEEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"between\s+(?:rs\.?\s*|₹\s*)?(\d+(?:\.\d+)?)\s*(?:lakhs?|lacs?)?\s*(?:and|to|-)\s*(?:rs\.?\s*|₹\s*)?(\d+(?:\.\d+)?)\s*(lakhs?|lacs?|crores?|cr)\b")
        .expect("Invalid between-range pattern")
});

static RANGE_DASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:rs\.?\s*|₹\s*)?(\d+(?:\.\d+)?)\s*(?:lakhs?|lacs?)?\s*(?:-|to)\s*(?:rs\.?\s*|₹\s*)?(\d+(?:\.\d+)?)\s*(lakhs?|lacs?|crores?|cr)\b")
        .expect("Invalid dash-range pattern")
});

static LOWER_BOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:above|over|more than|at least|minimum|starting from|starting at)\s+(?:rs\.?\s*|₹\s*)?(\d+(?:\.\d+)?)\s*(lakhs?|lacs?|crores?|cr)\b")
        .expect("Invalid lower-bound pattern")
});

static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:rs\.?\s*|₹\s*)?(\d+(?:\.\d+)?)\s*(lakhs?|lacs?|crores?|cr)\b").expect("Invalid amount pattern")
});

static SEATING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2}|four|five|six|seven|eight|nine)\s*(?:seater|seaters|seats?|people|persons|passengers)\b")
        .expect("Invalid seating pattern")
});

const SORT_INTENTS: &[(SortBy, &[&str])] = &[
    (SortBy::Price, &["cheapest", "cheap", "affordable", "lowest price", "low price", "budget friendly", "inexpensive"]),
    (SortBy::Mileage, &["mileage", "fuel efficient", "efficient", "economical", "fuel economy"]),
    (SortBy::Popularity, &["popular", "best selling", "bestselling", "top selling", "trending"]),
];

const NEW_LAUNCH_PHRASES: &[&str] = &["latest", "new launch", "newly launched", "recently launched", "new arrival"];

/// Converts free text into a canonical filter, preferring the LLM.
#[derive(Clone)]
pub struct NaturalLanguageParser {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
    brands: Vec<String>,
}

impl NaturalLanguageParser {
    /// `brands` is the catalog's brand vocabulary, used for brand detection.
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration, brands: Vec<String>) -> Self {
        Self { llm, timeout, brands }
    }

    pub async fn parse(&self, query: &str) -> AppResult<ParsedQuery> {
        let query = validate_query(query)?;
        let prompt = build_prompt(query, &self.brands);

        match complete_with_timeout(self.llm.as_ref(), &prompt, self.timeout).await {
            Ok(raw) => match parse_llm_response(&raw, &self.brands) {
                Some(parsed) => {
                    tracing::info!(confidence = parsed.confidence, "Parsed query with LLM");
                    return Ok(parsed);
                }
                None => {
                    tracing::warn!("LLM returned unparseable filter, using keyword fallback. Raw: {}", raw);
                }
            },
            Err(e) => {
                tracing::warn!("LLM query parsing failed, using keyword fallback: {:#}", e);
            }
        }

        Ok(fallback_parse(query, &self.brands))
    }
}

/// Trims and bounds the query: empty and over-long input are validation errors.
pub fn validate_query(query: &str) -> AppResult<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Query must not be empty"));
    }
    if trimmed.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::validation(format!(
            "Query must be at most {} characters",
            MAX_QUERY_CHARS
        )));
    }
    Ok(trimmed)
}

fn build_prompt(query: &str, brands: &[String]) -> String {
    let names = |terms: &[lexicon::Term]| terms.iter().map(|t| t.canonical).collect::<Vec<_>>().join(", ");
    let brand_list = brands.iter().take(50).cloned().collect::<Vec<_>>().join(", ");
    format!(
        "You convert car shopping requests into a JSON search filter for the Indian market.\n\
         Respond with ONLY a JSON object using these optional keys:\n\
         \"budget\": {{\"min\": number, \"max\": number}} in whole rupees. Convert \"X lakh\" to X * 100000 \
         and \"X crore\" to X * 10000000. Use min 0 unless a lower bound is stated.\n\
         \"bodyType\": array from [{body}]\n\
         \"fuelType\": array from [{fuel}]\n\
         \"transmission\": array from [{transmission}]. Keep AMT, CVT, DCT and iMT distinct. \
         Use only \"Automatic\" when the user just says automatic.\n\
         \"brand\": array from [{brand_list}]\n\
         \"seating\": minimum number of seats\n\
         \"features\": array from [{features}]\n\
         \"sortBy\": one of \"price\", \"mileage\", \"popularity\"\n\
         \"isNew\": true only for newly launched cars\n\
         \"isPopular\": true only when the user asks for popular or best-selling models\n\
         \"textQuery\": model or name words not covered by other keys, e.g. \"Creta\"\n\
         \"explanation\": one sentence describing the filter\n\
         \"confidence\": number between 0 and 1\n\
         \"suggestions\": up to 3 short follow-up refinements\n\n\
         Request: \"{query}\"",
        body = names(lexicon::BODY_TYPES),
        fuel = names(lexicon::FUEL_TYPES),
        transmission = names(lexicon::TRANSMISSIONS),
        features = names(lexicon::FEATURES),
    )
}

// --- LLM response validation ---

/// Parses the LLM's JSON object field by field. Invalid fields are dropped,
/// not the whole response. Returns `None` only when there is no JSON object.
fn parse_llm_response(raw: &str, brands: &[String]) -> Option<ParsedQuery> {
    let value: Value = serde_json::from_str(extract_json(raw)).ok()?;
    let object = value.as_object()?;

    let mut filter = CanonicalFilter {
        budget: object.get("budget").and_then(parse_budget),
        body_type: string_list(object, "bodyType")
            .into_iter()
            .map(|t| lexicon::canonical_body_type(&t).map(str::to_string).unwrap_or(t))
            .collect(),
        fuel_type: string_list(object, "fuelType")
            .into_iter()
            .map(|t| lexicon::canonical_fuel_type(&t).map(str::to_string).unwrap_or(t))
            .collect(),
        ..Default::default()
    };
    dedup_ignore_case(&mut filter.body_type);
    dedup_ignore_case(&mut filter.fuel_type);

    let transmissions: Vec<String> = string_list(object, "transmission")
        .into_iter()
        .filter_map(|t| match lexicon::canonical_transmission(&t) {
            Some(canonical) => Some(canonical.to_string()),
            None => {
                tracing::warn!("Dropping unknown transmission '{}' from LLM filter", t);
                None
            }
        })
        .collect();
    filter.transmission = lexicon::resolve_transmissions(&transmissions);

    filter.brand = string_list(object, "brand")
        .into_iter()
        .map(|b| canonical_brand(&b, brands).unwrap_or(b))
        .collect();
    dedup_ignore_case(&mut filter.brand);

    filter.seating = object
        .get("seating")
        .and_then(as_u64)
        .filter(|s| (1..=12).contains(s))
        .map(|s| s as u32);

    filter.features = string_list(object, "features")
        .into_iter()
        .map(|f| canonical_feature(&f).map(str::to_string).unwrap_or(f))
        .collect();
    dedup_ignore_case(&mut filter.features);

    filter.sort_by = object.get("sortBy").and_then(Value::as_str).and_then(SortBy::parse);
    filter.is_new = object.get("isNew").and_then(Value::as_bool).filter(|v| *v);
    filter.is_popular = object.get("isPopular").and_then(Value::as_bool).filter(|v| *v);
    filter.text_query = object
        .get("textQuery")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty() && t.chars().count() <= MAX_QUERY_CHARS)
        .map(str::to_string);

    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0) as f32)
        .unwrap_or(DEFAULT_AI_CONFIDENCE);

    let explanation = object
        .get("explanation")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| describe_filter(&filter));

    let mut suggestions = string_list(object, "suggestions");
    suggestions.truncate(MAX_SUGGESTIONS);

    Some(ParsedQuery {
        filter,
        explanation,
        confidence,
        suggestions,
        source: ParseSource::Ai,
    })
}

// Accepts numbers, numeric strings and whole-valued floats
fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f.round() as u64),
        _ => None,
    }
}

fn parse_budget(value: &Value) -> Option<Budget> {
    let object = value.as_object()?;
    let min = object.get("min").and_then(as_u64);
    let max = object.get("max").and_then(as_u64);
    if min.is_none() && max.is_none() {
        return None;
    }
    let budget = Budget::new(min.unwrap_or(0), max);
    if budget.is_none() {
        tracing::warn!(?min, ?max, "Dropping inverted budget from LLM filter");
    }
    budget
}

// An array of strings, or a single comma-separated string
fn string_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    let items: Vec<String> = match object.get(key) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn dedup_ignore_case(values: &mut Vec<String>) {
    let mut seen: Vec<String> = Vec::new();
    values.retain(|v| {
        let lower = v.to_lowercase();
        if seen.contains(&lower) {
            false
        } else {
            seen.push(lower);
            true
        }
    });
}

fn canonical_brand(name: &str, brands: &[String]) -> Option<String> {
    brands.iter().find(|b| b.eq_ignore_ascii_case(name.trim())).cloned()
}

fn canonical_feature(name: &str) -> Option<&'static str> {
    let normalized = normalize_text(name);
    lexicon::FEATURES
        .iter()
        .find(|term| term.canonical.eq_ignore_ascii_case(name.trim()) || term.phrases.contains(&normalized.as_str()))
        .map(|term| term.canonical)
}

// --- Keyword fallback ---

/// Deterministic keyword scan. Never fails; unmatched input yields an empty
/// (match-everything) filter.
pub fn fallback_parse(query: &str, brands: &[String]) -> ParsedQuery {
    let lowered = query.to_lowercase();
    let mut text = format!(" {} ", normalize_text(query));

    let mut filter = CanonicalFilter {
        budget: extract_budget(&lowered),
        ..Default::default()
    };

    // Features go first so phrases like "android auto" don't read as transmissions
    for term in lexicon::FEATURES {
        if take_any_phrase(&mut text, term.phrases) {
            filter.features.push(term.canonical.to_string());
        }
    }
    for term in lexicon::BODY_TYPES {
        if take_any_phrase(&mut text, term.phrases) {
            filter.body_type.push(term.canonical.to_string());
        }
    }
    for term in lexicon::FUEL_TYPES {
        if take_any_phrase(&mut text, term.phrases) {
            filter.fuel_type.push(term.canonical.to_string());
        }
    }
    let mut transmissions = Vec::new();
    for term in lexicon::TRANSMISSIONS {
        if take_any_phrase(&mut text, term.phrases) {
            transmissions.push(term.canonical.to_string());
        }
    }
    filter.transmission = lexicon::resolve_transmissions(&transmissions);

    for brand in brands {
        let normalized = normalize_text(brand);
        let first_word = normalized.split(' ').next().unwrap_or_default();
        let matched = lexicon::contains_phrase(text.trim(), &normalized)
            || (first_word.len() >= 3 && lexicon::contains_phrase(text.trim(), first_word));
        if matched && !filter.brand.iter().any(|b| b.eq_ignore_ascii_case(brand)) {
            filter.brand.push(brand.clone());
        }
    }

    filter.seating = extract_seating(text.trim());

    let scan = text.trim().to_string();
    filter.sort_by = SORT_INTENTS
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| lexicon::contains_phrase(&scan, p)))
        .map(|(sort_by, _)| *sort_by);
    if NEW_LAUNCH_PHRASES.iter().any(|p| lexicon::contains_phrase(&scan, p)) {
        filter.is_new = Some(true);
    }

    let explanation = describe_filter(&filter);
    let suggestions = suggest_refinements(&filter);
    tracing::debug!(?filter, "Keyword fallback produced filter");

    ParsedQuery {
        filter,
        explanation,
        confidence: FALLBACK_CONFIDENCE,
        suggestions,
        source: ParseSource::Fallback,
    }
}

// Removes every occurrence of the first matching phrase from the padded text
fn take_any_phrase(text: &mut String, phrases: &[&str]) -> bool {
    let mut found = false;
    for phrase in phrases {
        let needle = format!(" {} ", phrase);
        while text.contains(&needle) {
            *text = text.replacen(&needle, " ", 1);
            found = true;
        }
    }
    found
}

fn to_rupees(amount: &str, unit: &str) -> Option<u64> {
    let value: f64 = amount.parse().ok()?;
    let multiplier = if unit.starts_with("cr") { CRORE } else { LAKH };
    Some((value * multiplier).round() as u64)
}

fn extract_budget(lowered: &str) -> Option<Budget> {
    for pattern in [&*RANGE_BETWEEN, &*RANGE_DASH] {
        if let Some(caps) = pattern.captures(lowered) {
            let unit = caps.get(3)?.as_str();
            let min = to_rupees(caps.get(1)?.as_str(), unit)?;
            let max = to_rupees(caps.get(2)?.as_str(), unit)?;
            return Budget::new(min, Some(max));
        }
    }

    let lower = LOWER_BOUND.captures(lowered);
    let min = lower
        .as_ref()
        .and_then(|caps| to_rupees(caps.get(1)?.as_str(), caps.get(2)?.as_str()));
    let lower_span = lower.as_ref().and_then(|caps| caps.get(0)).map(|m| m.range());

    // Any other amount is read as the ceiling
    let max = AMOUNT
        .captures_iter(lowered)
        .filter(|caps| {
            let Some(whole) = caps.get(0) else { return false };
            lower_span
                .as_ref()
                .is_none_or(|span| whole.end() <= span.start || whole.start() >= span.end)
        })
        .find_map(|caps| to_rupees(caps.get(1)?.as_str(), caps.get(2)?.as_str()));

    match (min, max) {
        (None, None) => None,
        (min, max) => Budget::new(min.unwrap_or(0), max),
    }
}

fn extract_seating(normalized: &str) -> Option<u32> {
    let caps = SEATING.captures(normalized)?;
    let seats = match caps.get(1)?.as_str() {
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        digits => digits.parse().ok()?,
    };
    (1..=12).contains(&seats).then_some(seats)
}

/// Rupees as "₹X lakh" with at most one decimal.
pub(crate) fn format_lakh(amount: u64) -> String {
    let lakhs = amount as f64 / LAKH;
    if lakhs.fract() == 0.0 {
        format!("₹{} lakh", lakhs as u64)
    } else {
        format!("₹{:.1} lakh", lakhs)
    }
}

/// One-line, human-readable summary of a filter.
pub fn describe_filter(filter: &CanonicalFilter) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !filter.body_type.is_empty() {
        parts.push(filter.body_type.join(" or "));
    }
    if !filter.brand.is_empty() {
        parts.push(format!("from {}", filter.brand.join(" or ")));
    }
    if !filter.fuel_type.is_empty() {
        parts.push(format!("{} fuel", filter.fuel_type.join("/")));
    }
    if !filter.transmission.is_empty() {
        parts.push(format!("{} transmission", filter.transmission.join("/")));
    }
    if let Some(seating) = filter.seating {
        parts.push(format!("at least {} seats", seating));
    }
    if !filter.features.is_empty() {
        parts.push(format!("with {}", filter.features.join(", ")));
    }
    if let Some(budget) = &filter.budget {
        let range = match (budget.min, budget.max) {
            (0, Some(max)) => format!("under {}", format_lakh(max)),
            (min, Some(max)) => format!("between {} and {}", format_lakh(min), format_lakh(max)),
            (min, None) => format!("above {}", format_lakh(min)),
        };
        parts.push(range);
    }
    if filter.is_new == Some(true) {
        parts.push("newly launched".to_string());
    }
    if let Some(sort_by) = filter.sort_by {
        let label = match sort_by {
            SortBy::Price => "lowest price first",
            SortBy::Mileage => "best mileage first",
            SortBy::Popularity => "most popular first",
        };
        parts.push(label.to_string());
    }

    if parts.is_empty() {
        "No specific preferences detected; showing all cars.".to_string()
    } else {
        format!("Looking for {}.", parts.join(", "))
    }
}

fn suggest_refinements(filter: &CanonicalFilter) -> Vec<String> {
    let mut suggestions = Vec::new();
    if filter.budget.is_none() {
        suggestions.push("Add a budget, e.g. \"under 10 lakhs\"".to_string());
    }
    if filter.body_type.is_empty() {
        suggestions.push("Mention a body type such as SUV, sedan or hatchback".to_string());
    }
    if filter.fuel_type.is_empty() {
        suggestions.push("Specify a fuel type like petrol, diesel or electric".to_string());
    }
    if filter.transmission.is_empty() {
        suggestions.push("Say whether you prefer a manual or an automatic".to_string());
    }
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            anyhow::bail!("quota exceeded")
        }
    }

    struct CannedLlm {
        response: String,
        calls: AtomicUsize,
    }

    impl CannedLlm {
        fn new(response: &str) -> Self {
            Self { response: response.to_string(), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn parser(llm: Arc<dyn LlmClient>) -> NaturalLanguageParser {
        NaturalLanguageParser::new(llm, Duration::from_secs(2), strings(&["Maruti Suzuki", "Hyundai", "Tata"]))
    }

    #[test]
    fn test_fallback_suv_sunroof_automatic_scenario() {
        let parsed = fallback_parse("SUV with sunroof and automatic under 15 lakhs", &[]);
        assert_eq!(
            parsed.filter,
            CanonicalFilter {
                budget: Some(Budget { min: 0, max: Some(1_500_000) }),
                body_type: strings(&["SUV"]),
                transmission: strings(&["Automatic", "AMT", "CVT", "DCT"]),
                features: strings(&["Sunroof"]),
                ..Default::default()
            }
        );
        assert_eq!(parsed.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(parsed.source, ParseSource::Fallback);
    }

    #[test]
    fn test_fallback_specific_transmission_wins() {
        let parsed = fallback_parse("automatic sedan with DCT gearbox", &[]);
        assert_eq!(parsed.filter.transmission, strings(&["DCT"]));
        assert_eq!(parsed.filter.body_type, strings(&["Sedan"]));
    }

    #[test]
    fn test_fallback_budget_ranges() {
        let between = fallback_parse("between 8 and 12 lakh", &[]);
        assert_eq!(between.filter.budget, Some(Budget { min: 800_000, max: Some(1_200_000) }));

        let dash = fallback_parse("hatchback 5-7.5 lakhs", &[]);
        assert_eq!(dash.filter.budget, Some(Budget { min: 500_000, max: Some(750_000) }));

        let above = fallback_parse("diesel SUV above 20 lakh", &[]);
        assert_eq!(above.filter.budget, Some(Budget { min: 2_000_000, max: None }));

        let both = fallback_parse("over 10 lakh but under 1.2 crore", &[]);
        assert_eq!(both.filter.budget, Some(Budget { min: 1_000_000, max: Some(12_000_000) }));

        let inverted = fallback_parse("between 20 and 10 lakh", &[]);
        assert_eq!(inverted.filter.budget, None);
    }

    #[test]
    fn test_fallback_seating_sort_and_brand() {
        let parsed = fallback_parse("cheapest 7 seater Tata with good mileage", &strings(&["Tata", "Maruti Suzuki"]));
        assert_eq!(parsed.filter.seating, Some(7));
        assert_eq!(parsed.filter.sort_by, Some(SortBy::Price));
        assert_eq!(parsed.filter.brand, strings(&["Tata"]));

        let maruti = fallback_parse("seven seater maruti", &strings(&["Maruti Suzuki"]));
        assert_eq!(maruti.filter.seating, Some(7));
        assert_eq!(maruti.filter.brand, strings(&["Maruti Suzuki"]));
    }

    #[test]
    fn test_fallback_feature_phrases_do_not_leak() {
        let parsed = fallback_parse("panoramic sunroof and android auto, manual", &[]);
        assert_eq!(parsed.filter.features, strings(&["Panoramic Sunroof", "Android Auto"]));
        assert_eq!(parsed.filter.transmission, strings(&["Manual"]));
    }

    #[test]
    fn test_fallback_auto_feature_phrases_leave_transmission_open() {
        let parsed = fallback_parse("SUV with auto climate control", &[]);
        assert_eq!(parsed.filter.features, strings(&["Climate Control"]));
        assert_eq!(parsed.filter.body_type, strings(&["SUV"]));
        assert!(parsed.filter.transmission.is_empty());

        let parsed = fallback_parse("automatic climate control and auto headlamps", &[]);
        assert_eq!(parsed.filter.features, strings(&["Climate Control", "Auto Headlamps"]));
        assert!(parsed.filter.transmission.is_empty());

        // A bare "auto" still asks for the automatic family
        let parsed = fallback_parse("auto hatchback with auto ac", &[]);
        assert_eq!(parsed.filter.features, strings(&["Climate Control"]));
        assert_eq!(parsed.filter.transmission, strings(&["Automatic", "AMT", "CVT", "DCT"]));
    }

    #[test]
    fn test_fallback_synonyms_and_new_launches() {
        let parsed = fallback_parse("latest sport utility vehicle, EV please", &[]);
        assert_eq!(parsed.filter.body_type, strings(&["SUV"]));
        assert_eq!(parsed.filter.fuel_type, strings(&["Electric"]));
        assert_eq!(parsed.filter.is_new, Some(true));
    }

    #[test]
    fn test_fallback_handles_odd_input() {
        for input in ["", "   ", "🚗🚙💨", "!!!???", &"lakh ".repeat(400), "99999999999999999999 lakh"] {
            let parsed = fallback_parse(input, &[]);
            assert_eq!(parsed.confidence, FALLBACK_CONFIDENCE);
        }
        assert!(fallback_parse("🚗🚙💨", &[]).filter.is_empty());
    }

    #[test]
    fn test_validate_query_bounds() {
        assert!(matches!(validate_query("   "), Err(AppError::Validation(_))));
        assert!(matches!(validate_query(&"a".repeat(501)), Err(AppError::Validation(_))));
        assert_eq!(validate_query("  suv  ").unwrap(), "suv");
        assert!(validate_query(&"é".repeat(500)).is_ok());
    }

    #[tokio::test]
    async fn test_parse_falls_back_when_llm_fails() {
        let parsed = parser(Arc::new(FailingLlm)).parse("SUV with sunroof and automatic under 15 lakhs").await.unwrap();
        assert_eq!(parsed.source, ParseSource::Fallback);
        assert_eq!(parsed.filter.budget, Some(Budget { min: 0, max: Some(1_500_000) }));
    }

    #[tokio::test]
    async fn test_parse_rejects_empty_before_calling_llm() {
        let llm = Arc::new(CannedLlm::new("{}"));
        let result = parser(llm.clone()).parse("  ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_parse_uses_llm_json() {
        let llm = Arc::new(CannedLlm::new(
            "```json\n{\"budget\": {\"min\": 0, \"max\": 1500000}, \"bodyType\": [\"suv\"], \
             \"transmission\": [\"DCT\"], \"brand\": [\"hyundai\"], \"features\": [\"sunroof\"], \
             \"sortBy\": \"price\", \"explanation\": \"Hyundai SUVs with DCT\", \"confidence\": 0.92, \
             \"suggestions\": [\"Add a fuel type\"]}\n```",
        ));
        let parsed = parser(llm).parse("hyundai dct suv").await.unwrap();
        assert_eq!(parsed.source, ParseSource::Ai);
        assert_eq!(parsed.filter.budget, Some(Budget { min: 0, max: Some(1_500_000) }));
        assert_eq!(parsed.filter.body_type, strings(&["SUV"]));
        assert_eq!(parsed.filter.transmission, strings(&["DCT"]));
        assert_eq!(parsed.filter.brand, strings(&["Hyundai"]));
        assert_eq!(parsed.filter.features, strings(&["Sunroof"]));
        assert_eq!(parsed.filter.sort_by, Some(SortBy::Price));
        assert_eq!(parsed.explanation, "Hyundai SUVs with DCT");
        assert!((parsed.confidence - 0.92).abs() < 1e-6);
        assert_eq!(parsed.suggestions, strings(&["Add a fuel type"]));
    }

    #[tokio::test]
    async fn test_parse_drops_invalid_fields_only() {
        let llm = Arc::new(CannedLlm::new(
            r#"{"budget": {"min": 2000000, "max": 1000000}, "transmission": ["Automatic", "Hover"],
                "seating": "seven", "fuelType": "Diesel, CNG", "confidence": 7}"#,
        ));
        let parsed = parser(llm).parse("diesel automatic").await.unwrap();
        assert_eq!(parsed.source, ParseSource::Ai);
        assert_eq!(parsed.filter.budget, None);
        assert_eq!(parsed.filter.seating, None);
        assert_eq!(parsed.filter.transmission, strings(&["Automatic", "AMT", "CVT", "DCT"]));
        assert_eq!(parsed.filter.fuel_type, strings(&["Diesel", "CNG"]));
        assert_eq!(parsed.confidence, 1.0);
        assert!(parsed.explanation.starts_with("Looking for"));
    }

    #[tokio::test]
    async fn test_parse_keeps_llm_text_query_and_popularity() {
        let llm = Arc::new(CannedLlm::new(
            r#"{"textQuery": " Creta ", "features": ["Sunroof"], "isPopular": true}"#,
        ));
        let parsed = parser(llm).parse("creta with sunroof").await.unwrap();
        assert_eq!(parsed.source, ParseSource::Ai);
        assert_eq!(parsed.filter.text_query.as_deref(), Some("Creta"));
        assert_eq!(parsed.filter.features, strings(&["Sunroof"]));
        assert_eq!(parsed.filter.is_popular, Some(true));
    }

    #[tokio::test]
    async fn test_parse_drops_blank_or_oversized_text_query() {
        let blank = parser(Arc::new(CannedLlm::new(r#"{"textQuery": "   ", "bodyType": ["SUV"]}"#)))
            .parse("suv")
            .await
            .unwrap();
        assert_eq!(blank.filter.text_query, None);
        assert_eq!(blank.filter.body_type, strings(&["SUV"]));

        let reply = format!(r#"{{"textQuery": "{}"}}"#, "x".repeat(MAX_QUERY_CHARS + 1));
        let oversized = parser(Arc::new(CannedLlm::new(&reply))).parse("anything").await.unwrap();
        assert_eq!(oversized.source, ParseSource::Ai);
        assert_eq!(oversized.filter.text_query, None);
    }

    #[test]
    fn test_prompt_lists_every_filter_key() {
        let prompt = build_prompt("creta", &strings(&["Hyundai"]));
        for key in ["budget", "bodyType", "fuelType", "transmission", "brand", "seating", "features", "sortBy", "isNew", "isPopular", "textQuery"] {
            assert!(prompt.contains(&format!("\"{}\"", key)), "{key} missing from prompt");
        }
        assert!(prompt.contains("Request: \"creta\""));
    }

    #[tokio::test]
    async fn test_parse_falls_back_on_garbage() {
        let llm = Arc::new(CannedLlm::new("I'm sorry, I can't help with that."));
        let parsed = parser(llm).parse("cheap hatchback").await.unwrap();
        assert_eq!(parsed.source, ParseSource::Fallback);
        assert_eq!(parsed.filter.body_type, strings(&["Hatchback"]));
        assert_eq!(parsed.filter.sort_by, Some(SortBy::Price));
    }

    #[test]
    fn test_describe_filter() {
        let filter = CanonicalFilter {
            budget: Some(Budget { min: 0, max: Some(1_250_000) }),
            body_type: strings(&["SUV"]),
            ..Default::default()
        };
        assert_eq!(describe_filter(&filter), "Looking for SUV, under ₹12.5 lakh.");
        assert_eq!(
            describe_filter(&CanonicalFilter::default()),
            "No specific preferences detected; showing all cars."
        );
    }
}
