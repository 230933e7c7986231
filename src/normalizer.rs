// Structured query-string parameters -> CanonicalFilter plus paging.

use crate::config::SearchSettings;
use crate::error::{AppError, AppResult};
use crate::lexicon;
use crate::models::{Budget, CanonicalFilter, CarListing, SearchParams, SortBy, SortOrder};
use crate::nl_parser::MAX_QUERY_CHARS;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSearch {
    pub filter: CanonicalFilter,
    pub page: u32,
    pub page_size: u32,
}

/// Builds canonical filters from explicit facet parameters.
///
/// Body and fuel types are checked against the lexicon plus every value seen
/// in the catalog. Unknown tokens are dropped with a warning; a field whose
/// tokens are all unknown is rejected.
#[derive(Debug, Clone)]
pub struct QueryNormalizer {
    body_types: Vec<String>,
    fuel_types: Vec<String>,
    transmissions: Vec<String>,
    default_page_size: u32,
    max_page_size: u32,
}

impl QueryNormalizer {
    pub fn new(settings: &SearchSettings, listings: &[CarListing]) -> Self {
        let mut body_types = canonical_names(lexicon::BODY_TYPES);
        let mut fuel_types = canonical_names(lexicon::FUEL_TYPES);
        let mut transmissions = canonical_names(lexicon::TRANSMISSIONS);
        for listing in listings {
            push_new(&mut body_types, &listing.body_type);
            if let Some(sub) = &listing.sub_body_type {
                push_new(&mut body_types, sub);
            }
            for fuel in &listing.fuel_types {
                push_new(&mut fuel_types, fuel);
            }
            for transmission in &listing.transmissions {
                push_new(&mut transmissions, transmission);
            }
        }

        Self {
            body_types,
            fuel_types,
            transmissions,
            default_page_size: settings.default_page_size,
            max_page_size: settings.max_page_size,
        }
    }

    pub fn normalize(&self, params: &SearchParams) -> AppResult<NormalizedSearch> {
        let mut filter = CanonicalFilter {
            body_type: resolve_tokens("bodyTypes", params.body_types.as_deref(), &self.body_types, lexicon::canonical_body_type)?,
            fuel_type: resolve_tokens("fuelTypes", params.fuel_types.as_deref(), &self.fuel_types, lexicon::canonical_fuel_type)?,
            transmission: resolve_tokens(
                "transmissions",
                params.transmissions.as_deref(),
                &self.transmissions,
                lexicon::canonical_transmission,
            )?,
            brand: split_list(params.brands.as_deref()),
            features: split_list(params.features.as_deref())
                .into_iter()
                .map(|f| canonical_feature(&f).map(str::to_string).unwrap_or(f))
                .collect(),
            ..Default::default()
        };
        dedup_ignore_case(&mut filter.brand);
        dedup_ignore_case(&mut filter.features);

        let min = parse_number::<u64>("priceMin", params.price_min.as_deref())?;
        let max = parse_number::<u64>("priceMax", params.price_max.as_deref())?;
        if min.is_some() || max.is_some() {
            let budget = Budget::new(min.unwrap_or(0), max).ok_or_else(|| {
                AppError::validation("priceMin must not be greater than priceMax")
            })?;
            filter.budget = Some(budget);
        }

        filter.seating = parse_number::<u32>("seating", params.seating.as_deref())?;
        if filter.seating == Some(0) {
            return Err(AppError::validation("seating must be a positive integer"));
        }

        filter.is_new = parse_flag("isNew", params.is_new.as_deref())?;
        filter.is_popular = parse_flag("isPopular", params.is_popular.as_deref())?;

        filter.sort_by = match present(params.sort_by.as_deref()) {
            None => None,
            Some(value) if value.eq_ignore_ascii_case("relevance") => None,
            Some(value) => Some(SortBy::parse(value).ok_or_else(|| {
                AppError::validation(format!(
                    "Unknown sortBy '{}'; expected price, mileage, popularity or relevance",
                    value
                ))
            })?),
        };
        // A direction without a field has nothing to order
        if filter.sort_by.is_some() {
            filter.sort_order = match present(params.sort_order.as_deref()) {
                None => None,
                Some(value) => Some(match value.to_lowercase().as_str() {
                    "asc" => SortOrder::Asc,
                    "desc" => SortOrder::Desc,
                    _ => {
                        return Err(AppError::validation(format!(
                            "Unknown sortOrder '{}'; expected asc or desc",
                            value
                        )));
                    }
                }),
            };
        }

        if let Some(q) = present(params.q.as_deref()) {
            if q.chars().count() > MAX_QUERY_CHARS {
                return Err(AppError::validation(format!(
                    "q must be at most {} characters",
                    MAX_QUERY_CHARS
                )));
            }
            filter.text_query = Some(q.to_string());
        }

        let page = parse_number::<u32>("page", params.page.as_deref())?.unwrap_or(1);
        if page == 0 {
            return Err(AppError::validation("page must be 1 or greater"));
        }
        let page_size = parse_number::<u32>("size", params.size.as_deref())?.unwrap_or(self.default_page_size);
        if page_size == 0 || page_size > self.max_page_size {
            return Err(AppError::validation(format!(
                "size must be between 1 and {}",
                self.max_page_size
            )));
        }

        Ok(NormalizedSearch { filter, page, page_size })
    }
}

fn canonical_names(terms: &[lexicon::Term]) -> Vec<String> {
    terms.iter().map(|t| t.canonical.to_string()).collect()
}

fn push_new(values: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        values.push(value.to_string());
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn split_list(value: Option<&str>) -> Vec<String> {
    present(value)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn dedup_ignore_case(values: &mut Vec<String>) {
    let mut kept: Vec<String> = Vec::with_capacity(values.len());
    for value in values.drain(..) {
        if !kept.iter().any(|k| k.eq_ignore_ascii_case(&value)) {
            kept.push(value);
        }
    }
    *values = kept;
}

// Maps tokens to their canonical spelling: lexicon synonyms first, then the vocabulary
fn resolve_tokens(
    field: &str,
    raw: Option<&str>,
    vocabulary: &[String],
    synonym: fn(&str) -> Option<&'static str>,
) -> AppResult<Vec<String>> {
    let tokens = split_list(raw);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut resolved: Vec<String> = Vec::new();
    for token in &tokens {
        let canonical = synonym(token)
            .map(str::to_string)
            .or_else(|| vocabulary.iter().find(|v| v.eq_ignore_ascii_case(token)).cloned());
        match canonical {
            Some(value) => push_new(&mut resolved, &value),
            None => tracing::warn!("Dropping unrecognized {} token '{}'", field, token),
        }
    }

    if resolved.is_empty() {
        return Err(AppError::validation(format!(
            "{} contains no recognized values: {}",
            field,
            tokens.join(", ")
        )));
    }
    Ok(resolved)
}

fn canonical_feature(token: &str) -> Option<&'static str> {
    let normalized = lexicon::normalize_text(token);
    lexicon::FEATURES
        .iter()
        .find(|term| term.phrases.contains(&normalized.as_str()) || lexicon::normalize_text(term.canonical) == normalized)
        .map(|term| term.canonical)
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: Option<&str>) -> AppResult<Option<T>> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };
    value
        .replace(['_', ','], "")
        .parse::<T>()
        .map(Some)
        .map_err(|_| AppError::validation(format!("{} must be a non-negative integer, got '{}'", field, value)))
}

fn parse_flag(field: &str, raw: Option<&str>) -> AppResult<Option<bool>> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        _ => Err(AppError::validation(format!("{} must be true or false, got '{}'", field, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::engine::tests::sample_catalog;

    fn normalizer() -> QueryNormalizer {
        QueryNormalizer::new(&SearchSettings::default(), &sample_catalog())
    }

    fn params() -> SearchParams {
        SearchParams::default()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_params_yield_defaults() {
        let normalized = normalizer().normalize(&params()).unwrap();
        assert!(normalized.filter.is_empty());
        assert_eq!(normalized.page, 1);
        assert_eq!(normalized.page_size, 20);
    }

    #[test]
    fn test_lists_are_split_and_canonicalized() {
        let normalized = normalizer()
            .normalize(&SearchParams {
                body_types: Some("suv, Sport Utility Vehicle ,sedan".into()),
                fuel_types: Some("EV,petrol".into()),
                transmissions: Some("dct,dual clutch".into()),
                brands: Some("Hyundai,hyundai, Tata".into()),
                features: Some("sunroof,heated mirrors".into()),
                ..params()
            })
            .unwrap();
        let filter = normalized.filter;
        assert_eq!(filter.body_type, strings(&["SUV", "Sedan"]));
        assert_eq!(filter.fuel_type, strings(&["Electric", "Petrol"]));
        assert_eq!(filter.transmission, strings(&["DCT"]));
        assert_eq!(filter.brand, strings(&["Hyundai", "Tata"]));
        assert_eq!(filter.features, strings(&["Sunroof", "heated mirrors"]));
    }

    #[test]
    fn test_unknown_tokens_are_dropped_unless_all_unknown() {
        let normalized = normalizer()
            .normalize(&SearchParams {
                body_types: Some("SUV,hovercraft".into()),
                ..params()
            })
            .unwrap();
        assert_eq!(normalized.filter.body_type, strings(&["SUV"]));

        let err = normalizer()
            .normalize(&SearchParams {
                fuel_types: Some("plutonium".into()),
                ..params()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_catalog_values_extend_vocabulary() {
        let mut catalog = sample_catalog();
        catalog[0].body_type = "Micro SUV".into();
        let normalizer = QueryNormalizer::new(&SearchSettings::default(), &catalog);
        let normalized = normalizer
            .normalize(&SearchParams {
                body_types: Some("micro suv".into()),
                ..params()
            })
            .unwrap();
        assert_eq!(normalized.filter.body_type, strings(&["Micro SUV"]));
    }

    #[test]
    fn test_budget_parsing_and_validation() {
        let normalized = normalizer()
            .normalize(&SearchParams {
                price_max: Some("1,000,000".into()),
                ..params()
            })
            .unwrap();
        assert_eq!(normalized.filter.budget, Some(Budget { min: 0, max: Some(1_000_000) }));

        for (min, max) in [("abc", "10"), ("-5", "10"), ("20", "10")] {
            let result = normalizer().normalize(&SearchParams {
                price_min: Some(min.into()),
                price_max: Some(max.into()),
                ..params()
            });
            assert!(matches!(result, Err(AppError::Validation(_))), "{min}..{max}");
        }
    }

    #[test]
    fn test_sorting_parameters() {
        let normalized = normalizer()
            .normalize(&SearchParams {
                sort_by: Some("Price".into()),
                sort_order: Some("DESC".into()),
                ..params()
            })
            .unwrap();
        assert_eq!(normalized.filter.sort_by, Some(SortBy::Price));
        assert_eq!(normalized.filter.sort_order, Some(SortOrder::Desc));

        let relevance = normalizer()
            .normalize(&SearchParams {
                sort_by: Some("relevance".into()),
                sort_order: Some("asc".into()),
                ..params()
            })
            .unwrap();
        assert_eq!(relevance.filter.sort_by, None);
        assert_eq!(relevance.filter.sort_order, None);

        let bad = normalizer().normalize(&SearchParams {
            sort_by: Some("colour".into()),
            ..params()
        });
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_flags_seating_and_text() {
        let normalized = normalizer()
            .normalize(&SearchParams {
                is_new: Some("true".into()),
                is_popular: Some("0".into()),
                seating: Some("7".into()),
                q: Some("  creta  ".into()),
                ..params()
            })
            .unwrap();
        assert_eq!(normalized.filter.is_new, Some(true));
        assert_eq!(normalized.filter.is_popular, Some(false));
        assert_eq!(normalized.filter.seating, Some(7));
        assert_eq!(normalized.filter.text_query.as_deref(), Some("creta"));

        let bad_flag = normalizer().normalize(&SearchParams {
            is_new: Some("maybe".into()),
            ..params()
        });
        assert!(matches!(bad_flag, Err(AppError::Validation(_))));

        let zero_seats = normalizer().normalize(&SearchParams {
            seating: Some("0".into()),
            ..params()
        });
        assert!(matches!(zero_seats, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_paging_bounds() {
        let normalized = normalizer()
            .normalize(&SearchParams {
                page: Some("3".into()),
                size: Some("50".into()),
                ..params()
            })
            .unwrap();
        assert_eq!((normalized.page, normalized.page_size), (3, 50));

        for (page, size) in [("0", "10"), ("1", "0"), ("1", "101"), ("x", "10")] {
            let result = normalizer().normalize(&SearchParams {
                page: Some(page.into()),
                size: Some(size.into()),
                ..params()
            });
            assert!(matches!(result, Err(AppError::Validation(_))), "page={page} size={size}");
        }
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let normalized = normalizer()
            .normalize(&SearchParams {
                brands: Some("  ".into()),
                price_min: Some("".into()),
                sort_by: Some("".into()),
                q: Some("   ".into()),
                ..params()
            })
            .unwrap();
        assert!(normalized.filter.is_empty());
    }
}
