//! In-memory search index over catalog listings.
//!
//! Filtering is AND across dimensions and OR within a multi-valued dimension.
//! Set comparisons are case-insensitive. Ordering is relevance when a text
//! query is present, an explicit sort field when one is requested, and
//! catalog order otherwise.

use std::cmp::Ordering;

use crate::catalog::CatalogStore;
use crate::models::{CanonicalFilter, CarListing, SearchResults, SortBy, SortOrder};

use super::text;

// Relevance weights per field
const NAME_WEIGHT: f32 = 3.0;
const BRAND_WEIGHT: f32 = 2.0;
const DESCRIPTION_WEIGHT: f32 = 1.0;

/// Filter dimensions that can be relaxed when computing facet counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Budget,
    BodyType,
    FuelType,
    Transmission,
    Brand,
    Seating,
}

/// A listing with its pre-tokenized search fields.
#[derive(Debug, Clone)]
pub(crate) struct IndexedListing {
    pub(crate) listing: CarListing,
    name_terms: Vec<String>,
    brand_terms: Vec<String>,
    description_terms: Vec<String>,
    feature_text: String,
}

impl IndexedListing {
    fn new(listing: CarListing) -> Self {
        let name_terms = text::field_terms(&listing.name);
        let brand_terms = text::field_terms(&listing.brand_name);
        let description = format!(
            "{} {} {} {} {}",
            listing.body_type,
            listing.sub_body_type.as_deref().unwrap_or(""),
            listing.description.as_deref().unwrap_or(""),
            listing.fuel_types.join(" "),
            listing.transmissions.join(" "),
        );
        let description_terms = text::field_terms(&description);
        let feature_text = listing.key_features.join(" | ").to_lowercase();
        Self {
            listing,
            name_terms,
            brand_terms,
            description_terms,
            feature_text,
        }
    }

    /// Best-field relevance summed over query terms. 0.0 means no term matched.
    fn relevance(&self, query_terms: &[String]) -> f32 {
        query_terms
            .iter()
            .map(|term| {
                let name = NAME_WEIGHT * text::term_match_quality(term, &self.name_terms);
                let brand = BRAND_WEIGHT * text::term_match_quality(term, &self.brand_terms);
                let description =
                    DESCRIPTION_WEIGHT * text::term_match_quality(term, &self.description_terms);
                name.max(brand).max(description)
            })
            .sum()
    }
}

/// A filtered listing with its position in the catalog and text score.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'a> {
    pub(crate) doc: &'a IndexedListing,
    position: usize,
    score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    pub(crate) docs: Vec<IndexedListing>,
}

impl SearchEngine {
    pub fn new(listings: Vec<CarListing>) -> Self {
        let docs = listings.into_iter().map(IndexedListing::new).collect::<Vec<_>>();
        tracing::info!("Search index built with {} listings.", docs.len());
        Self { docs }
    }

    pub fn from_catalog(store: &dyn CatalogStore) -> Self {
        Self::new(store.listings().to_vec())
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Runs the filter and returns one page of ranked hits.
    /// `page` is 1-indexed; pages past the end are empty but keep the totals.
    pub fn search(&self, filter: &CanonicalFilter, page: u32, page_size: u32) -> SearchResults {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let ranked = self.ranked(filter);
        let total = ranked.len();
        let total_pages = total.div_ceil(page_size as usize) as u32;

        let start = (page as usize - 1).saturating_mul(page_size as usize);
        let hits: Vec<CarListing> = ranked
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();

        tracing::debug!(total, page, page_size, returned = hits.len(), "Search executed");
        SearchResults {
            hits,
            total,
            page,
            page_size,
            total_pages,
        }
    }

    /// Every matching listing, in final rank order.
    pub fn ranked(&self, filter: &CanonicalFilter) -> Vec<&CarListing> {
        let mut candidates = self.candidates(filter, None);
        sort_candidates(&mut candidates, filter);
        candidates.into_iter().map(|c| &c.doc.listing).collect()
    }

    /// Listings passing the filter with `skip` relaxed, in catalog order.
    pub(crate) fn candidates(&self, filter: &CanonicalFilter, skip: Option<Dimension>) -> Vec<Candidate<'_>> {
        let terms = filter
            .text_query
            .as_deref()
            .map(text::query_terms)
            .unwrap_or_default();

        self.docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| matches_filter(doc, filter, skip))
            .filter_map(|(position, doc)| {
                if terms.is_empty() {
                    return Some(Candidate { doc, position, score: 0.0 });
                }
                let score = doc.relevance(&terms);
                (score > 0.0).then_some(Candidate { doc, position, score })
            })
            .collect()
    }
}

fn contains_ignore_case(values: &[String], wanted: &str) -> bool {
    values.iter().any(|v| v.eq_ignore_ascii_case(wanted))
}

fn intersects(listing_values: &[String], wanted: &[String]) -> bool {
    wanted.iter().any(|w| contains_ignore_case(listing_values, w))
}

fn matches_filter(doc: &IndexedListing, filter: &CanonicalFilter, skip: Option<Dimension>) -> bool {
    let listing = &doc.listing;
    let active = |dimension: Dimension| skip != Some(dimension);

    if active(Dimension::Budget) {
        if let Some(budget) = &filter.budget {
            if !budget.contains(listing.price) {
                return false;
            }
        }
    }

    if active(Dimension::BodyType) && !filter.body_type.is_empty() {
        let matched = filter.body_type.iter().any(|wanted| {
            listing.body_type.eq_ignore_ascii_case(wanted)
                || listing
                    .sub_body_type
                    .as_deref()
                    .is_some_and(|sub| sub.eq_ignore_ascii_case(wanted))
        });
        if !matched {
            return false;
        }
    }

    if active(Dimension::FuelType)
        && !filter.fuel_type.is_empty()
        && !intersects(&listing.fuel_types, &filter.fuel_type)
    {
        return false;
    }

    if active(Dimension::Transmission)
        && !filter.transmission.is_empty()
        && !intersects(&listing.transmissions, &filter.transmission)
    {
        return false;
    }

    if active(Dimension::Brand) && !filter.brand.is_empty() {
        let matched = filter.brand.iter().any(|wanted| {
            listing.brand_name.eq_ignore_ascii_case(wanted) || listing.brand_id.eq_ignore_ascii_case(wanted)
        });
        if !matched {
            return false;
        }
    }

    if active(Dimension::Seating) {
        if let Some(seating) = filter.seating {
            if listing.seating_capacity < seating {
                return false;
            }
        }
    }

    // Every requested feature must appear somewhere in the feature text
    if !filter
        .features
        .iter()
        .all(|feature| doc.feature_text.contains(&feature.to_lowercase()))
    {
        return false;
    }

    if let Some(is_new) = filter.is_new {
        if listing.is_new != is_new {
            return false;
        }
    }
    if let Some(is_popular) = filter.is_popular {
        if listing.is_popular != is_popular {
            return false;
        }
    }

    true
}

// Orders `a` against `b` for a field that may be missing; missing values always go last.
fn compare_optional<T: PartialOrd>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sort_candidates(candidates: &mut [Candidate<'_>], filter: &CanonicalFilter) {
    let has_text = filter
        .text_query
        .as_deref()
        .is_some_and(|q| !text::query_terms(q).is_empty());

    // Relevance (or catalog order) first; a stable sort by field keeps it as the tie-break
    if has_text {
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
    }

    if let Some(sort_by) = filter.sort_by {
        let order = filter.sort_order.unwrap_or_else(|| sort_by.natural_order());
        candidates.sort_by(|a, b| {
            let (a, b) = (&a.doc.listing, &b.doc.listing);
            match sort_by {
                SortBy::Price => compare_optional(Some(a.price), Some(b.price), order),
                SortBy::Mileage => compare_optional(a.mileage, b.mileage, order),
                SortBy::Popularity => compare_optional(popularity_rank(a), popularity_rank(b), order),
            }
        });
    }
}

fn popularity_rank(listing: &CarListing) -> Option<u32> {
    if listing.is_popular { listing.popular_rank } else { None }
}
