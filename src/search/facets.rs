// Facet counts for filter chips. Each dimension is counted with its own
// constraint relaxed, so a bucket shows how many results selecting it would give.

use std::collections::BTreeMap;

use crate::models::{CanonicalFilter, FacetBucket, Facets, PriceBucket};

use super::engine::{Dimension, SearchEngine};

// (label, min inclusive, max exclusive) in whole rupees
const PRICE_BANDS: [(&str, u64, Option<u64>); 5] = [
    ("Under 5 Lakh", 0, Some(500_000)),
    ("5-10 Lakh", 500_000, Some(1_000_000)),
    ("10-20 Lakh", 1_000_000, Some(2_000_000)),
    ("20-50 Lakh", 2_000_000, Some(5_000_000)),
    ("Above 50 Lakh", 5_000_000, None),
];

impl SearchEngine {
    pub fn facets(&self, filter: &CanonicalFilter) -> Facets {
        Facets {
            brands: self.count_values(filter, Dimension::Brand, |l| vec![l.brand_name.clone()]),
            body_types: self.count_values(filter, Dimension::BodyType, |l| vec![l.body_type.clone()]),
            fuel_types: self.count_values(filter, Dimension::FuelType, |l| l.fuel_types.clone()),
            transmissions: self.count_values(filter, Dimension::Transmission, |l| l.transmissions.clone()),
            price_ranges: self.price_buckets(filter),
            seating: self.seating_buckets(filter),
        }
    }

    // Counts each listing once per distinct value; sorted by count, then value
    fn count_values<F>(&self, filter: &CanonicalFilter, dimension: Dimension, values: F) -> Vec<FacetBucket>
    where
        F: Fn(&crate::models::CarListing) -> Vec<String>,
    {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for candidate in self.candidates(filter, Some(dimension)) {
            let mut seen: Vec<String> = values(&candidate.doc.listing);
            seen.sort();
            seen.dedup();
            for value in seen {
                *counts.entry(value).or_insert(0) += 1;
            }
        }
        let mut buckets: Vec<FacetBucket> = counts
            .into_iter()
            .map(|(value, count)| FacetBucket { value, count })
            .collect();
        buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        buckets
    }

    fn price_buckets(&self, filter: &CanonicalFilter) -> Vec<PriceBucket> {
        let candidates = self.candidates(filter, Some(Dimension::Budget));
        PRICE_BANDS
            .iter()
            .map(|(label, min, max)| {
                let count = candidates
                    .iter()
                    .filter(|c| {
                        let price = c.doc.listing.price;
                        price >= *min && max.is_none_or(|max| price < max)
                    })
                    .count();
                PriceBucket {
                    label: label.to_string(),
                    min: *min,
                    max: *max,
                    count,
                }
            })
            .collect()
    }

    // Numeric order reads better than count order for seat counts
    fn seating_buckets(&self, filter: &CanonicalFilter) -> Vec<FacetBucket> {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for candidate in self.candidates(filter, Some(Dimension::Seating)) {
            *counts.entry(candidate.doc.listing.seating_capacity).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|(seats, count)| FacetBucket { value: seats.to_string(), count })
            .collect()
    }
}
