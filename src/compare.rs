// Side-by-side comparison of two catalog listings.

use serde::Deserialize;
use std::{sync::Arc, time::Duration};

use crate::catalog::CatalogStore;
use crate::error::{AppError, AppResult};
use crate::llm::{complete_with_timeout, extract_json, LlmClient};
use crate::models::{CarListing, Comparison};
use crate::nl_parser::format_lakh;

const MAX_HIGHLIGHTS: usize = 6;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LlmComparison {
    summary: String,
    highlights: Vec<String>,
}

#[derive(Clone)]
pub struct Comparer {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl Comparer {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub async fn compare(&self, store: &dyn CatalogStore, car1_id: &str, car2_id: &str) -> AppResult<Comparison> {
        let (car1_id, car2_id) = (car1_id.trim(), car2_id.trim());
        if car1_id.is_empty() || car2_id.is_empty() {
            return Err(AppError::validation("Both car1Id and car2Id are required"));
        }
        if car1_id == car2_id {
            return Err(AppError::validation("Pick two different cars to compare"));
        }
        let car1 = lookup(store, car1_id)?;
        let car2 = lookup(store, car2_id)?;

        let highlights = difference_highlights(&car1, &car2);
        let prompt = build_prompt(&car1, &car2);
        let ai = match complete_with_timeout(self.llm.as_ref(), &prompt, self.timeout).await {
            Ok(raw) => match serde_json::from_str::<LlmComparison>(extract_json(&raw)) {
                Ok(parsed) if !parsed.summary.trim().is_empty() => Some(parsed),
                Ok(_) => {
                    tracing::warn!("LLM comparison had an empty summary, using generated one");
                    None
                }
                Err(e) => {
                    tracing::warn!("Could not decode LLM comparison: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("LLM comparison failed, using generated summary: {:#}", e);
                None
            }
        };

        let comparison = match ai {
            Some(parsed) => {
                let mut ai_highlights: Vec<String> = parsed
                    .highlights
                    .into_iter()
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty())
                    .collect();
                ai_highlights.truncate(MAX_HIGHLIGHTS);
                Comparison {
                    summary: parsed.summary.trim().to_string(),
                    highlights: if ai_highlights.is_empty() { highlights } else { ai_highlights },
                    ai_generated: true,
                    car1,
                    car2,
                }
            }
            None => Comparison {
                summary: fallback_summary(&car1, &car2),
                highlights,
                ai_generated: false,
                car1,
                car2,
            },
        };
        Ok(comparison)
    }
}

fn lookup(store: &dyn CatalogStore, id: &str) -> AppResult<CarListing> {
    store
        .listing_by_id(id)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("Car '{}' not found", id)))
}

fn display_name(car: &CarListing) -> String {
    format!("{} {}", car.brand_name, car.name)
}

fn only_in<'a>(left: &'a [String], right: &[String]) -> Vec<&'a str> {
    left.iter()
        .filter(|l| !right.iter().any(|r| r.eq_ignore_ascii_case(l)))
        .map(String::as_str)
        .collect()
}

/// Deterministic differences: price, mileage, seating, then what only one car offers.
pub fn difference_highlights(car1: &CarListing, car2: &CarListing) -> Vec<String> {
    let (name1, name2) = (display_name(car1), display_name(car2));
    let mut highlights = Vec::new();

    if car1.price != car2.price {
        let (cheaper, other, gap) = if car1.price < car2.price {
            (&name1, &name2, car2.price - car1.price)
        } else {
            (&name2, &name1, car1.price - car2.price)
        };
        highlights.push(format!("{} starts {} cheaper than the {}", cheaper, format_lakh(gap), other));
    }

    if let (Some(m1), Some(m2)) = (car1.mileage, car2.mileage) {
        if (m1 - m2).abs() >= 0.1 {
            let (better, best, worst) = if m1 > m2 { (&name1, m1, m2) } else { (&name2, m2, m1) };
            highlights.push(format!("{} is more fuel efficient ({:.1} vs {:.1} km/l)", better, best, worst));
        }
    }

    if car1.seating_capacity != car2.seating_capacity {
        let (roomier, more, fewer) = if car1.seating_capacity > car2.seating_capacity {
            (&name1, car1.seating_capacity, car2.seating_capacity)
        } else {
            (&name2, car2.seating_capacity, car1.seating_capacity)
        };
        highlights.push(format!("{} seats {} instead of {}", roomier, more, fewer));
    }

    for (name, own, other) in [(&name1, car1, car2), (&name2, car2, car1)] {
        let fuels = only_in(&own.fuel_types, &other.fuel_types);
        if !fuels.is_empty() {
            highlights.push(format!("Only the {} offers {}", name, fuels.join("/")));
        }
        let transmissions = only_in(&own.transmissions, &other.transmissions);
        if !transmissions.is_empty() {
            highlights.push(format!("Only the {} offers a {} gearbox", name, transmissions.join("/")));
        }
    }

    highlights.truncate(MAX_HIGHLIGHTS);
    highlights
}

fn fallback_summary(car1: &CarListing, car2: &CarListing) -> String {
    let describe = |car: &CarListing| {
        format!(
            "the {} is a {}-seat {} from {}",
            display_name(car),
            car.seating_capacity,
            car.body_type,
            format_lakh(car.price)
        )
    };
    let mut summary = format!("Side by side, {} while {}.", describe(car1), describe(car2));
    if car1.body_type.eq_ignore_ascii_case(&car2.body_type) {
        summary.push_str(" Both compete in the same segment, so price and equipment decide.");
    }
    summary
}

fn build_prompt(car1: &CarListing, car2: &CarListing) -> String {
    let describe = |car: &CarListing| {
        format!(
            "{} | {} | from {} | fuel: {} | transmission: {} | {} seats | mileage: {} | features: {}",
            display_name(car),
            car.body_type,
            format_lakh(car.price),
            car.fuel_types.join("/"),
            car.transmissions.join("/"),
            car.seating_capacity,
            car.mileage.map(|m| format!("{:.1} km/l", m)).unwrap_or_else(|| "n/a".to_string()),
            car.key_features.join(", "),
        )
    };
    format!(
        "Compare these two cars for an Indian car buyer.\n\
         Car 1: {}\nCar 2: {}\n\n\
         Respond with ONLY JSON: {{\"summary\": \"2-3 sentences\", \"highlights\": [\"up to {} short differences\"]}}",
        describe(car1),
        describe(car2),
        MAX_HIGHLIGHTS,
    )
}
