// Narrows a ranked result list to a handful of picks plus alternates.

use serde::Deserialize;
use std::{sync::Arc, time::Duration};

use crate::llm::{complete_with_timeout, extract_json, LlmClient};
use crate::models::{CarListing, Recommendation};
use crate::nl_parser::format_lakh;

/// How many ranked listings are shown to the LLM.
pub const CANDIDATE_POOL: usize = 10;
pub const MAX_RECOMMENDATIONS: usize = 5;
pub const MAX_ALTERNATIVES: usize = 3;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LlmPick {
    recommendations: Vec<String>,
    alternatives: Vec<String>,
    explanation: String,
}

#[derive(Clone)]
pub struct Recommender {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl Recommender {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Always returns a result: any LLM failure, or a pick with no usable
    /// ids, falls back to the top five plus ranks six to eight.
    pub async fn recommend(&self, query: &str, ranked: &[CarListing]) -> Recommendation {
        if ranked.is_empty() {
            return Recommendation {
                recommendations: Vec::new(),
                alternatives: Vec::new(),
                explanation: "No cars matched this search, so there is nothing to recommend yet.".to_string(),
                ai_curated: false,
            };
        }

        let pool = &ranked[..ranked.len().min(CANDIDATE_POOL)];
        let prompt = build_prompt(query, pool);
        match complete_with_timeout(self.llm.as_ref(), &prompt, self.timeout).await {
            Ok(raw) => match apply_pick(&raw, pool) {
                Some(recommendation) => {
                    tracing::info!(
                        picks = recommendation.recommendations.len(),
                        alternatives = recommendation.alternatives.len(),
                        "LLM curated recommendations"
                    );
                    return recommendation;
                }
                None => tracing::warn!("LLM recommendation had no usable picks, using top-ranked fallback"),
            },
            Err(e) => tracing::warn!("LLM recommendation failed, using top-ranked fallback: {:#}", e),
        }

        fallback_recommendation(ranked)
    }
}

/// Top five by existing rank, then ranks six to eight as alternatives.
pub fn fallback_recommendation(ranked: &[CarListing]) -> Recommendation {
    let picks = ranked.len().min(MAX_RECOMMENDATIONS);
    let alternatives = ranked
        .len()
        .min(MAX_RECOMMENDATIONS + MAX_ALTERNATIVES)
        .saturating_sub(MAX_RECOMMENDATIONS);

    Recommendation {
        recommendations: ranked[..picks].to_vec(),
        alternatives: ranked[picks..picks + alternatives].to_vec(),
        explanation: format!(
            "Showing the top {} {} for your search in ranked order.",
            picks,
            if picks == 1 { "match" } else { "matches" }
        ),
        ai_curated: false,
    }
}

fn build_prompt(query: &str, pool: &[CarListing]) -> String {
    let cars = pool
        .iter()
        .map(|car| {
            let mileage = car.mileage.map(|m| format!("{:.1} km/l", m)).unwrap_or_else(|| "n/a".to_string());
            let features = car.key_features.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
            format!(
                "- id: {} | {} {} | {} | from {} | fuel: {} | transmission: {} | {} seats | mileage: {} | features: {}",
                car.id,
                car.brand_name,
                car.name,
                car.body_type,
                format_lakh(car.price),
                car.fuel_types.join("/"),
                car.transmissions.join("/"),
                car.seating_capacity,
                mileage,
                features,
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "A car buyer searched for: \"{query}\"\n\
         These cars matched, best ranked first:\n{cars}\n\n\
         Pick up to {MAX_RECOMMENDATIONS} cars that best fit the intent behind the search, and up to \
         {MAX_ALTERNATIVES} worthwhile alternatives. Use only ids from the list.\n\
         Respond with ONLY JSON: {{\"recommendations\": [ids], \"alternatives\": [ids], \
         \"explanation\": \"one or two sentences on why\"}}"
    )
}

// Keeps only ids from the pool, each at most once, within the size limits.
// None when no recommendation survives.
fn apply_pick(raw: &str, pool: &[CarListing]) -> Option<Recommendation> {
    let pick: LlmPick = match serde_json::from_str(extract_json(raw)) {
        Ok(pick) => pick,
        Err(e) => {
            tracing::warn!("Could not decode LLM recommendation: {}", e);
            return None;
        }
    };

    let mut used: Vec<&str> = Vec::new();
    let mut take = |ids: &[String], limit: usize| -> Vec<CarListing> {
        let mut selected = Vec::new();
        for id in ids {
            if selected.len() == limit {
                break;
            }
            let id = id.trim();
            if used.contains(&id) {
                continue;
            }
            match pool.iter().find(|car| car.id == id) {
                Some(car) => {
                    used.push(car.id.as_str());
                    selected.push(car.clone());
                }
                None => tracing::debug!("Ignoring unknown id '{}' in LLM recommendation", id),
            }
        }
        selected
    };

    let recommendations = take(&pick.recommendations, MAX_RECOMMENDATIONS);
    if recommendations.is_empty() {
        return None;
    }
    let alternatives = take(&pick.alternatives, MAX_ALTERNATIVES);

    let explanation = match pick.explanation.trim() {
        "" => "Picked for how closely they match what you described.".to_string(),
        text => text.to_string(),
    };

    Some(Recommendation {
        recommendations,
        alternatives,
        explanation,
        ai_curated: true,
    })
}
