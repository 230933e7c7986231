// Catalog store: loads brands and models from JSON and projects them into searchable listings

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::models::{Brand, CarListing, CarModel};

/// Read-only access to the catalog's searchable listings.
pub trait CatalogStore: Send + Sync {
    fn listings(&self) -> &[CarListing];

    fn listing_by_id(&self, id: &str) -> Option<&CarListing> {
        self.listings().iter().find(|l| l.id == id)
    }
}

// On-disk layout written by the admin console export
#[derive(Debug, Deserialize, Default)]
pub struct CatalogFile {
    #[serde(default)]
    pub brands: Vec<Brand>,
    #[serde(default)]
    pub models: Vec<CarModel>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    listings: Vec<CarListing>,
}

impl InMemoryCatalog {
    pub fn new(listings: Vec<CarListing>) -> Self {
        Self { listings }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading catalog from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        let file: CatalogFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file {}", path.display()))?;
        let catalog = Self::from_file(file);
        tracing::info!("Catalog loaded with {} listings.", catalog.listings.len());
        Ok(catalog)
    }

    pub fn from_file(file: CatalogFile) -> Self {
        let brands: HashMap<&str, &Brand> = file.brands.iter().map(|b| (b.id.as_str(), b)).collect();
        let listings = file
            .models
            .iter()
            .filter_map(|model| {
                let Some(brand) = brands.get(model.brand_id.as_str()) else {
                    tracing::warn!(model = %model.id, brand = %model.brand_id, "Skipping model with unknown brand");
                    return None;
                };
                project_listing(brand, model)
            })
            .collect();
        Self { listings }
    }
}

impl CatalogStore for InMemoryCatalog {
    fn listings(&self) -> &[CarListing] {
        &self.listings
    }
}

fn is_inactive(status: Option<&str>) -> bool {
    status.is_some_and(|s| s.eq_ignore_ascii_case("inactive"))
}

// Appends values not already present, ignoring case
fn push_unique(target: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !target.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        target.push(value.to_string());
    }
}

/// Denormalizes a model and its variants into one listing.
/// Returns `None` for inactive, seatless or unpriced records.
pub fn project_listing(brand: &Brand, model: &CarModel) -> Option<CarListing> {
    if is_inactive(brand.status.as_deref()) || is_inactive(model.status.as_deref()) {
        tracing::debug!(model = %model.id, "Skipping inactive model");
        return None;
    }
    if model.seating_capacity == 0 {
        tracing::warn!(model = %model.id, "Skipping model with zero seating capacity");
        return None;
    }

    let price = model
        .variants
        .iter()
        .map(|v| v.price)
        .min()
        .or(model.starting_price);
    let Some(price) = price else {
        tracing::warn!(model = %model.id, "Skipping model without any price");
        return None;
    };

    let mut fuel_types = Vec::new();
    let mut transmissions = Vec::new();
    let mut key_features = Vec::new();
    for feature in &model.key_features {
        push_unique(&mut key_features, feature);
    }
    for variant in &model.variants {
        push_unique(&mut fuel_types, &variant.fuel_type);
        push_unique(&mut transmissions, &variant.transmission);
        for feature in &variant.key_features {
            push_unique(&mut key_features, feature);
        }
    }

    let mileage = model
        .variants
        .iter()
        .filter_map(|v| v.mileage)
        .filter(|m| *m > 0.0)
        .fold(None, |best: Option<f64>, m| Some(best.map_or(m, |b| b.max(m))));

    Some(CarListing {
        id: model.id.clone(),
        name: model.name.clone(),
        brand_id: brand.id.clone(),
        brand_name: brand.name.clone(),
        body_type: model.body_type.clone(),
        sub_body_type: model.sub_body_type.clone(),
        fuel_types,
        transmissions,
        seating_capacity: model.seating_capacity,
        price,
        mileage,
        is_new: model.is_new,
        is_popular: model.is_popular,
        popular_rank: if model.is_popular { model.popular_rank.filter(|r| *r > 0) } else { None },
        launch_date: model.launch_date,
        description: model.description.clone(),
        key_features,
    })
}
