//! Filtering, ranking, faceting and prefix completion over catalog listings.

pub mod autocomplete;
pub mod engine;
pub mod facets;
pub mod text;

pub use engine::{Dimension, SearchEngine};
