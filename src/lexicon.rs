//! Fixed vocabulary shared by the normalizer, the keyword parser and the index.
//!
//! Every entry maps a canonical catalog value to the phrases users type for it.
//! Phrases are matched on word boundaries against [`normalize_text`] output.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};

/// A canonical value and the phrases that mean it.
pub struct Term {
    pub canonical: &'static str,
    pub phrases: &'static [&'static str],
}

pub static BODY_TYPES: &[Term] = &[
    Term { canonical: "SUV", phrases: &["suv", "suvs", "sport utility vehicle", "sports utility vehicle", "crossover"] },
    Term { canonical: "Sedan", phrases: &["sedan", "sedans", "saloon"] },
    Term { canonical: "Hatchback", phrases: &["hatchback", "hatchbacks", "hatch"] },
    Term { canonical: "MUV", phrases: &["muv", "mpv", "multi utility vehicle", "people mover", "minivan"] },
    Term { canonical: "Coupe", phrases: &["coupe", "coupes"] },
    Term { canonical: "Convertible", phrases: &["convertible", "cabriolet", "roadster"] },
    Term { canonical: "Pickup", phrases: &["pickup", "pick up", "pickup truck"] },
];

pub static FUEL_TYPES: &[Term] = &[
    Term { canonical: "Petrol", phrases: &["petrol", "gasoline"] },
    Term { canonical: "Diesel", phrases: &["diesel"] },
    Term { canonical: "CNG", phrases: &["cng"] },
    Term { canonical: "Electric", phrases: &["electric", "ev", "evs", "battery electric"] },
    Term { canonical: "Hybrid", phrases: &["hybrid", "strong hybrid", "mild hybrid"] },
];

// Closed set. AMT, CVT and DCT stay distinct from each other and from "Automatic".
pub static TRANSMISSIONS: &[Term] = &[
    Term { canonical: "Manual", phrases: &["manual", "stick shift"] },
    Term { canonical: "Automatic", phrases: &["automatic", "auto", "autos", "torque converter"] },
    Term { canonical: "AMT", phrases: &["amt", "automated manual"] },
    Term { canonical: "CVT", phrases: &["cvt"] },
    Term { canonical: "DCT", phrases: &["dct", "dual clutch", "dsg"] },
    Term { canonical: "iMT", phrases: &["imt", "clutchless manual"] },
];

pub const GENERIC_AUTOMATIC: &str = "Automatic";

/// Automatic-family transmissions, in the order they are reported.
pub const AUTOMATIC_FAMILY: [&str; 4] = ["Automatic", "AMT", "CVT", "DCT"];

// Longer phrases first so "panoramic sunroof" is claimed before "sunroof".
pub static FEATURES: &[Term] = &[
    Term { canonical: "Panoramic Sunroof", phrases: &["panoramic sunroof", "panoramic roof"] },
    Term { canonical: "Sunroof", phrases: &["sunroof", "sun roof", "moonroof"] },
    Term { canonical: "Dual Zone AC", phrases: &["dual zone ac", "dual zone climate", "dual zone climate control"] },
    // The "auto" forms must be consumed here before the transmission scan sees them
    Term {
        canonical: "Climate Control",
        phrases: &["automatic climate control", "auto climate control", "auto climate", "auto ac", "climate control"],
    },
    Term {
        canonical: "Auto Headlamps",
        phrases: &["automatic headlamps", "automatic headlights", "auto headlamps", "auto headlights"],
    },
    Term { canonical: "Ventilated Seats", phrases: &["ventilated seats", "cooled seats"] },
    Term { canonical: "Wireless Charging", phrases: &["wireless charging", "wireless charger"] },
    Term { canonical: "Cruise Control", phrases: &["cruise control"] },
    Term { canonical: "ADAS", phrases: &["adas", "lane assist", "adaptive cruise"] },
    Term { canonical: "360 Camera", phrases: &["360 camera", "360 degree camera", "surround view camera"] },
    Term { canonical: "Rear Camera", phrases: &["rear camera", "reverse camera", "reversing camera"] },
    Term { canonical: "6 Airbags", phrases: &["6 airbags", "six airbags"] },
    Term { canonical: "Apple CarPlay", phrases: &["apple carplay", "carplay"] },
    Term { canonical: "Android Auto", phrases: &["android auto"] },
    Term { canonical: "Touchscreen", phrases: &["touchscreen", "touch screen", "infotainment"] },
    Term { canonical: "Keyless Entry", phrases: &["keyless entry", "keyless"] },
    Term { canonical: "Push Button Start", phrases: &["push button start", "push start"] },
    Term { canonical: "Connected Car", phrases: &["connected car", "connected car tech"] },
];

/// Phrases rewritten to a single canonical token before indexing or scoring,
/// so "sport utility vehicle" and "suv" score against each other.
pub static SYNONYMS: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    let mut pairs = Vec::new();
    for table in [BODY_TYPES, FUEL_TYPES, TRANSMISSIONS] {
        for term in table {
            let canonical = normalize_text(term.canonical);
            for phrase in term.phrases {
                // Only multi-word or differently spelled phrases need rewriting
                if *phrase != canonical && phrase.contains(' ') {
                    pairs.push((phrase.to_string(), canonical.clone()));
                }
            }
        }
    }
    pairs.extend(
        [("mpv", "muv"), ("saloon", "sedan"), ("gasoline", "petrol"), ("ev", "electric")]
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string())),
    );
    // Longest first so nested phrases don't pre-empt each other
    pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    pairs
});

// Lowercase lookup from every phrase (and canonical spelling) to its canonical value
fn build_lookup(table: &[Term]) -> HashMap<String, &'static str> {
    let mut map = HashMap::new();
    for term in table {
        map.insert(term.canonical.to_lowercase(), term.canonical);
        for phrase in term.phrases {
            map.insert(phrase.to_string(), term.canonical);
        }
    }
    map
}

static BODY_LOOKUP: Lazy<HashMap<String, &'static str>> = Lazy::new(|| build_lookup(BODY_TYPES));
static FUEL_LOOKUP: Lazy<HashMap<String, &'static str>> = Lazy::new(|| build_lookup(FUEL_TYPES));
static TRANSMISSION_LOOKUP: Lazy<HashMap<String, &'static str>> =
    Lazy::new(|| build_lookup(TRANSMISSIONS));

pub fn canonical_body_type(token: &str) -> Option<&'static str> {
    BODY_LOOKUP.get(&normalize_text(token)).copied()
}

pub fn canonical_fuel_type(token: &str) -> Option<&'static str> {
    FUEL_LOOKUP.get(&normalize_text(token)).copied()
}

pub fn canonical_transmission(token: &str) -> Option<&'static str> {
    TRANSMISSION_LOOKUP.get(&normalize_text(token)).copied()
}

/// Lowercases, turns punctuation into spaces and collapses whitespace.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word-boundary phrase test. Both arguments must already be normalized.
pub fn contains_phrase(normalized_text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let haystack = format!(" {} ", normalized_text);
    haystack.contains(&format!(" {} ", phrase))
}

/// Normalizes `text` and rewrites synonym phrases to their canonical token.
pub fn apply_synonyms(text: &str) -> String {
    let mut normalized = format!(" {} ", normalize_text(text));
    for (phrase, canonical) in SYNONYMS.iter() {
        let needle = format!(" {} ", phrase);
        if normalized.contains(&needle) {
            normalized = normalized.replace(&needle, &format!(" {} ", canonical));
        }
    }
    normalized.trim().to_string()
}

/// Resolves a set of transmission values against the automatic-family rule:
/// specific AMT/CVT/DCT tokens narrow a generic "Automatic"; a generic token on
/// its own (or next to the whole family) widens to the full family.
pub fn resolve_transmissions(tokens: &[String]) -> Vec<String> {
    let has_generic = tokens.iter().any(|t| t == GENERIC_AUTOMATIC);
    let specific: BTreeSet<&str> = tokens
        .iter()
        .map(String::as_str)
        .filter(|t| AUTOMATIC_FAMILY[1..].contains(t))
        .collect();

    let widen = has_generic && (specific.is_empty() || specific.len() == AUTOMATIC_FAMILY.len() - 1);

    // TRANSMISSIONS keeps the family contiguous, so iteration order is report order
    let mut resolved: Vec<String> = Vec::new();
    for term in TRANSMISSIONS {
        let name = term.canonical;
        let keep = if AUTOMATIC_FAMILY.contains(&name) {
            if widen {
                true
            } else if name == GENERIC_AUTOMATIC {
                false
            } else {
                specific.contains(name)
            }
        } else {
            tokens.iter().any(|t| t == name)
        };
        if keep {
            resolved.push(name.to_string());
        }
    }
    resolved
}
