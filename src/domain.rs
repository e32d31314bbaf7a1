use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

// defaults implied by the "current" layer naming variants
pub const DEFAULT_SOURCE: &str = "vtech";
pub const CURRENT_SCENARIO: &str = "current";
pub const DEFAULT_YEAR: &str = "2020";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeciesSlug(String);

impl SpeciesSlug {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeciesSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpeciesSlug {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let is_valid = !normalized.is_empty()
            && !normalized.starts_with('-')
            && !normalized.ends_with('-')
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
        if !is_valid {
            return Err(PipelineError::InvalidSlug(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    pub slug: SpeciesSlug,
    pub common_name: String,
    pub scientific_name: String,
    pub provenance: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(f64);

impl Threshold {
    pub const ALL: [Threshold; 3] = [Threshold(0.25), Threshold(0.50), Threshold(0.75)];

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

// stems: {t}_current, {t}_{source}_current, {t}_{source}_{scenario}_{ytoken}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerKey {
    pub threshold: u32,
    pub source: String,
    pub scenario: String,
    pub year: String,
}

impl FromStr for LayerKey {
    type Err = PipelineError;

    fn from_str(stem: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = stem.split('_').collect();
        let invalid = || PipelineError::LayerName(stem.to_string());
        let threshold: u32 = tokens
            .first()
            .and_then(|token| token.parse().ok())
            .ok_or_else(invalid)?;

        match tokens.as_slice() {
            [_, scenario] if *scenario == CURRENT_SCENARIO => Ok(Self {
                threshold,
                source: DEFAULT_SOURCE.to_string(),
                scenario: CURRENT_SCENARIO.to_string(),
                year: DEFAULT_YEAR.to_string(),
            }),
            [_, source, scenario] if *scenario == CURRENT_SCENARIO => Ok(Self {
                threshold,
                source: (*source).to_string(),
                scenario: CURRENT_SCENARIO.to_string(),
                year: DEFAULT_YEAR.to_string(),
            }),
            [_, source, scenario, year_token] => {
                let mut chars = year_token.chars();
                if !chars.next().is_some_and(|ch| ch.is_ascii_alphabetic()) {
                    return Err(invalid());
                }
                let year: String = chars.collect();
                if year.is_empty() || !year.chars().all(|ch| ch.is_ascii_digit()) {
                    return Err(invalid());
                }
                Ok(Self {
                    threshold,
                    source: (*source).to_string(),
                    scenario: (*scenario).to_string(),
                    year,
                })
            }
            _ => Err(invalid()),
        }
    }
}
