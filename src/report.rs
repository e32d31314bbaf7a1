use std::fmt;

use serde::Serialize;

use crate::domain::SpeciesSlug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Setup,
    Extract,
    Transform,
    Polygonize,
    Aggregate,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Polygonize => "polygonize",
            Stage::Aggregate => "aggregate",
            Stage::Load => "load",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Skip {
    pub species: String,
    pub stage: Stage,
    pub unit: String,
    pub reason: String,
}

impl Skip {
    pub fn new(slug: &SpeciesSlug, stage: Stage, unit: &str, reason: String) -> Self {
        Self {
            species: slug.as_str().to_string(),
            stage,
            unit: unit.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: Option<String>,
    pub species_total: usize,
    pub skips: Vec<Skip>,
}

impl RunReport {
    pub fn new(species_total: usize) -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
            species_total,
            skips: Vec::new(),
        }
    }

    pub fn record(&mut self, skips: Vec<Skip>) {
        self.skips.extend(skips);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
    }

    pub fn skips_for_stage(&self, stage: Stage) -> Vec<&Skip> {
        self.skips.iter().filter(|skip| skip.stage == stage).collect()
    }
}
