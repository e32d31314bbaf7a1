use tracing::{info, warn};

use crate::aggregate::{build_records, dissolve_species};
use crate::backend::{RasterConverter, VectorOps};
use crate::catalog::{CatalogClient, parse_catalog};
use crate::convert::{convert_grids, normalize_grids};
use crate::domain::Species;
use crate::error::PipelineError;
use crate::fetcher::fetch_species;
use crate::layout::Workspace;
use crate::polygonize::polygonize_species;
use crate::pool::{NARROW_POOL, StagePool, WIDE_POOL};
use crate::report::{RunReport, Skip, Stage};
use crate::site::SpeciesSite;
use crate::store::{RangeStore, write_records};

#[derive(Debug, Clone, Copy)]
pub struct PoolWidths {
    pub wide: usize,
    pub narrow: usize,
}

impl Default for PoolWidths {
    fn default() -> Self {
        Self {
            wide: WIDE_POOL,
            narrow: NARROW_POOL,
        }
    }
}

pub struct Pipeline<C, S, B> {
    workspace: Workspace,
    catalog: C,
    site: S,
    backend: B,
    widths: PoolWidths,
}

impl<C, S, B> Pipeline<C, S, B>
where
    C: CatalogClient,
    S: SpeciesSite,
    B: RasterConverter + VectorOps,
{
    pub fn new(workspace: Workspace, catalog: C, site: S, backend: B, widths: PoolWidths) -> Self {
        Self {
            workspace,
            catalog,
            site,
            backend,
            widths,
        }
    }

    // fatal on failure, the catalog drives everything downstream
    pub fn resolve_catalog(&self) -> Result<Vec<Species>, PipelineError> {
        let text = self.catalog.fetch_catalog()?;
        parse_catalog(&text)
    }

    pub fn setup(&self, species: &[Species], report: &mut RunReport) -> Result<(), PipelineError> {
        info!(count = species.len(), "generating species directories");
        let pool = StagePool::new(self.widths.wide);
        let outcomes = pool.run(species.to_vec(), |sp| {
            let outcome = self.workspace.ensure_species_dirs(&sp.slug);
            (sp.slug, outcome)
        })?;
        for (slug, outcome) in outcomes {
            if let Err(err) = outcome {
                warn!(species = slug.as_str(), error = %err, "directory setup failed");
                report.record(vec![Skip::new(&slug, Stage::Setup, slug.as_str(), err.to_string())]);
            }
        }
        Ok(())
    }

    pub fn extract(&self, species: &[Species], report: &mut RunReport) -> Result<(), PipelineError> {
        info!(count = species.len(), "downloading scenario archives");
        let pool = StagePool::new(self.widths.wide);
        let outcomes = pool.run(species.to_vec(), |sp| {
            let outcome = fetch_species(&self.workspace, &self.site, &sp.slug);
            (sp.slug, outcome)
        })?;
        for (slug, outcome) in outcomes {
            match outcome {
                Ok(skips) => report.record(skips),
                Err(err) => {
                    warn!(species = slug.as_str(), error = %err, "species fetch failed");
                    report.record(vec![Skip::new(
                        &slug,
                        Stage::Extract,
                        slug.as_str(),
                        err.to_string(),
                    )]);
                }
            }
        }
        Ok(())
    }

    pub fn transform(
        &self,
        species: &[Species],
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        info!(count = species.len(), "normalizing grids and converting rasters");
        let wide = StagePool::new(self.widths.wide);
        let outcomes = wide.run(species.to_vec(), |sp| {
            let outcome = normalize_grids(&self.workspace, &sp.slug)
                .and_then(|_| convert_grids(&self.workspace, &self.backend, &sp.slug));
            (sp.slug, outcome)
        })?;
        for (slug, outcome) in outcomes {
            match outcome {
                Ok(skips) => report.record(skips),
                Err(err) => {
                    warn!(species = slug.as_str(), error = %err, "grid conversion failed");
                    report.record(vec![Skip::new(
                        &slug,
                        Stage::Transform,
                        slug.as_str(),
                        err.to_string(),
                    )]);
                }
            }
        }

        info!(count = species.len(), "polygonizing thresholds");
        let narrow = StagePool::new(self.widths.narrow);
        let outcomes = narrow.run(species.to_vec(), |sp| {
            let outcome = polygonize_species(&self.workspace, &self.backend, &sp.slug);
            (sp.slug, outcome)
        })?;
        for (slug, outcome) in outcomes {
            match outcome {
                Ok(skips) => report.record(skips),
                Err(err) => {
                    warn!(species = slug.as_str(), error = %err, "polygonization failed");
                    report.record(vec![Skip::new(
                        &slug,
                        Stage::Polygonize,
                        slug.as_str(),
                        err.to_string(),
                    )]);
                }
            }
        }
        Ok(())
    }

    pub fn load(
        &self,
        species: &[Species],
        store: &mut dyn RangeStore,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        info!(count = species.len(), "dissolving polygon layers");
        let pool = StagePool::new(self.widths.narrow);
        let outcomes = pool.run(species.to_vec(), |sp| {
            let outcome = dissolve_species(&self.workspace, &self.backend, &sp.slug);
            (sp.slug, outcome)
        })?;

        let mut layers = Vec::new();
        for (slug, outcome) in outcomes {
            match outcome {
                Ok(Some(aggregate)) => {
                    report.record(aggregate.skips);
                    layers.extend(aggregate.layers);
                }
                Ok(None) => {
                    report.record(vec![Skip::new(
                        &slug,
                        Stage::Aggregate,
                        slug.as_str(),
                        "no polygon layers".to_string(),
                    )]);
                }
                Err(err) => {
                    warn!(species = slug.as_str(), error = %err, "species dissolve failed");
                    report.record(vec![Skip::new(
                        &slug,
                        Stage::Load,
                        slug.as_str(),
                        err.to_string(),
                    )]);
                }
            }
        }

        let records = build_records(layers);
        write_records(store, &records)
    }

    pub fn run(&self, store: &mut dyn RangeStore) -> Result<RunReport, PipelineError> {
        let species = self.resolve_catalog()?;
        let mut report = RunReport::new(species.len());

        self.setup(&species, &mut report)?;
        self.extract(&species, &mut report)?;
        self.transform(&species, &mut report)?;
        self.load(&species, store, &mut report)?;

        report.finish();
        for skip in &report.skips {
            info!(
                species = %skip.species,
                stage = %skip.stage,
                unit = %skip.unit,
                reason = %skip.reason,
                "unit skipped"
            );
        }
        Ok(report)
    }
}
