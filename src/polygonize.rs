use tracing::{debug, warn};

use crate::backend::{TARGET_EPSG, VectorOps};
use crate::domain::{SpeciesSlug, Threshold};
use crate::error::PipelineError;
use crate::layout::{LAYER_EXT, RASTER_EXT, Workspace};
use crate::report::{Skip, Stage};

pub const MASKED_PREFIX: &str = "clean";

pub fn polygonize_species<B: VectorOps>(
    workspace: &Workspace,
    backend: &B,
    slug: &SpeciesSlug,
) -> Result<Vec<Skip>, PipelineError> {
    let raster_dir = workspace.raster_dir(slug);
    let polygon_dir = workspace.polygon_dir(slug);
    let masked_prefix = format!("{MASKED_PREFIX}_");
    let mut skips = Vec::new();

    for raster in Workspace::list_with_extension(&raster_dir, RASTER_EXT)? {
        let Some(stem) = raster.file_stem().map(str::to_string) else {
            continue;
        };
        if stem.starts_with(&masked_prefix) {
            continue;
        }
        for threshold in Threshold::ALL {
            let pct = threshold.percent();
            let layer = polygon_dir.join(format!("{pct}_{stem}.{LAYER_EXT}"));
            if layer.as_std_path().exists() {
                debug!(species = slug.as_str(), layer = %layer, "polygon layer already exists");
                continue;
            }
            let masked = raster_dir.join(format!("{masked_prefix}{pct}_{stem}.{RASTER_EXT}"));
            let produced = backend
                .mask_at_threshold(raster.as_std_path(), threshold.value(), masked.as_std_path())
                .and_then(|_| backend.vectorize(masked.as_std_path(), layer.as_std_path()));
            if let Err(err) = produced {
                warn!(
                    species = slug.as_str(),
                    layer = %layer,
                    error = %err,
                    "polygonization failed"
                );
                skips.push(Skip::new(slug, Stage::Polygonize, layer.as_str(), err.to_string()));
                continue;
            }
            if let Err(err) = backend.assign_crs(layer.as_std_path(), TARGET_EPSG) {
                warn!(
                    species = slug.as_str(),
                    layer = %layer,
                    error = %err,
                    "CRS assignment failed, keeping as-produced CRS"
                );
            }
        }
    }
    Ok(skips)
}
