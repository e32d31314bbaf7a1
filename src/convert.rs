use std::fs;

use tracing::{debug, warn};

use crate::backend::RasterConverter;
use crate::domain::SpeciesSlug;
use crate::error::PipelineError;
use crate::layout::{GRID_EXT, RASTER_EXT, RAW_GRID_EXT, Workspace};
use crate::report::{Skip, Stage};

pub fn normalize_grids(workspace: &Workspace, slug: &SpeciesSlug) -> Result<usize, PipelineError> {
    let dir = workspace.grid_dir(slug);
    let mut renamed = 0usize;
    for raw in Workspace::list_with_extension(&dir, RAW_GRID_EXT)? {
        let target = raw.with_extension(GRID_EXT);
        if target.as_std_path().exists() {
            // re-extracted raw grid, already normalized on a previous run
            debug!(species = slug.as_str(), file = %raw, "removing stale raw grid");
            fs::remove_file(raw.as_std_path())
                .map_err(|err| PipelineError::Filesystem(format!("remove {raw}: {err}")))?;
            continue;
        }
        fs::rename(raw.as_std_path(), target.as_std_path())
            .map_err(|err| PipelineError::Filesystem(format!("rename {raw}: {err}")))?;
        renamed += 1;
    }
    Ok(renamed)
}

pub fn convert_grids<B: RasterConverter>(
    workspace: &Workspace,
    backend: &B,
    slug: &SpeciesSlug,
) -> Result<Vec<Skip>, PipelineError> {
    let grid_dir = workspace.grid_dir(slug);
    let raster_dir = workspace.raster_dir(slug);
    let mut skips = Vec::new();

    for grid in Workspace::list_with_extension(&grid_dir, GRID_EXT)? {
        let Some(stem) = grid.file_stem() else {
            continue;
        };
        let raster = raster_dir.join(format!("{stem}.{RASTER_EXT}"));
        if raster.as_std_path().exists() {
            debug!(species = slug.as_str(), file = %grid, "raster already exists");
            continue;
        }
        if let Err(err) = backend.grid_to_raster(grid.as_std_path(), raster.as_std_path()) {
            warn!(
                species = slug.as_str(),
                file = %grid,
                error = %err,
                "raster conversion failed"
            );
            skips.push(Skip::new(slug, Stage::Transform, grid.as_str(), err.to_string()));
        }
    }
    Ok(skips)
}
