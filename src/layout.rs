use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::SpeciesSlug;
use crate::error::PipelineError;

pub const STAGING_DIR: &str = "zipfiles";
pub const GRID_DIR: &str = "ascii";
pub const RASTER_DIR: &str = "tif";
pub const POLYGON_DIR: &str = "shapes";

pub const RAW_GRID_EXT: &str = "txt";
pub const GRID_EXT: &str = "asc";
pub const RASTER_EXT: &str = "tif";
pub const LAYER_EXT: &str = "shp";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn staging_dir(&self, slug: &SpeciesSlug) -> Utf8PathBuf {
        self.root.join(STAGING_DIR).join(slug.as_str())
    }

    pub fn grid_root(&self) -> Utf8PathBuf {
        self.root.join(GRID_DIR)
    }

    pub fn grid_dir(&self, slug: &SpeciesSlug) -> Utf8PathBuf {
        self.root.join(GRID_DIR).join(slug.as_str())
    }

    pub fn raster_dir(&self, slug: &SpeciesSlug) -> Utf8PathBuf {
        self.root.join(RASTER_DIR).join(slug.as_str())
    }

    pub fn polygon_dir(&self, slug: &SpeciesSlug) -> Utf8PathBuf {
        self.root.join(POLYGON_DIR).join(slug.as_str())
    }

    pub fn ensure_species_dirs(&self, slug: &SpeciesSlug) -> Result<(), PipelineError> {
        for dir in [
            self.staging_dir(slug),
            self.grid_dir(slug),
            self.raster_dir(slug),
            self.polygon_dir(slug),
        ] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| PipelineError::Filesystem(format!("create {dir}: {err}")))?;
        }
        Ok(())
    }

    pub fn list_with_extension(
        dir: &Utf8Path,
        extension: &str,
    ) -> Result<Vec<Utf8PathBuf>, PipelineError> {
        if !dir.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        let entries = fs::read_dir(dir.as_std_path())
            .map_err(|err| PipelineError::Filesystem(format!("read {dir}: {err}")))?;
        for entry in entries {
            let entry = entry.map_err(|err| PipelineError::Filesystem(err.to_string()))?;
            let path = Utf8PathBuf::from_path_buf(entry.path())
                .map_err(|_| PipelineError::Filesystem("non-utf8 path in workspace".to_string()))?;
            if path.is_file() && path.extension() == Some(extension) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
