use std::fs;
use std::path::Path;

use geo::BooleanOps;
use geo_types::{LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use wkt::{ToWkt, TryFromWkt};

use crate::error::PipelineError;
use crate::grid::Grid;
use crate::raster::Raster;

pub const TARGET_EPSG: u32 = 4326;

pub trait RasterConverter: Send + Sync {
    fn grid_to_raster(&self, grid: &Path, raster: &Path) -> Result<(), PipelineError>;
}

pub trait VectorOps: Send + Sync {
    fn mask_at_threshold(
        &self,
        raster: &Path,
        threshold: f64,
        masked: &Path,
    ) -> Result<(), PipelineError>;
    fn vectorize(&self, masked: &Path, layer: &Path) -> Result<(), PipelineError>;
    fn assign_crs(&self, layer: &Path, epsg: u32) -> Result<(), PipelineError>;
    fn read_layer(&self, layer: &Path) -> Result<LayerData, PipelineError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerData {
    pub crs: Option<String>,
    pub features: Vec<Polygon<f64>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LayerFile {
    crs: Option<String>,
    features: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinBackend;

impl RasterConverter for BuiltinBackend {
    fn grid_to_raster(&self, grid: &Path, raster: &Path) -> Result<(), PipelineError> {
        let grid = Grid::read(grid)?;
        Raster {
            header: grid.header,
            values: grid.values,
        }
        .write(raster)
    }
}

impl VectorOps for BuiltinBackend {
    fn mask_at_threshold(
        &self,
        raster: &Path,
        threshold: f64,
        masked: &Path,
    ) -> Result<(), PipelineError> {
        let input = Raster::read(raster)?;
        let nodata = input.header.nodata;
        let values = input
            .values
            .iter()
            .map(|&value| {
                if value != nodata && value >= threshold {
                    0.0
                } else {
                    nodata
                }
            })
            .collect();
        Raster {
            header: input.header,
            values,
        }
        .write(masked)
    }

    fn vectorize(&self, masked: &Path, layer: &Path) -> Result<(), PipelineError> {
        let raster = Raster::read(masked)?;
        let regions = merge_passing_cells(&raster);
        let file = LayerFile {
            crs: None,
            features: regions.0.iter().map(|poly| poly.wkt_string()).collect(),
        };
        write_layer_file(layer, &file)
    }

    fn assign_crs(&self, layer: &Path, epsg: u32) -> Result<(), PipelineError> {
        let mut file =
            read_layer_file(layer).map_err(|err| PipelineError::CrsAssignment(err.to_string()))?;
        file.crs = Some(format!("EPSG:{epsg}"));
        write_layer_file(layer, &file).map_err(|err| PipelineError::CrsAssignment(err.to_string()))
    }

    fn read_layer(&self, layer: &Path) -> Result<LayerData, PipelineError> {
        let file = read_layer_file(layer)?;
        let mut features = Vec::with_capacity(file.features.len());
        for text in &file.features {
            let polygon =
                Polygon::try_from_wkt_str(text).map_err(|err| PipelineError::Conversion {
                    path: layer.display().to_string(),
                    message: err.to_string(),
                })?;
            features.push(polygon);
        }
        Ok(LayerData {
            crs: file.crs,
            features,
        })
    }
}

// touching cell rectangles merge, one polygon per connected region
fn merge_passing_cells(raster: &Raster) -> MultiPolygon<f64> {
    let header = &raster.header;
    let mut merged = MultiPolygon::new(Vec::new());
    for row in 0..header.nrows {
        for col in 0..header.ncols {
            if raster.values[row * header.ncols + col] == header.nodata {
                continue;
            }
            let x0 = header.xllcorner + col as f64 * header.cellsize;
            let x1 = x0 + header.cellsize;
            let y1 = header.yllcorner + (header.nrows - row) as f64 * header.cellsize;
            let y0 = y1 - header.cellsize;
            let cell = Polygon::new(
                LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
                Vec::new(),
            );
            merged = merged.union(&MultiPolygon::new(vec![cell]));
        }
    }
    merged
}

fn read_layer_file(layer: &Path) -> Result<LayerFile, PipelineError> {
    let fail = |message: String| PipelineError::Conversion {
        path: layer.display().to_string(),
        message,
    };
    let content = fs::read_to_string(layer).map_err(|err| fail(err.to_string()))?;
    serde_json::from_str(&content).map_err(|err| fail(err.to_string()))
}

fn write_layer_file(layer: &Path, file: &LayerFile) -> Result<(), PipelineError> {
    let fail = |message: String| PipelineError::Conversion {
        path: layer.display().to_string(),
        message,
    };
    let content = serde_json::to_vec_pretty(file).map_err(|err| fail(err.to_string()))?;
    fs::write(layer, content).map_err(|err| fail(err.to_string()))
}
