use geo::{Area, BooleanOps};
use geo_types::MultiPolygon;
use tracing::{debug, warn};
use wkt::ToWkt;

use crate::backend::VectorOps;
use crate::domain::{LayerKey, SpeciesSlug};
use crate::error::PipelineError;
use crate::layout::{LAYER_EXT, Workspace};
use crate::report::{Skip, Stage};
use crate::store::RangeRecord;

#[derive(Debug, Clone)]
pub struct DissolvedLayer {
    pub species: SpeciesSlug,
    pub key: LayerKey,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone)]
pub struct SpeciesAggregate {
    pub layers: Vec<DissolvedLayer>,
    pub skips: Vec<Skip>,
}

// None when the species produced no layers at all
pub fn dissolve_species<B: VectorOps>(
    workspace: &Workspace,
    backend: &B,
    slug: &SpeciesSlug,
) -> Result<Option<SpeciesAggregate>, PipelineError> {
    let dir = workspace.polygon_dir(slug);
    let files = Workspace::list_with_extension(&dir, LAYER_EXT)?;
    if files.is_empty() {
        debug!(species = slug.as_str(), "no polygon layers for species");
        return Ok(None);
    }

    let mut layers = Vec::new();
    let mut skips = Vec::new();
    for file in files {
        let Some(stem) = file.file_stem() else {
            continue;
        };
        let key: LayerKey = match stem.parse() {
            Ok(key) => key,
            Err(err) => {
                warn!(species = slug.as_str(), layer = %file, error = %err, "unparseable layer name");
                skips.push(Skip::new(slug, Stage::Aggregate, file.as_str(), err.to_string()));
                continue;
            }
        };
        let data = match backend.read_layer(file.as_std_path()) {
            Ok(data) => data,
            Err(err) => {
                warn!(species = slug.as_str(), layer = %file, error = %err, "unreadable layer");
                skips.push(Skip::new(slug, Stage::Aggregate, file.as_str(), err.to_string()));
                continue;
            }
        };

        let mut geometry = MultiPolygon::new(Vec::new());
        for feature in &data.features {
            geometry = geometry.union(&MultiPolygon::new(vec![feature.clone()]));
        }
        layers.push(DissolvedLayer {
            species: slug.clone(),
            key,
            geometry,
        });
    }
    Ok(Some(SpeciesAggregate { layers, skips }))
}

pub fn build_records(layers: Vec<DissolvedLayer>) -> Vec<RangeRecord> {
    layers
        .into_iter()
        .enumerate()
        .map(|(index, layer)| RangeRecord {
            sid: index as i64,
            species: layer.species.as_str().to_string(),
            threshold: layer.key.threshold,
            source: layer.key.source,
            scenario: layer.key.scenario,
            year: layer.key.year,
            area: layer.geometry.unsigned_area(),
            geometry: layer.geometry.wkt_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use crate::backend::BuiltinBackend;
    use crate::grid::GridHeader;
    use crate::raster::Raster;

    use super::*;

    #[test]
    fn dissolve_reduces_each_layer_to_one_row() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let workspace = Workspace::new(root);
        let slug: SpeciesSlug = "abies-balsamea".parse().unwrap();
        workspace.ensure_species_dirs(&slug).unwrap();

        let backend = BuiltinBackend;
        // two disjoint passing regions become two features in the layer
        let masked = workspace.raster_dir(&slug).join("clean_25_current.tif");
        Raster {
            header: GridHeader {
                ncols: 3,
                nrows: 1,
                xllcorner: 0.0,
                yllcorner: 0.0,
                cellsize: 1.0,
                nodata: -9999.0,
            },
            values: vec![0.0, -9999.0, 0.0],
        }
        .write(masked.as_std_path())
        .unwrap();
        let layer = workspace.polygon_dir(&slug).join("25_current.shp");
        backend.vectorize(masked.as_std_path(), layer.as_std_path()).unwrap();
        assert_eq!(backend.read_layer(layer.as_std_path()).unwrap().features.len(), 2);

        let aggregate = dissolve_species(&workspace, &backend, &slug)
            .unwrap()
            .unwrap();
        assert!(aggregate.skips.is_empty());
        assert_eq!(aggregate.layers.len(), 1);
        let dissolved = &aggregate.layers[0];
        assert_eq!(dissolved.key.threshold, 25);
        assert!((dissolved.geometry.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn species_without_layers_is_none() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let workspace = Workspace::new(root);
        let slug: SpeciesSlug = "abies-balsamea".parse().unwrap();
        workspace.ensure_species_dirs(&slug).unwrap();

        let result = dissolve_species(&workspace, &BuiltinBackend, &slug).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn bad_layer_name_is_skipped_not_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let workspace = Workspace::new(root);
        let slug: SpeciesSlug = "abies-balsamea".parse().unwrap();
        workspace.ensure_species_dirs(&slug).unwrap();

        std::fs::write(
            workspace.polygon_dir(&slug).join("notakey.shp").as_std_path(),
            "{}",
        )
        .unwrap();

        let aggregate = dissolve_species(&workspace, &BuiltinBackend, &slug)
            .unwrap()
            .unwrap();
        assert!(aggregate.layers.is_empty());
        assert_eq!(aggregate.skips.len(), 1);
        assert_eq!(aggregate.skips[0].stage, Stage::Aggregate);
    }

    #[test]
    fn records_carry_area_and_surrogate_ids() {
        let slug: SpeciesSlug = "abies-balsamea".parse().unwrap();
        let square = geo_types::Polygon::new(
            geo_types::LineString::from(vec![
                (0.0, 0.0),
                (2.0, 0.0),
                (2.0, 2.0),
                (0.0, 2.0),
                (0.0, 0.0),
            ]),
            Vec::new(),
        );
        let layers = vec![DissolvedLayer {
            species: slug,
            key: "50_cmip_rcp45_y2070".parse().unwrap(),
            geometry: MultiPolygon::new(vec![square]),
        }];

        let records = build_records(layers);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sid, 0);
        assert_eq!(records[0].year, "2070");
        assert!((records[0].area - 4.0).abs() < 1e-9);
        assert!(records[0].geometry.starts_with("MULTIPOLYGON"));
    }
}
