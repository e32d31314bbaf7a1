use camino::Utf8PathBuf;
use geo::Area;

use species_range_pipeline::backend::BuiltinBackend;
use species_range_pipeline::convert::{convert_grids, normalize_grids};
use species_range_pipeline::domain::SpeciesSlug;
use species_range_pipeline::grid::{Grid, GridHeader};
use species_range_pipeline::layout::Workspace;
use species_range_pipeline::polygonize::polygonize_species;
use species_range_pipeline::aggregate::dissolve_species;

// cells on both sides of every cutoff
fn sample_grid() -> Grid {
    Grid {
        header: GridHeader {
            ncols: 4,
            nrows: 4,
            xllcorner: -80.0,
            yllcorner: 35.0,
            cellsize: 0.25,
            nodata: -9999.0,
        },
        values: vec![
            0.05, 0.20, 0.30, 0.40, //
            0.45, 0.55, 0.60, 0.65, //
            0.70, 0.80, 0.85, 0.90, //
            0.10, -9999.0, 0.95, 0.50,
        ],
    }
}

#[test]
fn lower_thresholds_cover_at_least_as_much_area() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let workspace = Workspace::new(root);
    let slug: SpeciesSlug = "abies-balsamea".parse().unwrap();
    workspace.ensure_species_dirs(&slug).unwrap();

    std::fs::write(
        workspace.grid_dir(&slug).join("current.txt").as_std_path(),
        sample_grid().to_ascii(),
    )
    .unwrap();

    let backend = BuiltinBackend;
    assert_eq!(normalize_grids(&workspace, &slug).unwrap(), 1);
    assert!(convert_grids(&workspace, &backend, &slug).unwrap().is_empty());
    assert!(polygonize_species(&workspace, &backend, &slug)
        .unwrap()
        .is_empty());

    let aggregate = dissolve_species(&workspace, &backend, &slug)
        .unwrap()
        .unwrap();
    assert!(aggregate.skips.is_empty());
    assert_eq!(aggregate.layers.len(), 3);

    let area_at = |threshold: u32| -> f64 {
        aggregate
            .layers
            .iter()
            .find(|layer| layer.key.threshold == threshold)
            .map(|layer| layer.geometry.unsigned_area())
            .unwrap()
    };

    let (a25, a50, a75) = (area_at(25), area_at(50), area_at(75));
    assert!(a25 >= a50);
    assert!(a50 >= a75);
    // the sample surface separates all three cutoffs strictly
    assert!(a25 > a75);
    assert!(a75 > 0.0);
}

#[test]
fn nodata_cells_never_enter_any_layer() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let workspace = Workspace::new(root);
    let slug: SpeciesSlug = "acer-rubrum".parse().unwrap();
    workspace.ensure_species_dirs(&slug).unwrap();

    // every valid cell passes the lowest cutoff; one cell is nodata
    let grid = Grid {
        header: GridHeader {
            ncols: 2,
            nrows: 2,
            xllcorner: 0.0,
            yllcorner: 0.0,
            cellsize: 1.0,
            nodata: -9999.0,
        },
        values: vec![0.9, 0.9, -9999.0, 0.9],
    };
    std::fs::write(
        workspace.grid_dir(&slug).join("current.txt").as_std_path(),
        grid.to_ascii(),
    )
    .unwrap();

    let backend = BuiltinBackend;
    normalize_grids(&workspace, &slug).unwrap();
    convert_grids(&workspace, &backend, &slug).unwrap();
    polygonize_species(&workspace, &backend, &slug).unwrap();

    let aggregate = dissolve_species(&workspace, &backend, &slug)
        .unwrap()
        .unwrap();
    for layer in &aggregate.layers {
        assert!((layer.geometry.unsigned_area() - 3.0).abs() < 1e-9);
    }
}
