//! End-to-end runs of the grassland pipeline on synthetic 8-band scenes

use approx::assert_relative_eq;
use grassmap_core::io::{read_geotiff, read_shapefile, write_bands};
use grassmap_core::{BandStack, GeoTransform, Raster, CRS};
use grassmap_pipeline::session::{Map, ProjectDocument};
use grassmap_pipeline::{
    run, run_on_stack, ExtensionCheckout, PipelineConfig, PipelineError, ProjectSession,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SIZE: usize = 20;
const NIR: f64 = 0.8;
const RED: f64 = 0.2;

/// Red-edge reflectance giving `ndre` against the constant NIR
fn red_edge_for(ndre: f64) -> f64 {
    NIR * (1.0 - ndre) / (1.0 + ndre)
}

/// 20 x 20 scene with 10 m cells:
/// - a 5 x 5 grassland block (2500 m²) in the upper-left corner
/// - a 3 x 3 grassland block (900 m²) in the middle
/// - high NDRE in the five right-most columns, low NDRE elsewhere
/// - open water in the lower-left 5 x 5 block
fn scene(grass: bool) -> BandStack<f64> {
    let transform = GeoTransform::new(300_000.0, 6_000_000.0, 10.0, -10.0);
    let band = |f: &dyn Fn(usize, usize) -> f64| {
        let mut r = Raster::new(SIZE, SIZE);
        for row in 0..SIZE {
            for col in 0..SIZE {
                r.set(row, col, f(row, col)).unwrap();
            }
        }
        r.set_transform(transform);
        r.set_crs(Some(CRS::from_epsg(32719)));
        r
    };

    let ndre_at = |row: usize, col: usize| {
        if grass && ((row < 5 && col < 5) || ((8..11).contains(&row) && (8..11).contains(&col))) {
            0.52
        } else if col >= 15 {
            0.70
        } else {
            0.30
        }
    };
    let green_at = |row: usize, col: usize| if row >= 15 && col < 5 { 0.9 } else { 0.1 };

    let bands = vec![
        band(&|_, _| 0.05),
        band(&|_, _| 0.05),
        band(&green_at),
        band(&|_, _| RED),
        band(&|_, _| 0.1),
        band(&|_, _| 0.1),
        band(&|r, c| red_edge_for(ndre_at(r, c))),
        band(&|_, _| NIR),
    ];
    BandStack::from_bands(&bands).unwrap()
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn project(&self) -> PathBuf {
        let path = self.path("session.json");
        let doc = ProjectDocument {
            name: "Sequia".into(),
            active_map: Some("Map".into()),
            maps: vec![Map {
                name: "Map".into(),
                layers: vec![],
            }],
        };
        fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
        path
    }

    fn config(&self, project: Option<PathBuf>) -> PipelineConfig {
        let license_dir = self.path("licenses");
        fs::create_dir_all(&license_dir).unwrap();
        PipelineConfig {
            overwrite: true,
            project: project.clone(),
            publish_to_map: project.is_some(),
            license_dir,
            ..PipelineConfig::default()
        }
    }
}

fn extension_is_free(config: &PipelineConfig) -> bool {
    ExtensionCheckout::acquire("Spatial", &config.license_dir).is_ok()
}

#[test]
fn test_end_to_end_from_file() {
    let ws = Workspace::new();
    let input = ws.path("scene.tif");
    write_bands(&scene(true), &input, None).unwrap();
    let output = ws.path("out");
    let project = ws.project();
    let config = ws.config(Some(project.clone()));

    let report = run(&input, &output, &config).unwrap();

    for raster in report.outputs.rasters() {
        assert!(raster.exists(), "{} missing", raster.display());
    }
    for ext in ["shp", "shx", "dbf", "prj"] {
        assert!(output.join("NDRE_pastizales").with_extension(ext).exists());
    }

    // float32 storage of the input limits precision
    assert_relative_eq!(report.ndre_statistics.min, 0.30, epsilon = 1e-6);
    assert_relative_eq!(report.ndre_statistics.max, 0.70, epsilon = 1e-6);
    assert_eq!(report.water_cells, 25);
    assert_eq!(report.forest_cells, 0);
    assert_eq!(report.grassland_cells, 34);
    assert_eq!(report.polygons_traced, 2);
    assert_eq!(report.polygons_removed, 1);
    assert_eq!(report.polygons_kept(), 1);

    let classes: Raster<u8> = read_geotiff(&report.outputs.ndre_classes, None).unwrap();
    assert_eq!(classes.get(0, 0).unwrap(), 4);
    assert_eq!(classes.get(0, 19).unwrap(), 6);
    assert_eq!(classes.get(19, 10).unwrap(), 1);
    assert!(classes.data().iter().all(|&c| (1..=6).contains(&c)));

    let polygons = read_shapefile(&report.outputs.grassland_polygons).unwrap();
    assert_eq!(polygons.len(), 1);
    let feature = &polygons.features[0];
    assert_relative_eq!(feature.get_f64("AREA_M2").unwrap(), 2500.0, epsilon = 1e-6);
    assert_eq!(feature.get_f64("gridcode"), Some(1.0));
    let prj = polygons.crs().and_then(|c| c.wkt()).unwrap();
    assert!(prj.contains("WGS_1984_UTM_Zone_19S"));

    let layer = report.published.expect("layer published");
    assert_eq!(layer.name, "NDRE_pastizales");
    let session = ProjectSession::open(&project).unwrap();
    assert_eq!(session.active_map().unwrap().layers, vec![layer]);

    assert!(extension_is_free(&config));
}

#[test]
fn test_rerun_is_byte_identical() {
    let ws = Workspace::new();
    let stack = scene(true);
    let config = ws.config(None);

    let first = run_on_stack(&stack, &ws.path("a"), &config).unwrap();
    let second = run_on_stack(&stack, &ws.path("b"), &config).unwrap();
    let again = run_on_stack(&stack, &ws.path("a"), &config).unwrap();

    for ((a, b), c) in first
        .outputs
        .rasters()
        .iter()
        .zip(second.outputs.rasters().iter())
        .zip(again.outputs.rasters().iter())
    {
        let bytes = fs::read(a).unwrap();
        assert_eq!(bytes, fs::read(b).unwrap(), "{} differs", b.display());
        assert_eq!(bytes, fs::read(c).unwrap(), "{} differs", c.display());
    }
}

#[test]
fn test_comma_locale_gives_same_classes() {
    let ws = Workspace::new();
    let stack = scene(true);

    let mut dot = ws.config(None);
    dot.numeric_locale = grassmap_core::NumericLocale::Dot;
    let mut comma = dot.clone();
    comma.numeric_locale = grassmap_core::NumericLocale::Comma;

    let a = run_on_stack(&stack, &ws.path("dot"), &dot).unwrap();
    let b = run_on_stack(&stack, &ws.path("comma"), &comma).unwrap();
    assert_eq!(a.ndre_statistics, b.ndre_statistics);
    assert_eq!(a.ndre_classes, b.ndre_classes);
}

#[test]
fn test_no_grassland_writes_empty_layer() {
    let ws = Workspace::new();
    let config = ws.config(None);

    let report = run_on_stack(&scene(false), &ws.path("out"), &config).unwrap();
    assert_eq!(report.grassland_cells, 0);
    assert_eq!(report.polygons_traced, 0);

    let polygons = read_shapefile(&report.outputs.grassland_polygons).unwrap();
    assert!(polygons.is_empty());
}

#[test]
fn test_missing_session_fails_and_releases_extension() {
    let ws = Workspace::new();
    let mut config = ws.config(None);
    config.publish_to_map = true;

    let result = run_on_stack(&scene(true), &ws.path("out"), &config);
    assert!(matches!(result, Err(PipelineError::NoActiveSession)));
    // outputs up to the publishing step were written
    assert!(ws.path("out").join("NDRE_pastizales.shp").exists());
    assert!(extension_is_free(&config));
}

#[test]
fn test_held_extension_blocks_run() {
    let ws = Workspace::new();
    let config = ws.config(None);

    let _held = ExtensionCheckout::acquire("Spatial", &config.license_dir).unwrap();
    assert!(matches!(
        run_on_stack(&scene(true), &ws.path("out"), &config),
        Err(PipelineError::ExtensionUnavailable(_))
    ));
    assert!(!ws.path("out").exists());
}

#[test]
fn test_no_overwrite_rejects_existing_outputs() {
    let ws = Workspace::new();
    let stack = scene(true);
    let mut config = ws.config(None);

    run_on_stack(&stack, &ws.path("out"), &config).unwrap();
    config.overwrite = false;
    let result = run_on_stack(&stack, &ws.path("out"), &config);
    assert!(matches!(
        result,
        Err(PipelineError::Core(grassmap_core::Error::OutputExists(_)))
    ));
    assert!(extension_is_free(&config));
}

#[test]
fn test_too_few_bands() {
    let ws = Workspace::new();
    let config = ws.config(None);
    let bands: Vec<Raster<f64>> = (0..4).map(|_| Raster::filled(4, 4, 0.5)).collect();
    let stack = BandStack::from_bands(&bands).unwrap();

    let result = run_on_stack(&stack, &ws.path("out"), &config);
    assert!(matches!(
        result,
        Err(PipelineError::Core(grassmap_core::Error::BandOutOfRange { band: 7, count: 4 }))
    ));
}

#[test]
fn test_missing_input_is_io_error() {
    let ws = Workspace::new();
    let config = ws.config(None);
    let result = run(Path::new("/nonexistent/scene.tif"), &ws.path("out"), &config);
    assert!(matches!(
        result,
        Err(PipelineError::Core(grassmap_core::Error::Io(_)))
    ));
}
