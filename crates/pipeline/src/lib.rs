//! # grassmap pipeline
//!
//! Grassland identification from a multispectral raster:
//!
//! 1. Bands 3 (green), 4 (red), 7 (red edge) and 8 (NIR) are extracted.
//! 2. NDVI, NDRE and NDWI are computed and saved.
//! 3. Water (NDWI > 0) and forest (NDVI > 0.6) masks are saved.
//! 4. NDRE minimum, mean and maximum are read from the raster properties.
//! 5. NDRE is reclassified into six vigour classes.
//! 6. The grassland mask (NDRE in [0.41, 0.59]) is saved, polygonized, and
//!    polygons under 1600 m² are deleted.
//! 7. The polygon layer is added to the active map of the project session.
//!
//! The whole run holds the spatial analysis extension checkout.

pub mod config;
pub mod error;
pub mod license;
pub mod outputs;
pub mod session;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use license::ExtensionCheckout;
pub use outputs::OutputPaths;
pub use session::{Layer, ProjectSession};

use grassmap_algorithms::imagery::{
    ndre, ndvi, ndwi, range_mask, reclassify, threshold_mask, RemapTable, NDRE_BREAKS,
};
use grassmap_algorithms::statistics::{band_statistics, BandStatistics};
use grassmap_algorithms::vector::{add_area_field, polygonize, remove_smaller_than, AREA_FIELD, MIN_AREA_M2};
use grassmap_core::io::{read_bands, write_geotiff, write_shapefile, GeoTiffOptions, ShapefileOptions};
use grassmap_core::{BandStack, Raster, RasterElement};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Green band (1-based)
pub const BAND_GREEN: usize = 3;
/// Red band (1-based)
pub const BAND_RED: usize = 4;
/// Red-edge band (1-based)
pub const BAND_RED_EDGE: usize = 7;
/// Near-infrared band (1-based)
pub const BAND_NIR: usize = 8;

/// Cells with NDWI above this are water
pub const WATER_NDWI: f64 = 0.0;
/// Cells with NDVI above this are forest
pub const FOREST_NDVI: f64 = 0.6;
/// Closed NDRE interval of grassland cells
pub const GRASSLAND_NDRE: (f64, f64) = (NDRE_BREAKS[0], NDRE_BREAKS[NDRE_BREAKS.len() - 1]);

/// What a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub outputs: OutputPaths,
    pub ndre_statistics: BandStatistics,
    pub ndre_classes: RemapTable,
    pub water_cells: usize,
    pub forest_cells: usize,
    pub grassland_cells: usize,
    /// Polygons traced from the grassland mask
    pub polygons_traced: usize,
    /// Polygons deleted for being smaller than the minimum area
    pub polygons_removed: usize,
    /// Layer added to the active map, `None` when publishing is disabled
    pub published: Option<Layer>,
}

impl PipelineReport {
    pub fn polygons_kept(&self) -> usize {
        self.polygons_traced - self.polygons_removed
    }
}

/// Run the pipeline on the raster at `input`, writing into `output_dir`
pub fn run(input: &Path, output_dir: &Path, config: &PipelineConfig) -> Result<PipelineReport> {
    info!("Starting grassland identification for {}", input.display());
    let stack: BandStack<f64> = read_bands(input)?;
    debug!(
        "{} band(s), {}x{} cells, cell size {}",
        stack.band_count(),
        stack.cols(),
        stack.rows(),
        stack.cell_size()
    );
    run_on_stack(&stack, output_dir, config)
}

/// Run the pipeline on an already loaded band stack
pub fn run_on_stack(stack: &BandStack<f64>, output_dir: &Path, config: &PipelineConfig) -> Result<PipelineReport> {
    let _license = ExtensionCheckout::acquire(license::SPATIAL_ANALYST, &config.license_dir)?;

    fs::create_dir_all(output_dir)?;
    let outputs = OutputPaths::new(output_dir);
    let tiff_options = GeoTiffOptions {
        compression: config.compression.clone(),
        overwrite: config.overwrite,
    };

    let green = stack.band(BAND_GREEN)?;
    let red = stack.band(BAND_RED)?;
    let red_edge = stack.band(BAND_RED_EDGE)?;
    let nir = stack.band(BAND_NIR)?;

    let ndvi = ndvi(&nir, &red)?;
    write(&ndvi, &outputs.ndvi, &tiff_options)?;

    let ndre = ndre(&nir, &red_edge)?;
    write(&ndre, &outputs.ndre, &tiff_options)?;

    let ndwi = ndwi(&green, &nir)?;
    write(&ndwi, &outputs.ndwi, &tiff_options)?;

    let water = threshold_mask(&ndwi, WATER_NDWI)?;
    let forest = threshold_mask(&ndvi, FOREST_NDVI)?;
    write(&water, &outputs.water, &tiff_options)?;
    write(&forest, &outputs.forest, &tiff_options)?;

    let stats = band_statistics(&ndre, config.numeric_locale)?;
    info!("NDRE stats -> {}", stats);

    let table = RemapTable::ndre_classes(stats.min, stats.max)?;
    let classes = reclassify(&ndre, &table)?;
    write(&classes, &outputs.ndre_classes, &tiff_options)?;

    let (low, high) = GRASSLAND_NDRE;
    let grassland = range_mask(&ndre, low, high)?;
    write(&grassland, &outputs.grassland, &tiff_options)?;

    let mut polygons = polygonize(&grassland)?;
    let polygons_traced = polygons.len();
    add_area_field(&mut polygons, AREA_FIELD)?;
    let polygons_removed = remove_smaller_than(&mut polygons, AREA_FIELD, MIN_AREA_M2)?;
    info!(
        "{} grassland polygon(s), {} under {} m² deleted",
        polygons_traced, polygons_removed, MIN_AREA_M2
    );
    write_shapefile(
        &polygons,
        &outputs.grassland_polygons,
        Some(ShapefileOptions {
            overwrite: config.overwrite,
        }),
    )?;

    let published = if config.publish_to_map {
        let mut session = ProjectSession::current(config)?;
        let layer = session.add_data_from_path(&outputs.grassland_polygons)?;
        info!("Grassland shapefile added to the map");
        Some(layer)
    } else {
        None
    };

    info!("Completed: filtered raster and vector outputs written");
    Ok(PipelineReport {
        outputs,
        ndre_statistics: stats,
        ndre_classes: table,
        water_cells: water.valid_count(),
        forest_cells: forest.valid_count(),
        grassland_cells: grassland.valid_count(),
        polygons_traced,
        polygons_removed,
        published,
    })
}

fn write<T: RasterElement>(raster: &Raster<T>, path: &Path, options: &GeoTiffOptions) -> Result<()> {
    debug!("writing {}", path.display());
    write_geotiff(raster, path, Some(options.clone()))?;
    Ok(())
}
