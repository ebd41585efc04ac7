//! Output file names written by the pipeline

use std::path::{Path, PathBuf};

pub const NDVI_TIF: &str = "NDVI.tif";
pub const NDRE_TIF: &str = "NDRE.tif";
pub const NDWI_TIF: &str = "NDWI.tif";
/// Water mask
pub const WATER_TIF: &str = "agua.tif";
/// Forest mask
pub const FOREST_TIF: &str = "bosque.tif";
pub const NDRE_CLASSES_TIF: &str = "NDRE_clasificado.tif";
/// Grassland mask
pub const GRASSLAND_TIF: &str = "NDRE_pastizales.tif";
/// Filtered grassland polygons
pub const GRASSLAND_SHP: &str = "NDRE_pastizales.shp";

/// Paths of every output under one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub ndvi: PathBuf,
    pub ndre: PathBuf,
    pub ndwi: PathBuf,
    pub water: PathBuf,
    pub forest: PathBuf,
    pub ndre_classes: PathBuf,
    pub grassland: PathBuf,
    pub grassland_polygons: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            ndvi: dir.join(NDVI_TIF),
            ndre: dir.join(NDRE_TIF),
            ndwi: dir.join(NDWI_TIF),
            water: dir.join(WATER_TIF),
            forest: dir.join(FOREST_TIF),
            ndre_classes: dir.join(NDRE_CLASSES_TIF),
            grassland: dir.join(GRASSLAND_TIF),
            grassland_polygons: dir.join(GRASSLAND_SHP),
        }
    }

    /// Raster outputs in the order they are written
    pub fn rasters(&self) -> [&Path; 7] {
        [
            self.ndvi.as_path(),
            self.ndre.as_path(),
            self.ndwi.as_path(),
            self.water.as_path(),
            self.forest.as_path(),
            self.ndre_classes.as_path(),
            self.grassland.as_path(),
        ]
    }
}
