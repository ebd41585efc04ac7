//! Project session: the map document result layers are published to
//!
//! The running session is a JSON project document. It lists named maps, each
//! with an ordered list of layers, and names the map that is currently
//! active. Adding data appends a layer to the active map and saves the
//! document in place.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Kind of data a layer draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Vector,
    Raster,
}

impl LayerKind {
    /// Guess the layer kind from a file extension
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "shp" | "geojson" | "gpkg" => Some(LayerKind::Vector),
            "tif" | "tiff" | "img" => Some(LayerKind::Raster),
            _ => None,
        }
    }
}

/// A layer on a map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub path: PathBuf,
    pub kind: LayerKind,
}

/// A named map and its layers, drawn bottom to top
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Map {
    pub name: String,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// On-disk project document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active_map: Option<String>,
    #[serde(default)]
    pub maps: Vec<Map>,
}

/// Handle on the running project session
#[derive(Debug)]
pub struct ProjectSession {
    path: PathBuf,
    document: ProjectDocument,
}

impl ProjectSession {
    /// Open the session named by the configuration.
    ///
    /// Fails with `NoActiveSession` when no project is configured or the
    /// document does not exist.
    pub fn current(config: &PipelineConfig) -> Result<Self> {
        let path = config.project.as_deref().ok_or(PipelineError::NoActiveSession)?;
        Self::open(path)
    }

    /// Open a project document
    pub fn open(path: &Path) -> Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(PipelineError::NoActiveSession),
            Err(e) => return Err(e.into()),
        };
        let document: ProjectDocument = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &ProjectDocument {
        &self.document
    }

    /// The active map, `NoActiveMap` when none is set or it does not exist
    pub fn active_map(&self) -> Result<&Map> {
        let name = self.active_map_name()?;
        self.document
            .maps
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| PipelineError::NoActiveMap(self.path.clone()))
    }

    fn active_map_name(&self) -> Result<String> {
        self.document
            .active_map
            .clone()
            .ok_or_else(|| PipelineError::NoActiveMap(self.path.clone()))
    }

    /// Add the dataset at `data` as a new top layer of the active map and
    /// save the project.
    pub fn add_data_from_path(&mut self, data: &Path) -> Result<Layer> {
        let kind = LayerKind::from_path(data).ok_or_else(|| {
            PipelineError::Config(format!("unrecognised data format: {}", data.display()))
        })?;
        let name = data
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let layer = Layer {
            name,
            path: data.canonicalize()?,
            kind,
        };

        let map_name = self.active_map_name()?;
        let map = self
            .document
            .maps
            .iter_mut()
            .find(|m| m.name == map_name)
            .ok_or_else(|| PipelineError::NoActiveMap(self.path.clone()))?;
        map.layers.push(layer.clone());

        self.save()?;
        info!("Layer {} added to map {}", layer.name, map_name);
        Ok(layer)
    }

    /// Write the document back to its file
    pub fn save(&self) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &self.document)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_project(dir: &Path, active: Option<&str>) -> PathBuf {
        let doc = ProjectDocument {
            name: "Sequia".into(),
            active_map: active.map(String::from),
            maps: vec![Map {
                name: "Map".into(),
                layers: vec![],
            }],
        };
        let path = dir.join("project.json");
        serde_json::to_writer(File::create(&path).unwrap(), &doc).unwrap();
        path
    }

    fn config(project: Option<PathBuf>) -> PipelineConfig {
        PipelineConfig {
            project,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_add_layer_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let project = write_project(dir.path(), Some("Map"));
        let data = dir.path().join("NDRE_pastizales.shp");
        File::create(&data).unwrap();

        let mut session = ProjectSession::current(&config(Some(project.clone()))).unwrap();
        let layer = session.add_data_from_path(&data).unwrap();
        assert_eq!(layer.name, "NDRE_pastizales");
        assert_eq!(layer.kind, LayerKind::Vector);

        let reopened = ProjectSession::open(&project).unwrap();
        let layers = &reopened.active_map().unwrap().layers;
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0], layer);
    }

    #[test]
    fn test_no_session() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ProjectSession::current(&config(None)),
            Err(PipelineError::NoActiveSession)
        ));
        assert!(matches!(
            ProjectSession::current(&config(Some(dir.path().join("missing.json")))),
            Err(PipelineError::NoActiveSession)
        ));
    }

    #[test]
    fn test_no_active_map() {
        let dir = tempfile::tempdir().unwrap();
        let project = write_project(dir.path(), None);
        let data = dir.path().join("layer.shp");
        File::create(&data).unwrap();

        let mut session = ProjectSession::open(&project).unwrap();
        assert!(matches!(session.active_map(), Err(PipelineError::NoActiveMap(_))));
        assert!(matches!(
            session.add_data_from_path(&data),
            Err(PipelineError::NoActiveMap(_))
        ));

        let dangling = write_project(dir.path(), Some("Other"));
        let session = ProjectSession::open(&dangling).unwrap();
        assert!(matches!(session.active_map(), Err(PipelineError::NoActiveMap(_))));
    }
}
