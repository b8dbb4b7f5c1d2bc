//! Roadmap persistence
//!
//! JSON document holding node configurations, edges as
//! `(from, to, path_id, reversed)` and the local paths. Connected components
//! are not stored: they are rebuilt from the edges on load.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path as FsPath;
use std::sync::Arc;

use cspace_core::model::ConfigurationModel;
use log::info;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::Roadmap;
use crate::distance::Distance;
use crate::error::PlannerError;
use crate::path::Path;

/// Serialized edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: usize,
    pub to: usize,
    pub path_id: usize,
    pub reversed: bool,
}

/// Serialized local path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalPathRecord {
    pub waypoints: Vec<Vec<f64>>,
    pub lengths: Vec<f64>,
}

/// Serialized roadmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapDocument {
    /// Configuration size of the model the roadmap was built for
    pub dimension: usize,
    pub nodes: Vec<Vec<f64>>,
    pub edges: Vec<EdgeRecord>,
    pub local_paths: Vec<LocalPathRecord>,
}

impl Roadmap {
    pub fn to_document(&self) -> RoadmapDocument {
        RoadmapDocument {
            dimension: self.model.config_size(),
            nodes: self
                .nodes
                .iter()
                .map(|n| n.configuration.iter().copied().collect())
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|e| EdgeRecord {
                    from: e.from,
                    to: e.to,
                    path_id: e.path_id,
                    reversed: e.reversed,
                })
                .collect(),
            local_paths: self
                .local_paths
                .iter()
                .map(|p| LocalPathRecord {
                    waypoints: p.waypoint_rows(),
                    lengths: p.segment_lengths().to_vec(),
                })
                .collect(),
        }
    }

    /// Rebuild a roadmap from a document
    pub fn from_document(
        document: &RoadmapDocument,
        model: Arc<dyn ConfigurationModel>,
        distance: Arc<dyn Distance>,
    ) -> Result<Roadmap, PlannerError> {
        let dimension = model.config_size();
        if document.dimension != dimension {
            return Err(PlannerError::Serialization(format!(
                "roadmap dimension {} does not match model dimension {}",
                document.dimension, dimension
            )));
        }
        let vector = |row: &Vec<f64>| -> Result<DVector<f64>, PlannerError> {
            if row.len() != dimension {
                return Err(PlannerError::Serialization(format!(
                    "configuration of size {} in a roadmap of dimension {}",
                    row.len(),
                    dimension
                )));
            }
            Ok(DVector::from_column_slice(row))
        };

        let mut roadmap = Roadmap::new(model.clone(), distance);
        for row in &document.nodes {
            roadmap.push_node(vector(row)?);
        }
        for record in &document.local_paths {
            let waypoints = record
                .waypoints
                .iter()
                .map(&vector)
                .collect::<Result<Vec<_>, _>>()?;
            let path = Path::from_parts(model.clone(), waypoints, record.lengths.clone())?;
            roadmap.add_local_path(path)?;
        }
        for edge in &document.edges {
            roadmap.node(edge.from)?;
            roadmap.node(edge.to)?;
            roadmap.local_path(edge.path_id)?;
            roadmap.push_edge(edge.from, edge.to, edge.path_id, edge.reversed);
        }
        Ok(roadmap)
    }

    pub fn save<W: Write>(&self, writer: W) -> Result<(), PlannerError> {
        serde_json::to_writer_pretty(writer, &self.to_document())?;
        Ok(())
    }

    pub fn load<R: Read>(
        reader: R,
        model: Arc<dyn ConfigurationModel>,
        distance: Arc<dyn Distance>,
    ) -> Result<Roadmap, PlannerError> {
        let document: RoadmapDocument = serde_json::from_reader(reader)?;
        Self::from_document(&document, model, distance)
    }

    pub fn save_to_file<P: AsRef<FsPath>>(&self, path: P) -> Result<(), PlannerError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.save(&mut writer)?;
        writer.flush()?;
        info!(
            "[Roadmap] saved {} nodes, {} edges to {}",
            self.node_count(),
            self.edge_count(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn load_from_file<P: AsRef<FsPath>>(
        path: P,
        model: Arc<dyn ConfigurationModel>,
        distance: Arc<dyn Distance>,
    ) -> Result<Roadmap, PlannerError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let roadmap = Self::load(reader, model, distance)?;
        info!(
            "[Roadmap] loaded {} nodes, {} edges from {}",
            roadmap.node_count(),
            roadmap.edge_count(),
            path.as_ref().display()
        );
        Ok(roadmap)
    }
}
