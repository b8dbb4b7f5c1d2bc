//! Roadmap graph
//!
//! Nodes and edges are never removed individually, so their ids are indices.
//! Edges reference local paths held by the roadmap itself; a reverse edge
//! shares the path of its forward edge and is flagged `reversed`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use cspace_core::error::check_dimension;
use cspace_core::model::ConfigurationModel;
use cspace_core::{Configuration, CONFIG_EPSILON};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::search::{dijkstra, Adjacency};
use super::NearestNeighbour;
use crate::distance::Distance;
use crate::error::PlannerError;
use crate::path::{Path, CONTINUITY_TOLERANCE};
use crate::{ComponentId, EdgeId, NodeId};

/// Roadmap node
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub configuration: Configuration,
    pub component: ComponentId,
}

/// Directed roadmap edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    /// Index into the roadmap's local paths
    pub path_id: usize,
    /// Traverses the local path backwards
    pub reversed: bool,
}

/// Maximal set of nodes closed under the edge relation
#[derive(Debug, Clone)]
pub struct ConnectedComponent {
    pub id: ComponentId,
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Roadmap {
    pub(super) model: Arc<dyn ConfigurationModel>,
    pub(super) distance: Arc<dyn Distance>,
    pub(super) nodes: Vec<Node>,
    pub(super) edges: Vec<Edge>,
    pub(super) local_paths: Vec<Path>,
    components: BTreeMap<ComponentId, ConnectedComponent>,
    next_component: ComponentId,
    index: NearestNeighbour,
}

impl Roadmap {
    pub fn new(model: Arc<dyn ConfigurationModel>, distance: Arc<dyn Distance>) -> Self {
        Self {
            model,
            distance,
            nodes: Vec::new(),
            edges: Vec::new(),
            local_paths: Vec::new(),
            components: BTreeMap::new(),
            next_component: 0,
            index: NearestNeighbour::new(),
        }
    }

    pub fn model(&self) -> &Arc<dyn ConfigurationModel> {
        &self.model
    }

    pub fn distance(&self) -> &Arc<dyn Distance> {
        &self.distance
    }

    /// Insert a configuration; an existing equal node is returned instead
    pub fn add_node(&mut self, q: &Configuration) -> Result<NodeId, PlannerError> {
        check_dimension("configuration", self.model.config_size(), q.len())?;
        if let Some(&(id, d)) = self
            .index
            .search(q, None, 1, &self.nodes, self.distance.as_ref())
            .first()
        {
            if d <= CONFIG_EPSILON {
                return Ok(id);
            }
        }
        Ok(self.push_node(q.clone()))
    }

    /// Append a node in a fresh component
    pub(super) fn push_node(&mut self, configuration: Configuration) -> NodeId {
        let id = self.nodes.len();
        let component = self.next_component;
        self.next_component += 1;
        self.nodes.push(Node {
            id,
            configuration,
            component,
        });
        self.components.insert(
            component,
            ConnectedComponent {
                id: component,
                nodes: vec![id],
            },
        );
        self.index.add(id, component);
        id
    }

    /// Store a local path for later use by edges
    pub fn add_local_path(&mut self, path: Path) -> Result<usize, PlannerError> {
        check_dimension(
            "local path configuration",
            self.model.config_size(),
            path.initial().len(),
        )?;
        self.local_paths.push(path);
        Ok(self.local_paths.len() - 1)
    }

    pub fn local_path(&self, path_id: usize) -> Result<&Path, PlannerError> {
        self.local_paths
            .get(path_id)
            .ok_or(PlannerError::UnknownPath(path_id))
    }

    /// Insert an edge carrying `path`, and its reverse when `both`
    ///
    /// `path` must start at `from` and end at `to`.
    pub fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        path: Path,
        both: bool,
    ) -> Result<Vec<EdgeId>, PlannerError> {
        let joins = |q: &Configuration, node: NodeId| -> Result<bool, PlannerError> {
            let gap = self.model.difference(q, &self.node(node)?.configuration).norm();
            Ok(gap <= CONTINUITY_TOLERANCE)
        };
        if !joins(path.initial(), from)? || !joins(path.end(), to)? {
            return Err(PlannerError::InvalidArgument(format!(
                "local path does not join node {} to node {}",
                from, to
            )));
        }
        let path_id = self.add_local_path(path)?;
        self.add_edge_with_path_id(from, to, path_id, both)
    }

    /// Insert an edge over an already stored local path
    pub fn add_edge_with_path_id(
        &mut self,
        from: NodeId,
        to: NodeId,
        path_id: usize,
        both: bool,
    ) -> Result<Vec<EdgeId>, PlannerError> {
        self.node(from)?;
        self.node(to)?;
        self.local_path(path_id)?;

        let mut ids = vec![self.push_edge(from, to, path_id, false)];
        if both {
            ids.push(self.push_edge(to, from, path_id, true));
        }
        Ok(ids)
    }

    pub(super) fn push_edge(&mut self, from: NodeId, to: NodeId, path_id: usize, reversed: bool) -> EdgeId {
        let id = self.edges.len();
        self.edges.push(Edge {
            id,
            from,
            to,
            path_id,
            reversed,
        });
        self.merge(self.nodes[from].component, self.nodes[to].component);
        id
    }

    /// Absorb the smaller component into the larger one
    fn merge(&mut self, a: ComponentId, b: ComponentId) {
        if a == b {
            return;
        }
        let size = |c: ComponentId| self.components.get(&c).map_or(0, |cc| cc.nodes.len());
        let (into, absorbed) = if size(a) >= size(b) { (a, b) } else { (b, a) };

        let Some(absorbed_component) = self.components.remove(&absorbed) else {
            return;
        };
        for &node in &absorbed_component.nodes {
            self.nodes[node].component = into;
        }
        if let Some(target) = self.components.get_mut(&into) {
            target.nodes.extend(absorbed_component.nodes);
        }
        self.index.merge(absorbed, into);
        debug!(
            "[Roadmap] merged component {} into {} ({} components left)",
            absorbed,
            into,
            self.components.len()
        );
    }

    /// Closest node, optionally within one component
    pub fn nearest_node(
        &self,
        q: &Configuration,
        component: Option<ComponentId>,
    ) -> Result<Option<(NodeId, f64)>, PlannerError> {
        Ok(self.nearest_nodes(q, component, 1)?.into_iter().next())
    }

    /// The `k` closest nodes, closest first
    pub fn nearest_nodes(
        &self,
        q: &Configuration,
        component: Option<ComponentId>,
        k: usize,
    ) -> Result<Vec<(NodeId, f64)>, PlannerError> {
        check_dimension("configuration", self.model.config_size(), q.len())?;
        if let Some(c) = component {
            self.component(c)?;
        }
        Ok(self
            .index
            .search(q, component, k, &self.nodes, self.distance.as_ref()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, PlannerError> {
        self.nodes.get(id).ok_or(PlannerError::UnknownNode(id))
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge, PlannerError> {
        self.edges.get(id).ok_or(PlannerError::UnknownEdge(id))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn components(&self) -> impl Iterator<Item = &ConnectedComponent> {
        self.components.values()
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.components.keys().copied().collect()
    }

    pub fn component(&self, id: ComponentId) -> Result<&ConnectedComponent, PlannerError> {
        self.components
            .get(&id)
            .ok_or(PlannerError::UnknownComponent(id))
    }

    pub fn has_component(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    pub fn component_nodes(&self, id: ComponentId) -> Result<&[NodeId], PlannerError> {
        Ok(&self.component(id)?.nodes)
    }

    pub fn component_of(&self, node: NodeId) -> Result<ComponentId, PlannerError> {
        Ok(self.node(node)?.component)
    }

    pub fn same_component(&self, a: NodeId, b: NodeId) -> Result<bool, PlannerError> {
        Ok(self.component_of(a)? == self.component_of(b)?)
    }

    /// Whether `to` can be reached from `from` following edge directions
    pub fn reaches(&self, from: NodeId, to: NodeId) -> Result<bool, PlannerError> {
        if !self.same_component(from, to)? {
            return Ok(false);
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([from]);
        seen[from] = true;
        while let Some(node) = queue.pop_front() {
            if node == to {
                return Ok(true);
            }
            for edge in self.edges.iter().filter(|e| e.from == node) {
                if !seen[edge.to] {
                    seen[edge.to] = true;
                    queue.push_back(edge.to);
                }
            }
        }
        Ok(false)
    }

    /// Local path of an edge, in the edge's direction
    pub fn edge_path(&self, id: EdgeId) -> Result<Path, PlannerError> {
        let edge = self.edge(id)?;
        let path = self.local_path(edge.path_id)?;
        Ok(if edge.reversed { path.reverse() } else { path.clone() })
    }

    /// Edges of a shortest path, weighted by local path length
    pub fn shortest_path(&self, from: NodeId, to: NodeId) -> Result<Option<Vec<EdgeId>>, PlannerError> {
        self.node(from)?;
        self.node(to)?;
        let mut adjacency: Adjacency = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            let length = self.local_paths[edge.path_id].length();
            adjacency[edge.from].push((edge.to, edge.id, length));
        }
        Ok(dijkstra(&adjacency, from, to))
    }

    /// Path following a shortest edge sequence from `from` to `to`
    pub fn path_between(&self, from: NodeId, to: NodeId) -> Result<Option<Path>, PlannerError> {
        let Some(edges) = self.shortest_path(from, to)? else {
            return Ok(None);
        };
        let mut path = Path::from_parts(
            self.model.clone(),
            vec![self.node(from)?.configuration.clone()],
            Vec::new(),
        )?;
        for edge in edges {
            let piece = self.edge_path(edge)?;
            if !path.concat(&piece) {
                return Err(PlannerError::InvalidArgument(format!(
                    "local path of edge {} does not join its nodes",
                    edge
                )));
            }
        }
        Ok(Some(path))
    }

    /// Remove every node, edge, component and local path
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.local_paths.clear();
        self.components.clear();
        self.index.clear();
        self.next_component = 0;
        info!("[Roadmap] cleared");
    }

    /// Clear and switch to a new metric
    ///
    /// The nearest-neighbour index is rebuilt from scratch for the new metric.
    pub fn reset(&mut self, distance: Arc<dyn Distance>) {
        self.clear();
        self.distance = distance;
        self.index = NearestNeighbour::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::WeighedDistance;
    use approx::assert_relative_eq;
    use cspace_core::model::KinematicTree;
    use nalgebra::DVector;

    fn roadmap() -> Roadmap {
        let model: Arc<dyn ConfigurationModel> =
            Arc::new(KinematicTree::free_point(&[(-5.0, 5.0), (-5.0, 5.0)], 0.1).unwrap());
        let distance = Arc::new(WeighedDistance::new(model.clone()));
        Roadmap::new(model, distance)
    }

    fn q(x: f64, y: f64) -> Configuration {
        DVector::from_vec(vec![x, y])
    }

    fn connect(roadmap: &mut Roadmap, a: NodeId, b: NodeId, both: bool) -> Vec<EdgeId> {
        let path = Path::straight(
            roadmap.model().clone(),
            roadmap.distance().as_ref(),
            roadmap.node(a).unwrap().configuration.clone(),
            roadmap.node(b).unwrap().configuration.clone(),
        )
        .unwrap();
        roadmap.add_edge(a, b, path, both).unwrap()
    }

    #[test]
    fn test_duplicate_configuration_returns_existing_node() {
        let mut roadmap = roadmap();
        let a = roadmap.add_node(&q(1.0, 1.0)).unwrap();
        let b = roadmap.add_node(&q(1.0, 1.0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(roadmap.node_count(), 1);
        assert!(roadmap.add_node(&DVector::zeros(3)).is_err());
    }

    #[test]
    fn test_reverse_edge_shares_path() {
        let mut roadmap = roadmap();
        let a = roadmap.add_node(&q(0.0, 0.0)).unwrap();
        let b = roadmap.add_node(&q(1.0, 0.0)).unwrap();
        let ids = connect(&mut roadmap, a, b, true);
        assert_eq!(ids.len(), 2);
        let (forward, backward) = (*roadmap.edge(ids[0]).unwrap(), *roadmap.edge(ids[1]).unwrap());
        assert_eq!(forward.path_id, backward.path_id);
        assert!(backward.reversed);
        assert_eq!((backward.from, backward.to), (b, a));
        assert_relative_eq!(
            roadmap.edge_path(ids[1]).unwrap().initial().clone(),
            q(1.0, 0.0)
        );
    }

    #[test]
    fn test_edge_path_must_join_nodes() {
        let mut roadmap = roadmap();
        let a = roadmap.add_node(&q(0.0, 0.0)).unwrap();
        let b = roadmap.add_node(&q(1.0, 0.0)).unwrap();
        let elsewhere = Path::straight(
            roadmap.model().clone(),
            roadmap.distance().as_ref(),
            q(0.0, 0.0),
            q(0.0, 1.0),
        )
        .unwrap();
        let err = roadmap.add_edge(a, b, elsewhere.clone(), true).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidArgument(_)));
        // Backwards
        assert!(roadmap.add_edge(b, a, elsewhere, false).is_err());
        assert_eq!(roadmap.edge_count(), 0);
        assert_eq!(roadmap.component_count(), 2);
    }

    #[test]
    fn test_reaches_follows_directions() {
        let mut roadmap = roadmap();
        let a = roadmap.add_node(&q(0.0, 0.0)).unwrap();
        let b = roadmap.add_node(&q(1.0, 0.0)).unwrap();
        let c = roadmap.add_node(&q(2.0, 0.0)).unwrap();
        connect(&mut roadmap, a, b, false);
        assert!(roadmap.same_component(a, b).unwrap());
        assert!(roadmap.reaches(a, b).unwrap());
        assert!(!roadmap.reaches(b, a).unwrap());
        assert!(!roadmap.reaches(a, c).unwrap());
        assert!(roadmap.reaches(c, c).unwrap());
    }

    #[test]
    fn test_merge_absorbs_smaller_component() {
        let mut roadmap = roadmap();
        let a = roadmap.add_node(&q(0.0, 0.0)).unwrap();
        let b = roadmap.add_node(&q(1.0, 0.0)).unwrap();
        let c = roadmap.add_node(&q(2.0, 0.0)).unwrap();
        connect(&mut roadmap, a, b, true);
        let big = roadmap.component_of(a).unwrap();
        let small = roadmap.component_of(c).unwrap();

        connect(&mut roadmap, c, b, false);
        assert_eq!(roadmap.component_count(), 1);
        assert_eq!(roadmap.component_of(c).unwrap(), big);
        assert!(matches!(
            roadmap.component_nodes(small),
            Err(PlannerError::UnknownComponent(_))
        ));
        assert_eq!(roadmap.component_nodes(big).unwrap().len(), 3);
    }

    #[test]
    fn test_nearest_restricted_to_component() {
        let mut roadmap = roadmap();
        let a = roadmap.add_node(&q(0.0, 0.0)).unwrap();
        let b = roadmap.add_node(&q(3.0, 0.0)).unwrap();
        let target = q(2.5, 0.0);

        let (nearest, d) = roadmap.nearest_node(&target, None).unwrap().unwrap();
        assert_eq!(nearest, b);
        assert_relative_eq!(d, 0.5);

        let component_a = roadmap.component_of(a).unwrap();
        let (nearest, d) = roadmap
            .nearest_node(&target, Some(component_a))
            .unwrap()
            .unwrap();
        assert_eq!(nearest, a);
        assert_relative_eq!(d, 2.5);

        assert!(roadmap.nearest_node(&target, Some(99)).is_err());
        assert_eq!(roadmap.nearest_nodes(&target, None, 5).unwrap().len(), 2);
    }

    #[test]
    fn test_shortest_path_follows_directed_edges() {
        let mut roadmap = roadmap();
        let a = roadmap.add_node(&q(0.0, 0.0)).unwrap();
        let b = roadmap.add_node(&q(1.0, 0.0)).unwrap();
        let c = roadmap.add_node(&q(1.0, 1.0)).unwrap();
        connect(&mut roadmap, a, b, false);
        connect(&mut roadmap, b, c, true);

        let path = roadmap.path_between(a, c).unwrap().unwrap();
        assert_relative_eq!(path.length(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(path.end().clone(), q(1.0, 1.0));
        // a -> b is one-way
        assert!(roadmap.path_between(c, a).unwrap().is_none());
        // Trivial path
        assert_eq!(roadmap.path_between(b, b).unwrap().unwrap().length(), 0.0);
    }

    #[test]
    fn test_clear_and_reset() {
        let mut roadmap = roadmap();
        let a = roadmap.add_node(&q(0.0, 0.0)).unwrap();
        let b = roadmap.add_node(&q(1.0, 0.0)).unwrap();
        connect(&mut roadmap, a, b, true);
        roadmap.clear();
        assert_eq!(roadmap.node_count(), 0);
        assert_eq!(roadmap.edge_count(), 0);
        assert_eq!(roadmap.component_count(), 0);
        assert!(roadmap.nearest_node(&q(0.0, 0.0), None).unwrap().is_none());

        let model = roadmap.model().clone();
        let distance = Arc::new(WeighedDistance::with_weights(model, &[2.0, 2.0]).unwrap());
        roadmap.reset(distance);
        roadmap.add_node(&q(1.0, 0.0)).unwrap();
        let (_, d) = roadmap.nearest_node(&q(0.0, 0.0), None).unwrap().unwrap();
        assert_relative_eq!(d, 2.0);
    }
}
