//! Nearest-neighbour index
//!
//! Nodes are bucketed per connected component; queries scan either one
//! bucket or all of them.

use std::collections::BTreeMap;

use cspace_core::Configuration;

use super::Node;
use crate::distance::Distance;
use crate::{ComponentId, NodeId};

#[derive(Debug, Clone, Default)]
pub struct NearestNeighbour {
    buckets: BTreeMap<ComponentId, Vec<NodeId>>,
}

impl NearestNeighbour {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: NodeId, component: ComponentId) {
        self.buckets.entry(component).or_default().push(node);
    }

    /// Move every node of `absorbed` into `into`
    pub fn merge(&mut self, absorbed: ComponentId, into: ComponentId) {
        if let Some(nodes) = self.buckets.remove(&absorbed) {
            self.buckets.entry(into).or_default().extend(nodes);
        }
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// The `k` nodes closest to `q`, closest first
    pub fn search(
        &self,
        q: &Configuration,
        component: Option<ComponentId>,
        k: usize,
        nodes: &[Node],
        distance: &dyn Distance,
    ) -> Vec<(NodeId, f64)> {
        let candidates: Box<dyn Iterator<Item = &NodeId>> = match component {
            Some(c) => match self.buckets.get(&c) {
                Some(bucket) => Box::new(bucket.iter()),
                None => return Vec::new(),
            },
            None => Box::new(self.buckets.values().flatten()),
        };

        let mut found: Vec<(NodeId, f64)> = candidates
            .map(|&id| (id, distance.distance(q, &nodes[id].configuration)))
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        found.truncate(k);
        found
    }
}
