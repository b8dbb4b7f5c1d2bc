//! Dijkstra shortest path over roadmap edges

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::{EdgeId, NodeId};

/// Priority queue entry
#[derive(Clone, Copy, Debug)]
struct DijkstraState {
    cost: f64,
    node: NodeId,
}

impl PartialEq for DijkstraState {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.node == other.node
    }
}

impl Eq for DijkstraState {}

impl Ord for DijkstraState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for DijkstraState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Outgoing edge: (target node, edge id, cost)
pub type Adjacency = Vec<Vec<(NodeId, EdgeId, f64)>>;

/// Edge sequence of a shortest path from `start` to `goal`
///
/// `Some(vec![])` when `start == goal`, `None` when `goal` is unreachable.
pub fn dijkstra(adjacency: &Adjacency, start: NodeId, goal: NodeId) -> Option<Vec<EdgeId>> {
    let n = adjacency.len();
    if start >= n || goal >= n {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }

    let mut dist = vec![f64::INFINITY; n];
    let mut prev: Vec<Option<(NodeId, EdgeId)>> = vec![None; n];
    dist[start] = 0.0;

    let mut heap = BinaryHeap::new();
    heap.push(DijkstraState {
        cost: 0.0,
        node: start,
    });

    while let Some(DijkstraState { cost, node }) = heap.pop() {
        if cost > dist[node] {
            continue;
        }
        if node == goal {
            break;
        }
        for &(neighbour, edge, weight) in &adjacency[node] {
            let candidate = cost + weight;
            if candidate < dist[neighbour] {
                dist[neighbour] = candidate;
                prev[neighbour] = Some((node, edge));
                heap.push(DijkstraState {
                    cost: candidate,
                    node: neighbour,
                });
            }
        }
    }

    prev[goal]?;
    let mut edges = Vec::new();
    let mut current = goal;
    while current != start {
        let (node, edge) = prev[current]?;
        edges.push(edge);
        current = node;
    }
    edges.reverse();
    Some(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_cheaper_route() {
        // 0 -> 1 -> 2 costs 2, 0 -> 2 costs 5
        let adjacency: Adjacency = vec![
            vec![(1, 0, 1.0), (2, 1, 5.0)],
            vec![(2, 2, 1.0)],
            vec![],
        ];
        assert_eq!(dijkstra(&adjacency, 0, 2), Some(vec![0, 2]));
        assert_eq!(dijkstra(&adjacency, 2, 0), None);
        assert_eq!(dijkstra(&adjacency, 1, 1), Some(vec![]));
    }
}
