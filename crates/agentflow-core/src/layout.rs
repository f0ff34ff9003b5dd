//! Layered top-to-bottom placement of graph nodes.
//!
//! A node's rank is the longest path reaching it from any source. Nodes within
//! a rank keep their input order and the rank is centred on `x = 0`.
//! Coordinates are top-left corners of the node footprint.

use std::collections::HashMap;
use std::collections::VecDeque;

use super::state::ExecutionGraphState;
use super::state::GraphEdge;
use super::state::GraphNode;
use super::state::Position;

pub const NODE_WIDTH: f64 = 160.0;
pub const NODE_HEIGHT: f64 = 44.0;
pub const NODE_SEPARATION: f64 = 24.0;
pub const RANK_SEPARATION: f64 = 40.0;

pub fn layout(nodes: &[GraphNode], edges: &[GraphEdge]) -> Vec<GraphNode> {
    let ranks = assign_ranks(nodes, edges);

    let mut rows: Vec<Vec<usize>> = Vec::new();
    for (index, rank) in ranks.iter().enumerate() {
        if rows.len() <= *rank {
            rows.resize_with(rank + 1, Vec::new);
        }
        rows[*rank].push(index);
    }

    let mut positioned = nodes.to_vec();
    for (rank, row) in rows.iter().enumerate() {
        let count = row.len() as f64;
        let row_width = count * NODE_WIDTH + (count - 1.0).max(0.0) * NODE_SEPARATION;
        let left = -row_width / 2.0;
        for (slot, index) in row.iter().enumerate() {
            positioned[*index].position = Position {
                x: left + slot as f64 * (NODE_WIDTH + NODE_SEPARATION),
                y: rank as f64 * (NODE_HEIGHT + RANK_SEPARATION),
            };
        }
    }
    positioned
}

pub fn apply_layout(graph: &mut ExecutionGraphState) {
    graph.nodes = layout(&graph.nodes, &graph.edges);
}

fn assign_ranks(nodes: &[GraphNode], edges: &[GraphEdge]) -> Vec<usize> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    let mut indegree = vec![0usize; nodes.len()];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for edge in edges {
        let (Some(&source), Some(&target)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) else {
            continue;
        };
        outgoing[source].push(target);
        indegree[target] += 1;
    }

    let mut rank = vec![0usize; nodes.len()];
    let mut placed = vec![false; nodes.len()];
    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|i| indegree[*i] == 0).collect();
    while let Some(current) = queue.pop_front() {
        placed[current] = true;
        for &next in &outgoing[current] {
            rank[next] = rank[next].max(rank[current] + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    // Whatever Kahn could not reach sits on or behind a cycle.
    let deepest = (0..nodes.len())
        .filter(|i| placed[*i])
        .map(|i| rank[i])
        .max();
    let cyclic_rank = deepest.map_or(0, |depth| depth + 1);
    for (i, is_placed) in placed.iter().enumerate() {
        if !is_placed {
            rank[i] = cyclic_rank;
        }
    }
    rank
}
