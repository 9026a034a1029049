//! Connected components of the live support graph.
//!
//! Stands in for the fracture kernel's actor split: after fracture
//! commands are applied the family is re-partitioned into islands of
//! nodes still joined by live bonds.

use rubble_stress::SupportGraph;

/// Islands of nodes joined by bonds with positive health, each sorted,
/// ordered by their smallest node.
pub fn live_islands(graph: &SupportGraph, bond_healths: &[f32]) -> Vec<Vec<u32>> {
    let node_count = graph.node_count() as usize;
    let mut visited = vec![false; node_count];
    let mut islands = Vec::new();
    let mut stack = Vec::new();

    for seed in 0..node_count as u32 {
        if visited[seed as usize] {
            continue;
        }
        visited[seed as usize] = true;
        stack.push(seed);

        let mut island = Vec::new();
        while let Some(node) = stack.pop() {
            island.push(node);
            for (neighbor, bond_index) in graph.neighbors(node) {
                let alive = bond_healths.get(bond_index as usize).copied().unwrap_or(0.0) > 0.0;
                if alive && !visited[neighbor as usize] {
                    visited[neighbor as usize] = true;
                    stack.push(neighbor);
                }
            }
        }
        island.sort_unstable();
        islands.push(island);
    }
    islands
}
