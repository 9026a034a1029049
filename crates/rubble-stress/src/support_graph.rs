//! Support graph description consumed by the stress solver.
//!
//! The graph is supplied once by the fracture kernel in compressed sparse
//! row form. Every bond appears twice, once from each endpoint.
//!
//! ```text
//! node i neighbors: adjacent_node_indices[adjacency_partition[i]..adjacency_partition[i + 1]]
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use rubble_types::{RubbleError, RubbleResult, INVALID_INDEX};

/// Static support graph of one asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportGraph {
    /// Chunk index per node. Anything past the chunk array (usually
    /// `INVALID_INDEX`) marks the world node.
    pub chunk_indices: Vec<u32>,
    /// `node_count + 1` offsets into the adjacency arrays.
    pub adjacency_partition: Vec<u32>,
    pub adjacent_node_indices: Vec<u32>,
    /// Asset bond index of each adjacency entry.
    pub adjacent_bond_indices: Vec<u32>,
}

/// Geometry of one chunk, used to derive node mass and position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub centroid: Vec3,
    pub volume: f32,
}

impl SupportGraph {
    /// Builds the CSR arrays from an undirected edge list `(node0, node1, bond_index)`.
    pub fn from_edges(chunk_indices: Vec<u32>, edges: &[(u32, u32, u32)]) -> Self {
        let node_count = chunk_indices.len();
        let mut degree = vec![0u32; node_count];
        for &(node0, node1, _) in edges {
            degree[node0 as usize] += 1;
            degree[node1 as usize] += 1;
        }

        let mut adjacency_partition = Vec::with_capacity(node_count + 1);
        let mut offset = 0u32;
        adjacency_partition.push(0);
        for &d in &degree {
            offset += d;
            adjacency_partition.push(offset);
        }

        let mut cursor: Vec<u32> = adjacency_partition[..node_count].to_vec();
        let mut adjacent_node_indices = vec![0u32; offset as usize];
        let mut adjacent_bond_indices = vec![0u32; offset as usize];
        for &(node0, node1, bond_index) in edges {
            for (from, to) in [(node0, node1), (node1, node0)] {
                let slot = cursor[from as usize] as usize;
                adjacent_node_indices[slot] = to;
                adjacent_bond_indices[slot] = bond_index;
                cursor[from as usize] += 1;
            }
        }

        Self {
            chunk_indices,
            adjacency_partition,
            adjacent_node_indices,
            adjacent_bond_indices,
        }
    }

    pub fn node_count(&self) -> u32 {
        self.chunk_indices.len() as u32
    }

    /// Size of the bond health array this graph indexes into.
    pub fn bond_count(&self) -> u32 {
        self.adjacent_bond_indices
            .iter()
            .max()
            .map_or(0, |&max| max + 1)
    }

    /// Adjacency entries of `node` as `(neighbor, bond_index)` pairs.
    pub fn neighbors(&self, node: u32) -> impl Iterator<Item = (u32, u32)> + '_ {
        let start = self.adjacency_partition[node as usize] as usize;
        let end = self.adjacency_partition[node as usize + 1] as usize;
        self.adjacent_node_indices[start..end]
            .iter()
            .copied()
            .zip(self.adjacent_bond_indices[start..end].iter().copied())
    }

    /// Every bond once, as `(node0, node1, bond_index)` with `node0 < node1`.
    pub fn bonds(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        (0..self.node_count()).flat_map(move |node0| {
            self.neighbors(node0)
                .filter(move |&(node1, _)| node0 < node1)
                .map(move |(node1, bond_index)| (node0, node1, bond_index))
        })
    }

    /// Returns true if `node` stands for the world rather than a chunk.
    pub fn is_world_node(&self, node: u32, chunk_count: usize) -> bool {
        let chunk_index = self.chunk_indices[node as usize];
        chunk_index == INVALID_INDEX || chunk_index as usize >= chunk_count
    }

    /// Checks the CSR layout and that every bond is listed from both ends.
    pub fn validate(&self) -> RubbleResult<()> {
        let node_count = self.chunk_indices.len();
        let fail = |msg: String| Err(RubbleError::InvalidGraph(msg));

        if self.adjacency_partition.len() != node_count + 1 {
            return fail(format!(
                "adjacency partition has {} entries for {node_count} nodes",
                self.adjacency_partition.len()
            ));
        }
        if self.adjacent_node_indices.len() != self.adjacent_bond_indices.len() {
            return fail("adjacent node and bond arrays differ in length".into());
        }
        if self.adjacency_partition[0] != 0 {
            return fail("adjacency partition must start at 0".into());
        }
        if self.adjacency_partition.windows(2).any(|w| w[0] > w[1]) {
            return fail("adjacency partition is not monotonic".into());
        }
        let total = self.adjacency_partition[node_count] as usize;
        if total != self.adjacent_node_indices.len() {
            return fail(format!(
                "adjacency partition ends at {total}, arrays hold {}",
                self.adjacent_node_indices.len()
            ));
        }

        for node0 in 0..node_count as u32 {
            for (node1, bond_index) in self.neighbors(node0) {
                if node1 as usize >= node_count {
                    return Err(RubbleError::IndexOutOfRange {
                        kind: "node",
                        index: node1,
                        count: node_count as u32,
                    });
                }
                if node1 == node0 {
                    return fail(format!("node {node0} is bonded to itself"));
                }
                if !self.neighbors(node1).any(|entry| entry == (node0, bond_index)) {
                    return fail(format!(
                        "bond {bond_index} from {node0} to {node1} has no reverse entry"
                    ));
                }
            }
        }
        Ok(())
    }
}
