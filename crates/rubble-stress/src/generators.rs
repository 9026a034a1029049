//! Procedural structures for benchmarks and testing.
//!
//! Every generator builds a lattice of cubic chunks plus one world node
//! (the last node, chunk index `INVALID_INDEX`). Chunks touching the
//! anchored face are bonded to the world node. Bonds are numbered in
//! creation order, so the output is deterministic.

use glam::Vec3;

use rubble_types::INVALID_INDEX;

use crate::support_graph::{ChunkInfo, SupportGraph};

/// A generated family: support graph, chunk geometry and initial healths.
#[derive(Debug, Clone)]
pub struct Structure {
    pub graph: SupportGraph,
    pub chunks: Vec<ChunkInfo>,
    pub bond_healths: Vec<f32>,
    /// Lattice size in chunks along X, Y and Z.
    pub dims: [u32; 3],
}

impl Structure {
    /// Node of the chunk at lattice coordinates `(x, y, z)`.
    pub fn node_index(&self, x: u32, y: u32, z: u32) -> u32 {
        let [nx, ny, _] = self.dims;
        x + nx * (y + ny * z)
    }

    pub fn world_node(&self) -> u32 {
        self.chunks.len() as u32
    }

    /// All graph nodes, world node included: the initial single actor.
    pub fn all_nodes(&self) -> Vec<u32> {
        (0..self.graph.node_count()).collect()
    }

    /// Bond index between two nodes, if they are bonded.
    pub fn bond_between(&self, node0: u32, node1: u32) -> Option<u32> {
        self.graph
            .neighbors(node0)
            .find(|&(neighbor, _)| neighbor == node1)
            .map(|(_, bond_index)| bond_index)
    }
}

/// A vertical wall in the XY plane standing on the world at `y = 0`.
///
/// # Example
/// ```
/// use rubble_stress::generators::wall;
/// let s = wall(3, 2, 1.0, 100.0);
/// assert_eq!(s.graph.node_count(), 7); // 3×2 chunks + world
/// assert_eq!(s.bond_healths.len(), 10); // 4 horizontal + 3 vertical + 3 to world
/// ```
pub fn wall(columns: u32, rows: u32, chunk_size: f32, health: f32) -> Structure {
    lattice(
        [columns, rows, 1],
        chunk_size,
        health,
        Vec3::new(1.0, 1.0, 1.0),
        |_, y, _| y == 0,
    )
}

/// A column of chunks hanging down from the world, anchored at the top link.
pub fn chain(length: u32, chunk_size: f32, health: f32) -> Structure {
    lattice(
        [1, length, 1],
        chunk_size,
        health,
        Vec3::new(1.0, -1.0, 1.0),
        |_, y, _| y == 0,
    )
}

/// A solid block of `width × height × depth` chunks on the ground.
pub fn tower(width: u32, height: u32, depth: u32, chunk_size: f32, health: f32) -> Structure {
    lattice(
        [width, height, depth],
        chunk_size,
        health,
        Vec3::new(1.0, 1.0, 1.0),
        |_, y, _| y == 0,
    )
}

fn lattice(
    dims: [u32; 3],
    chunk_size: f32,
    health: f32,
    direction: Vec3,
    anchored: impl Fn(u32, u32, u32) -> bool,
) -> Structure {
    let [nx, ny, nz] = dims;
    let chunk_count = nx * ny * nz;
    let world = chunk_count;
    let index = |x: u32, y: u32, z: u32| x + nx * (y + ny * z);

    let mut chunks = Vec::with_capacity(chunk_count as usize);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let cell = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5);
                chunks.push(ChunkInfo {
                    centroid: cell * direction * chunk_size,
                    volume: chunk_size * chunk_size * chunk_size,
                });
            }
        }
    }

    let mut edges = Vec::new();
    let mut push = |node0: u32, node1: u32| {
        let bond_index = edges.len() as u32;
        edges.push((node0, node1, bond_index));
    };
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let node = index(x, y, z);
                if x + 1 < nx {
                    push(node, index(x + 1, y, z));
                }
                if y + 1 < ny {
                    push(node, index(x, y + 1, z));
                }
                if z + 1 < nz {
                    push(node, index(x, y, z + 1));
                }
                if anchored(x, y, z) {
                    push(node, world);
                }
            }
        }
    }

    let mut chunk_indices: Vec<u32> = (0..chunk_count).collect();
    chunk_indices.push(INVALID_INDEX);

    Structure {
        graph: SupportGraph::from_edges(chunk_indices, &edges),
        chunks,
        bond_healths: vec![health; edges.len()],
        dims,
    }
}
