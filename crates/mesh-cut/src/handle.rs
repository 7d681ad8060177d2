//! Stable handles into a mesh: mesh identity, polygon slots and edge keys.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a mesh.
///
/// Clones share the identity of the mesh they were cloned from: a clone is
/// the same mesh at another point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

impl MeshId {
    pub(crate) fn fresh() -> Self {
        Self(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to a polygon in a mesh's polygon arena.
///
/// Slots are never reused, so a handle to a removed polygon stays dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolygonId {
    mesh: MeshId,
    slot: usize,
}

impl PolygonId {
    pub(crate) fn new(mesh: MeshId, slot: usize) -> Self {
        Self { mesh, slot }
    }

    /// The mesh that issued this handle.
    #[inline]
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    /// Arena slot of the polygon.
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "polygon #{} of mesh {}", self.slot, self.mesh.0)
    }
}

/// An unordered pair of position indices in one mesh.
///
/// `Edge::new(mesh, a, b) == Edge::new(mesh, b, a)`. Edges are lookup keys
/// into the mesh adjacency index, not stored entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    mesh: MeshId,
    a: usize,
    b: usize,
}

impl Edge {
    /// Creates an edge key between two vertex indices of `mesh`.
    pub fn new(mesh: MeshId, a: usize, b: usize) -> Self {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        Self { mesh, a, b }
    }

    /// The mesh whose index space the edge refers to.
    #[inline]
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    /// The two vertex indices, smaller first.
    #[inline]
    pub fn vertices(&self) -> (usize, usize) {
        (self.a, self.b)
    }

    /// Returns true if the edge ends at `vertex`.
    #[inline]
    pub fn contains(&self, vertex: usize) -> bool {
        self.a == vertex || self.b == vertex
    }

    /// Returns the opposite end of the edge, if `vertex` is one of its ends.
    pub fn other(&self, vertex: usize) -> Option<usize> {
        if vertex == self.a {
            Some(self.b)
        } else if vertex == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.a, self.b)
    }
}
