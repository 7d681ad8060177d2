//! Error types for mesh mutation and cutting.
//!
//! Every error here is a defect: it means an invariant of the mesh or of the
//! cut engine would have been broken. Expected negative outcomes ("no cut",
//! "no intersection", "edge already exists") are plain `Option`/`bool`
//! returns and never show up as errors.

use std::fmt;

use thiserror::Error;

/// The invariant that an operation refused to break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invariant {
    /// A polygon needs at least three vertices.
    TooFewVertices,
    /// A polygon may not reference the same position twice.
    DuplicateVertex,
    /// A polygon referenced a position index that does not exist.
    VertexOutOfRange,
    /// A vertex was expected to be part of a polygon's loop but is not.
    VertexNotInPolygon,
    /// All vertices of a polygon must lie on one plane.
    NonPlanar,
    /// Every polygon loop must be convex.
    NonConvex,
    /// A polygon was registered in the adjacency index twice.
    DuplicateRegistration,
    /// The adjacency index was missing an entry it should have held.
    MissingAdjacency,
    /// A polygon handle did not refer to a live polygon.
    UnknownPolygon,
    /// An edge was expected to exist in the mesh but does not.
    MissingEdge,
    /// A polygon asked to be tracked was not adjacent to the split edge.
    UntrackedPolygon,
    /// A handle issued by one mesh was passed to another.
    ForeignHandle,
    /// The two cut points of a cut operation belong to different polygons.
    MismatchedCutPoints,
    /// A point that must lie inside a polygon does not.
    PointOutsidePolygon,
    /// The second face point of a cut was not found after the first poke.
    UnresolvedFacePoint,
    /// Mesh-level cut hit its iteration ceiling.
    IterationCeiling,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TooFewVertices => "too few vertices",
            Self::DuplicateVertex => "duplicate vertex",
            Self::VertexOutOfRange => "vertex out of range",
            Self::VertexNotInPolygon => "vertex not in polygon",
            Self::NonPlanar => "non-planar polygon",
            Self::NonConvex => "non-convex polygon",
            Self::DuplicateRegistration => "duplicate adjacency registration",
            Self::MissingAdjacency => "missing adjacency",
            Self::UnknownPolygon => "unknown polygon",
            Self::MissingEdge => "missing edge",
            Self::UntrackedPolygon => "untracked polygon",
            Self::ForeignHandle => "foreign handle",
            Self::MismatchedCutPoints => "mismatched cut points",
            Self::PointOutsidePolygon => "point outside polygon",
            Self::UnresolvedFacePoint => "unresolved face point",
            Self::IterationCeiling => "iteration ceiling",
        };
        f.write_str(name)
    }
}

/// Errors produced by mesh operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// An operation would have left the mesh in a state that breaks an invariant.
    #[error("invariant violation ({invariant}): {details}")]
    InvariantViolation {
        /// Which invariant failed.
        invariant: Invariant,
        /// Description of the offending input or state.
        details: String,
    },
}

impl MeshError {
    /// Creates an invariant violation error.
    pub fn invariant(invariant: Invariant, details: impl Into<String>) -> Self {
        Self::InvariantViolation {
            invariant,
            details: details.into(),
        }
    }

    /// Returns the invariant that failed.
    pub fn failed_invariant(&self) -> Invariant {
        match self {
            Self::InvariantViolation { invariant, .. } => *invariant,
        }
    }
}

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_invariant() {
        let err = MeshError::invariant(Invariant::NonConvex, "polygon [0, 1, 2, 3]");
        assert_eq!(
            err.to_string(),
            "invariant violation (non-convex polygon): polygon [0, 1, 2, 3]"
        );
        assert_eq!(err.failed_invariant(), Invariant::NonConvex);
    }
}
