//! Tolerances and limits for mesh operations.
//!
//! # Example
//!
//! ```
//! use mesh_cut::MeshConfig;
//!
//! let config = MeshConfig::default()
//!     .with_position_tolerance(5e-4)
//!     .with_max_cut_iterations(64);
//! assert_eq!(config.max_cut_iterations, 64);
//! ```

use crate::PLANE_EPSILON;

/// Default distance under which two positions are treated as the same vertex.
pub const POSITION_EPSILON: f32 = 1e-4;

/// Default number of cuts applied per cutting polygon before a cut aborts.
pub const DEFAULT_MAX_CUT_ITERATIONS: usize = 1024;

/// Configuration carried by every [`Mesh`](crate::Mesh).
#[derive(Debug, Clone, PartialEq)]
pub struct MeshConfig {
    /// Positions closer than this are the same vertex; a point closer than
    /// this to a segment lies on it. Also bounds the sine of a turn angle
    /// below which consecutive edges count as collinear.
    pub position_tolerance: f32,

    /// Maximum distance of a vertex from its polygon's plane.
    pub plane_tolerance: f32,

    /// Runaway guard for mesh-level cut, counted per cutting polygon.
    pub max_cut_iterations: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            position_tolerance: POSITION_EPSILON,
            plane_tolerance: PLANE_EPSILON,
            max_cut_iterations: DEFAULT_MAX_CUT_ITERATIONS,
        }
    }
}

impl MeshConfig {
    /// Looser tolerances for geometry that went through lossy transforms.
    #[must_use]
    pub fn coarse() -> Self {
        Self {
            position_tolerance: 1e-3,
            plane_tolerance: 1e-4,
            max_cut_iterations: DEFAULT_MAX_CUT_ITERATIONS,
        }
    }

    /// Tighter tolerances for small, exactly constructed geometry.
    #[must_use]
    pub fn precise() -> Self {
        Self {
            position_tolerance: 1e-5,
            plane_tolerance: 1e-6,
            max_cut_iterations: DEFAULT_MAX_CUT_ITERATIONS,
        }
    }

    /// Sets the position tolerance.
    #[must_use]
    pub fn with_position_tolerance(mut self, tolerance: f32) -> Self {
        self.position_tolerance = tolerance.abs();
        self
    }

    /// Sets the plane tolerance.
    #[must_use]
    pub fn with_plane_tolerance(mut self, tolerance: f32) -> Self {
        self.plane_tolerance = tolerance.abs();
        self
    }

    /// Sets the per-cutting-polygon iteration ceiling of mesh-level cut.
    #[must_use]
    pub fn with_max_cut_iterations(mut self, iterations: usize) -> Self {
        self.max_cut_iterations = iterations.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_order_by_tolerance() {
        let default = MeshConfig::default();
        let coarse = MeshConfig::coarse();
        let precise = MeshConfig::precise();

        assert!(coarse.position_tolerance > default.position_tolerance);
        assert!(precise.position_tolerance < default.position_tolerance);
        assert!(coarse.plane_tolerance > default.plane_tolerance);
        assert!(precise.plane_tolerance < default.plane_tolerance);
    }

    #[test]
    fn builders_sanitize_input() {
        let config = MeshConfig::default()
            .with_position_tolerance(-2e-4)
            .with_plane_tolerance(-1e-6)
            .with_max_cut_iterations(0);

        assert!(config.position_tolerance > 0.0);
        assert!(config.plane_tolerance > 0.0);
        assert_eq!(config.max_cut_iterations, 1);
    }
}
