//! Convex polygon meshes with edge/face adjacency, topological surgery, and
//! mesh-against-mesh cutting.
//!
//! A [`Mesh`] keeps positions, convex polygons and two adjacency indices
//! (edge→polygons, polygon→edges) consistent through every mutation.
//! [`Mesh::cut`] imprints the intersection with another mesh as new edges,
//! splitting polygons but never removing area.
//!
//! ```
//! use mesh_cut::Mesh;
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut mesh = Mesh::from_polygons(positions, [vec![0, 1, 2, 3]]).unwrap();
//! let square = mesh.polygon_ids()[0];
//!
//! let poke = mesh.poke_polygon(square, Point3::new(0.5, 0.5, 0.0), None).unwrap();
//! assert_eq!(poke.polygons.len(), 4);
//! assert_eq!(mesh.polygon_count(), 4);
//! ```

mod config;
mod cut;
mod debug;
mod error;
mod export;
mod frame;
pub mod geometry;
mod handle;
mod mesh;
mod plane;
mod polygon;
mod surgery;

pub use config::{MeshConfig, DEFAULT_MAX_CUT_ITERATIONS, POSITION_EPSILON};
pub use cut::{CutOp, CutPoint, CutReport};
pub use debug::{DebugKind, DebugSink, NoDebug};
pub use error::{Invariant, MeshError, MeshResult};
pub use export::MeshBuffer;
pub use frame::CoordinateFrame;
pub use geometry::{Containment, SegmentIntersection};
pub use handle::{Edge, MeshId, PolygonId};
pub use mesh::Mesh;
pub use plane::{Plane3D, PlaneSide, PLANE_EPSILON};
pub use polygon::Polygon;
pub use surgery::{EdgeSplit, Poke, PolygonSplit};
