//! Convex polygon loops over a shared position table.

use nalgebra::{Point3, Vector3};

use crate::error::{Invariant, MeshError, MeshResult};
use crate::geometry::{are_collinear, convex_containment, newell_normal, Containment};
use crate::Plane3D;

/// A convex polygon, defined by an ordered, cyclic list of position indices.
///
/// The polygon owns no positions: every geometric query takes the position
/// table of the mesh that issued the indices. Vertices should be coplanar
/// and wind counter-clockwise when viewed from the front (the direction the
/// normal points).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    vertices: Vec<usize>,
}

impl Polygon {
    /// Creates a polygon from a vertex loop. No validation happens here; see
    /// [`Polygon::validate`].
    pub fn new(vertices: Vec<usize>) -> Self {
        Self { vertices }
    }

    /// Returns the vertex indices of the polygon.
    #[inline]
    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true if the polygon has no vertices (always false for valid polygons).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns the vertex at a cyclic position in the loop, or `None` for an
    /// empty loop.
    #[inline]
    pub fn vertex(&self, i: usize) -> Option<usize> {
        let at = i.checked_rem(self.vertices.len())?;
        self.vertices.get(at).copied()
    }

    /// Returns the loop position of a vertex index, if the polygon uses it.
    pub fn position_of(&self, vertex: usize) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }

    /// Returns true if the polygon uses the vertex index.
    #[inline]
    pub fn contains_vertex(&self, vertex: usize) -> bool {
        self.vertices.contains(&vertex)
    }

    /// Cyclic consecutive vertex pairs, one per vertex.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Returns true if `a` and `b` are consecutive in the loop, in either order.
    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.edges()
            .any(|(u, v)| (u == a && v == b) || (u == b && v == a))
    }

    /// Fan triangulation from the first vertex. Valid because polygons are convex.
    pub fn triangulate(&self) -> Vec<[usize; 3]> {
        (1..self.vertices.len().saturating_sub(1))
            .map(|i| [self.vertices[0], self.vertices[i], self.vertices[i + 1]])
            .collect()
    }

    /// Resolves the loop into positions.
    pub fn points(&self, positions: &[Point3<f32>]) -> Vec<Point3<f32>> {
        self.vertices.iter().map(|&v| positions[v]).collect()
    }

    /// Unit normal following the winding, or `None` for a degenerate loop.
    pub fn normal(&self, positions: &[Point3<f32>]) -> Option<Vector3<f32>> {
        newell_normal(&self.points(positions)).try_normalize(f32::EPSILON)
    }

    /// Plane through the vertex centroid with the Newell normal, oriented
    /// with the loop winding. `None` for a degenerate loop.
    pub fn plane(&self, positions: &[Point3<f32>]) -> Option<Plane3D> {
        if self.vertices.is_empty() {
            return None;
        }
        let normal = newell_normal(&self.points(positions));
        Plane3D::from_point_and_normal(self.centroid(positions), normal)
    }

    /// Computes the centroid (vertex average) of the polygon.
    pub fn centroid(&self, positions: &[Point3<f32>]) -> Point3<f32> {
        let sum: Vector3<f32> = self.vertices.iter().map(|&v| positions[v].coords).sum();
        Point3::from(sum / self.vertices.len() as f32)
    }

    /// Area of the polygon.
    pub fn area(&self, positions: &[Point3<f32>]) -> f32 {
        newell_normal(&self.points(positions)).norm() * 0.5
    }

    /// Returns true if every vertex lies within `epsilon` of the polygon's plane.
    pub fn is_planar(&self, positions: &[Point3<f32>], epsilon: f32) -> bool {
        match self.plane(positions) {
            Some(plane) => self
                .vertices
                .iter()
                .all(|&v| plane.contains_point(positions[v], epsilon)),
            None => false,
        }
    }

    /// Returns true if the loop turns consistently around its normal.
    ///
    /// Consecutive collinear vertices (zero turn) are allowed, which is what
    /// an edge split leaves behind; a loop needs at least three real corners
    /// to count as convex. `epsilon` bounds the sine of a turn angle treated
    /// as zero.
    pub fn is_convex(&self, positions: &[Point3<f32>], epsilon: f32) -> bool {
        let Some(normal) = self.normal(positions) else {
            return false;
        };
        let n = self.vertices.len();
        let mut corners = 0;
        for i in 0..n {
            let prev = positions[self.vertices[(i + n - 1) % n]];
            let current = positions[self.vertices[i]];
            let next = positions[self.vertices[(i + 1) % n]];
            let (Some(incoming), Some(outgoing)) = (
                (current - prev).try_normalize(f32::EPSILON),
                (next - current).try_normalize(f32::EPSILON),
            ) else {
                return false;
            };
            let turn = incoming.cross(&outgoing).dot(&normal);
            if turn < -epsilon {
                return false;
            }
            if turn > epsilon {
                corners += 1;
            }
        }
        corners >= 3
    }

    /// Classifies a point (assumed to lie in the polygon's plane).
    pub fn containment(
        &self,
        positions: &[Point3<f32>],
        point: Point3<f32>,
        epsilon: f32,
    ) -> Containment {
        match self.normal(positions) {
            Some(normal) => convex_containment(point, &self.points(positions), &normal, epsilon),
            None => Containment::Outside,
        }
    }

    /// Returns the boundary run connecting `from` and `to` if every vertex on
    /// it is collinear with the two, as consecutive vertex pairs.
    ///
    /// Adjacent vertices form a run of one edge.
    pub fn colinear_run(
        &self,
        positions: &[Point3<f32>],
        from: usize,
        to: usize,
        epsilon: f32,
    ) -> Option<Vec<(usize, usize)>> {
        let start = self.position_of(from)?;
        let end = self.position_of(to)?;
        if start == end {
            return None;
        }
        let n = self.vertices.len();
        let a = positions[from];
        let b = positions[to];

        let walk = |step: usize| -> Option<Vec<(usize, usize)>> {
            let mut run = Vec::new();
            let mut i = start;
            while i != end {
                let next = (i + step) % n;
                let vertex = self.vertices[next];
                if next != end && !are_collinear(a, positions[vertex], b, epsilon) {
                    return None;
                }
                run.push((self.vertices[i], vertex));
                i = next;
            }
            Some(run)
        };

        walk(1).or_else(|| walk(n - 1))
    }

    /// Checks the polygon invariants: at least three distinct, in-range
    /// vertices forming a planar, convex loop.
    pub fn validate(&self, positions: &[Point3<f32>], epsilon: f32, plane_epsilon: f32) -> MeshResult<()> {
        if self.vertices.len() < 3 {
            return Err(MeshError::invariant(
                Invariant::TooFewVertices,
                format!("polygon {:?} has {} vertices", self.vertices, self.vertices.len()),
            ));
        }
        if let Some(&v) = self.vertices.iter().find(|&&v| v >= positions.len()) {
            return Err(MeshError::invariant(
                Invariant::VertexOutOfRange,
                format!("vertex {v} of polygon {:?} exceeds {} positions", self.vertices, positions.len()),
            ));
        }
        for (i, v) in self.vertices.iter().enumerate() {
            if self.vertices[i + 1..].contains(v) {
                return Err(MeshError::invariant(
                    Invariant::DuplicateVertex,
                    format!("vertex {v} repeats in polygon {:?}", self.vertices),
                ));
            }
        }
        if self.plane(positions).is_none() {
            return Err(MeshError::invariant(
                Invariant::NonConvex,
                format!("polygon {:?} is degenerate", self.vertices),
            ));
        }
        if !self.is_planar(positions, plane_epsilon) {
            return Err(MeshError::invariant(
                Invariant::NonPlanar,
                format!("polygon {:?}", self.vertices),
            ));
        }
        if !self.is_convex(positions, epsilon) {
            return Err(MeshError::invariant(
                Invariant::NonConvex,
                format!("polygon {:?}", self.vertices),
            ));
        }
        Ok(())
    }
}
