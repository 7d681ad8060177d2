//! Low-level mesh surgery: edge split, polygon split and polygon poke.
//!
//! These are the only operations that change mesh topology. Each one builds
//! and validates every replacement polygon before touching the mesh, then
//! swaps polygons through [`Mesh::remove_polygon`] and `insert_polygon` so
//! both adjacency indices stay in step.

use nalgebra::{Point3, Vector3};
use tracing::trace;

use crate::error::{Invariant, MeshError, MeshResult};
use crate::geometry::{closest_point_on_segment, Containment};
use crate::handle::{Edge, PolygonId};
use crate::{Mesh, Polygon};

/// Result of [`Mesh::split_edge_add_vertex`].
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSplit {
    /// Index of the inserted vertex.
    pub vertex: usize,
    /// The two sub-edges replacing the split edge.
    pub edges: [Edge; 2],
    /// The rebuilt counterpart of the polygon asked to be tracked.
    pub tracked: Option<PolygonId>,
}

/// Result of [`Mesh::split_polygon`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSplit {
    /// The new edge shared by both halves.
    pub edge: Edge,
    /// The two halves.
    pub polygons: [PolygonId; 2],
}

/// Result of [`Mesh::poke_polygon`].
#[derive(Debug, Clone, PartialEq)]
pub struct Poke {
    /// Index of the inserted vertex.
    pub vertex: usize,
    /// The convex fragments replacing the poked polygon.
    pub polygons: Vec<PolygonId>,
    /// Every edge from the new vertex to the boundary, without duplicates.
    pub new_edges: Vec<Edge>,
}

impl Mesh {
    /// Inserts a vertex on `edge` at the point of the edge closest to `point`.
    ///
    /// Every polygon containing the edge is rebuilt with the new vertex and
    /// re-added. If `track` names one of those polygons, the rebuilt
    /// counterpart is returned in [`EdgeSplit::tracked`].
    pub fn split_edge_add_vertex(
        &mut self,
        edge: Edge,
        point: Point3<f32>,
        track: Option<PolygonId>,
    ) -> MeshResult<EdgeSplit> {
        self.check_edge(edge)?;
        let adjacent = self.adjacent_polygons(edge).to_vec();
        if adjacent.is_empty() {
            return Err(MeshError::invariant(
                Invariant::MissingEdge,
                format!("cannot split edge {edge}: no polygon uses it"),
            ));
        }
        if let Some(tracked) = track {
            if !adjacent.contains(&tracked) {
                return Err(MeshError::invariant(
                    Invariant::UntrackedPolygon,
                    format!("{tracked} is not adjacent to edge {edge}"),
                ));
            }
        }

        let (a, b) = edge.vertices();
        let tolerance = self.config().position_tolerance;
        let (_, projected) = closest_point_on_segment(point, self.positions()[a], self.positions()[b]);
        if (projected - self.positions()[a]).norm() <= tolerance
            || (projected - self.positions()[b]).norm() <= tolerance
        {
            return Err(MeshError::invariant(
                Invariant::DuplicateVertex,
                format!("split point {projected:?} coincides with an end of edge {edge}"),
            ));
        }

        let vertex = self.positions().len();
        let mut rebuilt = Vec::with_capacity(adjacent.len());
        for &id in &adjacent {
            let polygon = self.live_polygon(id)?;
            let at = (0..polygon.len())
                .find(|&i| {
                    polygon
                        .vertex(i)
                        .zip(polygon.vertex(i + 1))
                        .is_some_and(|(a, b)| edge.contains(a) && edge.contains(b))
                })
                .ok_or_else(|| {
                    MeshError::invariant(
                        Invariant::MissingAdjacency,
                        format!("{id} is indexed under edge {edge} but does not contain it"),
                    )
                })?;
            let mut vertices = polygon.vertices().to_vec();
            vertices.insert(at + 1, vertex);
            rebuilt.push((id, Polygon::new(vertices)));
        }

        self.add_position(projected);
        let plane_tolerance = self.config().plane_tolerance;
        if let Some((id, _)) = rebuilt
            .iter()
            .find(|(_, polygon)| !polygon.is_planar(self.positions(), plane_tolerance))
        {
            let details = format!("splitting edge {edge} leaves {id} non-planar");
            self.truncate_positions(vertex);
            return Err(MeshError::invariant(Invariant::NonPlanar, details));
        }

        let mut tracked = None;
        for (id, polygon) in rebuilt {
            self.remove_polygon(id)?;
            let new_id = self.insert_polygon(polygon)?;
            if track == Some(id) {
                tracked = Some(new_id);
            }
        }

        trace!(%edge, vertex, polygons = adjacent.len(), "split edge");
        Ok(EdgeSplit {
            vertex,
            edges: [self.edge(a, vertex), self.edge(vertex, b)],
            tracked,
        })
    }

    /// Splits a polygon into two along the chord between two of its vertices.
    ///
    /// Both split vertices appear in both halves, forming the new shared edge.
    pub fn split_polygon(&mut self, id: PolygonId, v0: usize, v1: usize) -> MeshResult<PolygonSplit> {
        let polygon = self.live_polygon(id)?;
        let (Some(i0), Some(i1)) = (polygon.position_of(v0), polygon.position_of(v1)) else {
            return Err(MeshError::invariant(
                Invariant::VertexNotInPolygon,
                format!("cannot split {id} {:?} between {v0} and {v1}", polygon.vertices()),
            ));
        };

        let first = Polygon::new(cyclic_range(polygon.vertices(), i0, i1));
        let second = Polygon::new(cyclic_range(polygon.vertices(), i1, i0));
        self.check_polygon(&first)?;
        self.check_polygon(&second)?;

        self.remove_polygon(id)?;
        let first = self.insert_polygon(first)?;
        let second = self.insert_polygon(second)?;

        trace!(%id, v0, v1, "split polygon");
        Ok(PolygonSplit {
            edge: self.edge(v0, v1),
            polygons: [first, second],
        })
    }

    /// Adds `point` as a vertex strictly inside a polygon and fans it against
    /// the boundary into the fewest convex fragments.
    ///
    /// Fragments grow greedily around the boundary, starting at `anchor` when
    /// given (so an edge from the new vertex to the anchor always exists),
    /// and close as soon as adding the next boundary vertex would break
    /// convexity.
    pub fn poke_polygon(
        &mut self,
        id: PolygonId,
        point: Point3<f32>,
        anchor: Option<usize>,
    ) -> MeshResult<Poke> {
        let polygon = self.live_polygon(id)?.clone();
        let tolerance = self.config().position_tolerance;
        let plane = polygon.plane(self.positions()).ok_or_else(|| {
            MeshError::invariant(Invariant::NonConvex, format!("{id} is degenerate"))
        })?;
        let point = plane.project_point(point);
        if polygon.containment(self.positions(), point, tolerance) != Containment::Inside {
            return Err(MeshError::invariant(
                Invariant::PointOutsidePolygon,
                format!("poke point {point:?} is not strictly inside {id}"),
            ));
        }
        let start = match anchor {
            Some(v) => polygon.position_of(v).ok_or_else(|| {
                MeshError::invariant(
                    Invariant::VertexNotInPolygon,
                    format!("anchor {v} is not a vertex of {id}"),
                )
            })?,
            None => 0,
        };

        let n = polygon.len();
        let ring: Vec<usize> = (0..=n).filter_map(|k| polygon.vertex(start + k)).collect();
        let center = self.add_position(point);
        let normal = plane.normal();

        let mut fragments = Vec::new();
        let mut first = 0;
        while first < n {
            let mut last = first + 1;
            while last < n && self.fan_is_convex(center, &ring[first..=last + 1], &normal) {
                last += 1;
            }
            let mut vertices = Vec::with_capacity(last - first + 2);
            vertices.push(center);
            vertices.extend_from_slice(&ring[first..=last]);
            fragments.push(Polygon::new(vertices));
            first = last;
        }

        if let Some(err) = fragments.iter().find_map(|f| self.check_polygon(f).err()) {
            self.truncate_positions(center);
            return Err(err);
        }

        self.remove_polygon(id)?;
        let mut polygons = Vec::with_capacity(fragments.len());
        let mut new_edges = Vec::new();
        for fragment in fragments {
            let vertices = fragment.vertices();
            for &v in [vertices[1], vertices[vertices.len() - 1]].iter() {
                let edge = self.edge(center, v);
                if !new_edges.contains(&edge) {
                    new_edges.push(edge);
                }
            }
            polygons.push(self.insert_polygon(fragment)?);
        }

        trace!(%id, vertex = center, fragments = polygons.len(), "poked polygon");
        Ok(Poke {
            vertex: center,
            polygons,
            new_edges,
        })
    }

    /// Returns true if the fan `center, boundary...` is convex with a strict
    /// corner at `center`.
    fn fan_is_convex(&self, center: usize, boundary: &[usize], normal: &Vector3<f32>) -> bool {
        let positions = self.positions();
        let tolerance = self.config().position_tolerance;
        let apex = positions[center];
        let (Some(&first), Some(&last)) = (boundary.first(), boundary.last()) else {
            return false;
        };
        let (Some(incoming), Some(outgoing)) = (
            (apex - positions[last]).try_normalize(f32::EPSILON),
            (positions[first] - apex).try_normalize(f32::EPSILON),
        ) else {
            return false;
        };
        if incoming.cross(&outgoing).dot(normal) <= tolerance {
            return false;
        }

        let mut vertices = Vec::with_capacity(boundary.len() + 1);
        vertices.push(center);
        vertices.extend_from_slice(boundary);
        Polygon::new(vertices).is_convex(positions, tolerance)
    }
}

/// Vertices from loop position `from` to `to`, both inclusive, wrapping around.
fn cyclic_range(vertices: &[usize], from: usize, to: usize) -> Vec<usize> {
    let n = vertices.len();
    let mut out = vec![vertices[from]];
    let mut i = from;
    while i != to {
        i = (i + 1) % n;
        out.push(vertices[i]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_quads() -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        Mesh::from_polygons(positions, [vec![0, 1, 4, 3], vec![1, 2, 5, 4]]).unwrap()
    }

    fn unit_square() -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        Mesh::from_polygons(positions, [vec![0, 1, 2, 3]]).unwrap()
    }

    #[test]
    fn split_shared_edge_updates_both_sides() {
        let mut mesh = make_quads();
        let left = mesh.polygon_ids()[0];
        let shared = mesh.edge(1, 4);

        let split = mesh
            .split_edge_add_vertex(shared, Point3::new(1.0, 0.25, 0.0), Some(left))
            .unwrap();

        assert!(!mesh.edge_exists(shared));
        assert!(mesh.edge_exists(split.edges[0]));
        assert!(mesh.edge_exists(split.edges[1]));
        assert_eq!(mesh.adjacent_polygons(split.edges[0]).len(), 2);

        let tracked = split.tracked.unwrap();
        assert!(mesh.polygon(tracked).unwrap().contains_vertex(split.vertex));
        assert!(mesh.polygon(tracked).unwrap().contains_vertex(0));
        assert_eq!(mesh.polygon_count(), 2);
        mesh.validate().unwrap();
    }

    #[test]
    fn split_point_is_projected_onto_edge() {
        let mut mesh = unit_square();
        let split = mesh
            .split_edge_add_vertex(mesh.edge(0, 1), Point3::new(0.3, 0.01, 0.02), None)
            .unwrap();
        let position = mesh.position(split.vertex).unwrap();
        assert_relative_eq!(position.x, 0.3);
        assert_relative_eq!(position.y, 0.0);
        assert_relative_eq!(position.z, 0.0);
    }

    #[test]
    fn tracking_unrelated_polygon_fails_cleanly() {
        let mut mesh = make_quads();
        let right = mesh.polygon_ids()[1];
        let positions_before = mesh.positions().len();

        let err = mesh
            .split_edge_add_vertex(mesh.edge(0, 1), Point3::new(0.5, 0.0, 0.0), Some(right))
            .unwrap_err();

        assert_eq!(err.failed_invariant(), Invariant::UntrackedPolygon);
        assert_eq!(mesh.positions().len(), positions_before);
        assert!(mesh.edge_exists(mesh.edge(0, 1)));
    }

    #[test]
    fn splitting_missing_edge_fails() {
        let mut mesh = unit_square();
        let err = mesh
            .split_edge_add_vertex(mesh.edge(0, 2), Point3::new(0.5, 0.5, 0.0), None)
            .unwrap_err();
        assert_eq!(err.failed_invariant(), Invariant::MissingEdge);
    }

    #[test]
    fn splitting_at_endpoint_fails() {
        let mut mesh = unit_square();
        let err = mesh
            .split_edge_add_vertex(mesh.edge(0, 1), Point3::new(1.0, 0.0, 0.0), None)
            .unwrap_err();
        assert_eq!(err.failed_invariant(), Invariant::DuplicateVertex);
        assert_eq!(mesh.positions().len(), 4);
    }

    #[test]
    fn split_polygon_along_diagonal() {
        let mut mesh = unit_square();
        let id = mesh.polygon_ids()[0];

        let split = mesh.split_polygon(id, 0, 2).unwrap();

        let [a, b] = split.polygons;
        let (a, b) = (mesh.polygon(a).unwrap(), mesh.polygon(b).unwrap());
        assert_eq!(a.len() + b.len(), 4 + 2);
        assert_eq!(a.vertices(), &[0, 1, 2]);
        assert_eq!(b.vertices(), &[2, 3, 0]);
        assert_eq!(mesh.adjacent_polygons(split.edge).len(), 2);
        assert_relative_eq!(mesh.area(), 1.0);
        mesh.validate().unwrap();
    }

    #[test]
    fn split_polygon_between_neighbours_fails() {
        let mut mesh = unit_square();
        let id = mesh.polygon_ids()[0];
        let err = mesh.split_polygon(id, 0, 1).unwrap_err();
        assert_eq!(err.failed_invariant(), Invariant::TooFewVertices);
        assert!(mesh.contains_polygon(id));
    }

    #[test]
    fn split_polygon_across_collinear_run_fails() {
        let mut mesh = unit_square();
        let id = mesh.polygon_ids()[0];
        let split = mesh
            .split_edge_add_vertex(mesh.edge(0, 1), Point3::new(0.5, 0.0, 0.0), Some(id))
            .unwrap();
        let id = split.tracked.unwrap();

        let err = mesh.split_polygon(id, 0, 1).unwrap_err();
        assert_eq!(err.failed_invariant(), Invariant::NonConvex);
        mesh.validate().unwrap();
    }

    #[test]
    fn poke_square_center_gives_four_triangles() {
        let mut mesh = unit_square();
        let id = mesh.polygon_ids()[0];

        let poke = mesh.poke_polygon(id, Point3::new(0.5, 0.5, 0.0), None).unwrap();

        assert_eq!(poke.polygons.len(), 4);
        assert_eq!(poke.new_edges.len(), 4);
        for fragment in &poke.polygons {
            let polygon = mesh.polygon(*fragment).unwrap();
            assert_eq!(polygon.len(), 3);
            assert!(polygon.contains_vertex(poke.vertex));
        }
        assert_relative_eq!(mesh.area(), 1.0, epsilon = 1e-5);
        mesh.validate().unwrap();
    }

    #[test]
    fn poke_off_center_merges_fragments() {
        let mut mesh = unit_square();
        let id = mesh.polygon_ids()[0];

        let poke = mesh.poke_polygon(id, Point3::new(0.5, 0.2, 0.0), None).unwrap();

        assert_eq!(poke.polygons.len(), 3);
        assert_relative_eq!(mesh.area(), 1.0, epsilon = 1e-5);
        mesh.validate().unwrap();
    }

    #[test]
    fn poke_with_anchor_connects_to_anchor() {
        let mut mesh = unit_square();
        let id = mesh.polygon_ids()[0];

        let poke = mesh.poke_polygon(id, Point3::new(0.5, 0.2, 0.0), Some(2)).unwrap();

        let to_anchor = mesh.edge(poke.vertex, 2);
        assert!(mesh.edge_exists(to_anchor));
        assert!(poke.new_edges.contains(&to_anchor));
        mesh.validate().unwrap();
    }

    #[test]
    fn poke_outside_fails_without_side_effects() {
        let mut mesh = unit_square();
        let id = mesh.polygon_ids()[0];

        let err = mesh.poke_polygon(id, Point3::new(1.0, 0.5, 0.0), None).unwrap_err();

        assert_eq!(err.failed_invariant(), Invariant::PointOutsidePolygon);
        assert_eq!(mesh.positions().len(), 4);
        assert!(mesh.contains_polygon(id));
    }
}
