//! The mesh aggregate: positions, polygons and the two adjacency indices.
//!
//! The edge→polygons and polygon→edges maps are owned here and only change
//! through [`Mesh::insert_polygon`] and [`Mesh::remove_polygon`], which update
//! both maps together. Surgery and cut operations build on those two entry
//! points.

use std::sync::Arc;

use hashbrown::HashMap;
use nalgebra::Point3;

use crate::error::{Invariant, MeshError, MeshResult};
use crate::frame::CoordinateFrame;
use crate::handle::{Edge, MeshId, PolygonId};
use crate::{MeshConfig, Polygon};

/// A polygon mesh with maintained edge/face adjacency.
///
/// Positions are append-only and addressed by stable indices. Polygons live
/// in an arena of slots that are never reused.
#[derive(Debug, Clone)]
pub struct Mesh {
    id: MeshId,
    config: MeshConfig,
    frame: Option<Arc<dyn CoordinateFrame>>,
    positions: Vec<Point3<f32>>,
    polygons: Vec<Option<Polygon>>,
    live: usize,
    edge_polygons: HashMap<Edge, Vec<PolygonId>>,
    polygon_edges: HashMap<PolygonId, Vec<Edge>>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    /// Creates an empty mesh with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MeshConfig::default())
    }

    /// Creates an empty mesh with the given configuration.
    pub fn with_config(config: MeshConfig) -> Self {
        Self {
            id: MeshId::fresh(),
            config,
            frame: None,
            positions: Vec::new(),
            polygons: Vec::new(),
            live: 0,
            edge_polygons: HashMap::new(),
            polygon_edges: HashMap::new(),
        }
    }

    /// Builds a mesh from positions and polygon loops, validating every polygon.
    pub fn from_polygons<I>(positions: Vec<Point3<f32>>, loops: I) -> MeshResult<Self>
    where
        I: IntoIterator<Item = Vec<usize>>,
    {
        let mut mesh = Self::new();
        mesh.fill(positions, loops)?;
        Ok(mesh)
    }

    /// Attaches a coordinate frame; positions are then local to it.
    #[must_use]
    pub fn with_frame(mut self, frame: Arc<dyn CoordinateFrame>) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Returns the identity of this mesh.
    #[inline]
    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Returns the mesh configuration.
    #[inline]
    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Replaces the mesh configuration.
    pub fn set_config(&mut self, config: MeshConfig) {
        self.config = config;
    }

    /// Returns the coordinate frame, if any.
    pub fn frame(&self) -> Option<&Arc<dyn CoordinateFrame>> {
        self.frame.as_ref()
    }

    /// Sets or removes the coordinate frame. Stored positions are unchanged.
    pub fn set_frame(&mut self, frame: Option<Arc<dyn CoordinateFrame>>) {
        self.frame = frame;
    }

    /// Converts a local position into the world frame.
    #[inline]
    pub fn to_world(&self, local: Point3<f32>) -> Point3<f32> {
        match &self.frame {
            Some(frame) => frame.to_world(&local),
            None => local,
        }
    }

    /// Converts a world position into this mesh's local frame.
    #[inline]
    pub fn to_local(&self, world: Point3<f32>) -> Point3<f32> {
        match &self.frame {
            Some(frame) => frame.to_local(&world),
            None => world,
        }
    }

    /// Returns the position table (local frame).
    #[inline]
    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    /// Returns a local position by index.
    #[inline]
    pub fn position(&self, index: usize) -> Option<Point3<f32>> {
        self.positions.get(index).copied()
    }

    /// Returns a position by index, in the world frame.
    pub fn world_position(&self, index: usize) -> Option<Point3<f32>> {
        self.position(index).map(|p| self.to_world(p))
    }

    /// Appends a local position and returns its index.
    pub fn add_position(&mut self, position: Point3<f32>) -> usize {
        self.positions.push(position);
        self.positions.len() - 1
    }

    /// Drops positions appended by a primitive that then failed validation.
    pub(crate) fn truncate_positions(&mut self, len: usize) {
        self.positions.truncate(len);
    }

    /// Builds the edge key between two vertex indices of this mesh.
    #[inline]
    pub fn edge(&self, a: usize, b: usize) -> Edge {
        Edge::new(self.id, a, b)
    }

    /// Returns a live polygon.
    pub fn polygon(&self, id: PolygonId) -> Option<&Polygon> {
        if id.mesh() != self.id {
            return None;
        }
        self.polygons.get(id.slot()).and_then(Option::as_ref)
    }

    /// Returns true if the handle refers to a live polygon of this mesh.
    #[inline]
    pub fn contains_polygon(&self, id: PolygonId) -> bool {
        self.polygon(id).is_some()
    }

    /// Snapshot of the live polygon handles, in arena order.
    pub fn polygon_ids(&self) -> Vec<PolygonId> {
        self.polygons().map(|(id, _)| id).collect()
    }

    /// Iterates over live polygons in arena order.
    pub fn polygons(&self) -> impl Iterator<Item = (PolygonId, &Polygon)> + '_ {
        self.polygons
            .iter()
            .enumerate()
            .filter_map(|(slot, p)| p.as_ref().map(|p| (PolygonId::new(self.id, slot), p)))
    }

    /// Returns the number of live polygons.
    #[inline]
    pub fn polygon_count(&self) -> usize {
        self.live
    }

    /// Returns true if the mesh has no polygons.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns true iff some live polygon currently has this edge.
    pub fn edge_exists(&self, edge: Edge) -> bool {
        self.edge_polygons.contains_key(&edge)
    }

    /// Polygons currently containing the edge (empty if the edge does not exist).
    pub fn adjacent_polygons(&self, edge: Edge) -> &[PolygonId] {
        self.edge_polygons.get(&edge).map_or(&[], Vec::as_slice)
    }

    /// The edges of a live polygon, as recorded in the adjacency index.
    pub fn adjacent_edges(&self, id: PolygonId) -> Option<&[Edge]> {
        self.polygon_edges.get(&id).map(Vec::as_slice)
    }

    /// Iterates over every edge of the mesh.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edge_polygons.keys().copied()
    }

    /// Total polygon area (local frame).
    pub fn area(&self) -> f32 {
        self.polygons().map(|(_, p)| p.area(&self.positions)).sum()
    }

    /// Resolves a polygon's loop into world positions.
    pub fn world_points(&self, id: PolygonId) -> MeshResult<Vec<Point3<f32>>> {
        let polygon = self.live_polygon(id)?;
        Ok(polygon
            .vertices()
            .iter()
            .map(|&v| self.to_world(self.positions[v]))
            .collect())
    }

    /// Validates and adds a polygon over existing positions.
    pub fn add_polygon(&mut self, vertices: Vec<usize>) -> MeshResult<PolygonId> {
        let polygon = Polygon::new(vertices);
        self.check_polygon(&polygon)?;
        self.insert_polygon(polygon)
    }

    /// Removes a live polygon and its adjacency entries, returning its loop.
    pub fn remove_polygon(&mut self, id: PolygonId) -> MeshResult<Polygon> {
        self.live_polygon(id)?;
        let edges = self.polygon_edges.get(&id).ok_or_else(|| {
            MeshError::invariant(Invariant::MissingAdjacency, format!("no edge entry for {id}"))
        })?;
        for edge in edges {
            let registered = self
                .edge_polygons
                .get(edge)
                .is_some_and(|polygons| polygons.contains(&id));
            if !registered {
                return Err(MeshError::invariant(
                    Invariant::MissingAdjacency,
                    format!("edge {edge} does not list {id}"),
                ));
            }
        }

        let edges = self.polygon_edges.remove(&id).unwrap_or_default();
        for edge in edges {
            if let Some(polygons) = self.edge_polygons.get_mut(&edge) {
                polygons.retain(|&p| p != id);
                if polygons.is_empty() {
                    self.edge_polygons.remove(&edge);
                }
            }
        }
        self.live -= 1;
        self.polygons[id.slot()]
            .take()
            .ok_or_else(|| MeshError::invariant(Invariant::UnknownPolygon, format!("{id}")))
    }

    /// Replaces the whole mesh content, keeping identity, config and frame.
    /// Handles of the replaced polygons stay dead.
    ///
    /// Every polygon is validated before anything is replaced.
    pub fn fill<I>(&mut self, positions: Vec<Point3<f32>>, loops: I) -> MeshResult<()>
    where
        I: IntoIterator<Item = Vec<usize>>,
    {
        let mut staged = Self::with_config(self.config.clone());
        staged.id = self.id;
        staged.frame = self.frame.clone();
        staged.polygons = vec![None; self.polygons.len()];
        staged.positions = positions;
        for vertices in loops {
            staged.add_polygon(vertices)?;
        }
        *self = staged;
        Ok(())
    }

    /// Copies every polygon of `other` into this mesh, mapping positions
    /// through the world frame. Returns the handles of the copies.
    pub fn append(&mut self, other: &Mesh) -> MeshResult<Vec<PolygonId>> {
        let mut staged = self.clone();
        let offset = staged.positions.len();
        for &p in &other.positions {
            let local = staged.to_local(other.to_world(p));
            staged.positions.push(local);
        }
        let mut added = Vec::with_capacity(other.polygon_count());
        for (_, polygon) in other.polygons() {
            let vertices = polygon.vertices().iter().map(|&v| v + offset).collect();
            added.push(staged.add_polygon(vertices)?);
        }
        *self = staged;
        Ok(added)
    }

    /// Removes all positions and polygons. Handles issued before the call
    /// stay dead.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.polygons.fill(None);
        self.live = 0;
        self.edge_polygons.clear();
        self.polygon_edges.clear();
    }

    /// Audits every invariant: polygon validity and both adjacency indices.
    pub fn validate(&self) -> MeshResult<()> {
        let mut expected: HashMap<Edge, Vec<PolygonId>> = HashMap::new();
        for (id, polygon) in self.polygons() {
            self.check_polygon(polygon)?;
            let edges: Vec<Edge> = polygon.edges().map(|(a, b)| self.edge(a, b)).collect();
            let recorded = self.polygon_edges.get(&id).ok_or_else(|| {
                MeshError::invariant(Invariant::MissingAdjacency, format!("no edge entry for {id}"))
            })?;
            if recorded != &edges {
                return Err(MeshError::invariant(
                    Invariant::MissingAdjacency,
                    format!("{id} records edges {recorded:?}, owns {edges:?}"),
                ));
            }
            for edge in edges {
                expected.entry(edge).or_default().push(id);
            }
        }
        if self.polygon_edges.len() != self.live {
            return Err(MeshError::invariant(
                Invariant::DuplicateRegistration,
                format!("{} edge entries for {} polygons", self.polygon_edges.len(), self.live),
            ));
        }
        if expected.len() != self.edge_polygons.len() {
            return Err(MeshError::invariant(
                Invariant::MissingAdjacency,
                format!("{} edges expected, {} indexed", expected.len(), self.edge_polygons.len()),
            ));
        }
        for (edge, polygons) in &expected {
            let indexed = self.adjacent_polygons(*edge);
            if indexed.len() != polygons.len() || polygons.iter().any(|p| !indexed.contains(p)) {
                return Err(MeshError::invariant(
                    Invariant::MissingAdjacency,
                    format!("edge {edge} lists {indexed:?}, expected {polygons:?}"),
                ));
            }
        }
        Ok(())
    }

    /// Validates a polygon against this mesh's positions and tolerances.
    pub(crate) fn check_polygon(&self, polygon: &Polygon) -> MeshResult<()> {
        polygon.validate(
            &self.positions,
            self.config.position_tolerance,
            self.config.plane_tolerance,
        )
    }

    /// Looks up a live polygon, rejecting foreign and dead handles.
    pub(crate) fn live_polygon(&self, id: PolygonId) -> MeshResult<&Polygon> {
        if id.mesh() != self.id {
            return Err(MeshError::invariant(
                Invariant::ForeignHandle,
                format!("{id} used with mesh {:?}", self.id),
            ));
        }
        self.polygon(id)
            .ok_or_else(|| MeshError::invariant(Invariant::UnknownPolygon, format!("{id} is not live")))
    }

    /// Rejects edges that were not built for this mesh.
    pub(crate) fn check_edge(&self, edge: Edge) -> MeshResult<()> {
        if edge.mesh() != self.id {
            return Err(MeshError::invariant(
                Invariant::ForeignHandle,
                format!("edge {edge} used with mesh {:?}", self.id),
            ));
        }
        Ok(())
    }

    /// Stores an already validated polygon and registers its edges in both
    /// adjacency indices.
    pub(crate) fn insert_polygon(&mut self, polygon: Polygon) -> MeshResult<PolygonId> {
        let id = PolygonId::new(self.id, self.polygons.len());
        if self.polygon_edges.contains_key(&id) {
            return Err(MeshError::invariant(
                Invariant::DuplicateRegistration,
                format!("{id} is already registered"),
            ));
        }
        let edges: Vec<Edge> = polygon.edges().map(|(a, b)| self.edge(a, b)).collect();
        for edge in &edges {
            self.edge_polygons.entry(*edge).or_default().push(id);
        }
        self.polygon_edges.insert(id, edges);
        self.polygons.push(Some(polygon));
        self.live += 1;
        Ok(id)
    }

    /// Runs `operation`, restoring the mesh to its prior state if it fails.
    pub(crate) fn transaction<T>(
        &mut self,
        operation: impl FnOnce(&mut Self) -> MeshResult<T>,
    ) -> MeshResult<T> {
        let backup = self.clone();
        let result = operation(self);
        if result.is_err() {
            *self = backup;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Translation3;

    fn grid_positions() -> Vec<Point3<f32>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ]
    }

    fn two_quads() -> Mesh {
        Mesh::from_polygons(grid_positions(), [vec![0, 1, 4, 3], vec![1, 2, 5, 4]]).unwrap()
    }

    #[test]
    fn shared_edge_is_adjacent_to_both() {
        let mesh = two_quads();
        let shared = mesh.edge(4, 1);
        assert!(mesh.edge_exists(shared));
        assert_eq!(mesh.adjacent_polygons(shared).len(), 2);
        assert_eq!(mesh.edges().count(), 7);
        assert!(!mesh.edge_exists(mesh.edge(0, 4)));
        mesh.validate().unwrap();
    }

    #[test]
    fn removing_polygon_drops_orphaned_edges() {
        let mut mesh = two_quads();
        let ids = mesh.polygon_ids();
        let removed = mesh.remove_polygon(ids[1]).unwrap();

        assert_eq!(removed.vertices(), &[1, 2, 5, 4]);
        assert_eq!(mesh.polygon_count(), 1);
        assert!(mesh.edge_exists(mesh.edge(1, 4)));
        assert_eq!(mesh.adjacent_polygons(mesh.edge(1, 4)), &[ids[0]]);
        assert!(!mesh.edge_exists(mesh.edge(2, 5)));
        assert!(mesh.adjacent_edges(ids[1]).is_none());
        mesh.validate().unwrap();
    }

    #[test]
    fn removed_handles_stay_dead() {
        let mut mesh = two_quads();
        let ids = mesh.polygon_ids();
        mesh.remove_polygon(ids[0]).unwrap();
        let readded = mesh.add_polygon(vec![0, 1, 4, 3]).unwrap();

        assert_ne!(readded, ids[0]);
        assert!(!mesh.contains_polygon(ids[0]));
        assert_eq!(
            mesh.remove_polygon(ids[0]).unwrap_err().failed_invariant(),
            Invariant::UnknownPolygon
        );
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let mut a = two_quads();
        let b = two_quads();
        let foreign = b.polygon_ids()[0];
        assert_eq!(
            a.remove_polygon(foreign).unwrap_err().failed_invariant(),
            Invariant::ForeignHandle
        );
        assert!(!a.edge_exists(b.edge(0, 1)));
    }

    #[test]
    fn invalid_polygon_is_not_added() {
        let mut mesh = two_quads();
        let before = mesh.polygon_count();
        let err = mesh.add_polygon(vec![0, 1, 2]).unwrap_err();
        assert_eq!(err.failed_invariant(), Invariant::NonConvex);
        assert_eq!(mesh.polygon_count(), before);
        mesh.validate().unwrap();
    }

    #[test]
    fn fill_failure_keeps_previous_content() {
        let mut mesh = two_quads();
        let err = mesh.fill(grid_positions(), [vec![0, 1, 4, 3], vec![0, 1]]).unwrap_err();
        assert_eq!(err.failed_invariant(), Invariant::TooFewVertices);
        assert_eq!(mesh.polygon_count(), 2);
    }

    #[test]
    fn append_maps_through_world_frame() {
        let mut target = Mesh::new();
        let source = two_quads().with_frame(Arc::new(Translation3::new(0.0, 0.0, 2.0)));

        let added = target.append(&source).unwrap();
        assert_eq!(added.len(), 2);
        assert_relative_eq!(target.position(0).unwrap().z, 2.0);
        assert_relative_eq!(target.area(), 2.0);
        target.validate().unwrap();
    }

    #[test]
    fn clear_empties_everything() {
        let mut mesh = two_quads();
        let old = mesh.polygon_ids();
        mesh.clear();
        assert!(mesh.is_empty());
        assert!(mesh.positions().is_empty());
        assert_eq!(mesh.edges().count(), 0);

        mesh.fill(grid_positions(), [vec![0, 1, 4, 3]]).unwrap();
        assert!(old.iter().all(|id| !mesh.contains_polygon(*id)));
        assert_eq!(mesh.polygon_count(), 1);
        mesh.validate().unwrap();
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let mut mesh = two_quads();
        let ids = mesh.polygon_ids();
        let result: MeshResult<()> = mesh.transaction(|m| {
            m.remove_polygon(ids[0])?;
            m.add_polygon(vec![0, 1])?;
            Ok(())
        });
        assert!(result.is_err());
        assert!(mesh.contains_polygon(ids[0]));
        mesh.validate().unwrap();
    }

    #[test]
    fn world_positions_use_frame() {
        let mesh = two_quads().with_frame(Arc::new(Translation3::new(1.0, 0.0, 0.0)));
        assert_relative_eq!(mesh.world_position(0).unwrap().x, 1.0);
        assert_relative_eq!(mesh.to_local(Point3::new(1.0, 0.0, 0.0)).x, 0.0);
    }
}
