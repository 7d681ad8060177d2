//! The cut engine: splitting the polygons of one mesh along their
//! intersection with the polygons of another.
//!
//! A cut proceeds in three steps:
//!
//! 1. [`Mesh::try_create_cut_op`] intersects one target polygon with one
//!    cutting polygon and picks the segment to cut along.
//! 2. Both segment ends are classified against the target polygon as
//!    [`CutPoint`]s: an existing vertex, a new point on an edge, or a new
//!    point inside the face.
//! 3. [`Mesh::apply_cut`] realizes the segment with the surgery primitives.
//!
//! [`Mesh::cut`] repeats this for every cutting polygon until no target
//! polygon needs new topology.
//!
//! Cutting polygons that are coplanar with a target polygon are imprinted:
//! each of their boundary edges is clipped to the target and cut in turn.

use hashbrown::HashSet;
use nalgebra::{Point3, Vector3};
use tracing::{debug, info};

use crate::debug::{DebugKind, DebugSink, NoDebug};
use crate::error::{Invariant, MeshError, MeshResult};
use crate::geometry::{
    clip_segment_to_convex, closest_point_on_segment, convex_containment, distance_to_segment,
    intersect_segments, Containment, SegmentIntersection,
};
use crate::handle::{Edge, PolygonId};
use crate::{Mesh, Plane3D, Polygon};

/// A target position classified against one polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutPoint {
    /// The position matches an existing vertex of the polygon.
    Existing {
        /// The classified polygon.
        polygon: PolygonId,
        /// The matching vertex.
        vertex: usize,
    },
    /// A new position on one of the polygon's edges.
    OnEdge {
        /// The classified polygon.
        polygon: PolygonId,
        /// The edge the position lies on.
        edge: Edge,
        /// The position, projected onto the edge.
        position: Point3<f32>,
    },
    /// A new position strictly inside the polygon.
    OnFace {
        /// The classified polygon.
        polygon: PolygonId,
        /// The position.
        position: Point3<f32>,
    },
}

impl CutPoint {
    /// The polygon this point was classified against.
    pub fn polygon(&self) -> PolygonId {
        match *self {
            Self::Existing { polygon, .. }
            | Self::OnEdge { polygon, .. }
            | Self::OnFace { polygon, .. } => polygon,
        }
    }

    /// True for points that would add a new vertex.
    pub fn is_new(&self) -> bool {
        !matches!(self, Self::Existing { .. })
    }
}

/// Two cut points on the same polygon, plus whether realizing the segment
/// between them needs new topology.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutOp {
    first: CutPoint,
    second: CutPoint,
    creates_edge: bool,
    coplanar: bool,
}

impl CutOp {
    /// Pairs two cut points; both must belong to the same polygon.
    pub fn new(first: CutPoint, second: CutPoint, creates_edge: bool) -> MeshResult<Self> {
        if first.polygon() != second.polygon() {
            return Err(MeshError::invariant(
                Invariant::MismatchedCutPoints,
                format!("{} and {}", first.polygon(), second.polygon()),
            ));
        }
        Ok(Self {
            first,
            second,
            creates_edge,
            coplanar: false,
        })
    }

    /// The first cut point.
    #[inline]
    pub fn first(&self) -> CutPoint {
        self.first
    }

    /// The second cut point.
    #[inline]
    pub fn second(&self) -> CutPoint {
        self.second
    }

    /// The polygon being cut.
    #[inline]
    pub fn polygon(&self) -> PolygonId {
        self.first.polygon()
    }

    /// False when the segment is already realized by mesh edges; applying
    /// the op then only reports those edges.
    #[inline]
    pub fn creates_edge(&self) -> bool {
        self.creates_edge
    }

    /// True when the op came from imprinting a coplanar cutting polygon.
    #[inline]
    pub fn is_coplanar(&self) -> bool {
        self.coplanar
    }
}

/// Outcome of a mesh-level cut.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CutReport {
    /// True if any polygon was changed.
    pub cut_applied: bool,
    /// Number of cut operations that changed the mesh.
    pub operations: usize,
    /// Every edge realizing the cut, including edges that already existed.
    pub edges: Vec<Edge>,
}

impl CutReport {
    fn record(&mut self, edges: &[Edge]) {
        for edge in edges {
            if !self.edges.contains(edge) {
                self.edges.push(*edge);
            }
        }
    }
}

impl Mesh {
    /// Classifies a local position against a live polygon.
    ///
    /// Positions just outside a corner, but within tolerance of the edge
    /// lines meeting there, resolve to the nearest boundary feature. Fails if
    /// the position lies farther outside the polygon.
    pub fn classify_cut_point(&self, polygon: PolygonId, position: Point3<f32>) -> MeshResult<CutPoint> {
        let target = self.live_polygon(polygon)?;
        let positions = self.positions();
        let tolerance = self.config().position_tolerance;

        let nearest_vertex = target
            .vertices()
            .iter()
            .map(|&v| (v, (positions[v] - position).norm()))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((vertex, distance)) = nearest_vertex {
            if distance <= tolerance {
                return Ok(CutPoint::Existing { polygon, vertex });
            }
        }

        let nearest_edge = target
            .edges()
            .map(|(a, b)| ((a, b), distance_to_segment(position, positions[a], positions[b])))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some(((a, b), distance)) = nearest_edge {
            if distance <= tolerance {
                let (_, projected) = closest_point_on_segment(position, positions[a], positions[b]);
                return Ok(CutPoint::OnEdge {
                    polygon,
                    edge: self.edge(a, b),
                    position: projected,
                });
            }
        }

        match (target.containment(positions, position, tolerance), nearest_edge) {
            (Containment::Inside, _) => Ok(CutPoint::OnFace { polygon, position }),
            // Within tolerance of every edge line but past a corner: the
            // nearest point of the boundary stands in for the position.
            (Containment::Boundary, Some(((a, b), _))) => {
                let (_, projected) = closest_point_on_segment(position, positions[a], positions[b]);
                let corner = [a, b]
                    .into_iter()
                    .find(|&v| (positions[v] - projected).norm() <= tolerance);
                Ok(match corner {
                    Some(vertex) => CutPoint::Existing { polygon, vertex },
                    None => CutPoint::OnEdge {
                        polygon,
                        edge: self.edge(a, b),
                        position: projected,
                    },
                })
            }
            _ => Err(MeshError::invariant(
                Invariant::PointOutsidePolygon,
                format!("cut point {position:?} lies outside {polygon}"),
            )),
        }
    }

    /// Intersects a polygon of this mesh with a polygon of `cutter` and
    /// returns the cut operation realizing the intersection, if any.
    ///
    /// A returned op with [`CutOp::creates_edge`] false means the
    /// intersection already lies on mesh edges.
    pub fn try_create_cut_op(
        &self,
        polygon: PolygonId,
        cutter: &Mesh,
        cutter_polygon: PolygonId,
    ) -> MeshResult<Option<CutOp>> {
        self.find_cut_op(polygon, cutter, cutter_polygon, &mut NoDebug)
    }

    /// Realizes a cut operation and returns the edges that now carry the cut.
    ///
    /// On error the mesh is left as it was.
    pub fn apply_cut(&mut self, op: CutOp) -> MeshResult<Vec<Edge>> {
        self.transaction(|mesh| mesh.apply_cut_op(op))
    }

    /// Cuts this mesh along its intersection with every polygon of `cutter`.
    ///
    /// On error the mesh is left as it was.
    pub fn cut(&mut self, cutter: &Mesh) -> MeshResult<CutReport> {
        self.cut_with_sink(cutter, &mut NoDebug)
    }

    /// [`Mesh::cut`], reporting candidates, cut segments and cut edges to `sink`.
    pub fn cut_with_sink(&mut self, cutter: &Mesh, sink: &mut dyn DebugSink) -> MeshResult<CutReport> {
        self.transaction(|mesh| mesh.cut_all(cutter, sink))
    }

    /// Cuts this mesh with `other` and `other` with this mesh, each using the
    /// other's polygons as they were before the call.
    ///
    /// If either direction fails, both meshes are left as they were.
    pub fn dual_cut(&mut self, other: &mut Mesh) -> MeshResult<(CutReport, CutReport)> {
        let original_self = self.clone();
        let original_other = other.clone();
        let forward = self.cut(&original_other)?;
        match other.cut(&original_self) {
            Ok(backward) => Ok((forward, backward)),
            Err(err) => {
                *self = original_self;
                Err(err)
            }
        }
    }

    fn cut_all(&mut self, cutter: &Mesh, sink: &mut dyn DebugSink) -> MeshResult<CutReport> {
        let mut report = CutReport::default();
        let limit = self.config().max_cut_iterations;

        for cutter_polygon in cutter.polygon_ids() {
            sink.polygon(&cutter.world_points(cutter_polygon)?);
            let mut unaffected: HashSet<PolygonId> = HashSet::new();
            let mut applied = 0;

            loop {
                let mut found = None;
                for id in self.polygon_ids() {
                    if unaffected.contains(&id) {
                        continue;
                    }
                    match self.find_cut_op(id, cutter, cutter_polygon, sink)? {
                        Some(op) if op.creates_edge() => {
                            found = Some(op);
                            break;
                        }
                        Some(op) => {
                            let edges = self.apply_cut_op(op)?;
                            report.record(&edges);
                            unaffected.insert(id);
                        }
                        None => {
                            unaffected.insert(id);
                        }
                    }
                }

                let Some(op) = found else {
                    break;
                };
                applied += 1;
                if applied > limit {
                    return Err(MeshError::invariant(
                        Invariant::IterationCeiling,
                        format!("more than {limit} cuts against {cutter_polygon}"),
                    ));
                }

                let edges = self.apply_cut_op(op)?;
                debug!(
                    polygon = %op.polygon(),
                    cutter = %cutter_polygon,
                    edges = edges.len(),
                    coplanar = op.is_coplanar(),
                    "applied cut"
                );
                for edge in &edges {
                    let (a, b) = edge.vertices();
                    let (a, b) = (self.positions()[a], self.positions()[b]);
                    sink.segment(self.to_world(a), self.to_world(b), DebugKind::CutEdge);
                    if !op.is_coplanar() {
                        // Polygons bordering a transversal cut only touch the
                        // cutting plane along that edge.
                        unaffected.extend(self.adjacent_polygons(*edge).iter().copied());
                    }
                }
                report.record(&edges);
                report.operations += 1;
                report.cut_applied = true;
            }
        }

        info!(
            operations = report.operations,
            edges = report.edges.len(),
            polygons = self.polygon_count(),
            "cut complete"
        );
        Ok(report)
    }

    fn find_cut_op(
        &self,
        polygon: PolygonId,
        cutter: &Mesh,
        cutter_polygon: PolygonId,
        sink: &mut dyn DebugSink,
    ) -> MeshResult<Option<CutOp>> {
        let target = self.live_polygon(polygon)?;
        let tolerance = self.config().position_tolerance;
        let target_points = target.points(self.positions());
        let target_plane = target.plane(self.positions()).ok_or_else(|| {
            MeshError::invariant(Invariant::NonConvex, format!("{polygon} is degenerate"))
        })?;

        let cutter_points: Vec<Point3<f32>> = cutter
            .world_points(cutter_polygon)?
            .into_iter()
            .map(|p| self.to_local(p))
            .collect();
        let cutter_plane = Polygon::new((0..cutter_points.len()).collect())
            .plane(&cutter_points)
            .ok_or_else(|| {
                MeshError::invariant(Invariant::NonConvex, format!("{cutter_polygon} is degenerate"))
            })?;

        let coplanar = cutter_points
            .iter()
            .all(|p| target_plane.contains_point(*p, tolerance));
        if coplanar {
            return self.imprint_cut_op(polygon, &target_points, &target_plane.normal(), &cutter_points, sink);
        }

        let from_target = edge_candidates(&target_points, &cutter_points, &cutter_plane, tolerance);
        let from_cutter = edge_candidates(&cutter_points, &target_points, &target_plane, tolerance);
        for p in &from_target {
            sink.point(self.to_world(*p), DebugKind::TargetCandidate);
        }
        for p in &from_cutter {
            sink.point(self.to_world(*p), DebugKind::CutterCandidate);
        }

        let Some((start, end)) = choose_cut_segment(&from_target, &from_cutter) else {
            return Ok(None);
        };
        sink.segment(self.to_world(start), self.to_world(end), DebugKind::CutSegment);
        self.cut_op_between(polygon, start, end)
    }

    /// Clips each edge of a coplanar cutting polygon to the target and
    /// returns the first segment that still needs new topology, or else the
    /// first one already realized.
    fn imprint_cut_op(
        &self,
        polygon: PolygonId,
        target_points: &[Point3<f32>],
        normal: &Vector3<f32>,
        cutter_points: &[Point3<f32>],
        sink: &mut dyn DebugSink,
    ) -> MeshResult<Option<CutOp>> {
        let tolerance = self.config().position_tolerance;
        let m = cutter_points.len();
        let mut realized = None;

        for i in 0..m {
            let (start, end) = (cutter_points[i], cutter_points[(i + 1) % m]);
            let Some((a, b)) = clip_segment_to_convex(start, end, target_points, normal, tolerance) else {
                continue;
            };
            if (b - a).norm() <= tolerance {
                continue;
            }
            sink.segment(self.to_world(a), self.to_world(b), DebugKind::CutSegment);
            if let Some(mut op) = self.cut_op_between(polygon, a, b)? {
                op.coplanar = true;
                if op.creates_edge() {
                    return Ok(Some(op));
                }
                realized.get_or_insert(op);
            }
        }
        Ok(realized)
    }

    /// Classifies both segment ends and decides whether they form a cut.
    fn cut_op_between(
        &self,
        polygon: PolygonId,
        start: Point3<f32>,
        end: Point3<f32>,
    ) -> MeshResult<Option<CutOp>> {
        let tolerance = self.config().position_tolerance;
        let first = self.classify_cut_point(polygon, start)?;
        let second = self.classify_cut_point(polygon, end)?;

        let creates_edge = match (first, second) {
            (CutPoint::Existing { vertex: a, .. }, CutPoint::Existing { vertex: b, .. }) => {
                if a == b {
                    debug!(%polygon, vertex = a, "cut collapses to a vertex");
                    return Ok(None);
                }
                !self.vertices_connected(polygon, a, b)?
            }
            (CutPoint::Existing { .. }, _) | (_, CutPoint::Existing { .. }) => true,
            _ => {
                if (start - end).norm() <= tolerance {
                    debug!(%polygon, "cut points coincide");
                    return Ok(None);
                }
                true
            }
        };
        CutOp::new(first, second, creates_edge).map(Some)
    }

    /// True if two vertices of a polygon are joined by an edge or a straight
    /// run of edges.
    fn vertices_connected(&self, polygon: PolygonId, a: usize, b: usize) -> MeshResult<bool> {
        if self.edge_exists(self.edge(a, b)) {
            return Ok(true);
        }
        let target = self.live_polygon(polygon)?;
        Ok(target
            .colinear_run(self.positions(), a, b, self.config().position_tolerance)
            .is_some())
    }

    fn apply_cut_op(&mut self, op: CutOp) -> MeshResult<Vec<Edge>> {
        if op.first.polygon() != op.second.polygon() {
            return Err(MeshError::invariant(
                Invariant::MismatchedCutPoints,
                format!("{} and {}", op.first.polygon(), op.second.polygon()),
            ));
        }
        let polygon = op.polygon();
        self.live_polygon(polygon)?;

        match (op.first, op.second) {
            (CutPoint::Existing { vertex: a, .. }, CutPoint::Existing { vertex: b, .. }) => {
                if !op.creates_edge && self.edge_exists(self.edge(a, b)) {
                    return Ok(vec![self.edge(a, b)]);
                }
                self.cut_vertex_vertex(polygon, a, b)
            }
            (CutPoint::Existing { vertex, .. }, CutPoint::OnEdge { edge, position, .. })
            | (CutPoint::OnEdge { edge, position, .. }, CutPoint::Existing { vertex, .. }) => {
                let split = self.split_edge_add_vertex(edge, position, Some(polygon))?;
                let tracked = tracked_polygon(&split.tracked, edge)?;
                self.cut_vertex_vertex(tracked, vertex, split.vertex)
            }
            (
                CutPoint::OnEdge { edge: first_edge, position: p, .. },
                CutPoint::OnEdge { edge: second_edge, position: q, .. },
            ) => self.cut_edge_edge(polygon, first_edge, p, second_edge, q),
            (CutPoint::Existing { vertex, .. }, CutPoint::OnFace { position, .. })
            | (CutPoint::OnFace { position, .. }, CutPoint::Existing { vertex, .. }) => {
                let poke = self.poke_polygon(polygon, position, Some(vertex))?;
                Ok(vec![self.edge(vertex, poke.vertex)])
            }
            (CutPoint::OnEdge { edge, position: p, .. }, CutPoint::OnFace { position: q, .. })
            | (CutPoint::OnFace { position: q, .. }, CutPoint::OnEdge { edge, position: p, .. }) => {
                let split = self.split_edge_add_vertex(edge, p, Some(polygon))?;
                let tracked = tracked_polygon(&split.tracked, edge)?;
                let poke = self.poke_polygon(tracked, q, Some(split.vertex))?;
                Ok(vec![self.edge(split.vertex, poke.vertex)])
            }
            (CutPoint::OnFace { position: p, .. }, CutPoint::OnFace { position: q, .. }) => {
                self.cut_face_face(polygon, p, q)
            }
        }
    }

    fn cut_vertex_vertex(&mut self, polygon: PolygonId, a: usize, b: usize) -> MeshResult<Vec<Edge>> {
        let tolerance = self.config().position_tolerance;
        let target = self.live_polygon(polygon)?;
        if let Some(run) = target.colinear_run(self.positions(), a, b, tolerance) {
            return Ok(run.into_iter().map(|(u, v)| self.edge(u, v)).collect());
        }
        Ok(vec![self.split_polygon(polygon, a, b)?.edge])
    }

    fn cut_edge_edge(
        &mut self,
        polygon: PolygonId,
        first_edge: Edge,
        p: Point3<f32>,
        second_edge: Edge,
        q: Point3<f32>,
    ) -> MeshResult<Vec<Edge>> {
        let first = self.split_edge_add_vertex(first_edge, p, Some(polygon))?;
        let tracked = tracked_polygon(&first.tracked, first_edge)?;

        // The first split replaced a shared edge with two sub-edges.
        let second_edge = if second_edge == first_edge {
            let distance = |edge: &Edge| {
                let (a, b) = edge.vertices();
                distance_to_segment(q, self.positions()[a], self.positions()[b])
            };
            let [left, right] = first.edges;
            if distance(&left) <= distance(&right) { left } else { right }
        } else {
            second_edge
        };

        let second = self.split_edge_add_vertex(second_edge, q, Some(tracked))?;
        let tracked = tracked_polygon(&second.tracked, second_edge)?;
        self.cut_vertex_vertex(tracked, first.vertex, second.vertex)
    }

    fn cut_face_face(&mut self, polygon: PolygonId, p: Point3<f32>, q: Point3<f32>) -> MeshResult<Vec<Edge>> {
        let tolerance = self.config().position_tolerance;
        let first = self.poke_polygon(polygon, p, None)?;

        let containing = first.polygons.iter().copied().find(|&fragment| {
            self.polygon(fragment)
                .is_some_and(|f| f.containment(self.positions(), q, tolerance) == Containment::Inside)
        });
        if let Some(fragment) = containing {
            let second = self.poke_polygon(fragment, q, Some(first.vertex))?;
            return Ok(vec![self.edge(first.vertex, second.vertex)]);
        }

        let on_new_edge = first.new_edges.iter().copied().find(|edge| {
            let (a, b) = edge.vertices();
            distance_to_segment(q, self.positions()[a], self.positions()[b]) <= tolerance
        });
        if let Some(edge) = on_new_edge {
            let split = self.split_edge_add_vertex(edge, q, None)?;
            return Ok(vec![self.edge(first.vertex, split.vertex)]);
        }

        Err(MeshError::invariant(
            Invariant::UnresolvedFacePoint,
            format!("{q:?} is in no fragment of poked {polygon}"),
        ))
    }
}

fn tracked_polygon(tracked: &Option<PolygonId>, edge: Edge) -> MeshResult<PolygonId> {
    tracked.ok_or_else(|| {
        MeshError::invariant(
            Invariant::UntrackedPolygon,
            format!("split of edge {edge} lost the cut polygon"),
        )
    })
}

/// Intersection candidates found from the edges of `source` against the
/// convex loop `target`: edge/edge hits, or, for an edge with none, its
/// crossing of the target plane strictly inside the target.
fn edge_candidates(
    source: &[Point3<f32>],
    target: &[Point3<f32>],
    target_plane: &Plane3D,
    tolerance: f32,
) -> Vec<Point3<f32>> {
    let mut found = Vec::new();
    let (n, m) = (source.len(), target.len());
    for i in 0..n {
        let (start, end) = (source[i], source[(i + 1) % n]);
        let mut hit = false;
        for j in 0..m {
            match intersect_segments(start, end, target[j], target[(j + 1) % m], tolerance) {
                Some(SegmentIntersection::Point(p)) => {
                    push_unique(&mut found, p, tolerance);
                    hit = true;
                }
                Some(SegmentIntersection::Overlap(a, b)) => {
                    push_unique(&mut found, a, tolerance);
                    push_unique(&mut found, b, tolerance);
                    hit = true;
                }
                None => {}
            }
        }
        if hit {
            continue;
        }
        if let Some((_, p)) = target_plane.intersect_segment(start, end) {
            if convex_containment(p, target, &target_plane.normal(), tolerance) == Containment::Inside {
                push_unique(&mut found, p, tolerance);
            }
        }
    }
    found
}

fn push_unique(points: &mut Vec<Point3<f32>>, point: Point3<f32>, tolerance: f32) {
    if points.iter().all(|p| (p - point).norm() > tolerance) {
        points.push(point);
    }
}

/// Picks the segment to cut along from the two candidate lists.
fn choose_cut_segment(
    from_target: &[Point3<f32>],
    from_cutter: &[Point3<f32>],
) -> Option<(Point3<f32>, Point3<f32>)> {
    if (from_target.is_empty() && from_cutter.len() < 2)
        || (from_cutter.is_empty() && from_target.len() < 2)
    {
        return None;
    }
    if from_target.len() + from_cutter.len() == 2 {
        let mut both = from_target.iter().chain(from_cutter).copied();
        return Some((both.next()?, both.next()?));
    }
    if !from_target.is_empty() && !from_cutter.is_empty() {
        return farthest_pair(from_target, from_cutter);
    }
    let side = if from_target.is_empty() { from_cutter } else { from_target };
    farthest_pair(side, side)
}

fn farthest_pair(left: &[Point3<f32>], right: &[Point3<f32>]) -> Option<(Point3<f32>, Point3<f32>)> {
    let mut best: Option<(f32, Point3<f32>, Point3<f32>)> = None;
    for a in left {
        for b in right {
            let distance = (a - b).norm_squared();
            if best.is_none_or(|(d, _, _)| distance > d) {
                best = Some((distance, *a, *b));
            }
        }
    }
    best.map(|(_, a, b)| (a, b))
}
