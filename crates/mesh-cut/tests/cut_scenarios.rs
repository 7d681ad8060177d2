use std::sync::Arc;

use approx::assert_relative_eq;
use mesh_cut::geometry::{convex_containment, distance_to_segment};
use mesh_cut::{
    Containment, DebugKind, DebugSink, Invariant, Mesh, MeshConfig, PolygonId, POSITION_EPSILON,
};
use nalgebra::{Point3, Translation3, Vector3};

fn unit_square() -> Mesh {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    Mesh::from_polygons(positions, [vec![0, 1, 2, 3]]).unwrap()
}

fn unit_cube() -> Mesh {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    let faces = [
        vec![0, 3, 2, 1],
        vec![4, 5, 6, 7],
        vec![0, 1, 5, 4],
        vec![3, 7, 6, 2],
        vec![0, 4, 7, 3],
        vec![1, 2, 6, 5],
    ];
    Mesh::from_polygons(positions, faces).unwrap()
}

/// A horizontal square at height `z`, reaching past the unit cube on every side.
fn slab(z: f32) -> Mesh {
    let positions = vec![
        Point3::new(-1.0, -1.0, z),
        Point3::new(2.0, -1.0, z),
        Point3::new(2.0, 2.0, z),
        Point3::new(-1.0, 2.0, z),
    ];
    Mesh::from_polygons(positions, [vec![0, 1, 2, 3]]).unwrap()
}

/// Checks both adjacency indices against the polygon loops.
fn assert_adjacency_consistent(mesh: &Mesh) {
    mesh.validate().unwrap();
    for (id, polygon) in mesh.polygons() {
        let edges = mesh.adjacent_edges(id).unwrap();
        assert_eq!(edges.len(), polygon.len());
        for (a, b) in polygon.edges() {
            let edge = mesh.edge(a, b);
            assert!(edges.contains(&edge));
            assert!(mesh.adjacent_polygons(edge).contains(&id));
        }
    }
    for edge in mesh.edges() {
        assert!(!mesh.adjacent_polygons(edge).is_empty());
    }
}

fn vertex_at(mesh: &Mesh, point: Point3<f32>) -> Option<usize> {
    mesh.polygons()
        .flat_map(|(_, p)| p.vertices().iter().copied())
        .find(|&v| (mesh.positions()[v] - point).norm() <= POSITION_EPSILON)
}

fn point_on_some_edge(mesh: &Mesh, point: Point3<f32>) -> bool {
    mesh.edges().any(|edge| {
        let (a, b) = edge.vertices();
        distance_to_segment(point, mesh.positions()[a], mesh.positions()[b]) <= POSITION_EPSILON
    })
}

#[derive(Default)]
struct CountingSink {
    candidates: usize,
    cut_edges: usize,
    polygons: usize,
}

impl DebugSink for CountingSink {
    fn point(&mut self, _position: Point3<f32>, _kind: DebugKind) {
        self.candidates += 1;
    }

    fn segment(&mut self, _start: Point3<f32>, _end: Point3<f32>, kind: DebugKind) {
        if kind == DebugKind::CutEdge {
            self.cut_edges += 1;
        }
    }

    fn polygon(&mut self, _points: &[Point3<f32>]) {
        self.polygons += 1;
    }
}

#[test]
fn adjacency_stays_consistent_through_surgery() {
    let mut mesh = unit_cube();
    let top = mesh.polygon_ids()[1];

    let split = mesh
        .split_edge_add_vertex(mesh.edge(4, 5), Point3::new(0.5, 0.0, 1.0), Some(top))
        .unwrap();
    assert_adjacency_consistent(&mesh);

    let top = split.tracked.unwrap();
    let halves = mesh.split_polygon(top, split.vertex, 6).unwrap();
    assert_adjacency_consistent(&mesh);

    mesh.poke_polygon(halves.polygons[0], Point3::new(0.7, 0.3, 1.0), None)
        .unwrap();
    assert_adjacency_consistent(&mesh);
    assert_relative_eq!(mesh.area(), 6.0, epsilon = 1e-4);
}

#[test]
fn polygon_split_distributes_vertices() {
    let positions: Vec<Point3<f32>> = (0..6)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::TAU / 6.0;
            Point3::new(angle.cos(), angle.sin(), 0.0)
        })
        .collect();
    let mut mesh = Mesh::from_polygons(positions, [vec![0, 1, 2, 3, 4, 5]]).unwrap();
    let hexagon = mesh.polygon_ids()[0];

    let split = mesh.split_polygon(hexagon, 1, 4).unwrap();

    let sizes: usize = split
        .polygons
        .iter()
        .map(|&id| mesh.polygon(id).unwrap().len())
        .sum();
    assert_eq!(sizes, 6 + 2);
    assert!(!mesh.contains_polygon(hexagon));
    assert_eq!(mesh.adjacent_polygons(split.edge).len(), 2);
    assert_adjacency_consistent(&mesh);
}

#[test]
fn tracked_polygon_follows_edge_split() {
    let mut mesh = unit_cube();
    let front = mesh.polygon_ids()[2];

    let split = mesh
        .split_edge_add_vertex(mesh.edge(0, 1), Point3::new(0.25, 0.0, 0.0), Some(front))
        .unwrap();

    let tracked = split.tracked.unwrap();
    assert!(!mesh.contains_polygon(front));
    let polygon = mesh.polygon(tracked).unwrap();
    assert_eq!(polygon.len(), 5);
    assert!(polygon.contains_vertex(split.vertex));
    assert!(polygon.contains_vertex(4) && polygon.contains_vertex(5));
}

#[test]
fn coincident_face_is_not_cut() {
    let mut target = unit_square();
    let cutter = unit_square();
    let positions = target.positions().len();

    let report = target.cut(&cutter).unwrap();

    assert!(!report.cut_applied);
    assert_eq!(report.operations, 0);
    assert_eq!(target.polygon_count(), 1);
    assert_eq!(target.positions().len(), positions);
}

#[test]
fn poked_square_keeps_area() {
    let mut mesh = unit_square();
    let square = mesh.polygon_ids()[0];

    let poke = mesh
        .poke_polygon(square, Point3::new(0.5, 0.5, 0.0), None)
        .unwrap();

    assert_eq!(poke.polygons.len(), 4);
    assert!(poke.polygons.iter().all(|&id| mesh.polygon(id).unwrap().len() == 3));
    assert_relative_eq!(mesh.area(), 1.0, epsilon = 1e-5);
    assert_adjacency_consistent(&mesh);
}

#[test]
fn adjacent_square_only_touches_shared_edge() {
    let mut target = unit_square();
    let neighbour = unit_square().with_frame(Arc::new(Translation3::new(1.0, 0.0, 0.0)));

    let report = target.cut(&neighbour).unwrap();

    assert!(!report.cut_applied);
    assert_eq!(target.polygon_count(), 1);
    assert!(target.edge_exists(target.edge(1, 2)));
    assert!(neighbour.edge_exists(neighbour.edge(0, 3)));
    assert!(report.edges.contains(&target.edge(1, 2)));
}

#[test]
fn contained_diamond_is_imprinted_as_ring() {
    let mut target = unit_square();
    let corners = vec![
        Point3::new(0.5, 0.2, 0.0),
        Point3::new(0.8, 0.5, 0.0),
        Point3::new(0.5, 0.8, 0.0),
        Point3::new(0.2, 0.5, 0.0),
    ];
    let diamond = Mesh::from_polygons(corners.clone(), [vec![0, 1, 2, 3]]).unwrap();

    let report = target.cut(&diamond).unwrap();

    assert!(report.cut_applied);
    assert!(target.polygon_count() >= 2);
    assert_relative_eq!(target.area(), 1.0, epsilon = 1e-4);
    assert_adjacency_consistent(&target);

    for corner in &corners {
        assert!(vertex_at(&target, *corner).is_some(), "corner {corner:?} missing");
    }
    for i in 0..corners.len() {
        let (a, b) = (corners[i], corners[(i + 1) % corners.len()]);
        for t in [0.25, 0.5, 0.75] {
            let sample = a + (b - a) * t;
            assert!(point_on_some_edge(&target, sample), "ring edge at {sample:?} missing");
        }
    }

    let inside: f32 = target
        .polygons()
        .filter(|(_, p)| {
            let centroid = p.centroid(target.positions());
            convex_containment(centroid, &corners, &Vector3::z(), POSITION_EPSILON)
                == Containment::Inside
        })
        .map(|(_, p)| p.area(target.positions()))
        .sum();
    assert_relative_eq!(inside, 0.18, epsilon = 1e-3);
}

#[test]
fn slab_cuts_cube_sides_in_half() {
    let mut cube = unit_cube();

    let report = cube.cut(&slab(0.5)).unwrap();

    assert!(report.cut_applied);
    assert_eq!(report.operations, 4);
    assert_eq!(report.edges.len(), 4);
    assert_eq!(cube.polygon_count(), 10);
    for edge in &report.edges {
        let (a, b) = edge.vertices();
        assert_relative_eq!(cube.positions()[a].z, 0.5, epsilon = 1e-5);
        assert_relative_eq!(cube.positions()[b].z, 0.5, epsilon = 1e-5);
        assert_eq!(cube.adjacent_polygons(*edge).len(), 2);
    }
    assert_relative_eq!(cube.area(), 6.0, epsilon = 1e-4);
    assert_adjacency_consistent(&cube);
}

#[test]
fn slab_outside_cube_changes_nothing() {
    let mut cube = unit_cube();

    let report = cube.cut(&slab(3.0)).unwrap();

    assert!(!report.cut_applied);
    assert!(report.edges.is_empty());
    assert_eq!(cube.polygon_count(), 6);
}

#[test]
fn cut_follows_both_frames() {
    let mut target = unit_square().with_frame(Arc::new(Translation3::new(0.0, 0.0, 3.0)));
    let positions = vec![
        Point3::new(0.0, -1.0, -1.0),
        Point3::new(0.0, 2.0, -1.0),
        Point3::new(0.0, 2.0, 1.0),
        Point3::new(0.0, -1.0, 1.0),
    ];
    let wall = Mesh::from_polygons(positions, [vec![0, 1, 2, 3]])
        .unwrap()
        .with_frame(Arc::new(Translation3::new(0.5, 0.0, 3.0)));

    let report = target.cut(&wall).unwrap();

    assert!(report.cut_applied);
    assert_eq!(target.polygon_count(), 2);
    let (a, b) = report.edges[0].vertices();
    for v in [a, b] {
        let local = target.position(v).unwrap();
        assert_relative_eq!(local.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(local.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(target.world_position(v).unwrap().z, 3.0, epsilon = 1e-5);
    }
}

#[test]
fn dual_cut_imprints_both_meshes() {
    let mut cube = unit_cube();
    let mut plate = slab(0.5);

    let (forward, backward) = cube.dual_cut(&mut plate).unwrap();

    assert!(forward.cut_applied);
    assert!(backward.cut_applied);
    assert_eq!(cube.polygon_count(), 10);
    assert_relative_eq!(plate.area(), 9.0, epsilon = 1e-3);
    assert_adjacency_consistent(&plate);
    for corner in [
        Point3::new(0.0, 0.0, 0.5),
        Point3::new(1.0, 0.0, 0.5),
        Point3::new(1.0, 1.0, 0.5),
        Point3::new(0.0, 1.0, 0.5),
    ] {
        assert!(vertex_at(&plate, corner).is_some());
    }
}

#[test]
fn iteration_ceiling_rolls_back() {
    let mut cube = unit_cube();
    cube.set_config(MeshConfig::default().with_max_cut_iterations(1));
    let before: Vec<PolygonId> = cube.polygon_ids();

    let err = cube.cut(&slab(0.5)).unwrap_err();

    assert_eq!(err.failed_invariant(), Invariant::IterationCeiling);
    assert_eq!(cube.polygon_ids(), before);
    assert_eq!(cube.positions().len(), 8);
}

#[test]
fn sink_sees_cutter_and_cut_edges() {
    let mut cube = unit_cube();
    let mut sink = CountingSink::default();

    cube.cut_with_sink(&slab(0.5), &mut sink).unwrap();

    assert_eq!(sink.polygons, 1);
    assert_eq!(sink.cut_edges, 4);
    assert!(sink.candidates >= 8);
}

#[test]
fn buffer_covers_cut_mesh() {
    let mut cube = unit_cube();
    cube.cut(&slab(0.5)).unwrap();

    let buffer = cube.to_buffer();

    let triangles: usize = cube.polygons().map(|(_, p)| p.len() - 2).sum();
    assert_eq!(buffer.triangle_count(), triangles);
    assert_eq!(buffer.normals.len(), buffer.positions.len());
}
