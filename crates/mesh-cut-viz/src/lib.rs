//! Drawing helpers and scene generators for the mesh-cut demos.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use macroquad::models::{draw_mesh, Mesh as GpuMesh, Vertex};
use macroquad::prelude::*;
use mesh_cut::{DebugKind, DebugSink, Mesh, MeshResult, PolygonId};
use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

pub mod navigator;
pub use navigator::PolygonInspector;

fn to_vec3(p: &Point3<f32>) -> Vec3 {
    vec3(p.x, p.y, p.z)
}

/// Generates a deterministic color from a polygon's world positions.
///
/// Fragments produced by a cut hash differently from their parent, so every
/// new polygon shows up in its own color.
pub fn polygon_color(points: &[Point3<f32>]) -> Color {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for p in points {
        p.x.to_bits().hash(&mut hasher);
        p.y.to_bits().hash(&mut hasher);
        p.z.to_bits().hash(&mut hasher);
    }
    let hash = hasher.finish();

    let r = (((hash >> 16) & 0xFF) as u8).max(40);
    let g = (((hash >> 8) & 0xFF) as u8).max(40);
    let b = ((hash & 0xFF) as u8).max(40);
    Color::from_rgba(r, g, b, 255)
}

/// Draws a convex loop of world points as a filled fan.
pub fn draw_polygon(points: &[Point3<f32>], color: Color) {
    if points.len() < 3 {
        return;
    }
    let vertices: Vec<Vertex> = points
        .iter()
        .map(|p| Vertex::new2(to_vec3(p), vec2(0.0, 0.0), color))
        .collect();
    let mut indices: Vec<u16> = Vec::with_capacity((points.len() - 2) * 3);
    for i in 1..points.len() as u16 - 1 {
        indices.extend([0, i, i + 1]);
    }
    draw_mesh(&GpuMesh {
        vertices,
        indices,
        texture: None,
    });
}

/// Draws every polygon of a mesh in its own color.
pub fn draw_mesh_polygons(mesh: &Mesh) {
    for id in mesh.polygon_ids() {
        if let Ok(points) = mesh.world_points(id) {
            draw_polygon(&points, polygon_color(&points));
        }
    }
}

/// Draws every edge of a mesh.
pub fn draw_mesh_edges(mesh: &Mesh, color: Color) {
    for edge in mesh.edges() {
        let (a, b) = edge.vertices();
        if let (Some(pa), Some(pb)) = (mesh.world_position(a), mesh.world_position(b)) {
            draw_line_3d(to_vec3(&pa), to_vec3(&pb), color);
        }
    }
}

/// Draws the flat-shaded triangle buffer of a mesh, lit from `light`.
///
/// Meshes with more vertices than a 16-bit index buffer holds are skipped.
pub fn draw_shaded(mesh: &Mesh, base: Color, light: Vector3<f32>) {
    let buffer = mesh.to_buffer();
    let Some(light) = light.try_normalize(f32::EPSILON) else {
        return;
    };
    let Ok(indices) = buffer
        .indices
        .iter()
        .map(|&i| u16::try_from(i))
        .collect::<Result<Vec<u16>, _>>()
    else {
        return;
    };

    let vertices = buffer
        .positions
        .iter()
        .zip(&buffer.normals)
        .map(|(p, n)| {
            let shade = 0.35 + 0.65 * n.dot(&light).max(0.0);
            let color = Color::new(base.r * shade, base.g * shade, base.b * shade, base.a);
            Vertex::new2(to_vec3(p), vec2(0.0, 0.0), color)
        })
        .collect();

    draw_mesh(&GpuMesh {
        vertices,
        indices,
        texture: None,
    });
}

/// Outlines one polygon, slightly thicker than the wireframe.
pub fn draw_outline(mesh: &Mesh, id: PolygonId, color: Color) {
    let Ok(points) = mesh.world_points(id) else {
        return;
    };
    for i in 0..points.len() {
        let (a, b) = (points[i], points[(i + 1) % points.len()]);
        draw_line_3d(to_vec3(&a), to_vec3(&b), color);
        draw_sphere(to_vec3(&a), 0.08, None, color);
    }
}

/// A [`DebugSink`] that stores every request so it can be drawn each frame.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    points: Vec<(Point3<f32>, DebugKind)>,
    segments: Vec<(Point3<f32>, Point3<f32>, DebugKind)>,
    polygons: Vec<Vec<Point3<f32>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.segments.clear();
        self.polygons.clear();
    }

    /// Number of recorded segments of one kind.
    pub fn segment_count(&self, kind: DebugKind) -> usize {
        self.segments.iter().filter(|(_, _, k)| *k == kind).count()
    }

    pub fn draw(&self) {
        for (p, kind) in &self.points {
            draw_sphere(to_vec3(p), 0.12, None, kind_color(*kind));
        }
        for (a, b, kind) in &self.segments {
            draw_line_3d(to_vec3(a), to_vec3(b), kind_color(*kind));
        }
        for outline in &self.polygons {
            for i in 0..outline.len() {
                let (a, b) = (outline[i], outline[(i + 1) % outline.len()]);
                draw_line_3d(to_vec3(&a), to_vec3(&b), Color::from_rgba(120, 120, 255, 160));
            }
        }
    }
}

impl DebugSink for RecordingSink {
    fn point(&mut self, position: Point3<f32>, kind: DebugKind) {
        self.points.push((position, kind));
    }

    fn segment(&mut self, start: Point3<f32>, end: Point3<f32>, kind: DebugKind) {
        self.segments.push((start, end, kind));
    }

    fn polygon(&mut self, points: &[Point3<f32>]) {
        self.polygons.push(points.to_vec());
    }
}

fn kind_color(kind: DebugKind) -> Color {
    match kind {
        DebugKind::TargetCandidate => ORANGE,
        DebugKind::CutterCandidate => PINK,
        DebugKind::CutSegment => YELLOW,
        DebugKind::CutEdge => RED,
    }
}

/// Builds an axis-aligned cube mesh of edge length `size` centered at the origin.
///
/// Faces wind counter-clockwise viewed from outside.
pub fn generate_cube(size: f32) -> MeshResult<Mesh> {
    let half = size / 2.0;
    let corners = vec![
        Point3::new(-half, -half, -half), // 0: left-bottom-back
        Point3::new(half, -half, -half),  // 1: right-bottom-back
        Point3::new(half, half, -half),   // 2: right-top-back
        Point3::new(-half, half, -half),  // 3: left-top-back
        Point3::new(-half, -half, half),  // 4: left-bottom-front
        Point3::new(half, -half, half),   // 5: right-bottom-front
        Point3::new(half, half, half),    // 6: right-top-front
        Point3::new(-half, half, half),   // 7: left-top-front
    ];
    let faces = [
        vec![4, 5, 6, 7], // front (+Z)
        vec![1, 0, 3, 2], // back (-Z)
        vec![0, 4, 7, 3], // left (-X)
        vec![5, 1, 2, 6], // right (+X)
        vec![7, 6, 2, 3], // top (+Y)
        vec![0, 1, 5, 4], // bottom (-Y)
    ];
    Mesh::from_polygons(corners, faces)
}

/// A cube placed in the world by a rigid frame instead of rotated positions,
/// which keeps every face exactly planar in local space.
pub fn generate_rotated_cube(
    center: Point3<f32>,
    size: f32,
    rotation: &Rotation3<f32>,
) -> MeshResult<Mesh> {
    let frame = Isometry3::from_parts(
        Translation3::from(center.coords),
        UnitQuaternion::from_rotation_matrix(rotation),
    );
    Ok(generate_cube(size)?.with_frame(Arc::new(frame)))
}

/// A square plate of edge length `size` in the local XZ plane, facing +Y.
pub fn generate_plate(size: f32) -> MeshResult<Mesh> {
    let half = size / 2.0;
    let corners = vec![
        Point3::new(-half, 0.0, -half),
        Point3::new(-half, 0.0, half),
        Point3::new(half, 0.0, half),
        Point3::new(half, 0.0, -half),
    ];
    Mesh::from_polygons(corners, [vec![0, 1, 2, 3]])
}

/// Simple orbit camera for 3D scene navigation.
pub struct OrbitCamera {
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub target: Vec3,
    /// Scroll wheel zoom multiplier
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitCamera {
    pub fn new(distance: f32, yaw: f32, pitch: f32) -> Self {
        Self {
            distance,
            yaw,
            pitch,
            target: vec3(0.0, 0.0, 0.0),
            zoom_speed: 2.0,
            min_distance: 3.0,
            max_distance: 100.0,
        }
    }

    /// Sets the zoom speed and distance limits.
    pub fn with_zoom(mut self, speed: f32, min: f32, max: f32) -> Self {
        self.zoom_speed = speed;
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    /// Points the camera at the centroid of a mesh's world positions.
    pub fn focus(&mut self, mesh: &Mesh) {
        let buffer = mesh.to_buffer();
        if buffer.positions.is_empty() {
            return;
        }
        let sum: Vector3<f32> = buffer.positions.iter().map(|p| p.coords).sum();
        let center = sum / buffer.positions.len() as f32;
        self.target = vec3(center.x, center.y, center.z);
    }

    /// Mouse drag and arrow keys orbit, the wheel zooms.
    pub fn update(&mut self) {
        if is_mouse_button_down(MouseButton::Left) {
            let delta = mouse_delta_position();
            self.yaw -= delta.x * 2.0;
            self.pitch -= delta.y * 2.0;
        }

        let step = 0.02;
        let keys = [
            (KeyCode::Left, step, 0.0),
            (KeyCode::Right, -step, 0.0),
            (KeyCode::Up, 0.0, step),
            (KeyCode::Down, 0.0, -step),
        ];
        for (key, yaw, pitch) in keys {
            if is_key_down(key) {
                self.yaw += yaw;
                self.pitch += pitch;
            }
        }
        self.pitch = self.pitch.clamp(-1.5, 1.5);

        self.distance -= mouse_wheel().1 * self.zoom_speed;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + vec3(x, y, z)
    }

    pub fn to_camera3d(&self) -> Camera3D {
        Camera3D {
            position: self.position(),
            up: vec3(0.0, 1.0, 0.0),
            target: self.target,
            ..Default::default()
        }
    }
}

/// Draws the world axes at the origin.
pub fn draw_axes(length: f32) {
    draw_line_3d(vec3(0.0, 0.0, 0.0), vec3(length, 0.0, 0.0), RED);
    draw_line_3d(vec3(0.0, 0.0, 0.0), vec3(0.0, length, 0.0), GREEN);
    draw_line_3d(vec3(0.0, 0.0, 0.0), vec3(0.0, 0.0, length), BLUE);
}
