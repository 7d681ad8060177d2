//! Triangle buffers for rendering.

use nalgebra::{Point3, Vector3};

use crate::geometry::newell_normal;
use crate::Mesh;

/// Flat-shaded triangle soup in the world frame.
///
/// Every polygon gets its own copy of its corner positions so that each
/// vertex carries the normal of the polygon it belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    /// Vertex positions.
    pub positions: Vec<Point3<f32>>,
    /// One unit normal per vertex.
    pub normals: Vec<Vector3<f32>>,
    /// Triangle corners, three per triangle, indexing `positions`.
    pub indices: Vec<u32>,
}

impl MeshBuffer {
    /// Number of triangles in the buffer.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl Mesh {
    /// Fan-triangulates every polygon into a flat-shaded buffer.
    pub fn to_buffer(&self) -> MeshBuffer {
        let mut buffer = MeshBuffer::default();

        for (_, polygon) in self.polygons() {
            let world: Vec<Point3<f32>> = polygon
                .vertices()
                .iter()
                .map(|&v| self.to_world(self.positions()[v]))
                .collect();
            let normal = newell_normal(&world)
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vector3::z);

            let base = buffer.positions.len() as u32;
            buffer.positions.extend(world.iter().copied());
            buffer.normals.extend(std::iter::repeat_n(normal, world.len()));
            for triangle in polygon.triangulate() {
                if let [Some(a), Some(b), Some(c)] = triangle.map(|v| polygon.position_of(v)) {
                    buffer
                        .indices
                        .extend([base + a as u32, base + b as u32, base + c as u32]);
                }
            }
        }

        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Translation3;
    use std::sync::Arc;

    #[test]
    fn quad_becomes_two_triangles() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = Mesh::from_polygons(positions, [vec![0, 1, 2, 3]]).unwrap();

        let buffer = mesh.to_buffer();

        assert_eq!(buffer.positions.len(), 4);
        assert_eq!(buffer.triangle_count(), 2);
        assert_eq!(buffer.indices, vec![0, 1, 2, 0, 2, 3]);
        for normal in &buffer.normals {
            assert_relative_eq!(*normal, Vector3::z(), epsilon = 1e-6);
        }
    }

    #[test]
    fn indices_follow_each_polygon_fan() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = Mesh::from_polygons(positions, [vec![0, 1, 4, 5], vec![1, 2, 3, 4]]).unwrap();

        let buffer = mesh.to_buffer();

        assert_eq!(buffer.positions.len(), 8);
        assert_eq!(buffer.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
        for (_, polygon) in mesh.polygons() {
            assert_eq!(polygon.triangulate().len(), 2);
        }
    }

    #[test]
    fn buffer_is_in_world_frame() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = Mesh::from_polygons(positions, [vec![0, 1, 2]])
            .unwrap()
            .with_frame(Arc::new(Translation3::new(0.0, 0.0, 2.0)));

        let buffer = mesh.to_buffer();

        assert!(buffer.positions.iter().all(|p| (p.z - 2.0).abs() < 1e-6));
    }

    #[test]
    fn empty_mesh_gives_empty_buffer() {
        assert_eq!(Mesh::new().to_buffer(), MeshBuffer::default());
    }
}
