//! Plane representation used for planarity checks and edge/plane intersection.

use nalgebra::{Point3, Vector3};

/// Default epsilon for plane classification.
/// Points within this distance of the plane are considered "on" the plane.
pub const PLANE_EPSILON: f32 = 1e-5;

/// Which side of a plane a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Point is in front of the plane (positive side of normal)
    Front,
    /// Point is behind the plane (negative side of normal)
    Back,
    /// Point lies on the plane (within epsilon tolerance)
    OnPlane,
}

/// A plane in 3D space, represented as `normal · point = offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane3D {
    normal: Vector3<f32>,
    offset: f32,
}

impl Plane3D {
    /// Creates a plane from a point on the plane and a normal vector.
    ///
    /// Returns `None` if the normal has (near) zero length.
    pub fn from_point_and_normal(point: Point3<f32>, normal: Vector3<f32>) -> Option<Self> {
        let unit_normal = normal.try_normalize(f32::EPSILON)?;
        Some(Self {
            normal: unit_normal,
            offset: unit_normal.dot(&point.coords),
        })
    }

    /// Creates a plane from three points.
    /// The normal direction follows the right-hand rule: (b - a) × (c - a).
    ///
    /// Returns `None` if the points are collinear (or nearly so).
    pub fn from_three_points(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Option<Self> {
        Self::from_point_and_normal(a, (b - a).cross(&(c - a)))
    }

    /// Returns the unit normal vector of the plane.
    #[inline]
    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    /// Returns the signed distance from the origin to the plane along the normal.
    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Computes the signed distance from a point to the plane.
    #[inline]
    pub fn signed_distance(&self, point: Point3<f32>) -> f32 {
        self.normal.dot(&point.coords) - self.offset
    }

    /// Classifies which side of the plane a point lies on.
    /// Uses the default `PLANE_EPSILON` tolerance.
    #[inline]
    pub fn classify_point(&self, point: Point3<f32>) -> PlaneSide {
        self.classify_point_with_epsilon(point, PLANE_EPSILON)
    }

    /// Classifies which side of the plane a point lies on, with a custom epsilon.
    pub fn classify_point_with_epsilon(&self, point: Point3<f32>, epsilon: f32) -> PlaneSide {
        let dist = self.signed_distance(point);
        if dist > epsilon {
            PlaneSide::Front
        } else if dist < -epsilon {
            PlaneSide::Back
        } else {
            PlaneSide::OnPlane
        }
    }

    /// Returns true if the point lies within `epsilon` of the plane.
    #[inline]
    pub fn contains_point(&self, point: Point3<f32>, epsilon: f32) -> bool {
        self.classify_point_with_epsilon(point, epsilon) == PlaneSide::OnPlane
    }

    /// Projects a point onto the plane (finds the closest point on the plane).
    #[inline]
    pub fn project_point(&self, point: Point3<f32>) -> Point3<f32> {
        point - self.normal * self.signed_distance(point)
    }

    /// Computes the intersection of a line segment with the plane.
    ///
    /// Returns `Some((t, point))` where `t` is the interpolation parameter
    /// (0.0 = start, 1.0 = end). Returns `None` if the segment is parallel to
    /// the plane (including lying in it) or does not reach it.
    pub fn intersect_segment(
        &self,
        start: Point3<f32>,
        end: Point3<f32>,
    ) -> Option<(f32, Point3<f32>)> {
        let direction = end - start;
        let denom = self.normal.dot(&direction);

        if denom.abs() < f32::EPSILON {
            return None;
        }

        let t = (self.offset - self.normal.dot(&start.coords)) / denom;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }

        Some((t, start + direction * t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ground() -> Plane3D {
        Plane3D::from_point_and_normal(Point3::origin(), Vector3::z()).unwrap()
    }

    #[test]
    fn collinear_points_have_no_plane() {
        let plane = Plane3D::from_three_points(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        assert!(plane.is_none());
    }

    #[test]
    fn classify_respects_epsilon() {
        let plane = ground();
        assert_eq!(plane.classify_point(Point3::new(0.0, 0.0, 1.0)), PlaneSide::Front);
        assert_eq!(plane.classify_point(Point3::new(0.0, 0.0, -1.0)), PlaneSide::Back);
        assert_eq!(plane.classify_point(Point3::new(3.0, 2.0, 1e-6)), PlaneSide::OnPlane);
        assert!(!plane.contains_point(Point3::new(0.0, 0.0, 1e-3), 1e-4));
        assert!(plane.contains_point(Point3::new(0.0, 0.0, 1e-3), 1e-2));
    }

    #[test]
    fn segment_crossing_plane() {
        let (t, point) = ground()
            .intersect_segment(Point3::new(1.0, 1.0, -1.0), Point3::new(1.0, 1.0, 3.0))
            .unwrap();
        assert_relative_eq!(t, 0.25);
        assert_relative_eq!(point.z, 0.0);
    }

    #[test]
    fn segment_in_plane_does_not_intersect() {
        let hit = ground().intersect_segment(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        assert!(hit.is_none());
    }

    #[test]
    fn segment_short_of_plane() {
        let hit = ground().intersect_segment(Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, 2.0));
        assert!(hit.is_none());
    }

    #[test]
    fn projection_lands_on_plane() {
        let plane = Plane3D::from_three_points(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        )
        .unwrap();
        let projected = plane.project_point(Point3::new(0.3, 0.7, 5.0));
        assert_relative_eq!(projected.z, 1.0);
        assert_relative_eq!(plane.offset(), 1.0);
    }
}
