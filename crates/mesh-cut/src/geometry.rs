//! Tolerance-based point, segment and convex-loop primitives.
//!
//! All functions take a distance tolerance `epsilon`; positions closer than
//! that are treated as coincident.

use nalgebra::{Point3, Vector3};

/// Result of intersecting two segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentIntersection {
    /// The segments cross or touch at a single point.
    Point(Point3<f32>),
    /// The segments are collinear and share a stretch between two points.
    Overlap(Point3<f32>, Point3<f32>),
}

/// Where a point lies relative to a convex loop it is coplanar with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Strictly inside, farther than epsilon from every edge.
    Inside,
    /// Within epsilon of the boundary.
    Boundary,
    /// Outside the loop.
    Outside,
}

/// Projects `point` onto the segment `start..end`, clamped to the segment.
///
/// Returns the segment parameter in `[0, 1]` and the projected point.
pub fn closest_point_on_segment(
    point: Point3<f32>,
    start: Point3<f32>,
    end: Point3<f32>,
) -> (f32, Point3<f32>) {
    let direction = end - start;
    let len_sq = direction.norm_squared();
    if len_sq <= f32::EPSILON * f32::EPSILON {
        return (0.0, start);
    }
    let t = ((point - start).dot(&direction) / len_sq).clamp(0.0, 1.0);
    (t, start + direction * t)
}

/// Distance from `point` to the segment `start..end`.
#[inline]
pub fn distance_to_segment(point: Point3<f32>, start: Point3<f32>, end: Point3<f32>) -> f32 {
    let (_, closest) = closest_point_on_segment(point, start, end);
    (point - closest).norm()
}

/// Distance from `point` to the infinite line through `a` and `b`.
pub fn distance_to_line(point: Point3<f32>, a: Point3<f32>, b: Point3<f32>) -> f32 {
    let direction = b - a;
    let len = direction.norm();
    if len <= f32::EPSILON {
        return (point - a).norm();
    }
    direction.cross(&(point - a)).norm() / len
}

/// Returns true if `middle` lies within `epsilon` of the line through `a` and `b`.
#[inline]
pub fn are_collinear(a: Point3<f32>, middle: Point3<f32>, b: Point3<f32>, epsilon: f32) -> bool {
    distance_to_line(middle, a, b) <= epsilon
}

/// Intersects segment `a0..a1` with segment `b0..b1`.
///
/// Collinear segments yield their shared stretch, which collapses to a
/// single point when it is shorter than `epsilon`. Skew or disjoint
/// segments yield `None`.
pub fn intersect_segments(
    a0: Point3<f32>,
    a1: Point3<f32>,
    b0: Point3<f32>,
    b1: Point3<f32>,
    epsilon: f32,
) -> Option<SegmentIntersection> {
    let da = a1 - a0;
    let db = b1 - b0;
    let len_a = da.norm();
    let len_b = db.norm();
    if len_a <= epsilon || len_b <= epsilon {
        return None;
    }

    let cross = da.cross(&db);
    let cross_norm = cross.norm();

    if cross_norm <= epsilon * len_a * len_b {
        // Parallel: only collinear segments can meet.
        if distance_to_line(b0, a0, a1) > epsilon {
            return None;
        }
        let param = |p: Point3<f32>| (p - a0).dot(&da) / (len_a * len_a);
        let (t0, t1) = (param(b0), param(b1));
        let lo = t0.min(t1).max(0.0);
        let hi = t0.max(t1).min(1.0);
        if lo > hi + epsilon / len_a {
            return None;
        }
        let start = a0 + da * lo.min(1.0);
        let end = a0 + da * hi.max(0.0);
        if (end - start).norm() <= epsilon {
            return Some(SegmentIntersection::Point(start));
        }
        return Some(SegmentIntersection::Overlap(start, end));
    }

    let w = b0 - a0;
    if (w.dot(&cross) / cross_norm).abs() > epsilon {
        return None;
    }

    let denom = cross_norm * cross_norm;
    let t = w.cross(&db).dot(&cross) / denom;
    let u = w.cross(&da).dot(&cross) / denom;
    let slack_a = epsilon / len_a;
    let slack_b = epsilon / len_b;
    if t < -slack_a || t > 1.0 + slack_a || u < -slack_b || u > 1.0 + slack_b {
        return None;
    }

    Some(SegmentIntersection::Point(a0 + da * t.clamp(0.0, 1.0)))
}

/// Area-weighted normal of a closed loop (Newell's method).
///
/// The direction follows the loop winding; the length is twice the area of
/// the loop for planar input.
pub fn newell_normal(points: &[Point3<f32>]) -> Vector3<f32> {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let current = points[i];
        let next = points[(i + 1) % n];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal
}

/// Classifies a point against a convex loop with unit normal `normal`.
///
/// The point is assumed to lie in the loop's plane.
pub fn convex_containment(
    point: Point3<f32>,
    points: &[Point3<f32>],
    normal: &Vector3<f32>,
    epsilon: f32,
) -> Containment {
    let n = points.len();
    let mut on_boundary = false;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let Some(inward) = normal.cross(&(b - a)).try_normalize(f32::EPSILON) else {
            continue;
        };
        let side = (point - a).dot(&inward);
        if side < -epsilon {
            return Containment::Outside;
        }
        if side <= epsilon {
            on_boundary = true;
        }
    }
    if on_boundary {
        Containment::Boundary
    } else {
        Containment::Inside
    }
}

/// Clips the segment `start..end` against a convex loop it is coplanar with.
///
/// Returns the part of the segment inside or on the loop, or `None` if the
/// segment misses the loop entirely.
pub fn clip_segment_to_convex(
    start: Point3<f32>,
    end: Point3<f32>,
    points: &[Point3<f32>],
    normal: &Vector3<f32>,
    epsilon: f32,
) -> Option<(Point3<f32>, Point3<f32>)> {
    let direction = end - start;
    let length = direction.norm();
    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;

    let n = points.len();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let Some(inward) = normal.cross(&(b - a)).try_normalize(f32::EPSILON) else {
            continue;
        };
        let distance = (start - a).dot(&inward);
        let rate = direction.dot(&inward);

        if rate.abs() <= f32::EPSILON * length.max(1.0) {
            if distance < -epsilon {
                return None;
            }
            continue;
        }

        let t = -distance / rate;
        if rate > 0.0 {
            t_enter = t_enter.max(t);
        } else {
            t_exit = t_exit.min(t);
        }
    }

    if length > 0.0 && (t_enter - t_exit) * length > epsilon {
        return None;
    }
    let t_exit = t_exit.max(t_enter);
    Some((start + direction * t_enter, start + direction * t_exit))
}
