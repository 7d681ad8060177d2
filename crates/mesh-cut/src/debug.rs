//! Optional diagnostics port for the cut engine.
//!
//! The cut engine reports what it finds through a [`DebugSink`]. Every
//! method has a no-op default, so a sink only overrides what it draws, and
//! [`NoDebug`] ignores everything. Mesh results never depend on the sink.

use nalgebra::Point3;

/// What a reported point or segment represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugKind {
    /// An intersection candidate found from the target polygon's edges.
    TargetCandidate,
    /// An intersection candidate found from the cutting polygon's edges.
    CutterCandidate,
    /// The segment chosen for a cut operation.
    CutSegment,
    /// An edge that realizes an applied cut.
    CutEdge,
}

/// Receiver of draw requests. All positions are in the world frame.
pub trait DebugSink {
    /// A single point of interest.
    fn point(&mut self, _position: Point3<f32>, _kind: DebugKind) {}

    /// A segment between two points.
    fn segment(&mut self, _start: Point3<f32>, _end: Point3<f32>, _kind: DebugKind) {}

    /// A polygon outline.
    fn polygon(&mut self, _points: &[Point3<f32>]) {}
}

/// A sink that discards every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDebug;

impl DebugSink for NoDebug {}
