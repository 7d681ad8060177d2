//! Coordinate frames mapping mesh-local positions to a shared world frame.

use std::fmt::Debug;

use nalgebra::{Isometry3, Point3, Translation3};

/// Maps positions between a mesh's local frame and the world frame.
///
/// A mesh without a frame stores world positions directly.
pub trait CoordinateFrame: Debug + Send + Sync {
    /// Converts a local position into the world frame.
    fn to_world(&self, local: &Point3<f32>) -> Point3<f32>;

    /// Converts a world position into the local frame.
    fn to_local(&self, world: &Point3<f32>) -> Point3<f32>;
}

impl CoordinateFrame for Isometry3<f32> {
    fn to_world(&self, local: &Point3<f32>) -> Point3<f32> {
        self.transform_point(local)
    }

    fn to_local(&self, world: &Point3<f32>) -> Point3<f32> {
        self.inverse_transform_point(world)
    }
}

impl CoordinateFrame for Translation3<f32> {
    fn to_world(&self, local: &Point3<f32>) -> Point3<f32> {
        self.transform_point(local)
    }

    fn to_local(&self, world: &Point3<f32>) -> Point3<f32> {
        self.inverse_transform_point(world)
    }
}
