//! Contracts consumed from the host's navigation service.
//!
//! The microphysics never walks geometry itself; it asks a [`Navigator`] for
//! the volume at a point and for boundary normals, and asks a [`Solid`] for
//! containment tests in the solid's local frame. [`crate::geometry::Geometry`]
//! is a self-contained implementation used by tests and small hosts.

use crate::transform::{Touchable, VolumeId};
use nalgebra::{Point3, Unit, Vector3};

/// Result of a containment test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Inside,
    Surface,
    Outside,
}

/// A solid in its own local frame
pub trait Solid {
    fn inside(&self, local: &Point3<f64>) -> Containment;

    /// Outward unit normal of the surface nearest to `local`, if resolvable
    fn surface_normal(&self, local: &Point3<f64>) -> Option<Unit<Vector3<f64>>>;

    /// Distance from an interior point along `direction` to leaving the solid.
    /// `f64::INFINITY` for unbounded directions.
    fn distance_to_out(&self, local: &Point3<f64>, direction: &Vector3<f64>) -> f64;

    /// Lower bound on the distance from `local` to any boundary of the solid
    fn safety_distance(&self, local: &Point3<f64>) -> f64;
}

/// Navigation queries in the global frame
pub trait Navigator {
    /// Placement containing a global point
    fn locate(&self, global: &Point3<f64>) -> Option<Touchable>;

    /// Placement context of a known volume
    fn touchable(&self, volume: VolumeId) -> Option<Touchable>;

    /// Solid of a volume
    fn solid(&self, volume: VolumeId) -> Option<&dyn Solid>;

    /// Outward normal (global frame) of the boundary at a global point
    fn exit_normal(&self, global: &Point3<f64>) -> Option<Unit<Vector3<f64>>>;
}
