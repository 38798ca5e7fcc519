//! Boundary handling for drifting charge carriers.
//!
//! The drift-boundary process only detects the crossing and resolves the
//! surface normal; what happens at the surface is delegated to a
//! [`BoundaryResolver`] supplied by the host.

use crate::particle::{Fate, Step, Track, TrackStatus};
use crate::secondary::ParticleChange;
use nalgebra::{Unit, Vector3};
use std::fmt::Debug;

/// Surface interaction for a carrier that reached a boundary
pub trait BoundaryResolver: Debug + Send + Sync {
    /// `normal` is the global outward normal at the post-step point
    fn resolve(&self, track: &Track, step: &Step, normal: &Unit<Vector3<f64>>) -> ParticleChange;
}

/// Carrier is collected at the surface and its energy deposited
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsorbAtSurface;

impl BoundaryResolver for AbsorbAtSurface {
    fn resolve(&self, track: &Track, _step: &Step, _normal: &Unit<Vector3<f64>>) -> ParticleChange {
        let mut change = ParticleChange::new();
        change.deposit_non_ionizing(track.kinetic_energy);
        change.propose_energy(0.0);
        change.propose_status(TrackStatus::Killed(Fate::Absorbed));
        change
    }
}

/// Mirror reflection off the surface, energy unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecularReflection;

impl BoundaryResolver for SpecularReflection {
    fn resolve(&self, _track: &Track, step: &Step, normal: &Unit<Vector3<f64>>) -> ParticleChange {
        let d = step.post.direction.into_inner();
        let n = normal.into_inner();
        let reflected = d - n * (2.0 * d.dot(&n));

        let mut change = ParticleChange::new();
        change.propose_direction(Unit::new_normalize(reflected));
        change
    }
}
