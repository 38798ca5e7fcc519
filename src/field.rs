//! Equation of motion of a charge carrier in an electric field.
//!
//! The state vector follows the usual tracking layout
//! `[x, y, z, px, py, pz, _, _]` with momentum in eV s/m, and the derivative
//! is taken with respect to path length. Inside a valley the applied force
//! is mapped into Herring-Vogt space so that the carrier responds with its
//! scalar conductivity mass.

use crate::lattice::LatticeParams;
use crate::transform::{FrameCache, Touchable};
use nalgebra::Vector3;
use std::sync::Arc;
use tracing::trace;

/// Right-hand side of the carrier equation of motion
#[derive(Debug, Clone)]
pub struct CarrierEquation {
    lattice: Option<Arc<LatticeParams>>,
    frames: FrameCache,
    /// Charge in units of e
    charge: f64,
    /// Scalar mass [eV s^2/m^2]
    mass: f64,
    valley: Option<usize>,
}

impl CarrierEquation {
    pub fn new(lattice: Option<Arc<LatticeParams>>) -> Self {
        CarrierEquation {
            lattice,
            frames: FrameCache::new(),
            charge: 0.0,
            mass: 0.0,
            valley: None,
        }
    }

    /// Switch lattice; true when it differs from the current one
    pub fn change_lattice(&mut self, lattice: Option<Arc<LatticeParams>>) -> bool {
        let changed = match (&self.lattice, &lattice) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        };
        self.lattice = lattice;
        if changed {
            self.valley = None;
            self.frames.clear();
        }
        changed
    }

    /// Bind to the carrier's current placement; true when the frame changed
    pub fn bind_placement(&mut self, touchable: &Touchable) -> bool {
        let changed = self.frames.volume() != Some(touchable.volume) || self.frames.transform() != touchable.transform;
        self.frames.bind(touchable);
        changed
    }

    /// Select a valley; out-of-range indices (or no lattice) disable valley kinematics
    pub fn set_valley(&mut self, valley: Option<usize>) {
        self.valley = match (&self.lattice, valley) {
            (Some(lattice), Some(iv)) if iv < lattice.valley_count() => Some(iv),
            _ => None,
        };
    }

    pub fn valley(&self) -> Option<usize> {
        self.valley
    }

    pub fn set_charge_and_mass(&mut self, charge: f64, mass: f64) {
        self.charge = charge;
        self.mass = mass;
    }

    /// Derivatives of `y` with respect to path length for a global field
    /// `field` [V/m].
    ///
    /// Output layout: unit velocity, force [eV s/m^2], unused, inverse speed.
    pub fn evaluate_rhs(&self, y: &[f64; 8], field: &Vector3<f64>) -> [f64; 8] {
        let p = Vector3::new(y[3], y[4], y[5]);
        let v = p / self.mass;
        let vinv = 1.0 / v.norm();
        let applied = field * self.charge;

        let force = match (&self.lattice, self.valley) {
            (Some(lattice), Some(iv)) => {
                let frame = self.frames.transform();
                // Force transforms like momentum: into the valley, scale, back out
                let local = frame.to_local_direction(&applied);
                let in_lattice = lattice.rotate_to_lattice(&local);
                let hv = match lattice.valley(iv) {
                    Some(valley) => {
                        valley.from_valley * (lattice.sqrt_inv_tensor() * (valley.to_valley * in_lattice))
                    }
                    None => in_lattice,
                };
                let solid = lattice.rotate_to_solid(&hv);
                frame.to_global_direction(&solid) * vinv
            }
            _ => applied * vinv,
        };

        trace!(
            charge = self.charge,
            valley = ?self.valley,
            force = force.norm(),
            "carrier equation of motion"
        );

        [
            v.x * vinv,
            v.y * vinv,
            v.z * vinv,
            force.x,
            force.y,
            force.z,
            0.0,
            vinv,
        ]
    }
}
