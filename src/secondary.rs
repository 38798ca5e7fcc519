use crate::particle::{ParticleKind, TrackStatus};
use crate::transform::VolumeId;
use nalgebra::{Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

/// Descriptor of a secondary handed to the host for materialization.
///
/// The direction is in the global frame. For phonons it is the wavevector
/// direction; the host derives the group velocity from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secondary {
    pub kind: ParticleKind,
    pub direction: Unit<Vector3<f64>>,
    pub kinetic_energy: f64,
    pub weight: f64,
    pub time: f64,
    pub position: Point3<f64>,
    pub volume: VolumeId,
}

impl Secondary {
    pub fn new(
        kind: ParticleKind,
        direction: Unit<Vector3<f64>>,
        kinetic_energy: f64,
        weight: f64,
    ) -> Self {
        Secondary {
            kind,
            direction,
            kinetic_energy,
            weight,
            time: 0.0,
            position: Point3::origin(),
            volume: 0,
        }
    }

    /// Stamp creation time and place
    pub fn created_at(mut self, time: f64, position: Point3<f64>, volume: VolumeId) -> Self {
        self.time = time;
        self.position = position;
        self.volume = volume;
        self
    }
}

/// Daughters of one decay event; kept or dropped as a unit
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryPair {
    pub first: Secondary,
    pub second: Secondary,
}

impl SecondaryPair {
    pub fn total_energy(&self) -> f64 {
        self.first.kinetic_energy + self.second.kinetic_energy
    }

    pub fn scale_weights(&mut self, factor: f64) {
        self.first.weight *= factor;
        self.second.weight *= factor;
    }

    pub fn into_vec(self) -> Vec<Secondary> {
        vec![self.first, self.second]
    }
}

/// Proposed changes to a track after a process acts on it.
///
/// Nothing here is applied by the core; the host reads the proposal and
/// updates its own track. Proposals left as `None` mean "unchanged".
#[derive(Debug, Clone, Default)]
pub struct ParticleChange {
    pub kinetic_energy: Option<f64>,
    pub direction: Option<Unit<Vector3<f64>>>,
    pub status: Option<TrackStatus>,
    pub non_ionizing_deposit: f64,
    pub secondaries: Vec<Secondary>,
}

impl ParticleChange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn propose_energy(&mut self, energy: f64) {
        self.kinetic_energy = Some(energy);
    }

    pub fn propose_direction(&mut self, direction: Unit<Vector3<f64>>) {
        self.direction = Some(direction);
    }

    pub fn propose_status(&mut self, status: TrackStatus) {
        self.status = Some(status);
    }

    pub fn deposit_non_ionizing(&mut self, energy: f64) {
        self.non_ionizing_deposit += energy;
    }

    pub fn add_secondary(&mut self, secondary: Secondary) {
        self.secondaries.push(secondary);
    }

    /// Both daughters go in together or not at all
    pub fn add_pair(&mut self, pair: SecondaryPair) {
        self.secondaries.extend(pair.into_vec());
    }

    /// Discard every unmaterialized secondary
    pub fn clear_secondaries(&mut self) {
        self.secondaries.clear();
    }

    pub fn number_of_secondaries(&self) -> usize {
        self.secondaries.len()
    }

    pub fn kills_track(&self) -> bool {
        self.status.map(|s| s.is_killed()).unwrap_or(false)
    }

    pub fn secondary_energy(&self) -> f64 {
        self.secondaries.iter().map(|s| s.kinetic_energy).sum()
    }

    pub fn secondary_weight(&self) -> f64 {
        self.secondaries.iter().map(|s| s.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Fate;

    fn phonon(energy: f64) -> Secondary {
        Secondary::new(ParticleKind::PhononTransSlow, Vector3::x_axis(), energy, 1.0)
    }

    #[test]
    fn test_pair_is_added_atomically() {
        let mut change = ParticleChange::new();
        let mut pair = SecondaryPair {
            first: phonon(1e-3),
            second: phonon(2e-3),
        };
        pair.scale_weights(4.0);
        assert!((pair.total_energy() - 3e-3).abs() < 1e-18);
        change.add_pair(pair);
        assert_eq!(change.number_of_secondaries(), 2);
        assert_eq!(change.secondary_weight(), 8.0);
        change.clear_secondaries();
        assert_eq!(change.number_of_secondaries(), 0);
    }

    #[test]
    fn test_status_proposals() {
        let mut change = ParticleChange::new();
        assert!(!change.kills_track());
        change.propose_status(TrackStatus::Killed(Fate::BelowCutoff));
        change.deposit_non_ionizing(0.5);
        change.deposit_non_ionizing(0.25);
        assert!(change.kills_track());
        assert_eq!(change.non_ionizing_deposit, 0.75);
    }

    #[test]
    fn test_creation_stamp() {
        let s = phonon(1.0).created_at(2e-9, Point3::new(1.0, 2.0, 3.0), 5);
        assert_eq!(s.time, 2e-9);
        assert_eq!(s.volume, 5);
    }
}
