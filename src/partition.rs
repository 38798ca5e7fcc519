// Splitting of a local energy release into phonon secondaries
use crate::lattice::LatticeParams;
use crate::rotation::random_direction;
use crate::sampling::choose_polarization;
use crate::secondary::Secondary;
use crate::weighting::weigh_single;
use rand::Rng;
use tracing::debug;

/// Result of partitioning an energy release
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Phonons that survived the weighting policy
    pub phonons: Vec<Secondary>,
    /// Number of phonons generated before weighting
    pub generated: usize,
}

/// Number of equal-energy phonons an energy release is split into
pub fn phonon_count(energy: f64, debye_energy: f64) -> usize {
    if energy <= 0.0 {
        return 0;
    }
    (energy / debye_energy).ceil().max(1.0) as usize
}

/// Release `energy` as Debye-limited phonons with isotropic directions.
///
/// Each phonon carries `energy / n` and is kept or dropped independently by
/// the weighting policy with factor `bias`. Directions are in the frame of
/// the caller; isotropy makes the frame irrelevant.
pub fn partition_phonons<R: Rng + ?Sized>(
    rng: &mut R,
    lattice: &LatticeParams,
    energy: f64,
    bias: f64,
    parent_weight: f64,
) -> Partition {
    let generated = phonon_count(energy, lattice.debye_energy());
    if generated == 0 {
        return Partition::default();
    }
    let each = energy / generated as f64;

    let mut phonons = Vec::new();
    for _ in 0..generated {
        let kind = choose_polarization(rng, lattice.ldos(), lattice.stdos(), lattice.ftdos());
        let direction = random_direction(rng);
        let phonon = Secondary::new(kind, direction, each, 1.0);
        if let Some(kept) = weigh_single(rng, bias, parent_weight, phonon) {
            phonons.push(kept);
        }
    }
    debug!(energy, generated, kept = phonons.len(), "partitioned energy into phonons");

    Partition { phonons, generated }
}
