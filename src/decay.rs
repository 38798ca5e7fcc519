//! Anharmonic decay of longitudinal phonons.
//!
//! A longitudinal phonon splits either into two transverse phonons (TT) or
//! into a longitudinal and a transverse phonon (LT). The energy fraction `x`
//! is drawn by rejection sampling from the Tamura densities; the deflection
//! angles then follow from energy and momentum conservation with isotropic
//! dispersion, where `delta = v_L / v_T`.
//!
//! All constants for one decay are carried by [`DecayConstants`], built per
//! call from the active lattice.

use crate::constants::{ELASTIC_SCALE, H_PLANCK};
use crate::lattice::LatticeParams;
use crate::particle::ParticleKind;
use crate::rotation::{deflect, random_azimuth};
use crate::sampling::{choose_polarization, sample_rejection};
use crate::secondary::{Secondary, SecondaryPair};
use nalgebra::{Unit, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Envelope for the TT density
const TT_ENVELOPE: f64 = 1.5;
/// LT envelope, multiplied by the inverse width of the sampling interval
const LT_ENVELOPE_SCALE: f64 = 2.8;
/// Slack allowed on arc-cosine arguments before a clamp is reported
const COSINE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecayBranch {
    /// L -> T + T
    TT,
    /// L -> L + T
    LT,
}

impl DecayBranch {
    pub fn label(&self) -> &'static str {
        match self {
            DecayBranch::TT => "TT",
            DecayBranch::LT => "LT",
        }
    }
}

/// Dimensionless elastic constants and velocity ratio for one decay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayConstants {
    pub beta: f64,
    pub gamma: f64,
    pub lambda: f64,
    pub mu: f64,
    /// v_L / v_T
    pub delta: f64,
}

impl DecayConstants {
    pub fn new(beta: f64, gamma: f64, lambda: f64, mu: f64, delta: f64) -> Self {
        DecayConstants {
            beta,
            gamma,
            lambda,
            mu,
            delta,
        }
    }

    pub fn from_lattice(lattice: &LatticeParams) -> Self {
        DecayConstants {
            beta: lattice.beta() / ELASTIC_SCALE,
            gamma: lattice.gamma() / ELASTIC_SCALE,
            lambda: lattice.lambda() / ELASTIC_SCALE,
            mu: lattice.mu() / ELASTIC_SCALE,
            delta: lattice.velocity_ratio(),
        }
    }

    /// TT decay density at velocity ratio `d` and argument `x` (Tamura).
    ///
    /// A sum of two squares, so never negative where finite.
    pub fn tt_probability(&self, d: f64, x: f64) -> f64 {
        let (beta, gamma, lambda, mu) = (self.beta, self.gamma, self.lambda, self.mu);
        let d2 = d * d;
        let a = 0.5 * (1.0 - d2) * (beta + lambda + (1.0 + d2) * (gamma + mu));
        let b = beta + lambda + 2.0 * d2 * (gamma + mu);
        let c = beta + lambda + 2.0 * (gamma + mu);
        let dd = (1.0 - d2) * (2.0 * beta + 4.0 * gamma + lambda + 3.0 * mu);

        let first = a + b * d * x - b * x * x;
        let second = c * x * (d - x) - dd / (d - x) * (x - d - (1.0 - d2) / (4.0 * x));
        first * first + second * second
    }

    /// Sampling interval of the energy fraction for a branch
    pub fn fraction_bounds(&self, branch: DecayBranch) -> (f64, f64) {
        let d = self.delta;
        match branch {
            DecayBranch::TT => ((1.0 - 1.0 / d) / 2.0, (1.0 + 1.0 / d) / 2.0),
            DecayBranch::LT => ((d - 1.0) / (d + 1.0), 1.0),
        }
    }
}

/// LT decay density; `x` is the energy fraction kept by the longitudinal daughter
pub fn lt_probability(d: f64, x: f64) -> f64 {
    let one_minus = 1.0 - x;
    let spread = d * d * one_minus * one_minus;
    let angular = 1.0 + x * x - spread;
    (1.0 / (x * x))
        * (1.0 - x * x)
        * (1.0 - x * x)
        * ((1.0 + x) * (1.0 + x) - spread)
        * angular
        * angular
}

/// Draw TT with probability `frac_tt`, LT otherwise
pub fn sample_branch<R: Rng + ?Sized>(rng: &mut R, frac_tt: f64) -> DecayBranch {
    if rng.gen::<f64>() <= frac_tt {
        DecayBranch::TT
    } else {
        DecayBranch::LT
    }
}

/// Sample the energy fraction of the first daughter.
///
/// Returns `None` only when `max_iterations` is set and exhausted.
pub fn sample_energy_fraction<R: Rng + ?Sized>(
    rng: &mut R,
    branch: DecayBranch,
    constants: &DecayConstants,
    max_iterations: Option<u64>,
) -> Option<f64> {
    let d = constants.delta;
    let (lower, upper) = constants.fraction_bounds(branch);
    let sample = match branch {
        DecayBranch::TT => sample_rejection(
            rng,
            lower,
            upper,
            TT_ENVELOPE,
            |x| constants.tt_probability(d, x * d),
            max_iterations,
        ),
        DecayBranch::LT => sample_rejection(
            rng,
            lower,
            upper,
            LT_ENVELOPE_SCALE / (upper - lower),
            |x| lt_probability(d, x),
            max_iterations,
        ),
    };
    sample.map(|s| s.value)
}

/// Deflection of each daughter from the parent wavevector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeflectionAngles {
    pub first: f64,
    pub second: f64,
    /// True when an arc-cosine argument had to be clamped into [-1, 1]
    pub clamped: bool,
}

impl DeflectionAngles {
    /// Both angles lie in [0, pi] and came from a valid kinematic cosine.
    ///
    /// A daughter may leave backward of the parent; momentum along the
    /// parent axis is balanced by its partner.
    pub fn is_admissible(&self) -> bool {
        let in_range = |a: f64| a.is_finite() && (0.0..=std::f64::consts::PI).contains(&a);
        !self.clamped && in_range(self.first) && in_range(self.second)
    }
}

fn checked_acos(cosine: f64, what: &'static str) -> (f64, bool) {
    if cosine.is_nan() {
        warn!(what, "deflection cosine is not a number");
        return (0.0, true);
    }
    let clamped = cosine.clamp(-1.0, 1.0);
    let out_of_range = (cosine - clamped).abs() > COSINE_TOLERANCE;
    if out_of_range {
        warn!(what, cosine, "deflection cosine outside [-1, 1], clamped");
    }
    (clamped.acos(), out_of_range)
}

/// Longitudinal daughter deflection in L -> L + T
pub fn l_deviation(d: f64, x: f64) -> (f64, bool) {
    checked_acos((1.0 + x * x - d * d * (1.0 - x) * (1.0 - x)) / (2.0 * x), "L daughter")
}

/// Transverse daughter deflection in L -> L + T
pub fn t_deviation(d: f64, x: f64) -> (f64, bool) {
    checked_acos(
        (1.0 - x * x + d * d * (1.0 - x) * (1.0 - x)) / (2.0 * d * (1.0 - x)),
        "T daughter",
    )
}

/// Deflection of a transverse daughter with energy fraction `x` in L -> T + T
pub fn tt_deviation(d: f64, x: f64) -> (f64, bool) {
    checked_acos(
        (1.0 - d * d * (1.0 - x) * (1.0 - x) + d * d * x * x) / (2.0 * d * x),
        "TT daughter",
    )
}

pub fn deflection_angles(branch: DecayBranch, d: f64, x: f64) -> DeflectionAngles {
    let ((first, c1), (second, c2)) = match branch {
        DecayBranch::TT => (tt_deviation(d, x), tt_deviation(d, 1.0 - x)),
        DecayBranch::LT => (l_deviation(d, x), t_deviation(d, x)),
    };
    DeflectionAngles {
        first,
        second,
        clamped: c1 || c2,
    }
}

/// Longitudinal momentum of the daughters relative to the parent's, in
/// units of the parent wavevector. Equals 1 for conserving kinematics.
pub fn momentum_balance(branch: DecayBranch, d: f64, x: f64, angles: &DeflectionAngles) -> f64 {
    match branch {
        DecayBranch::TT => d * x * angles.first.cos() + d * (1.0 - x) * angles.second.cos(),
        DecayBranch::LT => x * angles.first.cos() + d * (1.0 - x) * angles.second.cos(),
    }
}

/// Build the daughter pair in the parent's frame.
///
/// The first daughter is tilted by `+first` about the parent's orthogonal
/// axis and the second by `-second`, then both spin by the common azimuth
/// `phi` about the parent direction. Weights are left at 1 for the
/// weighting policy to set.
pub fn build_secondaries(
    parent_direction: &Unit<Vector3<f64>>,
    parent_energy: f64,
    angles: &DeflectionAngles,
    phi: f64,
    fraction: f64,
    kinds: (ParticleKind, ParticleKind),
) -> SecondaryPair {
    let k = parent_direction.as_ref();
    let dir1 = Unit::new_normalize(deflect(k, angles.first, phi));
    let dir2 = Unit::new_normalize(deflect(k, -angles.second, phi));

    let e1 = fraction * parent_energy;
    let e2 = parent_energy - e1;

    SecondaryPair {
        first: Secondary::new(kinds.0, dir1, e1, 1.0),
        second: Secondary::new(kinds.1, dir2, e2, 1.0),
    }
}

/// Everything sampled for one decay
#[derive(Debug, Clone)]
pub struct DecayEvent {
    pub branch: DecayBranch,
    pub fraction: f64,
    pub angles: DeflectionAngles,
    pub pair: SecondaryPair,
}

/// Sample a complete decay of a longitudinal phonon.
///
/// Polarizations are drawn from the transverse densities of states: both
/// daughters for TT, the second daughter for LT. A deflection outside the
/// admissible cone is logged and the pair is still returned.
pub fn sample_decay<R: Rng + ?Sized>(
    rng: &mut R,
    lattice: &LatticeParams,
    k_direction: &Unit<Vector3<f64>>,
    energy: f64,
    max_iterations: Option<u64>,
) -> Option<DecayEvent> {
    let constants = DecayConstants::from_lattice(lattice);
    let branch = sample_branch(rng, lattice.anh_tt_frac());
    let fraction = sample_energy_fraction(rng, branch, &constants, max_iterations)?;

    let d = constants.delta;
    let angles = deflection_angles(branch, d, fraction);
    if !angles.is_admissible() {
        warn!(
            branch = branch.label(),
            fraction,
            first = angles.first,
            second = angles.second,
            "decay deflection outside admissible cone"
        );
    }
    let balance = momentum_balance(branch, d, fraction, &angles);
    if (balance - 1.0).abs() > 1e-6 {
        warn!(branch = branch.label(), balance, "decay daughters do not balance parent momentum");
    }

    let phi = random_azimuth(rng);
    let kinds = match branch {
        DecayBranch::TT => (
            choose_polarization(rng, 0.0, lattice.stdos(), lattice.ftdos()),
            choose_polarization(rng, 0.0, lattice.stdos(), lattice.ftdos()),
        ),
        DecayBranch::LT => (
            ParticleKind::PhononLong,
            choose_polarization(rng, 0.0, lattice.stdos(), lattice.ftdos()),
        ),
    };
    let pair = build_secondaries(k_direction, energy, &angles, phi, fraction, kinds);

    Some(DecayEvent {
        branch,
        fraction,
        angles,
        pair,
    })
}

/// Anharmonic decay rate [1/s] of a phonon with energy `energy`: A (E/h)^5
pub fn decay_rate(lattice: &LatticeParams, energy: f64) -> f64 {
    let frequency = energy / H_PLANCK;
    lattice.anh_decay_constant() * frequency.powi(5)
}

/// Mean free path [m] against anharmonic decay at the longitudinal sound speed
pub fn decay_mean_free_path(lattice: &LatticeParams, energy: f64) -> f64 {
    let rate = decay_rate(lattice, energy);
    if rate > 0.0 {
        lattice.sound_speed() / rate
    } else {
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::angle_between;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn germanium_constants() -> DecayConstants {
        DecayConstants::from_lattice(&LatticeParams::germanium())
    }

    #[test]
    fn test_constants_are_dimensionless() {
        let c = germanium_constants();
        assert_relative_eq!(c.beta, -0.7314, epsilon = 1e-12);
        assert_relative_eq!(c.mu, 0.561, epsilon = 1e-12);
        assert_relative_eq!(c.delta, 5310.0 / 3250.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fraction_bounds() {
        let c = DecayConstants::new(0.0, 0.0, 0.0, 0.0, 1.5);
        let (lo, hi) = c.fraction_bounds(DecayBranch::TT);
        assert_relative_eq!(lo, 1.0 / 6.0, epsilon = 1e-15);
        assert_relative_eq!(hi, 5.0 / 6.0, epsilon = 1e-15);
        let (lo, hi) = c.fraction_bounds(DecayBranch::LT);
        assert_relative_eq!(lo, 0.2, epsilon = 1e-15);
        assert_eq!(hi, 1.0);
    }

    #[test]
    fn test_lt_density_vanishes_at_lower_bound() {
        let d = 1.5;
        assert_relative_eq!(lt_probability(d, 0.2), 0.0, epsilon = 1e-12);
        assert!(lt_probability(d, 0.6) > 0.0);
    }

    #[test]
    fn test_angles_at_interval_ends() {
        let d = 1.5;
        // Upper end of TT: first daughter goes straight ahead
        let (theta, clamped) = tt_deviation(d, 5.0 / 6.0);
        assert!(theta.abs() < 1e-6);
        assert!(!clamped);
        // Near x = 1 in LT the longitudinal daughter keeps the parent direction
        let (theta, _) = l_deviation(d, 1.0 - 1e-12);
        assert!(theta < 1e-5);
    }

    #[test]
    fn test_clamp_is_reported() {
        let (theta, clamped) = checked_acos(1.5, "test");
        assert_eq!(theta, 0.0);
        assert!(clamped);
        let angles = DeflectionAngles {
            first: theta,
            second: 0.1,
            clamped,
        };
        assert!(!angles.is_admissible());
    }

    #[test]
    fn test_momentum_balance_holds() {
        let d = 5310.0 / 3250.0;
        for i in 1..20 {
            let x = 0.3 + 0.035 * i as f64;
            let angles = deflection_angles(DecayBranch::LT, d, x);
            assert_relative_eq!(momentum_balance(DecayBranch::LT, d, x, &angles), 1.0, epsilon = 1e-9);
        }
        let (lo, hi) = DecayConstants::new(0.0, 0.0, 0.0, 0.0, d).fraction_bounds(DecayBranch::TT);
        for i in 1..20 {
            let x = lo + (hi - lo) * i as f64 / 20.0;
            let angles = deflection_angles(DecayBranch::TT, d, x);
            assert_relative_eq!(momentum_balance(DecayBranch::TT, d, x, &angles), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_build_secondaries_splits_energy() {
        let dir = Unit::new_normalize(Vector3::new(0.2, -0.3, 0.9));
        let angles = DeflectionAngles {
            first: 0.4,
            second: 0.7,
            clamped: false,
        };
        let pair = build_secondaries(
            &dir,
            2e-3,
            &angles,
            1.1,
            0.3,
            (ParticleKind::PhononLong, ParticleKind::PhononTransSlow),
        );
        assert_relative_eq!(pair.total_energy(), 2e-3, epsilon = 1e-18);
        assert_relative_eq!(pair.first.kinetic_energy, 6e-4, epsilon = 1e-18);
        assert_relative_eq!(angle_between(&pair.first.direction, &dir), 0.4, epsilon = 1e-12);
        assert_relative_eq!(angle_between(&pair.second.direction, &dir), 0.7, epsilon = 1e-12);
        // Daughters lie on opposite sides of the parent in a common plane
        let n1 = dir.cross(pair.first.direction.as_ref());
        let n2 = dir.cross(pair.second.direction.as_ref());
        assert!(n1.dot(&n2) < 0.0);
        assert_relative_eq!(n1.normalize().dot(&n2.normalize()), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sampled_fractions_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(21);
        let c = germanium_constants();
        for branch in [DecayBranch::TT, DecayBranch::LT] {
            let (lo, hi) = c.fraction_bounds(branch);
            for _ in 0..500 {
                let x = sample_energy_fraction(&mut rng, branch, &c, None).unwrap();
                assert!(x >= lo && x < hi);
            }
        }
    }

    #[test]
    fn test_sample_decay_polarizations() {
        let mut rng = StdRng::seed_from_u64(22);
        let lattice = LatticeParams::germanium();
        let dir = Vector3::z_axis();
        for _ in 0..500 {
            let event = sample_decay(&mut rng, &lattice, &dir, 1e-3, None).unwrap();
            match event.branch {
                DecayBranch::TT => {
                    assert!(event.pair.first.kind != ParticleKind::PhononLong);
                    assert!(event.pair.second.kind != ParticleKind::PhononLong);
                }
                DecayBranch::LT => {
                    assert_eq!(event.pair.first.kind, ParticleKind::PhononLong);
                    assert!(event.pair.second.kind != ParticleKind::PhononLong);
                }
            }
            assert_relative_eq!(event.pair.total_energy(), 1e-3, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_rate_mean_free_path() {
        let lattice = LatticeParams::germanium();
        let low = decay_mean_free_path(&lattice, 1e-3);
        let high = decay_mean_free_path(&lattice, 2e-3);
        assert_relative_eq!(low / high, 32.0, max_relative = 1e-10);
        assert_eq!(decay_mean_free_path(&lattice, 0.0), f64::INFINITY);
    }
}
