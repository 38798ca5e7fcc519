//! Luke phonon emission by supersonic charge carriers.
//!
//! A carrier whose wavevector exceeds the sound-speed wavevector `k_s`
//! radiates phonons in a forward cone, like Cherenkov emission. For
//! electrons the kinematics are solved either in Herring-Vogt space, where
//! the mass tensor is isotropic, or directly in the valley frame
//! ([`LukeKinematics`]). Holes have a scalar mass and use their solid-frame
//! wavevector.
//!
//! All momenta here are in the solid (local) frame; rotation to the global
//! frame is the caller's business.

use crate::config::LukeKinematics;
use crate::constants::HBAR;
use crate::lattice::LatticeParams;
use crate::rotation::{deflect, random_azimuth};
use nalgebra::Vector3;
use rand::Rng;
use tracing::warn;

/// Carrier species and the valley it occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    Electron { valley: usize },
    Hole,
}

/// Polar emission angle of the phonon relative to the carrier wavevector.
///
/// Distributed so that cos(theta) = ks/k + (1-u)^(1/3) (1 - ks/k), which
/// keeps theta inside the cone acos(ks/k).
pub fn make_phonon_theta<R: Rng + ?Sized>(rng: &mut R, k: f64, ks: f64) -> f64 {
    let u: f64 = rng.gen();
    let ratio = ks / k;
    let operand = ratio + (1.0 - u).cbrt() * (1.0 - ratio);
    operand.min(1.0).acos()
}

/// Mean time between emissions at Mach number `mach` = k/ks
pub fn carrier_time_step(mach: f64, l0: f64, sound_speed: f64) -> f64 {
    let t_sound = 3.0 * l0 / sound_speed;
    if mach <= 1.0 {
        t_sound
    } else {
        t_sound * mach / ((mach - 1.0) * (mach - 1.0) * (mach - 1.0))
    }
}

/// Largest admissible emission angle for wavevector magnitude `k`
pub fn cone_angle(k: f64, ks: f64) -> f64 {
    (ks / k).clamp(-1.0, 1.0).acos().min(std::f64::consts::FRAC_PI_2)
}

/// Local-frame solid momentum of a carrier with the given direction and energy
pub fn carrier_momentum(lattice: &LatticeParams, carrier: Carrier, direction: &Vector3<f64>, energy: f64) -> Vector3<f64> {
    match carrier {
        Carrier::Electron { valley } => lattice.electron_momentum(valley, direction, energy),
        Carrier::Hole => lattice.hole_momentum(direction, energy),
    }
}

pub fn carrier_energy(lattice: &LatticeParams, carrier: Carrier, p: &Vector3<f64>) -> f64 {
    match carrier {
        Carrier::Electron { valley } => lattice.electron_energy(valley, p),
        Carrier::Hole => lattice.hole_energy(p),
    }
}

fn sound_wavevector(lattice: &LatticeParams, carrier: Carrier) -> f64 {
    match carrier {
        Carrier::Electron { .. } => lattice.k_sound_electron(),
        Carrier::Hole => lattice.k_sound_hole(),
    }
}

/// Wavevector magnitude compared against the sound-speed threshold
fn threshold_wavevector(lattice: &LatticeParams, carrier: Carrier, p: &Vector3<f64>) -> f64 {
    match carrier {
        Carrier::Electron { valley } => lattice.map_p_to_k_hv(valley, p).norm(),
        Carrier::Hole => p.norm() / HBAR,
    }
}

/// Mean free path [m] against Luke emission, or `None` below threshold.
pub fn mean_free_path(lattice: &LatticeParams, carrier: Carrier, p: &Vector3<f64>) -> Option<f64> {
    let k = threshold_wavevector(lattice, carrier, p);
    let ks = sound_wavevector(lattice, carrier);
    if k <= ks {
        return None;
    }

    let (velocity, l0) = match carrier {
        Carrier::Electron { valley } => (lattice.map_p_to_v(valley, p), lattice.l0_electron()),
        Carrier::Hole => (p / lattice.hole_mass(), lattice.l0_hole()),
    };
    let dtau = carrier_time_step(k / ks, l0, lattice.sound_speed());
    Some(dtau * velocity.norm())
}

/// Outcome of one emission, solid frame
#[derive(Debug, Clone, PartialEq)]
pub struct LukeEmission {
    pub theta: f64,
    pub phi: f64,
    /// Carrier wavevector magnitude used for the kinematics
    pub k: f64,
    pub ks: f64,
    /// Carrier momentum after recoil
    pub recoil_momentum: Vector3<f64>,
    pub recoil_energy: f64,
    /// Momentum carried away by the phonon
    pub phonon_momentum: Vector3<f64>,
    /// Initial minus recoil energy; negative when the kinematics failed to conserve
    pub phonon_energy: f64,
}

impl LukeEmission {
    pub fn in_cone(&self) -> bool {
        self.theta <= cone_angle(self.k, self.ks) + 1e-12
    }
}

/// Sample one Luke emission for a carrier with solid-frame momentum `p`.
///
/// Returns `None` when the carrier is at or below the sound-speed threshold.
/// Angles outside the emission cone and recoil energies above the initial
/// energy are logged and returned as computed.
pub fn sample_emission<R: Rng + ?Sized>(
    rng: &mut R,
    lattice: &LatticeParams,
    carrier: Carrier,
    kinematics: LukeKinematics,
    p: &Vector3<f64>,
) -> Option<LukeEmission> {
    let ks = sound_wavevector(lattice, carrier);
    let k = threshold_wavevector(lattice, carrier, p);
    if k <= ks {
        return None;
    }

    let theta = make_phonon_theta(rng, k, ks);
    let phi = random_azimuth(rng);
    let q = 2.0 * (k * theta.cos() - ks);

    if theta > cone_angle(k, ks) + 1e-12 {
        warn!(theta, cone = cone_angle(k, ks), "Luke phonon angle exceeds emission cone");
    }

    // Carrier wavevector in the frame the kinematics are solved in
    let k_vec = match (carrier, kinematics) {
        (Carrier::Electron { valley }, LukeKinematics::HerringVogt) => lattice.map_p_to_k_hv(valley, p),
        (Carrier::Electron { valley }, LukeKinematics::Valley) => lattice.map_p_to_k_valley(valley, p),
        (Carrier::Hole, _) => p / HBAR,
    };
    let k_dir = k_vec.normalize();
    let q_vec = deflect(&k_dir, theta, phi) * q;
    let k_recoil = k_vec - q_vec;

    let to_momentum = |k: &Vector3<f64>| match (carrier, kinematics) {
        (Carrier::Electron { valley }, LukeKinematics::HerringVogt) => lattice.map_k_hv_to_p(valley, k),
        (Carrier::Electron { valley }, LukeKinematics::Valley) => lattice.map_k_valley_to_p(valley, k),
        (Carrier::Hole, _) => k * HBAR,
    };
    let recoil_momentum = to_momentum(&k_recoil);
    let phonon_momentum = to_momentum(&q_vec);

    let initial_energy = carrier_energy(lattice, carrier, p);
    let recoil_energy = carrier_energy(lattice, carrier, &recoil_momentum);
    if recoil_energy > initial_energy {
        warn!(
            initial_energy,
            recoil_energy,
            "Luke recoil energy exceeds carrier energy, energy not conserved"
        );
    }

    Some(LukeEmission {
        theta,
        phi,
        k,
        ks,
        recoil_momentum,
        recoil_energy,
        phonon_momentum,
        phonon_energy: initial_energy - recoil_energy,
    })
}
