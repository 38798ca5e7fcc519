//! Lattice parameters and momentum-space maps.
//!
//! The lattice database itself is external; this module defines the
//! read-only bundle the processes consume ([`LatticeParams`]), the lookup
//! contract ([`LatticeRegistry`]) and a map-backed registry
//! ([`LatticeTable`]).
//!
//! Frames, innermost last: solid (local volume frame) -> lattice (crystal
//! axes, via `orientation`) -> valley (longitudinal mass along x) ->
//! Herring-Vogt (valley frame scaled by sqrt(m_c / m_i), where the mass
//! tensor becomes isotropic with scalar mass m_c).

use crate::constants::{ELECTRON_MASS, HBAR};
use crate::error::{CmpError, Result};
use crate::transform::VolumeId;
use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Serializable description of a crystal, as a lattice database would provide it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeConfig {
    pub name: String,
    /// Anharmonic elastic constants [Pa]
    pub beta: f64,
    pub gamma: f64,
    pub lambda: f64,
    pub mu: f64,
    /// Longitudinal and transverse sound speeds [m/s]
    pub v_long: f64,
    pub v_trans: f64,
    /// Phonon density of states fractions: longitudinal, slow and fast transverse
    pub ldos: f64,
    pub stdos: f64,
    pub ftdos: f64,
    /// Probability of the L -> T + T decay channel
    pub anh_tt_frac: f64,
    /// Anharmonic decay rate constant [s^4]
    pub anh_decay_constant: f64,
    /// Debye energy [eV]
    pub debye_energy: f64,
    /// Band gap [eV]
    pub band_gap: f64,
    /// Electron mass tensor in units of the electron mass, valley frame
    pub electron_mass_tensor: [f64; 3],
    /// Hole mass in units of the electron mass
    pub hole_mass: f64,
    /// Valley axes in the lattice frame
    pub valley_axes: Vec<[f64; 3]>,
    /// Luke scattering length scales [m]
    pub l0_electron: f64,
    pub l0_hole: f64,
    /// Rotation from the solid frame to the crystal axes
    #[serde(default = "default_orientation")]
    pub orientation: Rotation3<f64>,
}

impl LatticeConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

fn default_orientation() -> Rotation3<f64> {
    Rotation3::identity()
}

/// One conduction-band valley: rotation from the lattice frame into the
/// valley frame and back.
#[derive(Debug, Clone, Copy)]
pub struct Valley {
    pub to_valley: Rotation3<f64>,
    pub from_valley: Rotation3<f64>,
}

impl Valley {
    /// Valley whose longitudinal axis is `axis` (lattice frame)
    pub fn along(axis: &Vector3<f64>) -> Self {
        let to_valley = Rotation3::rotation_between(axis, &Vector3::x()).unwrap_or_else(|| {
            // Antiparallel to x: any half turn about a perpendicular axis
            Rotation3::from_axis_angle(&Vector3::y_axis(), std::f64::consts::PI)
        });
        Valley {
            to_valley,
            from_valley: to_valley.inverse(),
        }
    }
}

/// Validated, immutable lattice parameters with derived mass tensors.
#[derive(Debug, Clone)]
pub struct LatticeParams {
    config: LatticeConfig,
    valleys: Vec<Valley>,
    electron_mass: f64,
    hole_mass: f64,
    mass_inverse: Matrix3<f64>,
    sqrt_tensor: Matrix3<f64>,
    sqrt_inv_tensor: Matrix3<f64>,
}

impl LatticeParams {
    pub fn new(config: LatticeConfig) -> Result<Self> {
        validate(&config)?;

        let [mxx, myy, mzz] = config.electron_mass_tensor;
        // Scalar (conductivity) mass used in Herring-Vogt space
        let m_c = 3.0 / (1.0 / mxx + 1.0 / myy + 1.0 / mzz);
        let electron_mass = m_c * ELECTRON_MASS;
        let hole_mass = config.hole_mass * ELECTRON_MASS;

        let mass_inverse = Matrix3::from_diagonal(&Vector3::new(
            1.0 / (mxx * ELECTRON_MASS),
            1.0 / (myy * ELECTRON_MASS),
            1.0 / (mzz * ELECTRON_MASS),
        ));
        let sqrt_tensor =
            Matrix3::from_diagonal(&Vector3::new((mxx / m_c).sqrt(), (myy / m_c).sqrt(), (mzz / m_c).sqrt()));
        let sqrt_inv_tensor =
            Matrix3::from_diagonal(&Vector3::new((m_c / mxx).sqrt(), (m_c / myy).sqrt(), (m_c / mzz).sqrt()));

        let valleys = config
            .valley_axes
            .iter()
            .map(|axis| Valley::along(&Vector3::from(*axis).normalize()))
            .collect();

        Ok(LatticeParams {
            config,
            valleys,
            electron_mass,
            hole_mass,
            mass_inverse,
            sqrt_tensor,
            sqrt_inv_tensor,
        })
    }

    /// Reference parameters for germanium
    pub fn germanium() -> Self {
        let config = LatticeConfig {
            name: "Ge".to_string(),
            beta: -7.314e10,
            gamma: -7.08e10,
            lambda: 3.76e10,
            mu: 5.61e10,
            v_long: 5310.0,
            v_trans: 3250.0,
            ldos: 0.097834,
            stdos: 0.53539,
            ftdos: 0.36677,
            anh_tt_frac: 0.740,
            anh_decay_constant: 1.6456e-54,
            debye_energy: 0.0129,
            band_gap: 0.74,
            electron_mass_tensor: [1.588, 0.081, 0.081],
            hole_mass: 0.350,
            valley_axes: vec![
                [1.0, 1.0, 1.0],
                [1.0, 1.0, -1.0],
                [1.0, -1.0, 1.0],
                [-1.0, 1.0, 1.0],
            ],
            l0_electron: 257e-6,
            l0_hole: 108e-6,
            orientation: Rotation3::identity(),
        };
        match Self::new(config) {
            Ok(lattice) => lattice,
            Err(err) => panic!("built-in germanium parameters are invalid: {}", err),
        }
    }

    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn beta(&self) -> f64 {
        self.config.beta
    }

    pub fn gamma(&self) -> f64 {
        self.config.gamma
    }

    pub fn lambda(&self) -> f64 {
        self.config.lambda
    }

    pub fn mu(&self) -> f64 {
        self.config.mu
    }

    /// Longitudinal sound speed, the "sound speed" of Luke emission
    pub fn sound_speed(&self) -> f64 {
        self.config.v_long
    }

    pub fn transverse_sound_speed(&self) -> f64 {
        self.config.v_trans
    }

    /// delta = v_long / v_trans
    pub fn velocity_ratio(&self) -> f64 {
        self.config.v_long / self.config.v_trans
    }

    pub fn ldos(&self) -> f64 {
        self.config.ldos
    }

    pub fn stdos(&self) -> f64 {
        self.config.stdos
    }

    pub fn ftdos(&self) -> f64 {
        self.config.ftdos
    }

    pub fn anh_tt_frac(&self) -> f64 {
        self.config.anh_tt_frac
    }

    pub fn anh_decay_constant(&self) -> f64 {
        self.config.anh_decay_constant
    }

    pub fn debye_energy(&self) -> f64 {
        self.config.debye_energy
    }

    pub fn band_gap(&self) -> f64 {
        self.config.band_gap
    }

    pub fn l0_electron(&self) -> f64 {
        self.config.l0_electron
    }

    pub fn l0_hole(&self) -> f64 {
        self.config.l0_hole
    }

    pub fn electron_mass(&self) -> f64 {
        self.electron_mass
    }

    pub fn hole_mass(&self) -> f64 {
        self.hole_mass
    }

    pub fn valley_count(&self) -> usize {
        self.valleys.len()
    }

    pub fn valley(&self, iv: usize) -> Option<&Valley> {
        self.valleys.get(iv)
    }

    pub fn sqrt_inv_tensor(&self) -> &Matrix3<f64> {
        &self.sqrt_inv_tensor
    }

    /// Sound-speed wavevector threshold for electrons (Herring-Vogt space)
    pub fn k_sound_electron(&self) -> f64 {
        self.config.v_long * self.electron_mass / HBAR
    }

    pub fn k_sound_hole(&self) -> f64 {
        self.config.v_long * self.hole_mass / HBAR
    }

    pub fn rotate_to_lattice(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.config.orientation * v
    }

    pub fn rotate_to_solid(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.config.orientation.inverse() * v
    }

    fn valley_or_first(&self, iv: usize) -> &Valley {
        // Validation guarantees at least one valley
        self.valleys.get(iv).unwrap_or_else(|| {
            warn!(valley = iv, count = self.valleys.len(), "valley index out of range, using valley 0");
            &self.valleys[0]
        })
    }

    /// Momentum in the valley frame
    fn to_valley_frame(&self, iv: usize, p: &Vector3<f64>) -> Vector3<f64> {
        self.valley_or_first(iv).to_valley * self.rotate_to_lattice(p)
    }

    fn from_valley_frame(&self, iv: usize, v: &Vector3<f64>) -> Vector3<f64> {
        self.rotate_to_solid(&(self.valley_or_first(iv).from_valley * v))
    }

    /// Wavevector in the valley frame from solid-frame momentum
    pub fn map_p_to_k_valley(&self, iv: usize, p: &Vector3<f64>) -> Vector3<f64> {
        self.to_valley_frame(iv, p) / HBAR
    }

    /// Herring-Vogt wavevector from solid-frame momentum
    pub fn map_p_to_k_hv(&self, iv: usize, p: &Vector3<f64>) -> Vector3<f64> {
        self.sqrt_inv_tensor * self.map_p_to_k_valley(iv, p)
    }

    pub fn map_k_valley_to_p(&self, iv: usize, k: &Vector3<f64>) -> Vector3<f64> {
        self.from_valley_frame(iv, &(k * HBAR))
    }

    pub fn map_k_hv_to_p(&self, iv: usize, k_hv: &Vector3<f64>) -> Vector3<f64> {
        self.map_k_valley_to_p(iv, &(self.sqrt_tensor * k_hv))
    }

    /// Group velocity of an electron (solid frame) from its momentum
    pub fn map_p_to_v(&self, iv: usize, p: &Vector3<f64>) -> Vector3<f64> {
        let p_valley = self.to_valley_frame(iv, p);
        self.from_valley_frame(iv, &(self.mass_inverse * p_valley))
    }

    /// Kinetic energy of an electron with solid-frame momentum `p`
    pub fn electron_energy(&self, iv: usize, p: &Vector3<f64>) -> f64 {
        let p_valley = self.to_valley_frame(iv, p);
        0.5 * p_valley.dot(&(self.mass_inverse * p_valley))
    }

    /// Solid-frame electron momentum with the given direction and kinetic energy
    pub fn electron_momentum(&self, iv: usize, direction: &Vector3<f64>, energy: f64) -> Vector3<f64> {
        let u = direction.normalize();
        let u_valley = self.to_valley_frame(iv, &u);
        let inverse_mass = u_valley.dot(&(self.mass_inverse * u_valley));
        u * (2.0 * energy.max(0.0) / inverse_mass).sqrt()
    }

    pub fn hole_energy(&self, p: &Vector3<f64>) -> f64 {
        0.5 * p.norm_squared() / self.hole_mass
    }

    pub fn hole_momentum(&self, direction: &Vector3<f64>, energy: f64) -> Vector3<f64> {
        direction.normalize() * (2.0 * self.hole_mass * energy.max(0.0)).sqrt()
    }
}

fn validate(config: &LatticeConfig) -> Result<()> {
    let fail = |msg: &str| Err(CmpError::InvalidLattice(format!("{}: {}", config.name, msg)));
    if !(config.v_trans > 0.0 && config.v_long > config.v_trans) {
        return fail("sound speeds must satisfy v_long > v_trans > 0");
    }
    if config.ldos < 0.0 || config.stdos < 0.0 || config.ftdos < 0.0 {
        return fail("density of states fractions must be non-negative");
    }
    if config.stdos + config.ftdos <= 0.0 {
        return fail("transverse density of states must not vanish");
    }
    if !(0.0..=1.0).contains(&config.anh_tt_frac) {
        return fail("anh_tt_frac must lie in [0, 1]");
    }
    if config.electron_mass_tensor.iter().any(|m| *m <= 0.0) || config.hole_mass <= 0.0 {
        return fail("carrier masses must be positive");
    }
    if config.valley_axes.is_empty() {
        return fail("at least one valley is required");
    }
    if config
        .valley_axes
        .iter()
        .any(|axis| Vector3::from(*axis).norm() == 0.0)
    {
        return fail("valley axes must be non-zero");
    }
    if config.band_gap < 0.0 || config.debye_energy <= 0.0 {
        return fail("band gap must be non-negative and Debye energy positive");
    }
    if !(config.l0_electron > 0.0 && config.l0_hole > 0.0) {
        return fail("Luke scattering lengths must be positive");
    }
    if !(config.anh_decay_constant >= 0.0) {
        return fail("anh_decay_constant must be non-negative");
    }
    Ok(())
}

/// Lookup of lattice parameters by placed volume
pub trait LatticeRegistry {
    /// Lattice of a volume; `None` is a valid answer for volumes without a crystal
    fn lattice(&self, volume: VolumeId) -> Option<&LatticeParams>;
}

/// Registry backed by a map from volume to shared lattice
#[derive(Debug, Clone, Default)]
pub struct LatticeTable {
    lattices: HashMap<VolumeId, Arc<LatticeParams>>,
}

impl LatticeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, volume: VolumeId, lattice: Arc<LatticeParams>) {
        self.lattices.insert(volume, lattice);
    }

    pub fn with(mut self, volume: VolumeId, lattice: Arc<LatticeParams>) -> Self {
        self.insert(volume, lattice);
        self
    }
}

impl LatticeRegistry for LatticeTable {
    fn lattice(&self, volume: VolumeId) -> Option<&LatticeParams> {
        self.lattices.get(&volume).map(|lattice| lattice.as_ref())
    }
}
