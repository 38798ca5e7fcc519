// Read-only configuration for the phonon and charge-carrier processes
use crate::error::{CmpError, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::Path;

static GLOBAL: OnceCell<Config> = OnceCell::new();

/// Environment toggle selecting valley-frame Luke kinematics
pub const VALLEY_KINEMATICS_ENV: &str = "ELUKE_VALLEY_KINEMATICS";

/// Coordinate frame in which Luke scattering kinematics are solved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LukeKinematics {
    /// Isotropic Herring-Vogt momentum space
    #[default]
    HerringVogt,
    /// Anisotropic valley frame, recoil converted back through the mass tensor
    Valley,
}

/// How the anharmonic decay process decides to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecayTrigger {
    /// Fires on every step of a longitudinal phonon
    #[default]
    Forced,
    /// Mean free path from the lattice decay constant, rate = A (E/h)^5
    Rate,
}

/// Configuration surface consumed once per step.
///
/// All bias factors must be at least 1; a factor `b` keeps a secondary set
/// with probability `1/b` and scales survivors' weight by `b`.
/// A single process-wide instance can be installed with [`Config::install`]
/// and read back with [`Config::global`]; it is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub downconversion_sampling: f64,
    pub luke_sampling: f64,
    pub recombination_sampling: f64,
    /// Phonon tracking cutoff [eV]
    pub min_phonon_energy: f64,
    /// Charge carrier tracking cutoff [eV]
    pub min_charge_energy: f64,
    /// Distance kept between new secondaries and a volume boundary [m]
    pub surface_clearance: f64,
    pub verbose: u32,
    pub luke_kinematics: LukeKinematics,
    pub decay_trigger: DecayTrigger,
    /// Diagnostic cap on rejection sampling loops; `None` loops until accepted
    pub max_rejection_iterations: Option<u64>,
    pub max_clearance_iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            downconversion_sampling: 1.0,
            luke_sampling: 1.0,
            recombination_sampling: 1.0,
            min_phonon_energy: 0.0,
            min_charge_energy: 0.0,
            surface_clearance: 1e-9,
            verbose: 0,
            luke_kinematics: LukeKinematics::HerringVogt,
            decay_trigger: DecayTrigger::Forced,
            max_rejection_iterations: None,
            max_clearance_iterations: 100,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a configuration from JSON text; missing fields take defaults
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(mut self) -> Self {
        if std::env::var_os(VALLEY_KINEMATICS_ENV).is_some() {
            self.luke_kinematics = LukeKinematics::Valley;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let biases = [
            ("downconversion_sampling", self.downconversion_sampling),
            ("luke_sampling", self.luke_sampling),
            ("recombination_sampling", self.recombination_sampling),
        ];
        for (name, value) in biases {
            if !value.is_finite() || value < 1.0 {
                return Err(CmpError::InvalidConfig(format!(
                    "{} must be a finite value >= 1, got {}",
                    name, value
                )));
            }
        }
        if self.min_phonon_energy < 0.0 || self.min_charge_energy < 0.0 {
            return Err(CmpError::InvalidConfig(
                "minimum energy cutoffs must be non-negative".to_string(),
            ));
        }
        if !(self.surface_clearance > 0.0) {
            return Err(CmpError::InvalidConfig(format!(
                "surface_clearance must be positive, got {}",
                self.surface_clearance
            )));
        }
        if self.max_clearance_iterations == 0 {
            return Err(CmpError::InvalidConfig(
                "max_clearance_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_rejection_iterations == Some(0) {
            return Err(CmpError::InvalidConfig(
                "max_rejection_iterations must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Install the process-wide configuration. Fails if one is already installed.
    pub fn install(config: Config) -> Result<()> {
        config.validate()?;
        GLOBAL
            .set(config)
            .map_err(|_| CmpError::InvalidConfig("global configuration already installed".to_string()))
    }

    /// The process-wide configuration, or defaults with environment overrides
    pub fn global() -> &'static Config {
        GLOBAL.get_or_init(|| Config::default().with_env_overrides())
    }
}
