// Physical constants in the crate's unit system:
// energy [eV], length [m], time [s], momentum [eV s/m], mass [eV s^2/m^2]

/// Reduced Planck constant [eV s]
pub const HBAR: f64 = 6.582_119_569e-16;

/// Planck constant [eV s]
pub const H_PLANCK: f64 = 4.135_667_696e-15;

/// Speed of light [m/s]
pub const C_LIGHT: f64 = 2.997_924_58e8;

/// Electron rest mass [eV s^2/m^2]
pub const ELECTRON_MASS: f64 = 0.510_998_95e6 / (C_LIGHT * C_LIGHT);

/// Scale used to make elastic constants dimensionless [Pa]
pub const ELASTIC_SCALE: f64 = 1e11;

/// Geometric tolerance for surface classification [m]
pub const SURFACE_TOLERANCE: f64 = 1e-9;
