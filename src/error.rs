//! Error types for phonon and charge-carrier processes

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, CmpError>;

/// Errors raised by the microphysics core.
///
/// Geometry and lattice resolution failures abort the current simulated
/// event only; use [`CmpError::aborts_event`] to classify them. Kinematic
/// oddities (angles outside the emission cone, small energy violations) are
/// never errors: they are logged and the step proceeds.
#[derive(Debug, Error)]
pub enum CmpError {
    #[error("position {position:?} is not associated with a volume carrying a lattice")]
    NoLattice { position: [f64; 3] },

    #[error("cannot resolve surface normal at {position:?} between volumes {pre:?} and {post:?}")]
    SurfaceNormal {
        position: [f64; 3],
        pre: Option<u32>,
        post: Option<u32>,
    },

    #[error("surface clearance not reached after {iterations} iterations at {position:?}")]
    ClearanceNotReached { position: [f64; 3], iterations: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid lattice parameters: {0}")]
    InvalidLattice(String),

    #[error("duplicate volume id {0}")]
    DuplicateVolume(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CmpError {
    /// True for conditions that must abort the current event (not the run)
    pub fn aborts_event(&self) -> bool {
        matches!(
            self,
            CmpError::NoLattice { .. }
                | CmpError::SurfaceNormal { .. }
                | CmpError::ClearanceNotReached { .. }
        )
    }
}
