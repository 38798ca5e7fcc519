// Phonon and charge-carrier microphysics for condensed-matter particle tracking
mod constants;
mod error;
mod rotation;
mod transform;

pub mod boundary;
pub mod cell;
pub mod config;
pub mod decay;
pub mod field;
pub mod geometry;
pub mod geometry_utils;
pub mod lattice;
pub mod luke;
pub mod navigation;
pub mod particle;
pub mod partition;
pub mod process;
pub mod region;
pub mod sampling;
pub mod secondary;
pub mod surface;
pub mod trace;
pub mod weighting;

pub use constants::{ELASTIC_SCALE, ELECTRON_MASS, HBAR, H_PLANCK};
pub use error::{CmpError, Result};
pub use rotation::{angle_between, deflect, orthogonal, random_direction, rotate_about};
pub use transform::{FrameTransform, Touchable, VolumeId};

pub use boundary::{AbsorbAtSurface, BoundaryResolver, SpecularReflection};
pub use cell::Cell;
pub use config::{Config, DecayTrigger, LukeKinematics};
pub use decay::{DecayBranch, DecayConstants, DeflectionAngles};
pub use field::CarrierEquation;
pub use geometry::Geometry;
pub use lattice::{LatticeConfig, LatticeParams, LatticeRegistry, LatticeTable};
pub use navigation::{Containment, Navigator, Solid};
pub use particle::{Fate, ParticleKind, Step, StepPoint, StepStatus, Track, TrackStatus};
pub use process::{InteractionLength, Process, ProcessSet, StepContext};
pub use region::{HalfspaceType, Region};
pub use secondary::{ParticleChange, Secondary, SecondaryPair};
pub use surface::Surface;
pub use trace::{DecayRecord, DiagnosticSink, JsonLinesSink, NoopSink};
