use crate::transform::{Touchable, VolumeId};
use nalgebra::{Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

/// Particle species handled by the microphysics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleKind {
    PhononLong,
    PhononTransSlow,
    PhononTransFast,
    Electron,
    Hole,
}

impl ParticleKind {
    pub fn is_phonon(&self) -> bool {
        matches!(
            self,
            ParticleKind::PhononLong | ParticleKind::PhononTransSlow | ParticleKind::PhononTransFast
        )
    }

    pub fn is_charge_carrier(&self) -> bool {
        matches!(self, ParticleKind::Electron | ParticleKind::Hole)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ParticleKind::PhononLong => "phononL",
            ParticleKind::PhononTransSlow => "phononTS",
            ParticleKind::PhononTransFast => "phononTF",
            ParticleKind::Electron => "G4CMPDriftElectron",
            ParticleKind::Hole => "G4CMPDriftHole",
        }
    }
}

/// Why a track ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fate {
    Decayed,
    Recombined,
    BelowCutoff,
    EscapedVolume,
    Absorbed,
}

/// Lifecycle of a track. `Killed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackStatus {
    Alive,
    /// Came to rest but not yet removed (charge carriers awaiting recombination)
    StoppedButAlive,
    Killed(Fate),
}

impl TrackStatus {
    pub fn is_killed(&self) -> bool {
        matches!(self, TrackStatus::Killed(_))
    }
}

/// Read-only view of a host-owned track at the current step
#[derive(Debug, Clone)]
pub struct Track {
    pub kind: ParticleKind,
    pub kinetic_energy: f64,
    /// Momentum direction, global frame
    pub direction: Unit<Vector3<f64>>,
    /// Phonon wavevector direction, global frame (defaults to `direction`)
    pub wavevector: Option<Unit<Vector3<f64>>>,
    pub weight: f64,
    pub position: Point3<f64>,
    pub global_time: f64,
    pub touchable: Touchable,
    /// Conduction valley of an electron
    pub valley: Option<usize>,
    pub status: TrackStatus,
}

impl Track {
    pub fn new(
        kind: ParticleKind,
        touchable: Touchable,
        position: Point3<f64>,
        direction: Vector3<f64>,
        kinetic_energy: f64,
    ) -> Self {
        Self {
            kind,
            kinetic_energy,
            direction: Unit::new_normalize(direction),
            wavevector: None,
            weight: 1.0,
            position,
            global_time: 0.0,
            touchable,
            valley: if kind == ParticleKind::Electron { Some(0) } else { None },
            status: TrackStatus::Alive,
        }
    }

    pub fn with_valley(mut self, valley: usize) -> Self {
        self.valley = Some(valley);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_status(mut self, status: TrackStatus) -> Self {
        self.status = status;
        self
    }

    pub fn volume(&self) -> VolumeId {
        self.touchable.volume
    }

    /// Wavevector direction for phonons, falling back to the momentum direction
    pub fn k_direction(&self) -> Unit<Vector3<f64>> {
        self.wavevector.unwrap_or(self.direction)
    }
}

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Limited by a physics process inside the volume
    Interior,
    /// Ended on a geometric boundary
    GeomBoundary,
    /// Limited by the charge-carrier time stepper
    TimeStepLimit,
}

#[derive(Debug, Clone)]
pub struct StepPoint {
    pub position: Point3<f64>,
    /// Volume at the point; `None` when outside the world
    pub volume: Option<VolumeId>,
    pub direction: Unit<Vector3<f64>>,
    pub kinetic_energy: f64,
    pub status: StepStatus,
}

/// The step just taken by a track
#[derive(Debug, Clone)]
pub struct Step {
    pub pre: StepPoint,
    pub post: StepPoint,
}

impl Step {
    /// A step that ends where the track currently is, inside its volume
    pub fn at_rest(track: &Track) -> Self {
        let point = StepPoint {
            position: track.position,
            volume: Some(track.volume()),
            direction: track.direction,
            kinetic_energy: track.kinetic_energy,
            status: StepStatus::Interior,
        };
        Step {
            pre: point.clone(),
            post: point,
        }
    }

    pub fn with_post_status(mut self, status: StepStatus) -> Self {
        self.post.status = status;
        self
    }

    pub fn with_post_volume(mut self, volume: Option<VolumeId>) -> Self {
        self.post.volume = volume;
        self
    }

    pub fn on_boundary(&self) -> bool {
        self.post.status == StepStatus::GeomBoundary
    }
}
