//! Track lifecycle processes.
//!
//! Each process answers two questions per step: how far the track may go
//! before the process acts ([`Process::interaction_length`]) and what it does
//! when it acts ([`Process::apply`]). The set of processes is closed, so they
//! are variants of one enum rather than trait objects.
//!
//! A process never mutates the track. It returns a [`ParticleChange`] the
//! host applies. A killed track gets an empty change from every process.

use crate::boundary::{AbsorbAtSurface, BoundaryResolver};
use crate::config::{Config, DecayTrigger};
use crate::decay::{decay_mean_free_path, sample_decay};
use crate::error::Result;
use crate::geometry_utils::{
    apply_surface_clearance, get_global_direction, get_local_direction, get_surface_normal, resolve_lattice,
};
use crate::lattice::{LatticeParams, LatticeRegistry};
use crate::luke::{carrier_momentum, mean_free_path, sample_emission, Carrier};
use crate::navigation::Navigator;
use crate::partition::partition_phonons;
use crate::particle::{Fate, ParticleKind, Step, StepStatus, Track, TrackStatus};
use crate::sampling::choose_polarization;
use crate::secondary::{ParticleChange, Secondary};
use crate::trace::{DecayRecord, DiagnosticSink, NoopSink};
use crate::transform::Touchable;
use crate::weighting::{weigh_pair, weigh_single};
use nalgebra::{Point3, Unit};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read-only collaborators for one step
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub config: &'a Config,
    pub lattices: &'a dyn LatticeRegistry,
    pub navigator: &'a dyn Navigator,
}

impl<'a> StepContext<'a> {
    pub fn new(config: &'a Config, lattices: &'a dyn LatticeRegistry, navigator: &'a dyn Navigator) -> Self {
        StepContext {
            config,
            lattices,
            navigator,
        }
    }

    fn lattice_for(&self, track: &Track) -> Result<(&'a LatticeParams, Touchable)> {
        resolve_lattice(self.lattices, self.navigator, &track.touchable, &track.position)
    }

    /// Creation point for secondaries of `track`, cleared from the surface
    fn creation_point(&self, track: &Track) -> Result<Point3<f64>> {
        apply_surface_clearance(
            self.config,
            self.lattices,
            self.navigator,
            &track.touchable,
            &track.position,
        )
    }
}

/// Distance a track may travel before a process acts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionLength {
    /// Act at the end of this step whatever limited it
    Forced,
    /// Stochastic process with this mean free path [m]
    Path(f64),
    /// Rate conditions not met; the process does not limit the step
    Inactive,
}

impl InteractionLength {
    /// Length as seen by the stepping loop
    pub fn distance(&self) -> f64 {
        match self {
            InteractionLength::Path(d) => *d,
            InteractionLength::Forced | InteractionLength::Inactive => f64::MAX,
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, InteractionLength::Forced)
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, InteractionLength::Inactive)
    }
}

/// Longitudinal phonon splitting into two daughters
#[derive(Debug, Clone)]
pub struct AnharmonicDecay {
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for AnharmonicDecay {
    fn default() -> Self {
        AnharmonicDecay {
            sink: Arc::new(NoopSink),
        }
    }
}

impl AnharmonicDecay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        AnharmonicDecay { sink }
    }

    fn interaction_length(&self, track: &Track, ctx: &StepContext) -> Result<InteractionLength> {
        match ctx.config.decay_trigger {
            DecayTrigger::Forced => Ok(InteractionLength::Forced),
            DecayTrigger::Rate => {
                let (lattice, _) = ctx.lattice_for(track)?;
                let mfp = decay_mean_free_path(lattice, track.kinetic_energy);
                if mfp.is_finite() {
                    Ok(InteractionLength::Path(mfp))
                } else {
                    Ok(InteractionLength::Inactive)
                }
            }
        }
    }

    fn apply<R: Rng + ?Sized>(&self, track: &Track, ctx: &StepContext, rng: &mut R) -> Result<ParticleChange> {
        let mut change = ParticleChange::new();
        let (lattice, placement) = ctx.lattice_for(track)?;

        let energy = track.kinetic_energy;
        let k_direction = track.k_direction();
        let event = match sample_decay(rng, lattice, &k_direction, energy, ctx.config.max_rejection_iterations) {
            Some(event) => event,
            None => {
                warn!(energy, "decay sampling abandoned, parent left alive");
                return Ok(change);
            }
        };

        let kept = weigh_pair(rng, ctx.config.downconversion_sampling, track.weight, event.pair.clone());
        let (first_weight, second_weight) = kept
            .as_ref()
            .map(|p| (p.first.weight, p.second.weight))
            .unwrap_or((0.0, 0.0));

        if let Some(mut pair) = kept {
            if ctx.config.verbose > 1 {
                debug!(
                    branch = event.branch.label(),
                    first = pair.first.kind.name(),
                    first_energy = pair.first.kinetic_energy,
                    second = pair.second.kind.name(),
                    second_energy = pair.second.kinetic_energy,
                    "anharmonic decay secondaries"
                );
            }
            let position = ctx.creation_point(track)?;
            let time = track.global_time;
            pair.first = pair.first.created_at(time, position, placement.volume);
            pair.second = pair.second.created_at(time, position, placement.volume);
            change.add_pair(pair);
        }

        self.sink.record_decay(&DecayRecord {
            first_theta: event.angles.first,
            second_theta: event.angles.second,
            first_energy: event.pair.first.kinetic_energy,
            second_energy: event.pair.second.kinetic_energy,
            branch: event.branch,
            first_weight,
            second_weight,
            parent_weight: track.weight,
            secondaries: change.number_of_secondaries(),
            parent_energy: energy,
        });

        // Parent survives when the pair was dropped
        if change.number_of_secondaries() > 0 {
            change.propose_energy(0.0);
            change.propose_status(TrackStatus::Killed(Fate::Decayed));
        }
        Ok(change)
    }
}

/// Phonon emission by supersonic charge carriers
#[derive(Debug, Clone, Copy, Default)]
pub struct LukeScattering;

impl LukeScattering {
    fn carrier(track: &Track) -> Carrier {
        match track.kind {
            ParticleKind::Hole => Carrier::Hole,
            _ => {
                let valley = track.valley.unwrap_or_else(|| {
                    warn!(volume = track.volume(), "electron without a valley, using valley 0");
                    0
                });
                Carrier::Electron { valley }
            }
        }
    }

    fn interaction_length(&self, track: &Track, ctx: &StepContext) -> Result<InteractionLength> {
        let (lattice, _) = ctx.lattice_for(track)?;
        let direction = get_local_direction(&track.touchable, &track.direction);
        let p = carrier_momentum(lattice, Self::carrier(track), &direction, track.kinetic_energy);
        Ok(match mean_free_path(lattice, Self::carrier(track), &p) {
            Some(mfp) => InteractionLength::Path(mfp),
            None => InteractionLength::Inactive,
        })
    }

    fn apply<R: Rng + ?Sized>(
        &self,
        track: &Track,
        step: &Step,
        ctx: &StepContext,
        rng: &mut R,
    ) -> Result<ParticleChange> {
        let mut change = ParticleChange::new();
        // Nothing to do when the step was cut short by the time stepper or a boundary
        if matches!(step.post.status, StepStatus::TimeStepLimit | StepStatus::GeomBoundary) {
            return Ok(change);
        }

        let (lattice, placement) = ctx.lattice_for(track)?;
        let carrier = Self::carrier(track);
        let energy = step.post.kinetic_energy;
        let direction = get_local_direction(&track.touchable, &step.post.direction);
        let p = carrier_momentum(lattice, carrier, &direction, energy);

        let emission = match sample_emission(rng, lattice, carrier, ctx.config.luke_kinematics, &p) {
            Some(emission) => emission,
            None => return Ok(change),
        };

        let recoil = get_global_direction(&track.touchable, &emission.recoil_momentum);
        if let Some(dir) = Unit::try_new(recoil, 0.0) {
            change.propose_direction(dir);
        }
        change.propose_energy(emission.recoil_energy);

        if emission.phonon_energy <= 0.0 {
            return Ok(change);
        }

        let phonon_direction = get_global_direction(&track.touchable, &emission.phonon_momentum);
        let kind = choose_polarization(rng, lattice.ldos(), lattice.stdos(), lattice.ftdos());
        let phonon = Secondary::new(kind, Unit::new_normalize(phonon_direction), emission.phonon_energy, 1.0);

        match weigh_single(rng, ctx.config.luke_sampling, track.weight, phonon) {
            Some(phonon) => {
                if ctx.config.verbose > 1 {
                    debug!(
                        kind = phonon.kind.name(),
                        energy = phonon.kinetic_energy,
                        theta = emission.theta,
                        "Luke phonon"
                    );
                }
                let position = ctx.creation_point(track)?;
                change.add_secondary(phonon.created_at(track.global_time, position, placement.volume));
            }
            None => change.deposit_non_ionizing(emission.phonon_energy),
        }
        Ok(change)
    }
}

/// Hands boundary crossings of charge carriers to a resolver
#[derive(Debug, Clone)]
pub struct DriftBoundary {
    resolver: Arc<dyn BoundaryResolver>,
}

impl Default for DriftBoundary {
    fn default() -> Self {
        DriftBoundary {
            resolver: Arc::new(AbsorbAtSurface),
        }
    }
}

impl DriftBoundary {
    pub fn new(resolver: Arc<dyn BoundaryResolver>) -> Self {
        DriftBoundary { resolver }
    }

    fn apply(&self, track: &Track, step: &Step, ctx: &StepContext) -> Result<ParticleChange> {
        if !step.on_boundary() {
            return Ok(ParticleChange::new());
        }
        let normal = get_surface_normal(step, ctx.navigator)?;
        Ok(self.resolver.resolve(track, step, &normal))
    }
}

/// Charge carrier at rest returning half the band gap to the lattice
#[derive(Debug, Clone, Copy, Default)]
pub struct Recombination;

impl Recombination {
    fn apply<R: Rng + ?Sized>(&self, track: &Track, ctx: &StepContext, rng: &mut R) -> Result<ParticleChange> {
        let mut change = ParticleChange::new();
        if track.status != TrackStatus::StoppedButAlive {
            return Ok(change);
        }

        let (lattice, placement) = ctx.lattice_for(track)?;
        if ctx.config.verbose > 1 {
            debug!(particle = track.kind.name(), "reabsorbed by the lattice");
        }

        // Each carrier recombines on its own and gives back half the gap
        let released = 0.5 * lattice.band_gap();
        let partition = partition_phonons(rng, lattice, released, ctx.config.recombination_sampling, track.weight);

        if partition.phonons.is_empty() {
            change.deposit_non_ionizing(released);
        } else {
            let position = ctx.creation_point(track)?;
            for phonon in partition.phonons {
                change.add_secondary(phonon.created_at(track.global_time, position, placement.volume));
            }
        }
        change.propose_energy(0.0);
        change.propose_status(TrackStatus::Killed(Fate::Recombined));
        Ok(change)
    }
}

/// Kills tracks below their energy cutoff or outside their volume
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackLimiter;

impl TrackLimiter {
    /// Energy cut test. A carrier at rest is left for recombination.
    pub fn below_energy_cut(track: &Track, config: &Config) -> bool {
        let cut = if track.kind.is_charge_carrier() {
            if track.status == TrackStatus::StoppedButAlive {
                return false;
            }
            config.min_charge_energy
        } else {
            config.min_phonon_energy
        };
        track.kinetic_energy < cut
    }

    /// Track is not on a boundary yet one of its step points lies outside its volume
    pub fn escaped_from_volume(track: &Track, step: &Step) -> bool {
        let current = Some(track.volume());
        step.post.status != StepStatus::GeomBoundary && (step.post.volume != current || step.pre.volume != current)
    }

    fn apply(&self, track: &Track, step: &Step, ctx: &StepContext) -> ParticleChange {
        let mut change = ParticleChange::new();
        if Self::below_energy_cut(track, ctx.config) {
            change.deposit_non_ionizing(track.kinetic_energy);
            change.propose_energy(0.0);
            change.propose_status(TrackStatus::Killed(Fate::BelowCutoff));
        }
        if Self::escaped_from_volume(track, step) {
            change.clear_secondaries();
            change.propose_status(TrackStatus::Killed(Fate::EscapedVolume));
        }
        change
    }
}

/// The closed set of lifecycle processes
#[derive(Debug, Clone)]
pub enum Process {
    AnharmonicDecay(AnharmonicDecay),
    LukeScattering(LukeScattering),
    DriftBoundary(DriftBoundary),
    Recombination(Recombination),
    TrackLimiter(TrackLimiter),
}

impl Process {
    pub fn name(&self) -> &'static str {
        match self {
            Process::AnharmonicDecay(_) => "phononDownconversion",
            Process::LukeScattering(_) => "LukeScattering",
            Process::DriftBoundary(_) => "DriftBoundary",
            Process::Recombination(_) => "Recombination",
            Process::TrackLimiter(_) => "TrackLimiter",
        }
    }

    pub fn is_applicable(&self, kind: ParticleKind) -> bool {
        match self {
            Process::AnharmonicDecay(_) => kind == ParticleKind::PhononLong,
            Process::LukeScattering(_) | Process::DriftBoundary(_) | Process::Recombination(_) => {
                kind.is_charge_carrier()
            }
            Process::TrackLimiter(_) => kind.is_phonon() || kind.is_charge_carrier(),
        }
    }

    /// Interaction length for the coming step.
    ///
    /// Fails only when the process needs the lattice and none can be found.
    pub fn interaction_length(&self, track: &Track, ctx: &StepContext) -> Result<InteractionLength> {
        match self {
            Process::AnharmonicDecay(p) => p.interaction_length(track, ctx),
            Process::LukeScattering(p) => p.interaction_length(track, ctx),
            Process::DriftBoundary(_) | Process::Recombination(_) | Process::TrackLimiter(_) => {
                Ok(InteractionLength::Forced)
            }
        }
    }

    /// Act on the track at the end of `step`.
    ///
    /// An `Err` means the current event must be aborted; no secondaries
    /// from the failed call reach the host.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        track: &Track,
        step: &Step,
        ctx: &StepContext,
        rng: &mut R,
    ) -> Result<ParticleChange> {
        if track.status.is_killed() {
            return Ok(ParticleChange::new());
        }
        match self {
            Process::AnharmonicDecay(p) => p.apply(track, ctx, rng),
            Process::LukeScattering(p) => p.apply(track, step, ctx, rng),
            Process::DriftBoundary(p) => p.apply(track, step, ctx),
            Process::Recombination(p) => p.apply(track, ctx, rng),
            Process::TrackLimiter(p) => Ok(p.apply(track, step, ctx)),
        }
    }
}

/// The processes registered for one worker, in invocation order
#[derive(Debug, Clone)]
pub struct ProcessSet {
    processes: Vec<Process>,
}

impl ProcessSet {
    pub fn new(processes: Vec<Process>) -> Self {
        ProcessSet { processes }
    }

    /// All five processes with a no-op trace and absorbing boundaries
    pub fn standard() -> Self {
        Self::with_collaborators(Arc::new(NoopSink), Arc::new(AbsorbAtSurface))
    }

    pub fn with_collaborators(sink: Arc<dyn DiagnosticSink>, resolver: Arc<dyn BoundaryResolver>) -> Self {
        ProcessSet::new(vec![
            Process::TrackLimiter(TrackLimiter),
            Process::AnharmonicDecay(AnharmonicDecay::with_sink(sink)),
            Process::LukeScattering(LukeScattering),
            Process::DriftBoundary(DriftBoundary::new(resolver)),
            Process::Recombination(Recombination),
        ])
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn applicable(&self, kind: ParticleKind) -> impl Iterator<Item = &Process> {
        self.processes.iter().filter(move |p| p.is_applicable(kind))
    }

    /// Shortest stochastic interaction length among applicable processes
    pub fn step_limit(&self, track: &Track, ctx: &StepContext) -> Result<Option<(&'static str, f64)>> {
        let mut best: Option<(&'static str, f64)> = None;
        for process in self.applicable(track.kind) {
            if let InteractionLength::Path(d) = process.interaction_length(track, ctx)? {
                if best.map(|(_, b)| d < b).unwrap_or(true) {
                    best = Some((process.name(), d));
                }
            }
        }
        Ok(best)
    }

    /// Run every applicable process on the step, stopping after the first kill
    pub fn post_step<R: Rng + ?Sized>(
        &self,
        track: &Track,
        step: &Step,
        ctx: &StepContext,
        rng: &mut R,
    ) -> Result<Vec<(&'static str, ParticleChange)>> {
        let mut changes = Vec::new();
        for process in self.applicable(track.kind) {
            let change = process.apply(track, step, ctx, rng)?;
            let killed = change.kills_track();
            changes.push((process.name(), change));
            if killed {
                break;
            }
        }
        Ok(changes)
    }
}
