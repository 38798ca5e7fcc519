// Expectation invariance of secondary weighting and the recombination fallback

use approx::assert_relative_eq;
use cmpmc::partition::partition_phonons;
use cmpmc::weighting::{choose_weight, weigh_pair, WeightDecision};
use cmpmc::{
    Cell, Config, Fate, FrameTransform, Geometry, HalfspaceType, LatticeParams, LatticeTable, ParticleKind, Process,
    Region, Secondary, SecondaryPair, Step, StepContext, Surface, Touchable, Track, TrackStatus,
};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn world() -> (Geometry, LatticeTable) {
    let sphere = Arc::new(Surface::new_sphere([0.0, 0.0, 0.0], 0.02, Some(1)));
    let crystal = Cell::new(7, Region::new_from_halfspace(HalfspaceType::Below(sphere)), None);
    let geometry = Geometry::new(vec![crystal]).unwrap();
    let lattices = LatticeTable::new().with(7, Arc::new(LatticeParams::germanium()));
    (geometry, lattices)
}

fn track(kind: ParticleKind, energy: f64) -> Track {
    Track::new(
        kind,
        Touchable::new(7, FrameTransform::identity()),
        Point3::new(0.004, -0.002, 0.001),
        Vector3::new(1.0, 1.0, 0.0),
        energy,
    )
}

fn pair() -> SecondaryPair {
    SecondaryPair {
        first: Secondary::new(ParticleKind::PhononTransSlow, Vector3::x_axis(), 1e-3, 1.0),
        second: Secondary::new(ParticleKind::PhononTransFast, Vector3::y_axis(), 2e-3, 1.0),
    }
}

#[test]
fn test_weighted_yield_is_unbiased() {
    let mut rng = StdRng::seed_from_u64(404);
    let bias = 4.0;
    let parent_weight = 1.0;
    let trials = 100_000;

    let mut total_weight = 0.0;
    let mut kept = 0usize;
    for _ in 0..trials {
        if let Some(p) = weigh_pair(&mut rng, bias, parent_weight, pair()) {
            // Both members share one decision and one weight
            assert_eq!(p.first.weight, p.second.weight);
            assert_eq!(p.first.weight, bias * parent_weight);
            total_weight += p.first.weight;
            kept += 1;
        }
    }
    // Standard error of the mean weight is about 0.0055
    let mean = total_weight / trials as f64;
    assert!((mean - 1.0).abs() < 0.03, "mean weight {}", mean);
    let kept_fraction = kept as f64 / trials as f64;
    assert!((kept_fraction - 0.25).abs() < 0.01, "kept fraction {}", kept_fraction);
}

#[test]
fn test_unit_bias_keeps_everything() {
    let mut rng = StdRng::seed_from_u64(1);
    for bias in [0.0, 0.5, 1.0] {
        for _ in 0..100 {
            assert_eq!(choose_weight(&mut rng, bias), WeightDecision::Keep(1.0));
        }
    }
    let p = weigh_pair(&mut rng, 1.0, 0.3, pair()).unwrap();
    assert_relative_eq!(p.first.weight, 0.3);
    assert_relative_eq!(p.second.weight, 0.3);
}

#[test]
fn test_decay_process_preserves_expected_weight() {
    let (geometry, lattices) = world();
    let config = Config {
        downconversion_sampling: 4.0,
        ..Config::default()
    };
    let ctx = StepContext::new(&config, &lattices, &geometry);
    let decay = Process::AnharmonicDecay(Default::default());
    let mut rng = StdRng::seed_from_u64(405);

    let trials = 20_000;
    let parent = track(ParticleKind::PhononLong, 1e-3).with_weight(2.0);
    let step = Step::at_rest(&parent);
    let mut weighted_count = 0.0;
    let mut survivors = 0usize;
    for _ in 0..trials {
        let change = decay.apply(&parent, &step, &ctx, &mut rng).unwrap();
        match change.number_of_secondaries() {
            0 => {
                // Dropped pair leaves the parent alive
                assert!(change.status.is_none());
                survivors += 1;
            }
            2 => {
                assert_eq!(change.status, Some(TrackStatus::Killed(Fate::Decayed)));
                for s in &change.secondaries {
                    assert_eq!(s.weight, 8.0);
                }
                weighted_count += change.secondary_weight();
            }
            n => panic!("unexpected secondary count {}", n),
        }
    }
    // Unbiased expectation: two daughters of weight 2 per decay
    let per_decay = weighted_count / trials as f64;
    assert!((per_decay - 4.0).abs() < 0.2, "weighted daughters per decay {}", per_decay);
    assert!(survivors > 0);
}

#[test]
fn test_partition_weights_phonons_independently() {
    let lattice = LatticeParams::germanium();
    let mut rng = StdRng::seed_from_u64(406);
    let energy = 0.37;
    let mut expected = 0.0;
    let trials = 2000;
    for _ in 0..trials {
        let partition = partition_phonons(&mut rng, &lattice, energy, 2.0, 1.0);
        // ceil(0.37 / 0.0129) Debye-limited phonons
        assert_eq!(partition.generated, 29);
        for phonon in &partition.phonons {
            assert!(phonon.kind.is_phonon());
            assert_relative_eq!(phonon.kinetic_energy, energy / 29.0, max_relative = 1e-12);
            expected += phonon.weight * phonon.kinetic_energy;
        }
    }
    assert_relative_eq!(expected / trials as f64, energy, max_relative = 0.03);
}

#[test]
fn test_heavy_recombination_bias_deposits_locally() {
    let (geometry, lattices) = world();
    let config = Config {
        recombination_sampling: 1e12,
        ..Config::default()
    };
    let ctx = StepContext::new(&config, &lattices, &geometry);
    let recombination = Process::Recombination(Default::default());
    let mut rng = StdRng::seed_from_u64(407);

    for kind in [ParticleKind::Electron, ParticleKind::Hole] {
        let carrier = track(kind, 0.0).with_status(TrackStatus::StoppedButAlive);
        let change = recombination
            .apply(&carrier, &Step::at_rest(&carrier), &ctx, &mut rng)
            .unwrap();
        assert_eq!(change.number_of_secondaries(), 0);
        assert_relative_eq!(change.non_ionizing_deposit, 0.37, max_relative = 1e-12);
        assert_eq!(change.status, Some(TrackStatus::Killed(Fate::Recombined)));
    }
}
