use crate::particle::ParticleKind;
use rand::Rng;
use tracing::warn;

/// An accepted draw from [`sample_rejection`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RejectionSample {
    pub value: f64,
    /// Candidates drawn, including the accepted one
    pub iterations: u64,
}

/// Acceptance-rejection sampling with a uniform envelope.
///
/// Candidates `x` are drawn uniformly on `[lower, upper)` and accepted when
/// `envelope * u < density(x)` for a fresh uniform `u`. The loop terminates
/// almost surely for a density that is positive somewhere on the interval.
/// With `max_iterations` set, the loop gives up after that many candidates
/// and returns `None` so the caller can drop the event instead of emitting a
/// biased sample.
///
/// Density values outside `[0, envelope]` are logged once per call. Negative
/// values are never accepted; values above the envelope are accepted, which
/// biases the sample, so the warning is the only place this shows up.
pub fn sample_rejection<R, F>(
    rng: &mut R,
    lower: f64,
    upper: f64,
    envelope: f64,
    density: F,
    max_iterations: Option<u64>,
) -> Option<RejectionSample>
where
    R: Rng + ?Sized,
    F: Fn(f64) -> f64,
{
    let mut iterations = 0u64;
    let mut warned = false;
    loop {
        if let Some(cap) = max_iterations {
            if iterations >= cap {
                warn!(
                    lower,
                    upper,
                    envelope,
                    iterations,
                    "rejection sampling gave up without accepting a candidate"
                );
                return None;
            }
        }
        iterations += 1;

        let x = lower + rng.gen::<f64>() * (upper - lower);
        let p = envelope * rng.gen::<f64>();
        let f = density(x);

        if !warned && !(0.0..=envelope).contains(&f) {
            warn!(x, density = f, envelope, "density outside sampling envelope");
            warned = true;
        }

        if p < f {
            return Some(RejectionSample { value: x, iterations });
        }
    }
}

/// Choose a phonon polarization with probability proportional to the given
/// densities of states. A zero longitudinal weight restricts the draw to the
/// two transverse modes.
pub fn choose_polarization<R: Rng + ?Sized>(rng: &mut R, ldos: f64, stdos: f64, ftdos: f64) -> ParticleKind {
    let norm = ldos + stdos + ftdos;
    let r = rng.gen::<f64>() * norm;
    if r < ldos {
        ParticleKind::PhononLong
    } else if r < ldos + stdos {
        ParticleKind::PhononTransSlow
    } else {
        ParticleKind::PhononTransFast
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_density_accepts_within_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let s = sample_rejection(&mut rng, 0.25, 0.75, 1.0, |_| 0.5, None).unwrap();
            assert!(s.value >= 0.25 && s.value < 0.75);
            assert!(s.iterations >= 1);
        }
    }

    #[test]
    fn test_linear_density_mean() {
        // f(x) = 2x on [0, 1) has mean 2/3
        let mut rng = StdRng::seed_from_u64(2);
        let n = 20_000;
        let sum: f64 = (0..n)
            .map(|_| sample_rejection(&mut rng, 0.0, 1.0, 2.0, |x| 2.0 * x, None).unwrap().value)
            .sum();
        let mean = sum / n as f64;
        assert!((mean - 2.0 / 3.0).abs() < 0.01, "mean = {}", mean);
    }

    #[test]
    fn test_cap_reports_failure() {
        let mut rng = StdRng::seed_from_u64(3);
        let result = sample_rejection(&mut rng, 0.0, 1.0, 1.0, |_| 0.0, Some(50));
        assert!(result.is_none());
    }

    #[test]
    fn test_negative_density_never_accepted() {
        let mut rng = StdRng::seed_from_u64(4);
        let s = sample_rejection(&mut rng, 0.0, 1.0, 1.0, |x| if x < 0.5 { -1.0 } else { 0.9 }, Some(10_000))
            .unwrap();
        assert!(s.value >= 0.5);
    }

    #[test]
    fn test_polarization_fractions() {
        let mut rng = StdRng::seed_from_u64(5);
        let n = 30_000;
        let mut counts = [0usize; 3];
        for _ in 0..n {
            match choose_polarization(&mut rng, 0.2, 0.5, 0.3) {
                ParticleKind::PhononLong => counts[0] += 1,
                ParticleKind::PhononTransSlow => counts[1] += 1,
                ParticleKind::PhononTransFast => counts[2] += 1,
                other => panic!("unexpected species {:?}", other),
            }
        }
        let fractions: Vec<f64> = counts.iter().map(|c| *c as f64 / n as f64).collect();
        assert!((fractions[0] - 0.2).abs() < 0.015);
        assert!((fractions[1] - 0.5).abs() < 0.015);
        assert!((fractions[2] - 0.3).abs() < 0.015);
    }

    #[test]
    fn test_transverse_only_polarization() {
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..1000 {
            let kind = choose_polarization(&mut rng, 0.0, 0.5, 0.5);
            assert_ne!(kind, ParticleKind::PhononLong);
        }
    }
}
