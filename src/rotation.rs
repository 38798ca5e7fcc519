// Direction helpers shared by the kinematics samplers

use nalgebra::{Rotation3, Unit, Vector3};
use rand::Rng;
use rand_distr::{Distribution, UnitSphere};

/// A vector orthogonal to `v`, built from the two largest components.
///
/// Matches the usual "orthogonal()" convention of HEP vector libraries so the
/// first deflection plane is reproducible for a given parent direction.
pub fn orthogonal(v: &Vector3<f64>) -> Vector3<f64> {
    let (x, y, z) = (v.x.abs(), v.y.abs(), v.z.abs());
    if x < y {
        if x < z {
            Vector3::new(0.0, v.z, -v.y)
        } else {
            Vector3::new(v.y, -v.x, 0.0)
        }
    } else if y < z {
        Vector3::new(-v.z, 0.0, v.x)
    } else {
        Vector3::new(v.y, -v.x, 0.0)
    }
}

/// Rotate `v` by `angle` about `axis` (right-handed). A zero axis leaves `v` unchanged.
pub fn rotate_about(v: &Vector3<f64>, axis: &Vector3<f64>, angle: f64) -> Vector3<f64> {
    match Unit::try_new(*axis, 1e-300) {
        Some(axis) => Rotation3::from_axis_angle(&axis, angle) * v,
        None => *v,
    }
}

/// Deflect `dir` by polar angle `theta` in the plane spanned with its
/// orthogonal axis, then spin the result by azimuth `phi` about the original
/// `dir`.
pub fn deflect(dir: &Vector3<f64>, theta: f64, phi: f64) -> Vector3<f64> {
    let tilted = rotate_about(dir, &orthogonal(dir), theta);
    rotate_about(&tilted, dir, phi)
}

/// Angle between two vectors in [0, pi]
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let denom = a.norm() * b.norm();
    if denom <= 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}

/// Sample an isotropic unit direction
pub fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Unit<Vector3<f64>> {
    let [x, y, z]: [f64; 3] = UnitSphere.sample(rng);
    Unit::new_normalize(Vector3::new(x, y, z))
}

/// Sample a uniform azimuth in [0, 2 pi)
pub fn random_azimuth<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    2.0 * std::f64::consts::PI * rng.gen::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_orthogonal_is_perpendicular() {
        let vectors = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.3, -0.5, 0.8),
            Vector3::new(-2.0, 1.0, 0.1),
        ];
        for v in &vectors {
            let o = orthogonal(v);
            assert!(o.norm() > 0.0);
            assert_relative_eq!(o.dot(v), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_deflect_preserves_polar_angle() {
        let mut rng = StdRng::seed_from_u64(7);
        let dir = Vector3::new(0.2, 0.4, 0.9).normalize();
        for _ in 0..100 {
            let theta = rng.gen_range(0.0..std::f64::consts::PI);
            let phi = random_azimuth(&mut rng);
            let out = deflect(&dir, theta, phi);
            assert_relative_eq!(out.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(angle_between(&dir, &out), theta, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_opposite_deflections_share_azimuthal_plane() {
        let dir = Vector3::new(0.0, 0.0, 1.0);
        let a = deflect(&dir, 0.3, 1.1);
        let b = deflect(&dir, -0.5, 1.1);
        // Both daughters and the parent lie in one plane
        assert_relative_eq!(a.cross(&b).dot(&dir), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_random_direction_is_unit() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let d = random_direction(&mut rng);
            assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-12);
        }
    }
}
