use nalgebra::{Point3, Unit, Vector3};

/// Quadric surface bounding a crystal volume, expressed in the volume's local frame.
///
/// `evaluate` is a signed distance: negative on the "below" (inner) side and
/// positive "above" it. Plane coefficients are normalized on construction so
/// the same holds for planes.
#[derive(Clone, Debug)]
pub struct Surface {
    pub surface_id: Option<usize>,
    pub kind: SurfaceKind,
}

#[derive(Clone, Debug)]
pub enum SurfaceKind {
    Plane {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    },
    Sphere {
        center: Point3<f64>,
        radius: f64,
    },
    Cylinder {
        axis: Unit<Vector3<f64>>,
        origin: Point3<f64>,
        radius: f64,
    },
}

impl Surface {
    /// Plane ax + by + cz = d
    pub fn new_plane(a: f64, b: f64, c: f64, d: f64, surface_id: Option<usize>) -> Self {
        let norm = (a * a + b * b + c * c).sqrt();
        let norm = if norm > 0.0 { norm } else { 1.0 };
        Surface {
            surface_id,
            kind: SurfaceKind::Plane {
                a: a / norm,
                b: b / norm,
                c: c / norm,
                d: d / norm,
            },
        }
    }

    pub fn new_sphere(center: [f64; 3], radius: f64, surface_id: Option<usize>) -> Self {
        Surface {
            surface_id,
            kind: SurfaceKind::Sphere {
                center: Point3::from(center),
                radius,
            },
        }
    }

    pub fn new_cylinder(
        axis: [f64; 3],
        origin: [f64; 3],
        radius: f64,
        surface_id: Option<usize>,
    ) -> Self {
        Surface {
            surface_id,
            kind: SurfaceKind::Cylinder {
                axis: Unit::new_normalize(Vector3::from(axis)),
                origin: Point3::from(origin),
                radius,
            },
        }
    }

    pub fn x_plane(x0: f64, surface_id: Option<usize>) -> Self {
        Self::new_plane(1.0, 0.0, 0.0, x0, surface_id)
    }

    pub fn y_plane(y0: f64, surface_id: Option<usize>) -> Self {
        Self::new_plane(0.0, 1.0, 0.0, y0, surface_id)
    }

    pub fn z_plane(z0: f64, surface_id: Option<usize>) -> Self {
        Self::new_plane(0.0, 0.0, 1.0, z0, surface_id)
    }

    /// Cylinder along the Z axis centered at (x0, y0)
    pub fn z_cylinder(x0: f64, y0: f64, radius: f64, surface_id: Option<usize>) -> Self {
        Self::new_cylinder([0.0, 0.0, 1.0], [x0, y0, 0.0], radius, surface_id)
    }

    /// Signed distance of `point` from the surface
    pub fn evaluate(&self, point: &Point3<f64>) -> f64 {
        match &self.kind {
            SurfaceKind::Plane { a, b, c, d } => a * point.x + b * point.y + c * point.z - d,
            SurfaceKind::Sphere { center, radius } => (point - center).norm() - radius,
            SurfaceKind::Cylinder {
                axis,
                origin,
                radius,
            } => radial_offset(point, axis, origin).norm() - radius,
        }
    }

    /// Unit normal at (or nearest to) `point`, pointing to the "above" side.
    /// None where the normal is undefined (sphere center, cylinder axis).
    pub fn normal(&self, point: &Point3<f64>) -> Option<Unit<Vector3<f64>>> {
        let grad = match &self.kind {
            SurfaceKind::Plane { a, b, c, .. } => Vector3::new(*a, *b, *c),
            SurfaceKind::Sphere { center, .. } => point - center,
            SurfaceKind::Cylinder { axis, origin, .. } => radial_offset(point, axis, origin),
        };
        Unit::try_new(grad, 1e-15)
    }

    /// Distance from `point` along `direction` to the surface.
    /// Returns Some(distance) if an intersection exists ahead of the point.
    pub fn distance_to_surface(&self, point: &Point3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        match &self.kind {
            SurfaceKind::Plane { a, b, c, d } => {
                let n = Vector3::new(*a, *b, *c);
                let denom = n.dot(direction);
                if denom.abs() < 1e-12 {
                    // Parallel, no intersection
                    return None;
                }
                let t = (d - n.dot(&point.coords)) / denom;
                if t > 0.0 {
                    Some(t)
                } else {
                    None
                }
            }
            SurfaceKind::Sphere { center, radius } => {
                // Ray-sphere intersection: |p + t*v - c|^2 = r^2
                let oc = point - center;
                let a = direction.norm_squared();
                let b = 2.0 * oc.dot(direction);
                let c = oc.norm_squared() - radius * radius;
                smallest_positive_root(a, b, c)
            }
            SurfaceKind::Cylinder {
                axis,
                origin,
                radius,
            } => {
                // Project out the axial components of direction and offset
                let d = direction - axis.into_inner() * axis.dot(direction);
                let m = radial_offset(point, axis, origin);
                let a = d.norm_squared();
                if a < 1e-12 {
                    return None;
                }
                let b = 2.0 * d.dot(&m);
                let c = m.norm_squared() - radius * radius;
                smallest_positive_root(a, b, c)
            }
        }
    }
}

/// Component of (point - origin) perpendicular to the axis
fn radial_offset(point: &Point3<f64>, axis: &Unit<Vector3<f64>>, origin: &Point3<f64>) -> Vector3<f64> {
    let v = point - origin;
    v - axis.into_inner() * axis.dot(&v)
}

fn smallest_positive_root(a: f64, b: f64, c: f64) -> Option<f64> {
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    if t1 > 1e-12 {
        Some(t1)
    } else if t2 > 1e-12 {
        Some(t2)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_is_normalized() {
        let plane = Surface::new_plane(2.0, 0.0, 0.0, 4.0, Some(1));
        match plane.kind {
            SurfaceKind::Plane { a, b, c, d } => {
                assert_eq!(a, 1.0);
                assert_eq!(b, 0.0);
                assert_eq!(c, 0.0);
                assert_eq!(d, 2.0);
            }
            _ => panic!("Not a plane"),
        }
        assert_relative_eq!(plane.evaluate(&Point3::new(3.0, 7.0, -1.0)), 1.0);
    }

    #[test]
    fn test_sphere_distance() {
        let sphere = Surface::new_sphere([0.0, 0.0, 0.0], 1.0, None);
        // From (2,0,0) toward center
        let d = sphere.distance_to_surface(&Point3::new(2.0, 0.0, 0.0), &Vector3::new(-1.0, 0.0, 0.0));
        assert!((d.unwrap() - 1.0).abs() < 1e-10);
        // From the center outward
        let d2 = sphere.distance_to_surface(&Point3::origin(), &Vector3::new(1.0, 0.0, 0.0));
        assert!((d2.unwrap() - 1.0).abs() < 1e-10);
        // No intersection
        let d3 = sphere.distance_to_surface(&Point3::new(2.0, 0.0, 0.0), &Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(d3, None);
    }

    #[test]
    fn test_cylinder_distance_and_normal() {
        let cyl = Surface::z_cylinder(0.0, 0.0, 1.0, None);
        let p = Point3::new(0.5, 0.0, 3.0);
        let d = cyl.distance_to_surface(&p, &Vector3::new(1.0, 0.0, 0.0));
        assert!((d.unwrap() - 0.5).abs() < 1e-10);
        // Moving along the axis never hits the wall
        assert_eq!(cyl.distance_to_surface(&p, &Vector3::new(0.0, 0.0, 1.0)), None);
        let n = cyl.normal(&Point3::new(0.0, 2.0, -4.0)).unwrap();
        assert_relative_eq!(n.into_inner(), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert!(cyl.normal(&Point3::new(0.0, 0.0, 1.0)).is_none());
    }

    #[test]
    fn test_signed_distance_sign() {
        let sphere = Surface::new_sphere([1.0, 0.0, 0.0], 2.0, None);
        assert!(sphere.evaluate(&Point3::new(1.0, 0.5, 0.0)) < 0.0);
        assert!(sphere.evaluate(&Point3::new(4.0, 0.0, 0.0)) > 0.0);
        let n = sphere.normal(&Point3::new(3.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(n.into_inner(), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }
}
