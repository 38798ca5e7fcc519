// Constructive solid description of a crystal volume in its local frame
use crate::surface::Surface;
use nalgebra::{Point3, Vector3};
use std::sync::Arc;

/// Step taken past a surface when testing whether crossing it leaves the region [m]
const CROSSING_STEP: f64 = 1e-10;

/// Boolean combination of surface halfspaces describing a solid
#[derive(Clone, Debug)]
pub struct Region {
    pub expr: RegionExpr,
}

/// Side of a surface. `Below` is the negative side of its signed distance.
#[derive(Clone, Debug)]
pub enum HalfspaceType {
    Above(Arc<Surface>),
    Below(Arc<Surface>),
}

impl HalfspaceType {
    fn surface(&self) -> &Arc<Surface> {
        match self {
            HalfspaceType::Above(s) | HalfspaceType::Below(s) => s,
        }
    }

    fn is_above(&self) -> bool {
        matches!(self, HalfspaceType::Above(_))
    }

    fn contains(&self, point: &Point3<f64>) -> bool {
        let distance = self.surface().evaluate(point);
        if self.is_above() {
            distance > 0.0
        } else {
            distance < 0.0
        }
    }
}

#[derive(Clone, Debug)]
pub enum RegionExpr {
    Halfspace(HalfspaceType),
    Union(Box<RegionExpr>, Box<RegionExpr>),
    Intersection(Box<RegionExpr>, Box<RegionExpr>),
    Complement(Box<RegionExpr>),
}

impl RegionExpr {
    pub fn evaluate_contains(&self, point: &Point3<f64>) -> bool {
        match self {
            RegionExpr::Halfspace(hs) => hs.contains(point),
            RegionExpr::Union(a, b) => a.evaluate_contains(point) || b.evaluate_contains(point),
            RegionExpr::Intersection(a, b) => a.evaluate_contains(point) && b.evaluate_contains(point),
            RegionExpr::Complement(inner) => !inner.evaluate_contains(point),
        }
    }

    fn collect_surfaces(&self, flipped: bool, out: &mut Vec<(Arc<Surface>, bool)>) {
        match self {
            RegionExpr::Halfspace(hs) => out.push((hs.surface().clone(), hs.is_above() != flipped)),
            RegionExpr::Union(a, b) | RegionExpr::Intersection(a, b) => {
                a.collect_surfaces(flipped, out);
                b.collect_surfaces(flipped, out);
            }
            RegionExpr::Complement(inner) => inner.collect_surfaces(!flipped, out),
        }
    }
}

impl Region {
    pub fn new_from_halfspace(halfspace_type: HalfspaceType) -> Self {
        Region {
            expr: RegionExpr::Halfspace(halfspace_type),
        }
    }

    /// Intersection of the inner sides of all `surfaces`
    pub fn bounded_by(surfaces: &[Arc<Surface>]) -> Option<Self> {
        let mut halfspaces = surfaces
            .iter()
            .map(|s| Region::new_from_halfspace(HalfspaceType::Below(s.clone())));
        let first = halfspaces.next()?;
        Some(halfspaces.fold(first, |acc, r| acc.intersection(&r)))
    }

    pub fn intersection(&self, other: &Self) -> Self {
        Region {
            expr: RegionExpr::Intersection(Box::new(self.expr.clone()), Box::new(other.expr.clone())),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Region {
            expr: RegionExpr::Union(Box::new(self.expr.clone()), Box::new(other.expr.clone())),
        }
    }

    pub fn complement(&self) -> Self {
        Region {
            expr: RegionExpr::Complement(Box::new(self.expr.clone())),
        }
    }

    /// Every bounding surface with the side the region lies on (true = above)
    pub fn surfaces_with_sense(&self) -> Vec<(Arc<Surface>, bool)> {
        let mut surfaces = Vec::new();
        self.expr.collect_surfaces(false, &mut surfaces);
        surfaces
    }

    pub fn contains(&self, point: &Point3<f64>) -> bool {
        self.expr.evaluate_contains(point)
    }

    /// Surface closest to `point` (by unsigned distance), with its sense and the distance
    pub fn nearest_surface(&self, point: &Point3<f64>) -> Option<(Arc<Surface>, bool, f64)> {
        self.surfaces_with_sense()
            .into_iter()
            .map(|(surface, sense)| {
                let dist = surface.evaluate(point).abs();
                (surface, sense, dist)
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
    }

    /// True when crossing a surface `dist` ahead of `point` lands outside the region
    pub fn is_exit_surface(&self, point: &Point3<f64>, direction: &Vector3<f64>, dist: f64) -> bool {
        let beyond = point + direction * (dist + CROSSING_STEP);
        !self.contains(&beyond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk() -> Region {
        // 0 < z < 1 intersected with a unit cylinder
        let bottom = Arc::new(Surface::z_plane(0.0, Some(1)));
        let top = Arc::new(Surface::z_plane(1.0, Some(2)));
        let wall = Arc::new(Surface::z_cylinder(0.0, 0.0, 1.0, Some(3)));
        Region::new_from_halfspace(HalfspaceType::Above(bottom))
            .intersection(&Region::new_from_halfspace(HalfspaceType::Below(top)))
            .intersection(&Region::new_from_halfspace(HalfspaceType::Below(wall)))
    }

    #[test]
    fn test_region_contains() {
        let region = disk();
        assert!(region.contains(&Point3::new(0.0, 0.0, 0.5)));
        assert!(!region.contains(&Point3::new(0.0, 0.0, 1.5)));
        assert!(!region.contains(&Point3::new(2.0, 0.0, 0.5)));
        assert!(region.complement().contains(&Point3::new(2.0, 0.0, 0.5)));
    }

    #[test]
    fn test_surfaces_with_sense() {
        let senses: Vec<bool> = disk().surfaces_with_sense().iter().map(|(_, s)| *s).collect();
        assert_eq!(senses, vec![true, false, false]);
        let flipped: Vec<bool> = disk().complement().surfaces_with_sense().iter().map(|(_, s)| *s).collect();
        assert_eq!(flipped, vec![false, true, true]);
    }

    #[test]
    fn test_nearest_surface() {
        let (surface, above, dist) = disk().nearest_surface(&Point3::new(0.0, 0.0, 0.9)).unwrap();
        assert_eq!(surface.surface_id, Some(2));
        assert!(!above);
        assert!((dist - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_exit_surface() {
        let region = disk();
        let p = Point3::new(0.0, 0.0, 0.5);
        assert!(region.is_exit_surface(&p, &Vector3::new(0.0, 0.0, 1.0), 0.5));
        assert!(!region.is_exit_surface(&p, &Vector3::new(0.0, 0.0, 1.0), 0.2));
    }

    #[test]
    fn test_bounded_by() {
        let surfaces = vec![
            Arc::new(Surface::new_sphere([0.0, 0.0, 0.0], 1.0, None)),
            Arc::new(Surface::z_plane(0.5, None)),
        ];
        let cap = Region::bounded_by(&surfaces).unwrap();
        assert!(cap.contains(&Point3::new(0.0, 0.0, 0.2)));
        assert!(!cap.contains(&Point3::new(0.0, 0.0, 0.7)));
        assert!(Region::bounded_by(&[]).is_none());
    }
}
