use crate::constants::SURFACE_TOLERANCE;
use crate::navigation::{Containment, Solid};
use crate::region::Region;
use crate::transform::{FrameTransform, Touchable, VolumeId};
use nalgebra::{Point3, Unit, Vector3};

/// A placed crystal volume: a region in local coordinates plus its placement.
#[derive(Clone, Debug)]
pub struct Cell {
    pub cell_id: VolumeId,
    pub name: Option<String>,
    pub region: Region,
    pub placement: FrameTransform,
}

impl Cell {
    /// Create a new cell placed at the lab origin
    pub fn new(cell_id: VolumeId, region: Region, name: Option<String>) -> Self {
        Cell {
            cell_id,
            name,
            region,
            placement: FrameTransform::identity(),
        }
    }

    pub fn with_placement(mut self, placement: FrameTransform) -> Self {
        self.placement = placement;
        self
    }

    pub fn touchable(&self) -> Touchable {
        Touchable::new(self.cell_id, self.placement)
    }

    /// Check if a global point is inside this cell's region
    pub fn contains_global(&self, point: &Point3<f64>) -> bool {
        self.region.contains(&self.placement.to_local_position(point))
    }

    /// Distance to the closest exiting surface from a local point along a direction
    pub fn distance_to_surface(&self, point: &Point3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        let mut min_dist = f64::INFINITY;
        for (surface, _sense) in self.region.surfaces_with_sense() {
            if let Some(dist) = surface.distance_to_surface(point, direction) {
                if dist > 1e-12 && dist < min_dist && self.region.is_exit_surface(point, direction, dist) {
                    min_dist = dist;
                }
            }
        }
        if min_dist < f64::INFINITY {
            Some(min_dist)
        } else {
            None
        }
    }
}

impl Solid for Cell {
    fn inside(&self, local: &Point3<f64>) -> Containment {
        let near_surface = self
            .region
            .nearest_surface(local)
            .map(|(_, _, dist)| dist <= SURFACE_TOLERANCE)
            .unwrap_or(false);
        if near_surface {
            Containment::Surface
        } else if self.region.contains(local) {
            Containment::Inside
        } else {
            Containment::Outside
        }
    }

    /// Nearest surface with a defined gradient at `local`. A point on a
    /// cylinder axis skips the wall and takes the next closest surface.
    fn surface_normal(&self, local: &Point3<f64>) -> Option<Unit<Vector3<f64>>> {
        let mut candidates: Vec<_> = self
            .region
            .surfaces_with_sense()
            .into_iter()
            .map(|(surface, above)| (surface.evaluate(local).abs(), surface, above))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        candidates.into_iter().find_map(|(_, surface, above)| {
            // Inside lies on the "above" side for Above halfspaces, so outward points below
            surface.normal(local).map(|n| if above { -n } else { n })
        })
    }

    fn distance_to_out(&self, local: &Point3<f64>, direction: &Vector3<f64>) -> f64 {
        self.distance_to_surface(local, direction)
            .unwrap_or(f64::INFINITY)
    }

    fn safety_distance(&self, local: &Point3<f64>) -> f64 {
        self.region
            .nearest_surface(local)
            .map(|(_, _, dist)| dist)
            .unwrap_or(f64::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::HalfspaceType;
    use crate::surface::Surface;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn ball(radius: f64) -> Cell {
        let sphere = Arc::new(Surface::new_sphere([0.0, 0.0, 0.0], radius, Some(1)));
        Cell::new(
            1,
            Region::new_from_halfspace(HalfspaceType::Below(sphere)),
            Some("ball".to_string()),
        )
    }

    #[test]
    fn test_containment() {
        let cell = ball(1.0);
        assert_eq!(cell.inside(&Point3::new(0.0, 0.0, 0.5)), Containment::Inside);
        assert_eq!(cell.inside(&Point3::new(0.0, 0.0, 1.0)), Containment::Surface);
        assert_eq!(cell.inside(&Point3::new(0.0, 0.0, 1.5)), Containment::Outside);
    }

    #[test]
    fn test_outward_normal_for_both_senses() {
        let cell = ball(1.0);
        let n = cell.surface_normal(&Point3::new(0.0, 0.9, 0.0)).unwrap();
        assert_relative_eq!(n.into_inner(), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);

        // Slab above z = 0: outward normal points to -z
        let floor = Arc::new(Surface::z_plane(0.0, Some(2)));
        let slab = Cell::new(2, Region::new_from_halfspace(HalfspaceType::Above(floor)), None);
        let n = slab.surface_normal(&Point3::new(0.0, 0.0, 0.1)).unwrap();
        assert_relative_eq!(n.into_inner(), Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }

    fn can(radius: f64, half_height: f64) -> Cell {
        let wall = Arc::new(Surface::z_cylinder(0.0, 0.0, radius, Some(1)));
        let bottom = Arc::new(Surface::z_plane(-half_height, Some(2)));
        let top = Arc::new(Surface::z_plane(half_height, Some(3)));
        let region = Region::new_from_halfspace(HalfspaceType::Below(wall))
            .intersection(&Region::new_from_halfspace(HalfspaceType::Above(bottom)))
            .intersection(&Region::new_from_halfspace(HalfspaceType::Below(top)));
        Cell::new(4, region, Some("can".to_string()))
    }

    #[test]
    fn test_normal_on_axis_uses_next_surface() {
        let cell = can(1.0, 2.0);
        // The wall is nearest but has no gradient on the axis
        let n = cell.surface_normal(&Point3::new(0.0, 0.0, 0.5)).unwrap();
        assert_relative_eq!(n.into_inner(), Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
        let n = cell.surface_normal(&Point3::new(0.0, 0.0, -0.5)).unwrap();
        assert_relative_eq!(n.into_inner(), Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
        // Off the axis the wall wins again
        let n = cell.surface_normal(&Point3::new(0.9, 0.0, 0.0)).unwrap();
        assert_relative_eq!(n.into_inner(), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_safety_distance() {
        let cell = can(1.0, 2.0);
        assert_relative_eq!(cell.safety_distance(&Point3::origin()), 1.0, epsilon = 1e-12);
        assert_relative_eq!(cell.safety_distance(&Point3::new(0.0, 0.0, 1.75)), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_to_out() {
        let cell = ball(2.0);
        let d = cell.distance_to_out(&Point3::new(0.0, 0.0, 1.0), &Vector3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(d, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_placed_cell_contains_global_point() {
        let cell = ball(1.0).with_placement(FrameTransform::translation(Vector3::new(10.0, 0.0, 0.0)));
        assert!(cell.contains_global(&Point3::new(10.5, 0.0, 0.0)));
        assert!(!cell.contains_global(&Point3::new(0.0, 0.0, 0.0)));
    }
}
