//! Local (solid) <-> global (lab) coordinate frames.
//!
//! A [`FrameTransform`] is bound to one placement ([`Touchable`]) and is only
//! valid while a track stays in that placement; [`FrameCache`] rebuilds it
//! whenever the placement changes.

use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Identifier of a placed volume
pub type VolumeId = u32;

/// Rotation + translation mapping local coordinates to the global frame:
/// `global = R * local + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    local_to_global: Isometry3<f64>,
}

impl FrameTransform {
    /// Identity placement (local frame coincides with the lab)
    pub fn identity() -> Self {
        Self {
            local_to_global: Isometry3::identity(),
        }
    }

    /// Build from the placement's rotation and translation
    pub fn new(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            local_to_global: Isometry3::from_parts(
                Translation3::from(translation),
                UnitQuaternion::from_rotation_matrix(&rotation),
            ),
        }
    }

    /// Pure translation
    pub fn translation(offset: Vector3<f64>) -> Self {
        Self::new(Rotation3::identity(), offset)
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        self.local_to_global.rotation.to_rotation_matrix()
    }

    pub fn offset(&self) -> Vector3<f64> {
        self.local_to_global.translation.vector
    }

    /// Transform that maps global coordinates into this local frame
    pub fn inverse(&self) -> Self {
        Self {
            local_to_global: self.local_to_global.inverse(),
        }
    }

    pub fn to_local_position(&self, global: &Point3<f64>) -> Point3<f64> {
        self.local_to_global.inverse_transform_point(global)
    }

    pub fn to_global_position(&self, local: &Point3<f64>) -> Point3<f64> {
        self.local_to_global.transform_point(local)
    }

    /// Directions (axes) only rotate; translation does not apply
    pub fn to_local_direction(&self, global: &Vector3<f64>) -> Vector3<f64> {
        self.local_to_global.inverse_transform_vector(global)
    }

    pub fn to_global_direction(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.local_to_global.transform_vector(local)
    }
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Placement context of a track: which volume it is in and how that volume
/// is placed in the lab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touchable {
    pub volume: VolumeId,
    pub transform: FrameTransform,
}

impl Touchable {
    pub fn new(volume: VolumeId, transform: FrameTransform) -> Self {
        Self { volume, transform }
    }
}

/// Per-worker holder of the frame for the current placement.
///
/// The cached transform is rebuilt whenever [`FrameCache::bind`] sees a
/// different touchable, so it never outlives its placement context.
#[derive(Debug, Clone, Default)]
pub struct FrameCache {
    current: Option<Touchable>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Bind to `touchable`, returning the transform for it
    pub fn bind(&mut self, touchable: &Touchable) -> &FrameTransform {
        let current = self.current.get_or_insert(*touchable);
        if current != touchable {
            *current = *touchable;
        }
        &current.transform
    }

    /// Drop the cached frame so the next bind starts fresh
    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn volume(&self) -> Option<VolumeId> {
        self.current.map(|t| t.volume)
    }

    /// Transform of the bound placement, identity when unbound
    pub fn transform(&self) -> FrameTransform {
        self.current.map(|t| t.transform).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn placement() -> FrameTransform {
        let rotation = Rotation3::from_euler_angles(0.3, -1.2, 2.1);
        FrameTransform::new(rotation, Vector3::new(0.01, -0.02, 0.5))
    }

    #[test]
    fn test_position_round_trip() {
        let t = placement();
        let p = Point3::new(0.1, 0.2, -0.3);
        let back = t.to_global_position(&t.to_local_position(&p));
        assert_relative_eq!(back, p, epsilon = 1e-12);
        let back = t.to_local_position(&t.to_global_position(&p));
        assert_relative_eq!(back, p, epsilon = 1e-12);
    }

    #[test]
    fn test_direction_ignores_translation() {
        let t = FrameTransform::translation(Vector3::new(5.0, 5.0, 5.0));
        let d = Vector3::new(0.0, 0.0, 1.0);
        assert_relative_eq!(t.to_local_direction(&d), d, epsilon = 1e-15);
        let p = Point3::new(5.0, 5.0, 6.0);
        assert_relative_eq!(t.to_local_position(&p), Point3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_swaps_frames() {
        let t = placement();
        let inv = t.inverse();
        let p = Point3::new(-0.4, 0.9, 0.05);
        assert_relative_eq!(inv.to_global_position(&p), t.to_local_position(&p), epsilon = 1e-12);
    }

    #[test]
    fn test_frame_cache_rebinds_on_new_placement() {
        let mut cache = FrameCache::new();
        let a = Touchable::new(1, FrameTransform::identity());
        let b = Touchable::new(2, placement());
        cache.bind(&a);
        assert_eq!(cache.volume(), Some(1));
        let t = *cache.bind(&b);
        assert_eq!(cache.volume(), Some(2));
        assert_eq!(t, b.transform);
        cache.clear();
        assert_eq!(cache.volume(), None);
    }
}
