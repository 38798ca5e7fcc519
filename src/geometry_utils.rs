//! Geometry helpers for placing and orienting secondaries.

use crate::config::Config;
use crate::error::{CmpError, Result};
use crate::lattice::{LatticeParams, LatticeRegistry};
use crate::navigation::{Containment, Navigator};
use crate::particle::Step;
use crate::transform::Touchable;
use nalgebra::{Point3, Unit, Vector3};
use tracing::debug;

pub fn get_local_direction(touchable: &Touchable, direction: &Vector3<f64>) -> Vector3<f64> {
    touchable.transform.to_local_direction(direction)
}

pub fn get_local_position(touchable: &Touchable, position: &Point3<f64>) -> Point3<f64> {
    touchable.transform.to_local_position(position)
}

pub fn get_global_direction(touchable: &Touchable, direction: &Vector3<f64>) -> Vector3<f64> {
    touchable.transform.to_global_direction(direction)
}

pub fn get_global_position(touchable: &Touchable, position: &Point3<f64>) -> Point3<f64> {
    touchable.transform.to_global_position(position)
}

fn as_array(p: &Point3<f64>) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// Outward normal (global frame) at the post-step point of a boundary step.
///
/// A failed or degenerate navigator answer aborts the event.
pub fn get_surface_normal(step: &Step, navigator: &dyn Navigator) -> Result<Unit<Vector3<f64>>> {
    let position = step.post.position;
    let failure = || CmpError::SurfaceNormal {
        position: as_array(&position),
        pre: step.pre.volume,
        post: step.post.volume,
    };
    let normal = navigator.exit_normal(&position).ok_or_else(failure)?;
    if normal.norm() < 0.99 {
        return Err(failure());
    }
    Ok(normal)
}

/// Placement of the volume containing a global point
pub fn get_volume_at_point(navigator: &dyn Navigator, position: &Point3<f64>) -> Option<Touchable> {
    navigator.locate(position)
}

/// Lattice for a placement, falling back to the volume at `position`.
///
/// Returns the placement the lattice belongs to alongside it.
pub fn resolve_lattice<'a>(
    lattices: &'a dyn LatticeRegistry,
    navigator: &dyn Navigator,
    touchable: &Touchable,
    position: &Point3<f64>,
) -> Result<(&'a LatticeParams, Touchable)> {
    if let Some(lattice) = lattices.lattice(touchable.volume) {
        return Ok((lattice, *touchable));
    }
    let fallback = get_volume_at_point(navigator, position)
        .and_then(|t| lattices.lattice(t.volume).map(|lattice| (lattice, t)));
    match fallback {
        Some(found) => {
            debug!(
                from = touchable.volume,
                to = found.1.volume,
                "lattice resolved from position instead of placement"
            );
            Ok(found)
        }
        None => Err(CmpError::NoLattice {
            position: as_array(position),
        }),
    }
}

/// Move a global position inward until it is inside its crystal and at
/// least `surface_clearance` away from the boundary along the outward normal.
///
/// Interior points at least one clearance from every surface are returned
/// unchanged without asking for a normal. Otherwise each iteration steps one
/// clearance distance against the normal of the nearest surface, recomputing
/// the normal since the nearest surface may change. Gives up after
/// `max_clearance_iterations`.
pub fn apply_surface_clearance(
    config: &Config,
    lattices: &dyn LatticeRegistry,
    navigator: &dyn Navigator,
    touchable: &Touchable,
    position: &Point3<f64>,
) -> Result<Point3<f64>> {
    let clearance = config.surface_clearance;
    let (_, placement) = resolve_lattice(lattices, navigator, touchable, position)?;

    let normal_failure = |at: &Point3<f64>| CmpError::SurfaceNormal {
        position: as_array(at),
        pre: Some(placement.volume),
        post: None,
    };
    let solid = navigator
        .solid(placement.volume)
        .ok_or_else(|| normal_failure(position))?;

    let mut local = get_local_position(&placement, position);
    if solid.inside(&local) == Containment::Inside && solid.safety_distance(&local) >= clearance {
        return Ok(*position);
    }
    let mut normal = solid.surface_normal(&local).ok_or_else(|| normal_failure(position))?;

    let mut iterations = 0u32;
    while solid.inside(&local) != Containment::Inside
        || solid.distance_to_out(&local, &normal) < clearance
    {
        if iterations >= config.max_clearance_iterations {
            return Err(CmpError::ClearanceNotReached {
                position: as_array(position),
                iterations,
            });
        }
        local -= normal.into_inner() * clearance;
        normal = solid.surface_normal(&local).ok_or_else(|| normal_failure(position))?;
        iterations += 1;
    }

    Ok(get_global_position(&placement, &local))
}
