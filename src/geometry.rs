use crate::cell::Cell;
use crate::error::{CmpError, Result};
use crate::navigation::{Navigator, Solid};
use crate::transform::{Touchable, VolumeId};
use nalgebra::{Point3, Unit, Vector3};
use std::collections::HashSet;

/// Distance within which a point counts as lying on a boundary [m]
const BOUNDARY_TOLERANCE: f64 = 1e-7;

/// Geometry is a collection of placed cells acting as the navigation service
#[derive(Debug, Clone)]
pub struct Geometry {
    pub cells: Vec<Cell>,
}

impl Geometry {
    /// Create a new geometry, rejecting duplicate cell IDs
    pub fn new(cells: Vec<Cell>) -> Result<Self> {
        let mut used_cell_ids = HashSet::new();
        for cell in &cells {
            if !used_cell_ids.insert(cell.cell_id) {
                return Err(CmpError::DuplicateVolume(cell.cell_id));
            }
        }
        Ok(Geometry { cells })
    }

    /// Find the first cell containing the given global point, or None if not found
    pub fn find_cell(&self, point: &Point3<f64>) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.contains_global(point))
    }

    pub fn cell(&self, volume: VolumeId) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.cell_id == volume)
    }
}

impl Navigator for Geometry {
    fn locate(&self, global: &Point3<f64>) -> Option<Touchable> {
        self.find_cell(global).map(Cell::touchable)
    }

    fn touchable(&self, volume: VolumeId) -> Option<Touchable> {
        self.cell(volume).map(Cell::touchable)
    }

    fn solid(&self, volume: VolumeId) -> Option<&dyn Solid> {
        self.cell(volume).map(|cell| cell as &dyn Solid)
    }

    fn exit_normal(&self, global: &Point3<f64>) -> Option<Unit<Vector3<f64>>> {
        // Boundary belongs to whichever cell has a surface passing through the point
        self.cells.iter().find_map(|cell| {
            let local = cell.placement.to_local_position(global);
            let (_, _, dist) = cell.region.nearest_surface(&local)?;
            if dist > BOUNDARY_TOLERANCE {
                return None;
            }
            let normal = cell.surface_normal(&local)?;
            Unit::try_new(cell.placement.to_global_direction(&normal), 1e-12)
        })
    }
}
