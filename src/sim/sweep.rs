//! Tile collision probing for pixel sweeps

use crate::map::TileGrid;
use crate::settings::SimulationConfig;

/// Read-only view of the ground layer and its collision classes
#[derive(Clone, Copy)]
pub struct TileProbe<'a> {
    grid: &'a TileGrid,
    config: &'a SimulationConfig,
}

impl<'a> TileProbe<'a> {
    pub fn new(grid: &'a TileGrid, config: &'a SimulationConfig) -> Self {
        Self { grid, config }
    }

    pub fn grid(&self) -> &'a TileGrid {
        self.grid
    }

    pub fn config(&self) -> &'a SimulationConfig {
        self.config
    }

    #[inline]
    pub fn tile_size(&self) -> i32 {
        self.grid.tile_size as i32
    }

    /// Can a body occupy pixel `(x, y)`?
    ///
    /// Pixels outside the map are free. Ground codes always block. Platform
    /// codes block only a body that stands on platforms while it moves down
    /// (`dir_y > 0`) onto the top row of the platform tile.
    pub fn check_point(&self, x: i32, y: i32, dir_y: i32, stands_on_platforms: bool) -> bool {
        let Some(code) = self.grid.ground_code_at_pixel(x, y) else {
            return true;
        };
        if self.config.is_ground(code) {
            return false;
        }
        if stands_on_platforms && dir_y > 0 && self.config.is_platform(code) && y % self.tile_size() == 0 {
            return false;
        }
        true
    }
}

/// Cross-axis sample coordinates over `[start, end)`: one per tile starting
/// at `start`, plus the last pixel. Empty when `end <= start`.
pub fn cross_samples(start: i32, end: i32, step: i32) -> impl Iterator<Item = i32> {
    let step = step.max(1) as usize;
    let last = (end > start).then_some(end - 1);
    (start..end.max(start))
        .step_by(step)
        .filter(move |&s| Some(s) != last)
        .chain(last)
}
