// Grid-bucketed collision buffer for map markers and labels.
//
// Each annotation kind owns its own grid and occupancy set. A cell, once
// reserved, stays reserved until the buffer is cleared for the next pass.

use crate::config::PlacementConfig;
use crate::error::{PlacementError, Result};
use std::collections::HashSet;

/// Quantized grid coordinate. Orders x-major then y, the same order as
/// [`packed`](Self::packed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub x: i32,
    pub y: i32,
}

impl CellKey {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The key packed into 64 bits, high half x, low half y. Each half has
    /// its sign bit flipped so unsigned order matches signed order.
    pub fn packed(&self) -> u64 {
        ((bias(self.x) as u64) << 32) | bias(self.y) as u64
    }
}

fn bias(value: i32) -> u32 {
    (value as u32) ^ 0x8000_0000
}

/// Fixed cell size used to quantize pixel coordinates. Negative
/// coordinates floor toward negative infinity so every cell has the same
/// size on both sides of the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGrid {
    cell_width: i32,
    cell_height: i32,
}

impl CellGrid {
    pub fn new(cell_width: i32, cell_height: i32) -> Result<Self> {
        if cell_width <= 0 || cell_height <= 0 {
            return Err(PlacementError::InvalidConfig(format!(
                "cell size must be positive, got {cell_width}x{cell_height}"
            )));
        }
        Ok(Self {
            cell_width,
            cell_height,
        })
    }

    pub fn cell_width(&self) -> i32 {
        self.cell_width
    }

    pub fn cell_height(&self) -> i32 {
        self.cell_height
    }

    pub fn quantize(&self, x: i32, y: i32) -> CellKey {
        CellKey::new(x.div_euclid(self.cell_width), y.div_euclid(self.cell_height))
    }
}

#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    grid: CellGrid,
    cells: HashSet<CellKey>,
}

impl OccupancyGrid {
    pub fn new(grid: CellGrid) -> Self {
        Self {
            grid,
            cells: HashSet::new(),
        }
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.cells.contains(key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Keys in a stable order, for reports and tests.
    pub fn sorted_keys(&self) -> Vec<CellKey> {
        let mut keys: Vec<CellKey> = self.cells.iter().copied().collect();
        keys.sort();
        keys
    }

    fn try_insert(&mut self, key: CellKey) -> bool {
        self.cells.insert(key)
    }
}

/// Two independent occupancy grids: a fine one for point markers and a
/// coarser, text-sized one for labels.
#[derive(Debug, Clone)]
pub struct PlacementBuffer {
    points: OccupancyGrid,
    labels: OccupancyGrid,
}

impl Default for PlacementBuffer {
    fn default() -> Self {
        // Default cell sizes are positive constants.
        let config = PlacementConfig::default();
        Self {
            points: OccupancyGrid::new(CellGrid {
                cell_width: config.point_cell_size,
                cell_height: config.point_cell_size,
            }),
            labels: OccupancyGrid::new(CellGrid {
                cell_width: config.label_cell_width,
                cell_height: config.label_cell_height,
            }),
        }
    }
}

impl PlacementBuffer {
    pub fn new(config: &PlacementConfig) -> Result<Self> {
        Ok(Self {
            points: OccupancyGrid::new(CellGrid::new(
                config.point_cell_size,
                config.point_cell_size,
            )?),
            labels: OccupancyGrid::new(CellGrid::new(
                config.label_cell_width,
                config.label_cell_height,
            )?),
        })
    }

    pub fn point_key(&self, x: i32, y: i32) -> CellKey {
        self.points.grid.quantize(x, y)
    }

    pub fn label_key(&self, x: i32, y: i32) -> CellKey {
        self.labels.grid.quantize(x, y)
    }

    /// Reserves the point cell containing `(x, y)`. Returns `false` without
    /// touching the buffer when the cell is already taken.
    pub fn try_reserve_point(&mut self, x: i32, y: i32) -> bool {
        let key = self.point_key(x, y);
        let reserved = self.points.try_insert(key);
        if !reserved {
            log::trace!("point cell ({}, {}) already occupied", key.x, key.y);
        }
        reserved
    }

    /// Reserves `cell_count` horizontally adjacent label cells starting at
    /// the cell containing `(x, y)`. Either the whole span becomes occupied
    /// or nothing changes.
    pub fn try_reserve_label(&mut self, x: i32, y: i32, cell_count: i32) -> Result<bool> {
        if cell_count < 0 {
            return Err(PlacementError::NegativeCellCount(cell_count));
        }
        let start = self.label_key(x, y);
        if cell_count == 0 {
            return Ok(true);
        }
        if start.x.checked_add(cell_count - 1).is_none() {
            return Err(PlacementError::CellOverflow {
                start: start.x,
                count: cell_count,
            });
        }

        let span = (0..cell_count).map(|offset| CellKey::new(start.x + offset, start.y));
        if let Some(taken) = span.clone().find(|key| self.labels.contains(key)) {
            log::trace!(
                "label span of {cell_count} at ({}, {}) blocked by cell ({}, {})",
                start.x,
                start.y,
                taken.x,
                taken.y
            );
            return Ok(false);
        }
        for key in span {
            self.labels.try_insert(key);
        }
        Ok(true)
    }

    /// Reserves exactly one label cell, e.g. for a point caption.
    pub fn try_reserve_label_cell(&mut self, x: i32, y: i32) -> bool {
        let key = self.label_key(x, y);
        self.labels.try_insert(key)
    }

    pub fn is_point_reserved(&self, x: i32, y: i32) -> bool {
        self.points.contains(&self.point_key(x, y))
    }

    pub fn is_label_cell_reserved(&self, x: i32, y: i32) -> bool {
        self.labels.contains(&self.label_key(x, y))
    }

    pub fn reserved_points(&self) -> &OccupancyGrid {
        &self.points
    }

    pub fn reserved_label_cells(&self) -> &OccupancyGrid {
        &self.labels
    }

    /// Forgets every reservation so the buffer can serve a new pass.
    pub fn clear(&mut self) {
        self.points.clear();
        self.labels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_point_in_same_cell_is_rejected() {
        let mut buffer = PlacementBuffer::default();
        assert!(buffer.try_reserve_point(30, 30));
        assert!(!buffer.try_reserve_point(30, 30));
        assert_eq!(buffer.reserved_points().len(), 1);
    }

    #[test]
    fn point_cells_are_nine_pixels() {
        let mut buffer = PlacementBuffer::default();
        assert!(buffer.try_reserve_point(0, 0));
        assert!(!buffer.try_reserve_point(8, 8));
        assert!(buffer.try_reserve_point(9, 0));
        assert!(buffer.try_reserve_point(0, 9));
        assert_eq!(buffer.point_key(30, 30), CellKey::new(3, 3));
        assert_eq!(buffer.point_key(31, 31), CellKey::new(3, 3));
    }

    #[test]
    fn negative_coordinates_floor() {
        let buffer = PlacementBuffer::default();
        assert_eq!(buffer.point_key(-1, -1), CellKey::new(-1, -1));
        assert_eq!(buffer.point_key(-9, 0), CellKey::new(-1, 0));
        assert_eq!(buffer.point_key(-10, 0), CellKey::new(-2, 0));
        assert_eq!(buffer.label_key(-1, -21), CellKey::new(-1, -2));

        let mut buffer = buffer;
        assert!(buffer.try_reserve_point(0, 0));
        assert!(buffer.try_reserve_point(-1, 0));
    }

    #[test]
    fn label_span_is_atomic() {
        let mut buffer = PlacementBuffer::default();
        // Occupy label column 3 on row 0.
        assert!(buffer.try_reserve_label_cell(48, 5));
        assert_eq!(buffer.try_reserve_label(0, 0, 5), Ok(false));
        assert_eq!(buffer.reserved_label_cells().len(), 1);
        for column in [0, 1, 2, 4] {
            assert!(!buffer.is_label_cell_reserved(column * 16, 0));
        }
    }

    #[test]
    fn label_span_occupies_every_cell() {
        let mut buffer = PlacementBuffer::default();
        assert_eq!(buffer.try_reserve_label(20, 45, 3), Ok(true));
        assert_eq!(
            buffer.reserved_label_cells().sorted_keys(),
            vec![CellKey::new(1, 2), CellKey::new(2, 2), CellKey::new(3, 2)]
        );
        assert!(!buffer.try_reserve_label_cell(63, 59));
        assert!(buffer.try_reserve_label_cell(64, 59));
    }

    #[test]
    fn zero_cell_label_is_free() {
        let mut buffer = PlacementBuffer::default();
        assert!(buffer.try_reserve_label_cell(0, 0));
        assert_eq!(buffer.try_reserve_label(0, 0, 0), Ok(true));
        assert_eq!(buffer.reserved_label_cells().len(), 1);
    }

    #[test]
    fn negative_cell_count_is_an_error() {
        let mut buffer = PlacementBuffer::default();
        assert_eq!(
            buffer.try_reserve_label(0, 0, -1),
            Err(PlacementError::NegativeCellCount(-1))
        );
        assert!(buffer.reserved_label_cells().is_empty());
    }

    #[test]
    fn span_overflow_is_an_error() {
        let mut buffer = PlacementBuffer::default();
        let result = buffer.try_reserve_label(i32::MAX, 0, i32::MAX);
        assert!(matches!(result, Err(PlacementError::CellOverflow { .. })));
        assert!(buffer.reserved_label_cells().is_empty());
    }

    #[test]
    fn point_and_label_grids_are_independent() {
        let mut buffer = PlacementBuffer::default();
        assert!(buffer.try_reserve_point(40, 40));
        assert!(buffer.try_reserve_label_cell(40, 40));
        assert!(!buffer.try_reserve_point(40, 40));
        assert!(!buffer.try_reserve_label_cell(40, 40));
    }

    #[test]
    fn clear_starts_a_fresh_pass() {
        let mut buffer = PlacementBuffer::default();
        assert!(buffer.try_reserve_point(1, 1));
        assert_eq!(buffer.try_reserve_label(1, 1, 4), Ok(true));
        buffer.clear();
        assert!(buffer.reserved_points().is_empty());
        assert!(buffer.reserved_label_cells().is_empty());
        assert!(buffer.try_reserve_point(1, 1));
    }

    #[test]
    fn packed_key_orders_like_struct() {
        let a = CellKey::new(1, 7);
        let b = CellKey::new(2, 0);
        assert!(a < b);
        assert!(a.packed() < b.packed());
        assert_eq!(CellKey::new(0, 0).packed(), 0x8000_0000_8000_0000);
    }

    #[test]
    fn packed_key_orders_negative_cells() {
        let keys = [
            CellKey::new(i32::MIN, 0),
            CellKey::new(-1, i32::MAX),
            CellKey::new(0, -1),
            CellKey::new(0, 0),
            CellKey::new(3, -5),
            CellKey::new(i32::MAX, i32::MIN),
        ];
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "{:?} < {:?}", pair[0], pair[1]);
            assert!(pair[0].packed() < pair[1].packed(), "{:?} < {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn custom_config_changes_point_cell() {
        let config = PlacementConfig {
            point_cell_size: 3,
            ..PlacementConfig::default()
        };
        let mut buffer = PlacementBuffer::new(&config).unwrap();
        assert!(buffer.try_reserve_point(30, 30));
        assert!(!buffer.try_reserve_point(31, 31));
        assert!(buffer.try_reserve_point(33, 33));
    }

    #[test]
    fn zero_cell_size_is_rejected() {
        assert!(CellGrid::new(0, 4).is_err());
        let config = PlacementConfig {
            label_cell_width: -2,
            ..PlacementConfig::default()
        };
        assert!(PlacementBuffer::new(&config).is_err());
    }
}
