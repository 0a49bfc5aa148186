//! Landmark code grid.
//!
//! A landmark is a `DIM x DIM` grid of dot positions. Three grid corners are
//! always lit and fix the orientation; every other cell carries one bit of
//! the identity.
//!
//! Cell `(i, j)` sits at unit-square coordinates `(i / (DIM-1), j / (DIM-1))`
//! and contributes `(1 << i) << (DIM * j)`. The reserved corners are
//! `(0, 0)` (the right-angle apex), `(DIM-1, 0)` and `(0, DIM-1)`.

use nalgebra::Point2;

/// Grid side length.
pub const DIM: usize = 4;

/// Bits occupied by the three reserved corner cells.
pub const RESERVED_MASK: u16 = cell_bit(0, 0) | cell_bit(DIM - 1, 0) | cell_bit(0, DIM - 1);

/// Bit value of cell `(i, j)`.
#[inline]
pub const fn cell_bit(i: usize, j: usize) -> u16 {
    (1u16 << i) << (DIM * j)
}

#[inline]
pub const fn is_reserved_cell(i: usize, j: usize) -> bool {
    (i == 0 && j == 0) || (i == DIM - 1 && j == 0) || (i == 0 && j == DIM - 1)
}

/// An identity is encodable iff it sets no reserved bit.
#[inline]
pub fn is_valid_identity(id: u16) -> bool {
    id & RESERVED_MASK == 0
}

/// Nominal unit-square center of cell `(i, j)`.
#[inline]
pub fn cell_center(i: usize, j: usize) -> Point2<f64> {
    let step = (DIM - 1) as f64;
    Point2::new(i as f64 / step, j as f64 / step)
}

/// Quantize a unit-square coordinate to the nearest cell index.
#[inline]
pub fn quantize(u: f64) -> usize {
    let n = (0.5 + (DIM - 1) as f64 * u).floor();
    n.clamp(0.0, (DIM - 1) as f64) as usize
}

/// Non-reserved cells in ascending bit order.
pub fn code_cells() -> impl Iterator<Item = (usize, usize)> {
    (0..DIM)
        .flat_map(|j| (0..DIM).map(move |i| (i, j)))
        .filter(|&(i, j)| !is_reserved_cell(i, j))
}

/// Cells set in `id`, in ascending bit order.
pub fn identity_cells(id: u16) -> Vec<(usize, usize)> {
    code_cells().filter(|&(i, j)| id & cell_bit(i, j) != 0).collect()
}

/// Reserved corner cells in observation corner order.
pub const CORNER_CELLS: [(usize, usize); 3] = [(DIM - 1, 0), (0, 0), (0, DIM - 1)];
