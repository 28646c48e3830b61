use std::f64::consts::PI;

use rayon::prelude::*;

use crate::grid::{Grid, wrap};

/// Brightness factor for a point in time: `0.5 + 0.5 * sin(2 * PI * t)`.
#[inline]
pub fn modulation_factor(time_factor: f64) -> f64 {
    0.5 + 0.5 * (time_factor * PI * 2.0).sin()
}

/// Scale every cell by [`modulation_factor`] into a fresh grid; the input may
/// be a shared cache entry.
pub fn modulate(grid: &Grid<f64>, time_factor: f64) -> Grid<f64> {
    let k = modulation_factor(time_factor);
    grid.map(|v| v * k)
}

/// Gather-warp: cell `(row i, col j)` reads from
/// `(trunc(i + f * sin(0.1 * PI * j)), trunc(j + f * cos(0.1 * PI * i)))`,
/// both wrapped into the grid. Always writes a fresh grid.
pub fn distort(grid: &Grid<f64>, distortion_factor: f64) -> Grid<f64> {
    let n = grid.size();
    let mut out = Grid::square(n);
    if n == 0 {
        return out;
    }

    out.data.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        let col_shift = distortion_factor * (i as f64 * PI * 0.1).cos();
        for (j, cell) in row.iter_mut().enumerate() {
            let src_row = (i as f64 + distortion_factor * (j as f64 * PI * 0.1).sin()) as isize;
            let src_col = (j as f64 + col_shift) as isize;
            *cell = grid.get(wrap(src_col, n), wrap(src_row, n));
        }
    });

    out
}
