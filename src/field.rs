use std::f64::consts::PI;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::grid::{Grid, wrap_xy};
use crate::rng::{Rng, entropy_seed};
use crate::tier::{DOWNSAMPLE_FACTOR, OptimizationLevel, TierProfile};

/// Largest f64 strictly below 1.0.
const BELOW_ONE: f64 = 1.0 - f64::EPSILON / 2.0;

/// `v mod 1` into [0, 1). `rem_euclid` rounds tiny negatives up to exactly 1.0.
#[inline]
pub fn wrap_unit(v: f64) -> f64 {
    let r = v.rem_euclid(1.0);
    if r >= 1.0 { 0.0 } else { r }
}

/// Generate an `size`x`size` field. `seed = None` draws a fresh seed, so the
/// result is not reproducible.
///
/// Each iteration replaces every cell with the toroidal mean of its
/// neighbourhood plus a sinusoidal term of the cell's previous value,
/// wrapped back into [0, 1). Tiers only change the parameters of that one
/// update (see [`TierProfile`]).
pub fn generate(
    size: usize,
    iterations: usize,
    seed: Option<u64>,
    level: OptimizationLevel,
) -> Grid<f64> {
    generate_with_profile(size, iterations, seed, &TierProfile::new(level, size))
}

pub fn generate_with_profile(
    size: usize,
    iterations: usize,
    seed: Option<u64>,
    profile: &TierProfile,
) -> Grid<f64> {
    let start = Instant::now();
    let effective = profile.effective_iterations(size, iterations);
    if effective < iterations {
        debug!(size, requested = iterations, effective, "adaptive iteration reduction");
    }

    let mut rng = Rng::new(seed.unwrap_or_else(entropy_seed));

    let field = if profile.downsample {
        let small = size / DOWNSAMPLE_FACTOR;
        let inner = TierProfile::half_resolution();
        let mut g = random_grid(small, &mut rng);
        for _ in 0..effective {
            g = step(&g, &inner);
        }
        upscale_bilinear(&g, size)
    } else {
        let mut g = random_grid(size, &mut rng);
        for _ in 0..effective {
            g = step(&g, profile);
        }
        g
    };

    debug!(
        size,
        iterations = effective,
        downsample = profile.downsample,
        ms = start.elapsed().as_secs_f64() * 1000.0,
        "field generated"
    );
    field
}

fn random_grid(size: usize, rng: &mut Rng) -> Grid<f64> {
    let mut g = Grid::square(size);
    rng.fill_unit(&mut g.data);
    g
}

/// Toroidal mean over `offsets` for every cell.
fn neighbourhood_mean(src: &Grid<f64>, offsets: &[(isize, isize)]) -> Grid<f64> {
    let n = src.w;
    let mut mean = Grid::square(n);
    let count = offsets.len() as f64;

    mean.data.par_chunks_mut(n).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut sum = 0.0;
            for &(dx, dy) in offsets {
                let (sx, sy) = wrap_xy(x as isize + dx, y as isize + dy, n, n);
                sum += src.get(sx, sy);
            }
            *out = sum / count;
        }
    });

    mean
}

/// 3x3 variance at every `skip`-th cell on both axes (the tile anchors),
/// one entry per tile: `ceil(n / skip)` squared.
///
/// With `skip > 1` only offsets `-1, -1 + skip, ...` are sampled, each
/// measured against the anchor's mean. Normalised by 9 regardless of how
/// many offsets were sampled. Partial tiles at the far edge still get
/// their own anchor.
fn strided_variance(src: &Grid<f64>, mean: &Grid<f64>, skip: usize) -> Grid<f64> {
    let n = src.w;
    let m = n.div_ceil(skip);
    let mut var = Grid::square(m);

    var.data.par_chunks_mut(m).enumerate().for_each(|(ty, row)| {
        let ay = ty * skip;
        for (tx, out) in row.iter_mut().enumerate() {
            let ax = tx * skip;
            let centre = mean.get(ax, ay);
            let mut acc = 0.0;
            for dy in (-1isize..=1).step_by(skip) {
                for dx in (-1isize..=1).step_by(skip) {
                    let (sx, sy) = wrap_xy(ax as isize + dx, ay as isize + dy, n, n);
                    let d = src.get(sx, sy) - centre;
                    acc += d * d;
                }
            }
            *out = acc / 9.0;
        }
    });

    var
}

/// One chaotic update into a fresh buffer. Reads only `src`, so the row
/// order rayon picks does not affect the result.
fn step(src: &Grid<f64>, profile: &TierProfile) -> Grid<f64> {
    let n = src.w;
    if n == 0 {
        return src.clone();
    }
    let mean = neighbourhood_mean(src, profile.neighbourhood.offsets());
    let skip = profile.skip.max(1);
    let variance = profile.variance.then(|| strided_variance(src, &mean, skip));
    let term = profile.fallback;

    let mut dst = Grid::square(n);
    dst.data.par_chunks_mut(n).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let old = src.get(x, y);
            let avg = mean.get(x, y);
            let v = match &variance {
                Some(var) => avg + var.get(x / skip, y / skip) * (old * PI * 4.0).sin(),
                None => avg + term.amplitude * (old * PI * term.frequency).sin(),
            };
            *out = wrap_unit(v);
        }
    });

    dst
}

/// Bilinear resize of a square grid to `size`x`size`, corners aligned.
/// Output is a convex blend of inputs, so it stays in [0, 1).
pub fn upscale_bilinear(src: &Grid<f64>, size: usize) -> Grid<f64> {
    let n = src.w;
    let mut dst = Grid::square(size);
    if n == 0 || size == 0 {
        return dst;
    }
    let scale = if size > 1 {
        (n - 1) as f64 / (size - 1) as f64
    } else {
        0.0
    };

    dst.data.par_chunks_mut(size).enumerate().for_each(|(dy, row)| {
        let sy_f = dy as f64 * scale;
        let sy0 = (sy_f.floor() as usize).min(n - 1);
        let sy1 = (sy0 + 1).min(n - 1);
        let fy = sy_f - sy0 as f64;

        for (dx, out) in row.iter_mut().enumerate() {
            let sx_f = dx as f64 * scale;
            let sx0 = (sx_f.floor() as usize).min(n - 1);
            let sx1 = (sx0 + 1).min(n - 1);
            let fx = sx_f - sx0 as f64;

            let v00 = src.get(sx0, sy0);
            let v10 = src.get(sx1, sy0);
            let v01 = src.get(sx0, sy1);
            let v11 = src.get(sx1, sy1);

            let top = v00 + (v10 - v00) * fx;
            let bot = v01 + (v11 - v01) * fx;
            *out = (top + (bot - top) * fy).clamp(0.0, BELOW_ONE);
        }
    });

    dst
}
