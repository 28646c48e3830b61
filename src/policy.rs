use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{CacheStats, FieldCache};
use crate::config::Limits;
use crate::error::Result;
use crate::field::upscale_bilinear;
use crate::grid::Grid;
use crate::metrics::{PerformanceMetrics, PerformanceSnapshot};
use crate::post::{distort, modulate};
use crate::render;
use crate::tier::{DOWNSAMPLE_ABOVE, OptimizationLevel};

/// Parameters after clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestPlan {
    pub size: usize,
    pub iterations: usize,
    pub level: OptimizationLevel,
    pub large: bool,
}

/// Field rows, narrowed to f32 for big grids.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldData {
    Full(Vec<Vec<f64>>),
    Half(Vec<Vec<f32>>),
}

impl FieldData {
    pub fn full(grid: &Grid<f64>) -> Self {
        FieldData::Full(grid.to_rows())
    }

    /// Narrowing can round values just under 1.0 up to 1.0; those are pulled
    /// back to the largest f32 below one.
    pub fn half(grid: &Grid<f64>) -> Self {
        const BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0;
        FieldData::Half(grid.map(|v| (v as f32).min(BELOW_ONE)).to_rows())
    }

    pub fn rows(&self) -> usize {
        match self {
            FieldData::Full(r) => r.len(),
            FieldData::Half(r) => r.len(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GenerateResponse {
    pub data: FieldData,
    pub size: usize,
    /// Seconds.
    pub generation_time: f64,
    pub optimization: OptimizationLevel,
}

#[derive(Clone, Debug, Serialize)]
pub struct ModulationResponse {
    pub data: FieldData,
}

#[derive(Clone, Debug, Serialize)]
pub struct RenderResponse {
    /// `data:image/png;base64,...`
    pub image: String,
    pub size: usize,
    pub generation_time: f64,
    pub optimization: OptimizationLevel,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub performance: PerformanceSnapshot,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_entries: usize,
}

/// Shared per-process state: limits, the field cache and request counters.
/// Clamps what clients ask for, picks the tier, and shapes results for the wire.
pub struct Engine {
    pub limits: Limits,
    pub cache: FieldCache,
    pub metrics: PerformanceMetrics,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl Engine {
    pub fn new(limits: Limits) -> Self {
        Self {
            cache: FieldCache::new(limits.cache_capacity),
            metrics: PerformanceMetrics::new(),
            limits,
        }
    }

    pub fn plan(&self, size: usize, iterations: usize) -> RequestPlan {
        let l = &self.limits;
        let clamped_size = size.min(l.max_size);
        if clamped_size < size {
            warn!(requested = size, limit = l.max_size, "size limited");
        }

        let large = clamped_size > l.large_size;
        let cap = if large { l.max_iterations_large } else { l.max_iterations };
        let clamped_iterations = iterations.min(cap);
        if clamped_iterations < iterations {
            info!(
                requested = iterations,
                limit = clamped_iterations,
                size = clamped_size,
                "iterations limited"
            );
        }

        RequestPlan {
            size: clamped_size,
            iterations: clamped_iterations,
            level: OptimizationLevel::for_size(clamped_size),
            large,
        }
    }

    fn cached(&self, plan: &RequestPlan, seed: u64) -> Arc<Grid<f64>> {
        self.cache
            .cached_generate(plan.size, plan.iterations, Some(seed), plan.level)
    }

    /// `/generate_fractal`: clamp, generate through the cache, narrow precision
    /// for big grids, record timing.
    pub fn generate(&self, size: usize, iterations: usize, seed: u64) -> GenerateResponse {
        let start = Instant::now();
        let plan = self.plan(size, iterations);
        self.metrics.begin_request(plan.large);

        let grid = self.cached(&plan, seed);
        let data = if plan.size > self.limits.precision_threshold {
            FieldData::half(&grid)
        } else {
            FieldData::full(&grid)
        };

        let elapsed = start.elapsed();
        let totals = self.metrics.record_latency(elapsed);
        info!(
            size = plan.size,
            optimization = %plan.level,
            secs = elapsed.as_secs_f64(),
            avg = totals.average_time(),
            "generated field"
        );

        GenerateResponse {
            data,
            size: plan.size,
            generation_time: elapsed.as_secs_f64(),
            optimization: plan.level,
        }
    }

    /// Fixed reference field, modulated at `time_factor`.
    pub fn modulated_reference(&self, time_factor: f64) -> ModulationResponse {
        let l = &self.limits;
        let grid = self.cache.cached_generate(
            l.reference_size,
            l.reference_iterations,
            Some(l.reference_seed),
            OptimizationLevel::Standard,
        );
        ModulationResponse {
            data: FieldData::full(&modulate(&grid, time_factor)),
        }
    }

    /// One animation frame: cached field, modulated, then distorted.
    /// Above the downsample size the field is generated at the nearest even
    /// size and resized back.
    pub fn process_frame(
        &self,
        size: usize,
        iterations: usize,
        seed: u64,
        time_factor: f64,
        distortion_factor: f64,
    ) -> Grid<f64> {
        let plan = self.plan(size, iterations);
        let grid = if plan.size > DOWNSAMPLE_ABOVE {
            let even = RequestPlan { size: plan.size / 2 * 2, ..plan };
            let g = self.cached(&even, seed);
            if even.size == plan.size {
                g
            } else {
                Arc::new(upscale_bilinear(&g, plan.size))
            }
        } else {
            self.cached(&plan, seed)
        };
        distort(&modulate(&grid, time_factor), distortion_factor)
    }

    pub fn render(&self, size: usize, iterations: usize, seed: u64) -> Result<RenderResponse> {
        let start = Instant::now();
        let plan = self.plan(size, iterations);
        let grid = self.cached(&plan, seed);
        let image = render::encode_png(&render::render_field(&grid), grid.w, grid.h)?;
        Ok(RenderResponse {
            image,
            size: plan.size,
            generation_time: start.elapsed().as_secs_f64(),
            optimization: plan.level,
        })
    }

    pub fn stats(&self) -> StatsResponse {
        let CacheStats { hits, misses, entries } = self.cache.stats();
        StatsResponse {
            performance: self.metrics.snapshot(),
            cache_hits: hits,
            cache_misses: misses,
            cache_entries: entries,
        }
    }
}
