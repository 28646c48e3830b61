pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod metrics;
pub mod policy;
pub mod post;
pub mod render;
pub mod rng;
pub mod tier;

use std::time::Instant;

pub use error::{FieldError, Result};
use grid::Grid;
use tier::OptimizationLevel;

pub struct Frame {
    pub size: usize,
    pub level: OptimizationLevel,
    pub field: Grid<f64>,
    pub frame: Grid<f64>,
    pub rgba: Vec<u8>,
}

pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// Uncached single-frame pipeline with per-stage timings.
pub fn generate_frame(
    size: usize,
    iterations: usize,
    seed: Option<u64>,
    time_factor: f64,
    distortion_factor: f64,
) -> (Frame, Vec<Timing>) {
    let mut timings = Vec::new();
    let total_start = Instant::now();
    let level = OptimizationLevel::for_size(size);

    let t = Instant::now();
    let field = field::generate(size, iterations, seed, level);
    timings.push(Timing {
        name: "field",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let t = Instant::now();
    let modulated = post::modulate(&field, time_factor);
    timings.push(Timing {
        name: "modulate",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let t = Instant::now();
    let frame = post::distort(&modulated, distortion_factor);
    timings.push(Timing {
        name: "distort",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let t = Instant::now();
    let rgba = render::render_field(&frame);
    timings.push(Timing {
        name: "render",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    timings.push(Timing {
        name: "TOTAL",
        ms: total_start.elapsed().as_secs_f64() * 1000.0,
    });

    let frame = Frame {
        size,
        level,
        field,
        frame,
        rgba,
    };

    (frame, timings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_pipeline_stages() {
        let (frame, timings) = generate_frame(16, 5, Some(3), 0.25, 0.0);
        assert_eq!(frame.level, OptimizationLevel::Standard);
        assert_eq!(frame.frame, frame.field);
        assert_eq!(frame.rgba.len(), 16 * 16 * 4);
        let names: Vec<_> = timings.iter().map(|t| t.name).collect();
        assert_eq!(names, ["field", "modulate", "distort", "render", "TOTAL"]);
    }
}
