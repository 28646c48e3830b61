use std::fmt;

use serde::Serialize;

use crate::grid::{MOORE9, VON_NEUMANN5};

/// Sizes above this use [`OptimizationLevel::High`].
pub const HIGH_ABOVE: usize = 100;
/// Sizes above this (and up to `HIGH_ABOVE`) use [`OptimizationLevel::Medium`].
pub const MEDIUM_ABOVE: usize = 80;
/// High tier switches to the half-resolution path above this size.
pub const DOWNSAMPLE_ABOVE: usize = 120;
pub const DOWNSAMPLE_FACTOR: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    Standard,
    Medium,
    High,
}

impl OptimizationLevel {
    pub fn for_size(size: usize) -> Self {
        if size > HIGH_ABOVE {
            OptimizationLevel::High
        } else if size > MEDIUM_ABOVE {
            OptimizationLevel::Medium
        } else {
            OptimizationLevel::Standard
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationLevel::Standard => "standard",
            OptimizationLevel::Medium => "medium",
            OptimizationLevel::High => "high",
        }
    }
}

impl fmt::Display for OptimizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Neighbourhood {
    /// Centre + 4 orthogonal neighbours.
    VonNeumann5,
    /// Centre + 8 surrounding neighbours.
    Moore9,
}

impl Neighbourhood {
    pub fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Neighbourhood::VonNeumann5 => &VON_NEUMANN5,
            Neighbourhood::Moore9 => &MOORE9,
        }
    }
}

/// `amplitude * sin(old * PI * frequency)`, the chaotic term used when
/// variance is disabled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SineTerm {
    pub amplitude: f64,
    pub frequency: f64,
}

/// Update term for tiers without variance.
pub const CHEAP_TERM: SineTerm = SineTerm { amplitude: 0.3, frequency: 3.0 };
/// Update term for the half-resolution grid.
pub const DOWNSAMPLE_TERM: SineTerm = SineTerm { amplitude: 0.2, frequency: 2.0 };

/// Everything that distinguishes one tier from another. Every tier is one
/// parameterization of the same chaotic update in [`crate::field`].
#[derive(Clone, Debug, PartialEq)]
pub struct TierProfile {
    pub neighbourhood: Neighbourhood,
    /// Use local variance as the chaotic amplitude; otherwise `fallback`.
    pub variance: bool,
    pub fallback: SineTerm,
    /// Variance is sampled on a `skip`-strided lattice and tiled. 1 = every cell.
    pub skip: usize,
    /// Iterate at `1/DOWNSAMPLE_FACTOR` resolution, then upscale.
    pub downsample: bool,
    pub min_iterations: usize,
    pub ceiling_base: usize,
    pub ceiling_divisor: usize,
}

impl TierProfile {
    pub fn new(level: OptimizationLevel, size: usize) -> Self {
        match level {
            OptimizationLevel::High => Self {
                neighbourhood: Neighbourhood::VonNeumann5,
                variance: false,
                fallback: CHEAP_TERM,
                skip: (size / 100).max(1),
                downsample: size > DOWNSAMPLE_ABOVE,
                min_iterations: 3,
                ceiling_base: 50,
                ceiling_divisor: 20,
            },
            OptimizationLevel::Medium => Self {
                neighbourhood: Neighbourhood::Moore9,
                variance: true,
                fallback: CHEAP_TERM,
                skip: 1,
                downsample: false,
                min_iterations: 4,
                ceiling_base: 70,
                ceiling_divisor: 15,
            },
            OptimizationLevel::Standard => Self {
                neighbourhood: Neighbourhood::Moore9,
                variance: true,
                fallback: CHEAP_TERM,
                skip: 1,
                downsample: false,
                min_iterations: 5,
                ceiling_base: 100,
                ceiling_divisor: 10,
            },
        }
    }

    /// Profile run on the half-resolution grid of the downsample path.
    pub fn half_resolution() -> Self {
        Self {
            neighbourhood: Neighbourhood::VonNeumann5,
            variance: false,
            fallback: DOWNSAMPLE_TERM,
            skip: 1,
            downsample: false,
            min_iterations: 0,
            ceiling_base: usize::MAX,
            ceiling_divisor: 1,
        }
    }

    /// Latency cap: `max(floor, min(requested, base - size / divisor))`.
    /// The ceiling saturates at zero for huge sizes, so the floor always wins there.
    pub fn effective_iterations(&self, size: usize, requested: usize) -> usize {
        let ceiling = self
            .ceiling_base
            .saturating_sub(size / self.ceiling_divisor.max(1));
        self.min_iterations.max(requested.min(ceiling))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_follows_size() {
        assert_eq!(OptimizationLevel::for_size(1), OptimizationLevel::Standard);
        assert_eq!(OptimizationLevel::for_size(80), OptimizationLevel::Standard);
        assert_eq!(OptimizationLevel::for_size(81), OptimizationLevel::Medium);
        assert_eq!(OptimizationLevel::for_size(100), OptimizationLevel::Medium);
        assert_eq!(OptimizationLevel::for_size(101), OptimizationLevel::High);
        assert_eq!(OptimizationLevel::for_size(150), OptimizationLevel::High);
    }

    #[test]
    fn effective_iterations_capped_by_tier() {
        let high = TierProfile::new(OptimizationLevel::High, 150);
        // ceiling = 50 - 150/20 = 43
        assert_eq!(high.effective_iterations(150, 200), 43);
        assert!(high.effective_iterations(150, 200) <= 50 - 150 / 20);

        let medium = TierProfile::new(OptimizationLevel::Medium, 90);
        assert_eq!(medium.effective_iterations(90, 100), 70 - 90 / 15);
        assert_eq!(medium.effective_iterations(90, 10), 10);

        let standard = TierProfile::new(OptimizationLevel::Standard, 10);
        assert_eq!(standard.effective_iterations(10, 5), 5);
        assert_eq!(standard.effective_iterations(10, 0), 5);
        assert_eq!(standard.effective_iterations(10, 500), 99);
    }

    #[test]
    fn huge_sizes_fall_back_to_floor() {
        let high = TierProfile::new(OptimizationLevel::High, 5000);
        assert_eq!(high.effective_iterations(5000, 100), 3);
    }

    #[test]
    fn high_profile_shape() {
        let p = TierProfile::new(OptimizationLevel::High, 110);
        assert_eq!(p.neighbourhood, Neighbourhood::VonNeumann5);
        assert!(!p.variance);
        assert!(!p.downsample);
        assert_eq!(p.skip, 1);
        assert!(TierProfile::new(OptimizationLevel::High, 121).downsample);
        assert_eq!(TierProfile::new(OptimizationLevel::High, 250).skip, 2);
    }

    #[test]
    fn names_serialize_lowercase() {
        assert_eq!(OptimizationLevel::Medium.to_string(), "medium");
        assert_eq!(
            serde_json::to_string(&OptimizationLevel::High).unwrap(),
            "\"high\""
        );
    }
}
