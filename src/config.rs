use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{FieldError, Result};

/// Request limits applied before generation.
#[derive(Clone, Debug)]
pub struct Limits {
    pub max_size: usize,
    /// Above this size iterations are clamped harder and the request
    /// counts as a large generation.
    pub large_size: usize,
    pub max_iterations_large: usize,
    pub max_iterations: usize,
    /// Above this size response data is narrowed to f32.
    pub precision_threshold: usize,
    pub cache_capacity: usize,

    // Reference field used by /apply_modulation
    pub reference_size: usize,
    pub reference_iterations: usize,
    pub reference_seed: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_size: 150,
            large_size: 80,
            max_iterations_large: 40,
            max_iterations: 100,
            precision_threshold: 90,
            cache_capacity: 16,
            reference_size: 40,
            reference_iterations: 50,
            reference_seed: 42,
        }
    }
}

pub const ENV_BIND: &str = "FRACTAL_BIND";
pub const ENV_STATIC_DIR: &str = "FRACTAL_STATIC_DIR";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub static_dir: PathBuf,
    pub limits: Limits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            static_dir: PathBuf::from("static"),
            limits: Limits::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Defaults overridden by whatever `lookup` returns.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(bind) = lookup(ENV_BIND) {
            cfg.bind = bind
                .parse()
                .map_err(|e| FieldError::Config(format!("{ENV_BIND}={bind}: {e}")))?;
        }
        if let Some(dir) = lookup(ENV_STATIC_DIR) {
            cfg.static_dir = PathBuf::from(dir);
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        let cfg = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.bind.port(), 5000);
        assert_eq!(cfg.limits.max_size, 150);
    }

    #[test]
    fn env_overrides() {
        let cfg = ServerConfig::from_lookup(|k| match k {
            ENV_BIND => Some("127.0.0.1:8081".into()),
            ENV_STATIC_DIR => Some("web".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:8081".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.static_dir, PathBuf::from("web"));
    }

    #[test]
    fn bad_bind_is_config_error() {
        let err = ServerConfig::from_lookup(|k| (k == ENV_BIND).then(|| "nope".into()));
        assert!(matches!(err, Err(FieldError::Config(_))));
    }
}
