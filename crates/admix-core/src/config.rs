//! Fit parameters shared by the model and the CLI.

use crate::error::{AdmixError, Result};

pub const DEFAULT_K: usize = 3;
pub const DEFAULT_MAX_ITER: usize = 100;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Settings for one EM fit.
#[derive(Clone, Debug, PartialEq)]
pub struct FitConfig {
    /// Number of ancestral populations.
    pub k: usize,
    /// Iteration budget; reaching it is a normal terminal outcome.
    pub max_iter: usize,
    /// Absolute log-likelihood change below which the fit is converged.
    pub tolerance: f64,
    /// Seed for the initial draw of Q and F. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            seed: None,
        }
    }
}

impl FitConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(AdmixError::config("K must be at least 1"));
        }
        if self.max_iter == 0 {
            return Err(AdmixError::config("max_iter must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(AdmixError::config(format!(
                "tolerance must be a finite non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = FitConfig::default();
        assert_eq!(cfg.k, 3);
        assert_eq!(cfg.max_iter, 100);
        assert_eq!(cfg.tolerance, 1e-4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_settings() {
        assert!(FitConfig::new(0).validate().is_err());
        assert!(FitConfig::new(2).with_max_iter(0).validate().is_err());
        assert!(FitConfig::new(2).with_tolerance(-1.0).validate().is_err());
        assert!(FitConfig::new(2).with_tolerance(f64::NAN).validate().is_err());
        assert!(FitConfig::new(2).with_tolerance(0.0).validate().is_ok());
    }
}
