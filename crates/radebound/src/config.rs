use crate::combinatorics::PrecisionGuard;
use crate::constants::{
    DEFAULT_INITIAL_GUESS, DEFAULT_INITIAL_STEP, DEFAULT_LOWER_BOUND, DEFAULT_MAX_ITERS,
    DEFAULT_OBJECTIVE_TOLERANCE, DEFAULT_PARAM_TOLERANCE, DEFAULT_PRECISION_GUARD,
    DEFAULT_REPLICATION_FACTOR,
};
use crate::error::{RadeBoundError, Result};
use crate::optimize::{Bounds, NelderMeadMinimizer, Tolerances};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Estimator settings, loadable from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub replication_factor: u32,
    pub precision_guard: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            precision_guard: DEFAULT_PRECISION_GUARD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    pub initial_guess: f64,
    pub initial_step: f64,
    pub lower_bound: f64,
    pub param_tolerance: f64,
    pub objective_tolerance: f64,
    pub max_iters: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: DEFAULT_INITIAL_GUESS,
            initial_step: DEFAULT_INITIAL_STEP,
            lower_bound: DEFAULT_LOWER_BOUND,
            param_tolerance: DEFAULT_PARAM_TOLERANCE,
            objective_tolerance: DEFAULT_OBJECTIVE_TOLERANCE,
            max_iters: DEFAULT_MAX_ITERS,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RadeBoundError::ConfigError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            RadeBoundError::ConfigError(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Applies command-line overrides on top of the file settings.
    pub fn with_overrides(mut self, replication_factor: Option<u32>) -> Result<Self> {
        if let Some(r) = replication_factor {
            self.estimator.replication_factor = r;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.estimator.replication_factor == 0 {
            return Err(RadeBoundError::InvalidReplicationFactor(0));
        }
        if self.estimator.precision_guard == 0 {
            return Err(RadeBoundError::ConfigError(
                "estimator.precision_guard must be positive".to_string(),
            ));
        }

        let solver = &self.solver;
        if !solver.lower_bound.is_finite() || solver.lower_bound <= 0.0 {
            return Err(RadeBoundError::ConfigError(format!(
                "solver.lower_bound must be a positive number, got {}",
                solver.lower_bound
            )));
        }
        if !solver.initial_guess.is_finite() || solver.initial_guess < solver.lower_bound {
            return Err(RadeBoundError::ConfigError(format!(
                "solver.initial_guess must be at least lower_bound ({}), got {}",
                solver.lower_bound, solver.initial_guess
            )));
        }
        for (name, value) in [
            ("initial_step", solver.initial_step),
            ("param_tolerance", solver.param_tolerance),
            ("objective_tolerance", solver.objective_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(RadeBoundError::ConfigError(format!(
                    "solver.{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if solver.max_iters == 0 {
            return Err(RadeBoundError::ConfigError(
                "solver.max_iters must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn precision_guard(&self) -> PrecisionGuard {
        PrecisionGuard::new(self.estimator.precision_guard)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            lower: self.solver.lower_bound,
            upper: f64::INFINITY,
        }
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            param_abs: self.solver.param_tolerance,
            objective_abs: self.solver.objective_tolerance,
            max_iters: self.solver.max_iters,
        }
    }

    pub fn minimizer(&self) -> NelderMeadMinimizer {
        NelderMeadMinimizer::new(self.solver.initial_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.estimator.replication_factor, 1);
        assert_eq!(config.precision_guard().limit(), 500_000);
        assert_eq!(config.solver.initial_guess, 1000.0);
        assert_eq!(config.tolerances().param_abs, 1e-10);
        assert_eq!(config.tolerances().objective_abs, 1e-10);
        assert_eq!(config.bounds().lower, 1.0);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let file = write_config("[estimator]\nreplication_factor = 3\n");
        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.estimator.replication_factor, 3);
        assert_eq!(config.estimator.precision_guard, 500_000);
        assert_eq!(config.solver, SolverConfig::default());
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
[estimator]
replication_factor = 2
precision_guard = 1000

[solver]
initial_guess = 50.0
initial_step = 5.0
lower_bound = 1.0
param_tolerance = 1e-8
objective_tolerance = 1e-9
max_iters = 500
"#,
        );
        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.precision_guard().limit(), 1000);
        assert_eq!(config.solver.initial_guess, 50.0);
        assert_eq!(config.tolerances().max_iters, 500);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_config("[estimator]\nreplication_factor = 0\n");
        assert!(matches!(
            Config::load_from_file(file.path()),
            Err(RadeBoundError::InvalidReplicationFactor(0))
        ));

        let file = write_config("[solver]\nobjective_tolerance = -1.0\n");
        assert!(matches!(
            Config::load_from_file(file.path()),
            Err(RadeBoundError::ConfigError(_))
        ));

        let file = write_config("[solver]\ninitial_guess = 0.5\n");
        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let file = write_config("[estimator\nreplication_factor = ");
        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::load_or_default(None).unwrap();
        assert_eq!(config, Config::default());

        let config = config.with_overrides(Some(5)).unwrap();
        assert_eq!(config.estimator.replication_factor, 5);

        let config = config.with_overrides(None).unwrap();
        assert_eq!(config.estimator.replication_factor, 5);

        assert!(Config::default().with_overrides(Some(0)).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load_from_file("nonexistent_config.toml");
        assert!(matches!(result, Err(RadeBoundError::ConfigError(_))));
    }
}
