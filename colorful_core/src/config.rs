//! Learning configuration management via TOML files.
//!
//! Every section is optional; a missing section or key falls back to the
//! defaults used in the colour naming experiments.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Complete configuration of a learning session.
///
/// # Examples
///
/// ```
/// use colorful_core::LearningConfig;
///
/// let config = LearningConfig::from_str("[learning]\nmargin = 0.05").unwrap();
/// assert_eq!(config.learning.margin, 0.05);
/// assert_eq!(config.scoring.alpha, 0.3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LearningConfig {
    pub scoring: ScoringConfig,
    pub learning: AdaptationConfig,
    pub solver: SolverConfig,
}

impl LearningConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawLearningConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;

        Ok(Self {
            scoring: ScoringConfig::try_from(&raw.scoring)?,
            learning: AdaptationConfig::try_from(&raw.learning)?,
            solver: SolverConfig::try_from(&raw.solver)?,
        })
    }
}

/// Parameters of the acceptability / score functions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringConfig {
    /// Weight of acceptability in the blended score
    pub alpha: f64,
    /// Floor of acceptability
    pub lower_bound: f64,
}

impl ScoringConfig {
    fn try_from(raw: &RawScoring) -> Result<Self, ConfigError> {
        if !raw.alpha.is_finite() || !(0.0..=1.0).contains(&raw.alpha) {
            return Err(ConfigError::Parse("scoring.alpha must be in [0, 1]".into()));
        }
        if !raw.lower_bound.is_finite() || raw.lower_bound <= 0.0 || raw.lower_bound >= 1.0 {
            return Err(ConfigError::Parse(
                "scoring.lower_bound must be in (0, 1)".into(),
            ));
        }
        Ok(Self {
            alpha: raw.alpha,
            lower_bound: raw.lower_bound,
        })
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            lower_bound: default_lower_bound(),
        }
    }
}

/// Parameters shared by the two learning rules and the goal builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptationConfig {
    /// Required metric gap between target and distractor
    pub margin: f64,
    /// Effective window size of the statistical update
    pub accumulated_number: usize,
    /// Push down every outranking category instead of only the strongest
    pub add_all_distracting_categories: bool,
    /// Session-wide default change budget; `None` is unbounded
    pub change_limit: Option<f64>,
    /// Increment applied when two colours are judged indistinguishable
    pub diversity_bump: f64,
}

impl AdaptationConfig {
    fn try_from(raw: &RawLearning) -> Result<Self, ConfigError> {
        if !raw.margin.is_finite() || raw.margin < 0.0 {
            return Err(ConfigError::Parse("learning.margin must be ≥ 0".into()));
        }
        if raw.accumulated_number < 2 {
            return Err(ConfigError::Parse(
                "learning.accumulated_number must be ≥ 2".into(),
            ));
        }
        if let Some(limit) = raw.change_limit {
            if limit.is_nan() || limit <= 0.0 {
                return Err(ConfigError::Parse(
                    "learning.change_limit must be positive".into(),
                ));
            }
        }
        if !raw.diversity_bump.is_finite() || raw.diversity_bump < 0.0 {
            return Err(ConfigError::Parse(
                "learning.diversity_bump must be ≥ 0".into(),
            ));
        }
        Ok(Self {
            margin: raw.margin,
            accumulated_number: raw.accumulated_number,
            add_all_distracting_categories: raw.add_all_distracting_categories,
            change_limit: raw.change_limit,
            diversity_bump: raw.diversity_bump,
        })
    }

    /// The configured change budget, `f64::INFINITY` when unbounded.
    pub fn change_limit_or_unbounded(&self) -> f64 {
        self.change_limit.unwrap_or(f64::INFINITY)
    }
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            accumulated_number: default_accumulated_number(),
            add_all_distracting_categories: false,
            change_limit: None,
            diversity_bump: default_diversity_bump(),
        }
    }
}

/// Parameters of the augmented-Lagrangian minimiser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverConfig {
    pub convergence_tolerance: f64,
    pub max_outer_iterations: usize,
    pub max_inner_iterations: usize,
    pub learning_rate: f64,
    pub initial_penalty: f64,
    pub penalty_growth: f64,
    pub max_penalty: f64,
    pub feasibility_tolerance: f64,
    pub finite_difference_step: f64,
}

impl SolverConfig {
    fn try_from(raw: &RawSolver) -> Result<Self, ConfigError> {
        let positive = [
            ("convergence_tolerance", raw.convergence_tolerance),
            ("learning_rate", raw.learning_rate),
            ("initial_penalty", raw.initial_penalty),
            ("max_penalty", raw.max_penalty),
            ("feasibility_tolerance", raw.feasibility_tolerance),
            ("finite_difference_step", raw.finite_difference_step),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Parse(format!("solver.{} must be positive", name)));
            }
        }
        if !raw.penalty_growth.is_finite() || raw.penalty_growth <= 1.0 {
            return Err(ConfigError::Parse(
                "solver.penalty_growth must be > 1".into(),
            ));
        }
        if raw.max_outer_iterations == 0 || raw.max_inner_iterations == 0 {
            return Err(ConfigError::Parse(
                "solver iteration caps must be ≥ 1".into(),
            ));
        }
        Ok(Self {
            convergence_tolerance: raw.convergence_tolerance,
            max_outer_iterations: raw.max_outer_iterations,
            max_inner_iterations: raw.max_inner_iterations,
            learning_rate: raw.learning_rate,
            initial_penalty: raw.initial_penalty,
            penalty_growth: raw.penalty_growth,
            max_penalty: raw.max_penalty.max(raw.initial_penalty),
            feasibility_tolerance: raw.feasibility_tolerance,
            finite_difference_step: raw.finite_difference_step,
        })
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            convergence_tolerance: default_convergence_tolerance(),
            max_outer_iterations: default_max_outer_iterations(),
            max_inner_iterations: default_max_inner_iterations(),
            learning_rate: default_learning_rate(),
            initial_penalty: default_initial_penalty(),
            penalty_growth: default_penalty_growth(),
            max_penalty: default_max_penalty(),
            feasibility_tolerance: default_feasibility_tolerance(),
            finite_difference_step: default_finite_difference_step(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawLearningConfig {
    #[serde(default)]
    scoring: RawScoring,
    #[serde(default)]
    learning: RawLearning,
    #[serde(default)]
    solver: RawSolver,
}

#[derive(Debug, Deserialize)]
struct RawScoring {
    #[serde(default = "default_alpha")]
    alpha: f64,
    #[serde(default = "default_lower_bound")]
    lower_bound: f64,
}

impl Default for RawScoring {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            lower_bound: default_lower_bound(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLearning {
    #[serde(default = "default_margin")]
    margin: f64,
    #[serde(default = "default_accumulated_number")]
    accumulated_number: usize,
    #[serde(default)]
    add_all_distracting_categories: bool,
    #[serde(default)]
    change_limit: Option<f64>,
    #[serde(default = "default_diversity_bump")]
    diversity_bump: f64,
}

impl Default for RawLearning {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            accumulated_number: default_accumulated_number(),
            add_all_distracting_categories: false,
            change_limit: None,
            diversity_bump: default_diversity_bump(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSolver {
    #[serde(default = "default_convergence_tolerance")]
    convergence_tolerance: f64,
    #[serde(default = "default_max_outer_iterations")]
    max_outer_iterations: usize,
    #[serde(default = "default_max_inner_iterations")]
    max_inner_iterations: usize,
    #[serde(default = "default_learning_rate")]
    learning_rate: f64,
    #[serde(default = "default_initial_penalty")]
    initial_penalty: f64,
    #[serde(default = "default_penalty_growth")]
    penalty_growth: f64,
    #[serde(default = "default_max_penalty")]
    max_penalty: f64,
    #[serde(default = "default_feasibility_tolerance")]
    feasibility_tolerance: f64,
    #[serde(default = "default_finite_difference_step")]
    finite_difference_step: f64,
}

impl Default for RawSolver {
    fn default() -> Self {
        Self {
            convergence_tolerance: default_convergence_tolerance(),
            max_outer_iterations: default_max_outer_iterations(),
            max_inner_iterations: default_max_inner_iterations(),
            learning_rate: default_learning_rate(),
            initial_penalty: default_initial_penalty(),
            penalty_growth: default_penalty_growth(),
            max_penalty: default_max_penalty(),
            feasibility_tolerance: default_feasibility_tolerance(),
            finite_difference_step: default_finite_difference_step(),
        }
    }
}

fn default_alpha() -> f64 {
    0.3
}

fn default_lower_bound() -> f64 {
    0.02
}

fn default_margin() -> f64 {
    0.02
}

fn default_accumulated_number() -> usize {
    15
}

fn default_diversity_bump() -> f64 {
    5.0
}

fn default_convergence_tolerance() -> f64 {
    0.01
}

fn default_max_outer_iterations() -> usize {
    30
}

fn default_max_inner_iterations() -> usize {
    400
}

fn default_learning_rate() -> f64 {
    0.5
}

fn default_initial_penalty() -> f64 {
    100.0
}

fn default_penalty_growth() -> f64 {
    10.0
}

fn default_max_penalty() -> f64 {
    1.0e7
}

fn default_feasibility_tolerance() -> f64 {
    1.0e-4
}

fn default_finite_difference_step() -> f64 {
    1.0e-4
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_when_sections_missing() {
        let config = LearningConfig::from_str("").unwrap();
        assert_eq!(config, LearningConfig::default());
        assert_eq!(config.learning.accumulated_number, 15);
        assert!(config.learning.change_limit.is_none());
        assert!(config.learning.change_limit_or_unbounded().is_infinite());
    }

    #[test]
    fn config_parses_custom_values() {
        let toml = r#"
[scoring]
alpha = 0.5
lower_bound = 0.01

[learning]
margin = 0.05
accumulated_number = 10
add_all_distracting_categories = true
change_limit = 750.0
diversity_bump = 2.5

[solver]
convergence_tolerance = 0.001
max_outer_iterations = 12
"#;
        let config = LearningConfig::from_str(toml).unwrap();
        assert!((config.scoring.alpha - 0.5).abs() < f64::EPSILON);
        assert!((config.scoring.lower_bound - 0.01).abs() < f64::EPSILON);
        assert!((config.learning.margin - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.learning.accumulated_number, 10);
        assert!(config.learning.add_all_distracting_categories);
        assert_eq!(config.learning.change_limit, Some(750.0));
        assert_eq!(config.learning.diversity_bump, 2.5);
        assert_eq!(config.solver.max_outer_iterations, 12);
        assert_eq!(config.solver.max_inner_iterations, 400);
    }

    #[test]
    fn config_rejects_invalid_alpha() {
        assert!(LearningConfig::from_str("[scoring]\nalpha = 1.5").is_err());
    }

    #[test]
    fn config_rejects_zero_lower_bound() {
        assert!(LearningConfig::from_str("[scoring]\nlower_bound = 0.0").is_err());
    }

    #[test]
    fn config_rejects_tiny_window() {
        assert!(LearningConfig::from_str("[learning]\naccumulated_number = 1").is_err());
    }

    #[test]
    fn config_rejects_non_growing_penalty() {
        assert!(LearningConfig::from_str("[solver]\npenalty_growth = 1.0").is_err());
    }
}
