//! # Colorful Core
//!
//! Probabilistic colour categories in HSL space that learn from single
//! labelled observations shown in context.
//!
//! Each category is a Gaussian-like region with a circular hue centre and
//! linear saturation/lightness centres, each with a radius. Observed colours
//! are scored by acceptability (fit to one category), discriminatory power
//! (share of fit among all categories) and their blend. Learning either
//! folds an observation into running statistics, or solves a small
//! constrained problem that moves the involved categories just enough for
//! the right name to win by a margin.
//!
//! ## Quick Start
//!
//! ```rust
//! use colorful_core::{CategoryModel, Color, ColorSession, LearningConfig, Metric};
//!
//! let preset = "colorname,hc,hr,sc,sr,lc,lr\n\
//!               red,0,20,90,10,50,15\n\
//!               yellow,50,20,90,10,50,15\n";
//! let model = CategoryModel::from_csv_str(preset).unwrap();
//! let mut session = ColorSession::new(model, LearningConfig::default()).unwrap();
//!
//! let colors = [
//!     Color::new(10.0, 90.0, 50.0).unwrap(),
//!     Color::new(45.0, 90.0, 50.0).unwrap(),
//! ];
//! session.fit_colors(&colors).unwrap();
//! assert_eq!(session.best_descriptions(Metric::Acc).unwrap(), ["red", "yellow"]);
//! ```
//!
//! ## Core Modules
//!
//! - [`config`] - Learning configuration via TOML
//! - [`model`] - Categories and the category table
//! - [`scoring`] - Acceptability, discriminatory power and score
//! - [`goal`] - Contrastive goals from a scored context
//! - [`learning`] - Constrained and statistical learning rules
//! - [`solver`] - Constrained minimiser used by the constrained rule
//! - [`session`] - Experiment session owning the live model
//! - [`logging`] - JSON line-delimited learning journal

pub mod checkpoint;
pub mod color;
pub mod config;
pub mod error;
pub mod goal;
pub mod learning;
pub mod logging;
pub mod model;
pub mod sampling;
pub mod scoring;
pub mod session;
pub mod solver;

pub use checkpoint::{CheckpointError, Checkpointable};
pub use color::{canonical_hue, circular_mean, hue_distance, signed_hue_delta, Color};
pub use config::{AdaptationConfig, ConfigError, LearningConfig, ScoringConfig, SolverConfig};
pub use error::{ModelError, ModelResult};
pub use goal::{DistractorPolicy, Goal, GoalBuilder};
pub use learning::{
    AdaptationReport, ConstrainedAdapter, LearningOutcome, RejectReason, StatisticalAdapter,
};
pub use logging::{LearningJournal, LearningLogEntry, LearningMode};
pub use model::{border_change, Borders, Category, CategoryModel};
pub use sampling::{two_adjacent_colors, two_adjacent_colors_naive};
pub use scoring::{Metric, ScoredTable, ScoringEngine, SlotScore};
pub use session::ColorSession;
pub use solver::{
    AugmentedLagrangian, ConstrainedProblem, Minimizer, SolverReport, SolverStatus,
};
