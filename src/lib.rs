//! # mlpeval - dense MLP surrogate evaluation with exact derivatives
//!
//! Evaluates small feed-forward networks that stand in for expensive physics
//! inside numerical solvers, together with the exact first and second
//! derivatives of every output w.r.t. every input.
//!
//! ## Architecture
//! - Layer arena owned by the [`Network`], weights stored `[destination][source]`
//! - Closed [`Activation`] enum with analytic φ′ and φ″
//! - Per-side [`Scaling`] strategies mapping raw values to the network domain
//! - Derivatives selected per call through [`EvalOptions`]
//!
//! ## Usage
//! ```rust
//! use mlpeval::{EvalOptions, Network, Scaling};
//!
//! let mut net = Network::new();
//! net.define_input_layer(2).unwrap();
//! net.define_output_layer(1).unwrap();
//! net.push_hidden_layer(4).unwrap();
//! net.size_weights().unwrap();
//!
//! net.set_activation_function(1, "gelu").unwrap();
//! net.set_activation_function(2, "linear").unwrap();
//! for dest in 0..4 {
//!     net.set_weight(0, 0, dest, 0.3).unwrap();
//!     net.set_weight(0, 1, dest, -0.2).unwrap();
//!     net.set_weight(1, dest, 0, 0.5).unwrap();
//! }
//! net.set_input_name(0, "u").unwrap();
//! net.set_input_name(1, "v").unwrap();
//! net.set_output_name(0, "y").unwrap();
//! net.set_input_scaling(Scaling::Standard);
//!
//! let mapping = net.variable_mapping(&["v", "u"], &["y"]);
//! assert!(mapping.is_match);
//!
//! net.evaluate(&[0.1, 0.4], EvalOptions::hessian()).unwrap();
//! let dy_du = net.d_output_d_input(0, 0);
//! let d2y_dudv = net.d2_output_d_input2(0, 0, 1);
//! assert!(dy_du.is_finite() && d2y_dudv.is_finite());
//! ```

pub mod activation;
pub mod config;
pub mod error;
pub mod kernels;
pub mod layer;
pub mod matcher;
pub mod network;
pub mod normalization;

// Re-exports
pub use activation::{Activated, Activation, DerivativeOrder};
pub use config::{ConfigError, EvalOptions, NetworkConfig, DEFAULT_PARALLEL_THRESHOLD};
pub use error::{ExtrapolationWarning, MlpError, MlpResult};
pub use layer::{Layer, Weights};
pub use matcher::{match_variables, MatchResult};
pub use network::{Evaluation, Network};
pub use normalization::{BoundedRange, NormPair, NormalizationStrategy, Scaling, Statistical};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
