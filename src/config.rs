//! Network description, evaluation options and construction errors.
//!
//! [`NetworkConfig`] is the declarative form of an architecture as handed over
//! by a loader; [`Network::from_config`](crate::Network::from_config) replays
//! it through the imperative construction API. [`EvalOptions`] selects what a
//! single evaluation call produces.
//!
//! # Example
//!
//! ```rust
//! use mlpeval::{NetworkConfig, Scaling};
//!
//! let config = NetworkConfig {
//!     input_names: vec!["u".into(), "v".into()],
//!     output_names: vec!["y".into()],
//!     hidden_dims: vec![3],
//!     activations: vec!["tanh".into(), "linear".into()],
//!     weights: vec![vec![vec![0.1, 0.2]; 3], vec![vec![1.0, 1.0, 1.0]]],
//!     biases: vec![vec![0.0; 3], vec![0.0]],
//!     input_norm: vec![(0.0, 1.0); 2],
//!     output_norm: vec![(0.0, 1.0)],
//!     input_scaling: Scaling::MinMax,
//!     output_scaling: Scaling::MinMax,
//! };
//! assert_eq!(config.layer_dims(), vec![2, 3, 1]);
//! assert!(config.validate().is_ok());
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::activation::{Activation, DerivativeOrder};
use crate::normalization::{NormPair, Scaling};

/// Default amount of per-layer work (multiply-adds) above which the
/// `parallel` feature splits a layer's neurons across threads.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1 << 16;

/// Declarative network architecture.
///
/// Layer `0` is the input layer; activations and biases are listed for every
/// following layer (hidden layers first, output layer last). Weights are
/// given per layer gap as `[destination][source]`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkConfig {
    /// Input variable names; their count fixes the input layer size.
    pub input_names: Vec<String>,

    /// Output variable names; their count fixes the output layer size.
    pub output_names: Vec<String>,

    /// Hidden layer sizes, at least one.
    pub hidden_dims: Vec<usize>,

    /// Activation name per non-input layer.
    pub activations: Vec<String>,

    /// Weights per gap, `[gap][destination][source]`.
    pub weights: Vec<Vec<Vec<f64>>>,

    /// Biases per non-input layer.
    pub biases: Vec<Vec<f64>>,

    /// Normalization pair per input.
    pub input_norm: Vec<NormPair>,

    /// Normalization pair per output.
    pub output_norm: Vec<NormPair>,

    /// Strategy applied to inputs.
    #[cfg_attr(feature = "serde", serde(default))]
    pub input_scaling: Scaling,

    /// Strategy applied to outputs.
    #[cfg_attr(feature = "serde", serde(default))]
    pub output_scaling: Scaling,
}

impl NetworkConfig {
    /// Number of network inputs.
    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_names.len()
    }

    /// Number of network outputs.
    #[inline]
    pub fn output_dim(&self) -> usize {
        self.output_names.len()
    }

    /// Total number of layers, input and output included.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.hidden_dims.len() + 2
    }

    /// All layer sizes: `[input, hidden..., output]`.
    pub fn layer_dims(&self) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.num_layers());
        dims.push(self.input_dim());
        dims.extend_from_slice(&self.hidden_dims);
        dims.push(self.output_dim());
        dims
    }

    /// Checks that every table matches the declared layer sizes and that all
    /// activation names are known.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_dim() == 0 {
            return Err(ConfigError::InvalidDimension("input layer must have neurons"));
        }
        if self.output_dim() == 0 {
            return Err(ConfigError::InvalidDimension("output layer must have neurons"));
        }
        if self.hidden_dims.is_empty() {
            return Err(ConfigError::MissingLayer("hidden"));
        }
        if self.hidden_dims.contains(&0) {
            return Err(ConfigError::InvalidDimension("hidden layer must have neurons"));
        }

        let dims = self.layer_dims();
        if self.activations.len() != dims.len() - 1 {
            return Err(ConfigError::Mismatched("activations"));
        }
        for name in &self.activations {
            name.parse::<Activation>()?;
        }

        if self.weights.len() != dims.len() - 1 {
            return Err(ConfigError::Mismatched("weights"));
        }
        for (gap, matrix) in self.weights.iter().enumerate() {
            let (sources, destinations) = (dims[gap], dims[gap + 1]);
            if matrix.len() != destinations || matrix.iter().any(|row| row.len() != sources) {
                return Err(ConfigError::Mismatched("weights"));
            }
        }

        if self.biases.len() != dims.len() - 1
            || self
                .biases
                .iter()
                .zip(&dims[1..])
                .any(|(layer, &n)| layer.len() != n)
        {
            return Err(ConfigError::Mismatched("biases"));
        }

        if self.input_norm.len() != self.input_dim() {
            return Err(ConfigError::Mismatched("input_norm"));
        }
        if self.output_norm.len() != self.output_dim() {
            return Err(ConfigError::Mismatched("output_norm"));
        }
        Ok(())
    }
}

/// What a single evaluation call computes.
///
/// Derivative selection is per call, so the same network can serve callers
/// with different derivative needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// Compute ∂y/∂x.
    pub first_order: bool,

    /// Compute ∂²y/∂x². Implies `first_order`.
    pub second_order: bool,

    /// Log a warning for every input outside its trust region.
    pub warn_on_extrapolation: bool,

    /// Per-layer work above which neurons are evaluated in parallel
    /// (only with the `parallel` feature).
    pub parallel_threshold: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            first_order: false,
            second_order: false,
            warn_on_extrapolation: false,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl EvalOptions {
    /// Outputs only.
    pub fn values() -> Self {
        Self::default()
    }

    /// Outputs and first derivatives.
    pub fn gradient() -> Self {
        Self {
            first_order: true,
            ..Self::default()
        }
    }

    /// Outputs, first and second derivatives.
    pub fn hessian() -> Self {
        Self {
            first_order: true,
            second_order: true,
            ..Self::default()
        }
    }

    /// Enables extrapolation warnings.
    pub fn warn_on_extrapolation(mut self, enabled: bool) -> Self {
        self.warn_on_extrapolation = enabled;
        self
    }

    /// Overrides the parallel work threshold.
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Highest derivative order requested.
    #[inline]
    pub fn order(&self) -> DerivativeOrder {
        if self.second_order {
            DerivativeOrder::Second
        } else if self.first_order {
            DerivativeOrder::First
        } else {
            DerivativeOrder::Value
        }
    }
}

/// Errors raised while declaring or populating a network.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Activation name not in the supported table.
    #[error("Unknown activation function '{0}'")]
    UnknownActivation(String),

    /// Normalization method name not recognized.
    #[error("Unknown scaling method '{0}'")]
    UnknownScaling(String),

    /// A layer was declared with an invalid size.
    #[error("Invalid dimension: {0}")]
    InvalidDimension(&'static str),

    /// Sizing requested before a required layer was declared.
    #[error("Missing {0} layer")]
    MissingLayer(&'static str),

    /// The operation needs the sizing step to have run first.
    #[error("Network weights have not been sized")]
    NotSized,

    /// The architecture is frozen once sized.
    #[error("Network weights are already sized")]
    AlreadySized,

    /// Layer index beyond the network depth.
    #[error("Layer {layer} out of bounds (layers: {n_layers})")]
    LayerOutOfBounds {
        /// Requested layer.
        layer: usize,
        /// Number of layers.
        n_layers: usize,
    },

    /// Neuron index beyond the layer width.
    #[error("Neuron {neuron} out of bounds in layer {layer} (neurons: {n_neurons})")]
    NeuronOutOfBounds {
        /// Layer of the neuron.
        layer: usize,
        /// Requested neuron.
        neuron: usize,
        /// Width of the layer.
        n_neurons: usize,
    },

    /// The input layer has no bias.
    #[error("Input layer has no bias")]
    InputLayerBias,

    /// The input layer is not evaluated and only carries `none`.
    #[error("Input layer cannot take activation '{0}'")]
    InputLayerActivation(Activation),

    /// Variable index beyond the declared inputs or outputs.
    #[error("{kind} variable {index} out of bounds (count: {count})")]
    VariableOutOfBounds {
        /// "input" or "output".
        kind: &'static str,
        /// Requested variable.
        index: usize,
        /// Declared variable count.
        count: usize,
    },

    /// Normalization parameters give a zero or non-finite scale.
    #[error("Degenerate {kind} normalization for variable {index}: {params:?} under {scaling}")]
    DegenerateNormalization {
        /// "input" or "output".
        kind: &'static str,
        /// Offending variable.
        index: usize,
        /// Offending pair.
        params: NormPair,
        /// Active strategy.
        scaling: Scaling,
    },

    /// A table in [`NetworkConfig`] does not match the layer sizes.
    #[error("Mismatched table: {0}")]
    Mismatched(&'static str),
}
