//! Dense feed-forward network with exact input derivatives.
//!
//! # Lifecycle
//!
//! 1. Declare the input and output layers, then push hidden layers in order.
//! 2. Call [`Network::size_weights`] once; the layer arena, weight matrices
//!    and every evaluation buffer are allocated here.
//! 3. Assign activations, weights and biases by index. Names, normalization
//!    parameters and strategies can be set any time after step 1.
//! 4. Call [`Network::evaluate`] as often as needed.
//!
//! # Example
//!
//! ```rust
//! use mlpeval::{EvalOptions, Network};
//!
//! let mut net = Network::new();
//! net.define_input_layer(1).unwrap();
//! net.define_output_layer(1).unwrap();
//! net.push_hidden_layer(1).unwrap();
//! net.size_weights().unwrap();
//!
//! net.set_activation_function(1, "tanh").unwrap();
//! net.set_activation_function(2, "linear").unwrap();
//! net.set_weight(0, 0, 0, 1.0).unwrap();
//! net.set_weight(1, 0, 0, 2.0).unwrap();
//!
//! net.evaluate(&[0.0], EvalOptions::gradient()).unwrap();
//! assert_eq!(net.output(0), 0.0);
//! assert_eq!(net.d_output_d_input(0, 0), 2.0);
//! ```
//!
//! # Concurrency
//!
//! Evaluation writes into buffers owned by the network and therefore takes
//! `&mut self`. Solvers running several threads clone one network per thread.

use crate::activation::{Activation, DerivativeOrder};
use crate::config::{ConfigError, EvalOptions, NetworkConfig};
use crate::error::{ExtrapolationWarning, MlpError, MlpResult};
use crate::layer::{Layer, Weights};
use crate::matcher::{match_variables, MatchResult};
use crate::normalization::{NormPair, Scaling, IDENTITY_NORM};

/// Multi-layer perceptron with per-variable normalization.
#[derive(Debug, Clone, Default)]
pub struct Network {
    input_dim: Option<usize>,
    output_dim: Option<usize>,
    hidden_dims: Vec<usize>,

    /// Layer arena, input first; empty until sized.
    layers: Vec<Layer>,
    /// `weights[l]` connects `layers[l]` to `layers[l + 1]`.
    weights: Vec<Weights>,

    input_names: Vec<String>,
    output_names: Vec<String>,
    input_norm: Vec<NormPair>,
    output_norm: Vec<NormPair>,
    input_scaling: Scaling,
    output_scaling: Scaling,

    outputs: Vec<f64>,
    /// `[output][input]`
    jacobian: Vec<f64>,
    /// `[output][input][input]`
    hessian: Vec<f64>,

    /// Set by the first evaluation after a mutation.
    validated: bool,
}

impl Network {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and sizes a network from a declarative description.
    pub fn from_config(config: &NetworkConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut net = Self::new();
        net.define_input_layer(config.input_dim())?;
        net.define_output_layer(config.output_dim())?;
        for &n in &config.hidden_dims {
            net.push_hidden_layer(n)?;
        }
        net.size_weights()?;

        for (i, name) in config.input_names.iter().enumerate() {
            net.set_input_name(i, name.as_str())?;
        }
        for (i, name) in config.output_names.iter().enumerate() {
            net.set_output_name(i, name.as_str())?;
        }
        for (i, &(a, b)) in config.input_norm.iter().enumerate() {
            net.set_input_norm(i, a, b)?;
        }
        for (i, &(a, b)) in config.output_norm.iter().enumerate() {
            net.set_output_norm(i, a, b)?;
        }
        net.set_input_scaling(config.input_scaling);
        net.set_output_scaling(config.output_scaling);

        for (l, name) in config.activations.iter().enumerate() {
            net.set_activation_function(l + 1, name)?;
        }
        for (gap, matrix) in config.weights.iter().enumerate() {
            for (dest, row) in matrix.iter().enumerate() {
                for (source, &w) in row.iter().enumerate() {
                    net.set_weight(gap, source, dest, w)?;
                }
            }
        }
        for (l, biases) in config.biases.iter().enumerate() {
            for (neuron, &b) in biases.iter().enumerate() {
                net.set_bias(l + 1, neuron, b)?;
            }
        }
        Ok(net)
    }

    // =========================================================================
    // Declaration
    // =========================================================================

    /// Declares the input layer, fixing the number of inputs.
    pub fn define_input_layer(&mut self, n_neurons: usize) -> Result<(), ConfigError> {
        self.ensure_unsized()?;
        if n_neurons == 0 {
            return Err(ConfigError::InvalidDimension("input layer must have neurons"));
        }
        self.input_dim = Some(n_neurons);
        self.input_names = vec![String::new(); n_neurons];
        self.input_norm = vec![IDENTITY_NORM; n_neurons];
        self.validated = false;
        Ok(())
    }

    /// Declares the output layer, fixing the number of outputs.
    pub fn define_output_layer(&mut self, n_neurons: usize) -> Result<(), ConfigError> {
        self.ensure_unsized()?;
        if n_neurons == 0 {
            return Err(ConfigError::InvalidDimension("output layer must have neurons"));
        }
        self.output_dim = Some(n_neurons);
        self.output_names = vec![String::new(); n_neurons];
        self.output_norm = vec![IDENTITY_NORM; n_neurons];
        self.validated = false;
        Ok(())
    }

    /// Appends a hidden layer after the previously pushed ones.
    pub fn push_hidden_layer(&mut self, n_neurons: usize) -> Result<(), ConfigError> {
        self.ensure_unsized()?;
        if n_neurons == 0 {
            return Err(ConfigError::InvalidDimension("hidden layer must have neurons"));
        }
        self.hidden_dims.push(n_neurons);
        Ok(())
    }

    /// Builds the layer arena and allocates weights and evaluation buffers.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingLayer`] unless the input layer, the output layer
    /// and at least one hidden layer are declared; [`ConfigError::AlreadySized`]
    /// when called twice.
    pub fn size_weights(&mut self) -> Result<(), ConfigError> {
        self.ensure_unsized()?;
        let n_in = self.input_dim.ok_or(ConfigError::MissingLayer("input"))?;
        let n_out = self.output_dim.ok_or(ConfigError::MissingLayer("output"))?;
        if self.hidden_dims.is_empty() {
            return Err(ConfigError::MissingLayer("hidden"));
        }

        let dims = self.layer_dims();
        let mut layers = Vec::with_capacity(dims.len());
        layers.push(Layer::input(n_in));
        layers.extend(dims[1..].iter().map(|&n| Layer::new(n)));
        for layer in &mut layers {
            layer.size_gradients(n_in);
        }

        self.weights = dims
            .windows(2)
            .map(|pair| Weights::zeros(pair[1], pair[0]))
            .collect();
        self.layers = layers;
        self.outputs = vec![0.0; n_out];
        self.jacobian = vec![0.0; n_out * n_in];
        self.hessian = vec![0.0; n_out * n_in * n_in];
        self.validated = false;

        log::debug!("sized network with layer dims {:?}", dims);
        Ok(())
    }

    #[inline]
    fn is_sized(&self) -> bool {
        !self.layers.is_empty()
    }

    fn ensure_unsized(&self) -> Result<(), ConfigError> {
        if self.is_sized() {
            Err(ConfigError::AlreadySized)
        } else {
            Ok(())
        }
    }

    fn ensure_sized(&self) -> Result<(), ConfigError> {
        if self.is_sized() {
            Ok(())
        } else {
            Err(ConfigError::NotSized)
        }
    }

    fn layer_index(&self, layer: usize) -> Result<(), ConfigError> {
        self.ensure_sized()?;
        if layer >= self.layers.len() {
            return Err(ConfigError::LayerOutOfBounds {
                layer,
                n_layers: self.layers.len(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Assigns the activation of a layer.
    ///
    /// The input layer is never evaluated and only takes [`Activation::None`];
    /// anything else is rejected with [`ConfigError::InputLayerActivation`].
    pub fn set_activation(&mut self, layer: usize, activation: Activation) -> Result<(), ConfigError> {
        self.layer_index(layer)?;
        if layer == 0 && activation != Activation::None {
            return Err(ConfigError::InputLayerActivation(activation));
        }
        self.layers[layer].set_activation(activation);
        self.validated = false;
        Ok(())
    }

    /// Assigns the activation of a layer by its file name (`"tanh"`, ...).
    ///
    /// Unknown names are rejected with [`ConfigError::UnknownActivation`].
    pub fn set_activation_function(&mut self, layer: usize, name: &str) -> Result<(), ConfigError> {
        let activation = name.parse::<Activation>()?;
        self.set_activation(layer, activation)
    }

    /// Sets the weight of the synapse from neuron `source` of layer `gap` to
    /// neuron `dest` of layer `gap + 1`.
    pub fn set_weight(
        &mut self,
        gap: usize,
        source: usize,
        dest: usize,
        value: f64,
    ) -> Result<(), ConfigError> {
        self.layer_index(gap + 1)?;
        let matrix = &mut self.weights[gap];
        if source >= matrix.sources() {
            return Err(ConfigError::NeuronOutOfBounds {
                layer: gap,
                neuron: source,
                n_neurons: matrix.sources(),
            });
        }
        if dest >= matrix.destinations() {
            return Err(ConfigError::NeuronOutOfBounds {
                layer: gap + 1,
                neuron: dest,
                n_neurons: matrix.destinations(),
            });
        }
        matrix.set(dest, source, value);
        self.validated = false;
        Ok(())
    }

    /// Sets the bias of a neuron in a hidden or output layer.
    pub fn set_bias(&mut self, layer: usize, neuron: usize, value: f64) -> Result<(), ConfigError> {
        self.layer_index(layer)?;
        let target = &mut self.layers[layer];
        if target.is_input() {
            return Err(ConfigError::InputLayerBias);
        }
        if neuron >= target.n_neurons() {
            return Err(ConfigError::NeuronOutOfBounds {
                layer,
                neuron,
                n_neurons: target.n_neurons(),
            });
        }
        target.set_bias(neuron, value);
        self.validated = false;
        Ok(())
    }

    /// Names input `index`.
    pub fn set_input_name(&mut self, index: usize, name: impl Into<String>) -> Result<(), ConfigError> {
        let slot = variable_slot(&mut self.input_names, "input", index)?;
        *slot = name.into();
        Ok(())
    }

    /// Names output `index`.
    pub fn set_output_name(&mut self, index: usize, name: impl Into<String>) -> Result<(), ConfigError> {
        let slot = variable_slot(&mut self.output_names, "output", index)?;
        *slot = name.into();
        Ok(())
    }

    /// Sets the normalization pair of input `index`.
    pub fn set_input_norm(&mut self, index: usize, first: f64, second: f64) -> Result<(), ConfigError> {
        *variable_slot(&mut self.input_norm, "input", index)? = (first, second);
        self.validated = false;
        Ok(())
    }

    /// Sets the normalization pair of output `index`.
    pub fn set_output_norm(&mut self, index: usize, first: f64, second: f64) -> Result<(), ConfigError> {
        *variable_slot(&mut self.output_norm, "output", index)? = (first, second);
        self.validated = false;
        Ok(())
    }

    /// Selects the normalization strategy for all inputs.
    pub fn set_input_scaling(&mut self, scaling: Scaling) {
        self.input_scaling = scaling;
        self.validated = false;
    }

    /// Selects the normalization strategy for all outputs.
    pub fn set_output_scaling(&mut self, scaling: Scaling) {
        self.output_scaling = scaling;
        self.validated = false;
    }

    /// Checks that the network is sized and every normalization pair is usable
    /// under its strategy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ensure_sized()?;
        check_norms(&self.input_norm, self.input_scaling, "input")?;
        check_norms(&self.output_norm, self.output_scaling, "output")?;
        Ok(())
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluates the network for raw (dimensional) `inputs`.
    ///
    /// Outputs and the derivatives selected by `opts` are available through
    /// [`outputs`](Self::outputs), [`jacobian`](Self::jacobian) and
    /// [`hessian`](Self::hessian) until the next call. Derivatives that were
    /// not requested read as zero.
    ///
    /// # Errors
    ///
    /// [`MlpError::Config`] if the network is not sized or has degenerate
    /// normalization; [`MlpError::DimensionMismatch`] if `inputs` does not
    /// have one value per network input.
    pub fn evaluate(&mut self, inputs: &[f64], opts: EvalOptions) -> MlpResult<()> {
        if !self.validated {
            self.validate()?;
            self.validated = true;
        }
        if inputs.len() != self.n_inputs() {
            return Err(MlpError::dimension_mismatch(
                "network inputs",
                self.n_inputs(),
                inputs.len(),
            ));
        }
        if opts.warn_on_extrapolation {
            for warning in self.extrapolated_inputs(inputs) {
                log::warn!("{warning}");
            }
        }

        let order = opts.order();
        self.layers[0].load_inputs(
            inputs,
            &self.input_norm,
            self.input_scaling.strategy(),
            order,
        );
        for l in 1..self.layers.len() {
            let (done, rest) = self.layers.split_at_mut(l);
            rest[0].forward_from(&done[l - 1], &self.weights[l - 1], order, opts.parallel_threshold);
        }
        self.denormalize_outputs(order);
        Ok(())
    }

    /// Maps the output layer back to raw units and rescales its derivatives.
    fn denormalize_outputs(&mut self, order: DerivativeOrder) {
        let Network {
            layers,
            output_norm,
            output_scaling,
            outputs,
            jacobian,
            hessian,
            ..
        } = self;
        let last = &layers[layers.len() - 1];
        let strategy = output_scaling.strategy();
        let m = last.d_output_row(0).len();

        for (i, &params) in output_norm.iter().enumerate() {
            outputs[i] = strategy.denormalize(last.outputs()[i], params);
            let scale = strategy.scale(params);

            let jac_row = &mut jacobian[i * m..(i + 1) * m];
            if order.has_first() {
                for (dst, &src) in jac_row.iter_mut().zip(last.d_output_row(i)) {
                    *dst = scale * src;
                }
            } else {
                jac_row.fill(0.0);
            }

            let hess_block = &mut hessian[i * m * m..(i + 1) * m * m];
            if order.has_second() {
                for (dst, &src) in hess_block.iter_mut().zip(last.d2_output_block(i)) {
                    *dst = scale * src;
                }
            } else {
                hess_block.fill(0.0);
            }
        }
    }

    /// Evaluates and copies the results into a caller-owned [`Evaluation`].
    ///
    /// # Errors
    ///
    /// As [`evaluate`](Self::evaluate), plus [`MlpError::DimensionMismatch`]
    /// if `result` was created for a different input or output count.
    pub fn predict(
        &mut self,
        inputs: &[f64],
        opts: EvalOptions,
        result: &mut Evaluation,
    ) -> MlpResult<()> {
        if result.n_outputs != self.n_outputs() {
            return Err(MlpError::dimension_mismatch(
                "evaluation outputs",
                self.n_outputs(),
                result.n_outputs,
            ));
        }
        if result.n_inputs != self.n_inputs() {
            return Err(MlpError::dimension_mismatch(
                "evaluation inputs",
                self.n_inputs(),
                result.n_inputs,
            ));
        }
        self.evaluate(inputs, opts)?;
        result.outputs.copy_from_slice(&self.outputs);
        result.jacobian.copy_from_slice(&self.jacobian);
        result.hessian.copy_from_slice(&self.hessian);
        result.order = opts.order();
        Ok(())
    }

    /// Allocates an [`Evaluation`] shaped for this network.
    pub fn create_evaluation(&self) -> Evaluation {
        Evaluation::new(self.n_inputs(), self.n_outputs())
    }

    /// Raw outputs of the last evaluation.
    #[inline]
    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    /// Raw output `i` of the last evaluation.
    #[inline]
    pub fn output(&self, i: usize) -> f64 {
        self.outputs[i]
    }

    /// ∂y_i/∂x_j from the last evaluation.
    ///
    /// # Panics
    ///
    /// If `i` is not an output index or `j` not an input index.
    #[inline]
    pub fn d_output_d_input(&self, i: usize, j: usize) -> f64 {
        jacobian_entry(&self.jacobian, self.n_inputs(), i, j)
    }

    /// ∂²y_i/∂x_j∂x_k from the last evaluation.
    ///
    /// # Panics
    ///
    /// If `i` is not an output index or `j`, `k` not input indices.
    #[inline]
    pub fn d2_output_d_input2(&self, i: usize, j: usize, k: usize) -> f64 {
        hessian_entry(&self.hessian, self.n_inputs(), i, j, k)
    }

    /// Flat `[output][input]` first derivatives.
    pub fn jacobian(&self) -> &[f64] {
        &self.jacobian
    }

    /// Flat `[output][input][input]` second derivatives.
    pub fn hessian(&self) -> &[f64] {
        &self.hessian
    }

    /// Whether raw input `index` lies in its trust region. Unknown indices
    /// are reported as outside.
    pub fn check_input_inclusion(&self, value: f64, index: usize) -> bool {
        self.input_norm
            .get(index)
            .is_some_and(|&params| self.input_scaling.strategy().contains(value, params))
    }

    /// All inputs of `inputs` lying outside their trust region.
    pub fn extrapolated_inputs(&self, inputs: &[f64]) -> Vec<ExtrapolationWarning> {
        inputs
            .iter()
            .enumerate()
            .filter(|&(i, &value)| !self.check_input_inclusion(value, i))
            .map(|(i, &value)| ExtrapolationWarning {
                input: i,
                name: self.input_names.get(i).cloned().unwrap_or_default(),
                value,
            })
            .collect()
    }

    /// Pairs this network's variables with a requester's variable lists.
    pub fn variable_mapping<S: AsRef<str>>(
        &self,
        lookup_inputs: &[S],
        lookup_outputs: &[S],
    ) -> MatchResult {
        match_variables(
            self.input_names.as_slice(),
            self.output_names.as_slice(),
            lookup_inputs,
            lookup_outputs,
        )
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Declared layer sizes, `[input, hidden..., output]`, as far as known.
    pub fn layer_dims(&self) -> Vec<usize> {
        self.input_dim
            .into_iter()
            .chain(self.hidden_dims.iter().copied())
            .chain(self.output_dim)
            .collect()
    }

    /// Number of layers, input and output included.
    pub fn n_layers(&self) -> usize {
        self.layer_dims().len()
    }

    /// Number of hidden layers.
    pub fn n_hidden_layers(&self) -> usize {
        self.hidden_dims.len()
    }

    /// Number of weight matrices (layer gaps) once sized.
    pub fn n_weight_layers(&self) -> usize {
        self.weights.len()
    }

    /// Neuron count of `layer`.
    pub fn n_neurons(&self, layer: usize) -> Option<usize> {
        self.layer_dims().get(layer).copied()
    }

    /// Number of network inputs (0 before the input layer is declared).
    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.input_names.len()
    }

    /// Number of network outputs (0 before the output layer is declared).
    #[inline]
    pub fn n_outputs(&self) -> usize {
        self.output_names.len()
    }

    pub fn input_name(&self, index: usize) -> Option<&str> {
        self.input_names.get(index).map(String::as_str)
    }

    pub fn output_name(&self, index: usize) -> Option<&str> {
        self.output_names.get(index).map(String::as_str)
    }

    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn input_norm(&self, index: usize) -> Option<NormPair> {
        self.input_norm.get(index).copied()
    }

    pub fn output_norm(&self, index: usize) -> Option<NormPair> {
        self.output_norm.get(index).copied()
    }

    pub fn input_scaling(&self) -> Scaling {
        self.input_scaling
    }

    pub fn output_scaling(&self) -> Scaling {
        self.output_scaling
    }

    /// Activation of `layer` once sized.
    pub fn activation(&self, layer: usize) -> Option<Activation> {
        self.layers.get(layer).map(Layer::activation)
    }

    /// Layer `index` of the arena once sized.
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Weight from neuron `source` of layer `gap` to neuron `dest` of layer `gap + 1`.
    pub fn weight(&self, gap: usize, source: usize, dest: usize) -> Option<f64> {
        self.weights.get(gap)?.get(dest, source)
    }

    /// Bias of `neuron` in `layer`; `None` for the input layer.
    pub fn bias(&self, layer: usize, neuron: usize) -> Option<f64> {
        self.layers.get(layer)?.bias(neuron)
    }
}

fn variable_slot<'a, T>(
    values: &'a mut [T],
    kind: &'static str,
    index: usize,
) -> Result<&'a mut T, ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::MissingLayer(kind));
    }
    let count = values.len();
    values
        .get_mut(index)
        .ok_or(ConfigError::VariableOutOfBounds { kind, index, count })
}

fn check_norms(norms: &[NormPair], scaling: Scaling, kind: &'static str) -> Result<(), ConfigError> {
    let strategy = scaling.strategy();
    match norms.iter().position(|&p| !strategy.is_valid(p)) {
        Some(index) => Err(ConfigError::DegenerateNormalization {
            kind,
            index,
            params: norms[index],
            scaling,
        }),
        None => Ok(()),
    }
}

/// Entry `[i][j]` of a flat `[output][input]` buffer. Rows are sliced first
/// so an out-of-range `j` cannot land in the next output's row.
#[inline]
fn jacobian_entry(jacobian: &[f64], m: usize, i: usize, j: usize) -> f64 {
    jacobian[i * m..(i + 1) * m][j]
}

/// Entry `[i][j][k]` of a flat `[output][input][input]` buffer.
#[inline]
fn hessian_entry(hessian: &[f64], m: usize, i: usize, j: usize, k: usize) -> f64 {
    let block = &hessian[i * m * m..(i + 1) * m * m];
    block[j * m..(j + 1) * m][k]
}

/// Caller-owned copy of one evaluation's results.
///
/// Create it once with [`Network::create_evaluation`] and reuse it across
/// calls to [`Network::predict`].
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    n_inputs: usize,
    n_outputs: usize,
    outputs: Vec<f64>,
    jacobian: Vec<f64>,
    hessian: Vec<f64>,
    order: DerivativeOrder,
}

impl Evaluation {
    /// Zeroed results for `n_inputs` inputs and `n_outputs` outputs.
    pub fn new(n_inputs: usize, n_outputs: usize) -> Self {
        Self {
            n_inputs,
            n_outputs,
            outputs: vec![0.0; n_outputs],
            jacobian: vec![0.0; n_outputs * n_inputs],
            hessian: vec![0.0; n_outputs * n_inputs * n_inputs],
            order: DerivativeOrder::Value,
        }
    }

    /// Derivative order of the stored results.
    pub fn order(&self) -> DerivativeOrder {
        self.order
    }

    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    pub fn output(&self, i: usize) -> f64 {
        self.outputs[i]
    }

    /// ∂y_i/∂x_j. Panics on an index outside the network's shape.
    pub fn first_derivative(&self, i: usize, j: usize) -> f64 {
        jacobian_entry(&self.jacobian, self.n_inputs, i, j)
    }

    /// ∂²y_i/∂x_j∂x_k. Panics on an index outside the network's shape.
    pub fn second_derivative(&self, i: usize, j: usize, k: usize) -> f64 {
        hessian_entry(&self.hessian, self.n_inputs, i, j, k)
    }

    pub fn jacobian(&self) -> &[f64] {
        &self.jacobian
    }

    pub fn hessian(&self) -> &[f64] {
        &self.hessian
    }
}
