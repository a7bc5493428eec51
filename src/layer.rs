//! Dense layer storage and per-layer derivative propagation.
//!
//! # Buffer Layout
//!
//! With `n` neurons and `m` network inputs, a sized layer holds:
//! - `outputs`: `[n]`
//! - `d_outputs`: `[n][m]`, row `i` is ∂y_i/∂x
//! - `d2_outputs`: `[n][m][m]`, block `i` is ∂²y_i/∂x²
//!
//! all flat and row-major. Derivative buffers are allocated once by
//! [`Network::size_weights`](crate::Network::size_weights) and overwritten in
//! full by every evaluation that requests them.
//!
//! # Propagation
//!
//! For neuron `i` with weights `w` to the previous layer `p`:
//!
//! ```text
//! z      = b_i + Σ_n w_n y_p[n]
//! ψ_j    = Σ_n w_n ∂y_p[n]/∂x_j
//! χ_jk   = Σ_n w_n ∂²y_p[n]/∂x_j∂x_k
//! ∂y/∂x_j       = φ′(z) ψ_j
//! ∂²y/∂x_j∂x_k  = φ″(z) ψ_j ψ_k + φ′(z) χ_jk
//! ```
//!
//! ψ and χ are accumulated in place in the neuron's own derivative rows, so
//! the propagation needs no scratch memory.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::activation::{Activation, DerivativeOrder};
use crate::kernels::{axpy, dot};
use crate::normalization::{NormPair, NormalizationStrategy};

/// Weights of one layer gap, `[destination][source]` row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    destinations: usize,
    sources: usize,
    data: Vec<f64>,
}

impl Weights {
    /// Zero-initialized gap between a `sources`-wide and a `destinations`-wide layer.
    pub fn zeros(destinations: usize, sources: usize) -> Self {
        Self {
            destinations,
            sources,
            data: vec![0.0; destinations * sources],
        }
    }

    /// Width of the receiving layer.
    #[inline]
    pub fn destinations(&self) -> usize {
        self.destinations
    }

    /// Width of the sending layer.
    #[inline]
    pub fn sources(&self) -> usize {
        self.sources
    }

    /// Incoming weights of one destination neuron.
    #[inline]
    pub fn row(&self, destination: usize) -> &[f64] {
        let start = destination * self.sources;
        &self.data[start..start + self.sources]
    }

    /// Weight from `source` to `destination`, if both are in range.
    pub fn get(&self, destination: usize, source: usize) -> Option<f64> {
        (destination < self.destinations && source < self.sources)
            .then(|| self.data[destination * self.sources + source])
    }

    pub(crate) fn set(&mut self, destination: usize, source: usize, value: f64) {
        self.data[destination * self.sources + source] = value;
    }
}

/// One layer of neurons with its evaluation buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    n_neurons: usize,
    is_input: bool,
    activation: Activation,
    /// Empty for the input layer.
    bias: Vec<f64>,
    outputs: Vec<f64>,
    /// Derivative width (network input count); zero until sized.
    n_inputs: usize,
    d_outputs: Vec<f64>,
    d2_outputs: Vec<f64>,
}

impl Layer {
    /// Creates a computed (hidden or output) layer.
    pub fn new(n_neurons: usize) -> Self {
        Self {
            n_neurons,
            is_input: false,
            activation: Activation::None,
            bias: vec![0.0; n_neurons],
            outputs: vec![0.0; n_neurons],
            n_inputs: 0,
            d_outputs: Vec::new(),
            d2_outputs: Vec::new(),
        }
    }

    /// Creates the input layer.
    pub fn input(n_neurons: usize) -> Self {
        Self {
            is_input: true,
            bias: Vec::new(),
            ..Self::new(n_neurons)
        }
    }

    /// Allocates the derivative buffers for `n_inputs` network inputs.
    pub(crate) fn size_gradients(&mut self, n_inputs: usize) {
        self.n_inputs = n_inputs;
        self.d_outputs = vec![0.0; self.n_neurons * n_inputs];
        self.d2_outputs = vec![0.0; self.n_neurons * n_inputs * n_inputs];
    }

    #[inline]
    pub fn n_neurons(&self) -> usize {
        self.n_neurons
    }

    #[inline]
    pub fn is_input(&self) -> bool {
        self.is_input
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub(crate) fn set_activation(&mut self, activation: Activation) {
        self.activation = activation;
    }

    /// Bias of a neuron; `None` for the input layer or an out-of-range neuron.
    pub fn bias(&self, neuron: usize) -> Option<f64> {
        self.bias.get(neuron).copied()
    }

    pub(crate) fn set_bias(&mut self, neuron: usize, value: f64) {
        self.bias[neuron] = value;
    }

    /// Neuron outputs from the last evaluation (normalized domain).
    #[inline]
    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    /// ∂y_neuron/∂x row from the last derivative evaluation.
    #[inline]
    pub fn d_output_row(&self, neuron: usize) -> &[f64] {
        let start = neuron * self.n_inputs;
        &self.d_outputs[start..start + self.n_inputs]
    }

    /// ∂²y_neuron/∂x² block (`[m][m]`) from the last second-order evaluation.
    #[inline]
    pub fn d2_output_block(&self, neuron: usize) -> &[f64] {
        let width = self.n_inputs * self.n_inputs;
        let start = neuron * width;
        &self.d2_outputs[start..start + width]
    }

    /// Normalizes raw inputs into this (input) layer and seeds the derivatives.
    ///
    /// Seeds ∂y_i/∂x_j = δ_ij / scale_i and a zero second derivative.
    pub(crate) fn load_inputs(
        &mut self,
        inputs: &[f64],
        norms: &[NormPair],
        strategy: &dyn NormalizationStrategy,
        order: DerivativeOrder,
    ) {
        debug_assert!(self.is_input);
        debug_assert_eq!(inputs.len(), self.n_neurons);

        for ((out, &raw), &params) in self.outputs.iter_mut().zip(inputs).zip(norms) {
            *out = strategy.normalize(raw, params);
        }

        if order.has_first() {
            for (i, (row, &params)) in self
                .d_outputs
                .chunks_exact_mut(self.n_inputs)
                .zip(norms)
                .enumerate()
            {
                row.fill(0.0);
                row[i] = 1.0 / strategy.scale(params);
            }
        }
        if order.has_second() {
            self.d2_outputs.fill(0.0);
        }
    }

    /// Computes this layer from the previous one.
    pub(crate) fn forward_from(
        &mut self,
        prev: &Layer,
        weights: &Weights,
        order: DerivativeOrder,
        parallel_threshold: usize,
    ) {
        debug_assert_eq!(weights.sources(), prev.n_neurons);
        debug_assert_eq!(weights.destinations(), self.n_neurons);

        let m = self.n_inputs;
        let activation = self.activation;
        let bias: &[f64] = &self.bias;

        let neuron = |i: usize, out: &mut f64, d1: &mut [f64], d2: &mut [f64]| {
            let w = weights.row(i);
            let phi = activation.evaluate(bias[i] + dot(w, &prev.outputs), order);
            *out = phi.value;
            if !order.has_first() {
                return;
            }

            // d1 <- ψ
            d1.fill(0.0);
            for (n, &wn) in w.iter().enumerate() {
                axpy(wn, prev.d_output_row(n), d1);
            }

            if order.has_second() {
                // d2 <- χ, then the second-order chain rule
                d2.fill(0.0);
                for (n, &wn) in w.iter().enumerate() {
                    axpy(wn, prev.d2_output_block(n), d2);
                }
                for (row, &psi_j) in d2.chunks_exact_mut(m).zip(d1.iter()) {
                    for (chi, &psi_k) in row.iter_mut().zip(d1.iter()) {
                        *chi = phi.second * psi_j * psi_k + phi.first * *chi;
                    }
                }
            }

            for v in d1.iter_mut() {
                *v *= phi.first;
            }
        };

        let per_neuron = match order {
            DerivativeOrder::Value => 1,
            DerivativeOrder::First => 1 + m,
            DerivativeOrder::Second => 1 + m + m * m,
        };
        let parallel = self.n_neurons * prev.n_neurons * per_neuron >= parallel_threshold;

        for_each_neuron(
            &mut self.outputs,
            &mut self.d_outputs,
            &mut self.d2_outputs,
            m,
            parallel,
            neuron,
        );
    }
}

fn for_each_neuron_serial<F>(outputs: &mut [f64], d1: &mut [f64], d2: &mut [f64], m: usize, f: F)
where
    F: Fn(usize, &mut f64, &mut [f64], &mut [f64]),
{
    for (i, ((out, d1), d2)) in outputs
        .iter_mut()
        .zip(d1.chunks_exact_mut(m))
        .zip(d2.chunks_exact_mut(m * m))
        .enumerate()
    {
        f(i, out, d1, d2);
    }
}

#[cfg(feature = "parallel")]
fn for_each_neuron<F>(
    outputs: &mut [f64],
    d1: &mut [f64],
    d2: &mut [f64],
    m: usize,
    parallel: bool,
    f: F,
) where
    F: Fn(usize, &mut f64, &mut [f64], &mut [f64]) + Sync + Send,
{
    if !parallel {
        return for_each_neuron_serial(outputs, d1, d2, m, f);
    }
    outputs
        .par_iter_mut()
        .zip(d1.par_chunks_exact_mut(m))
        .zip(d2.par_chunks_exact_mut(m * m))
        .enumerate()
        .for_each(|(i, ((out, d1), d2))| f(i, out, d1, d2));
}

#[cfg(not(feature = "parallel"))]
#[inline]
fn for_each_neuron<F>(
    outputs: &mut [f64],
    d1: &mut [f64],
    d2: &mut [f64],
    m: usize,
    _parallel: bool,
    f: F,
) where
    F: Fn(usize, &mut f64, &mut [f64], &mut [f64]),
{
    for_each_neuron_serial(outputs, d1, d2, m, f);
}
