//! Finite-difference verification of the activation derivatives.
//!
//! For every activation we compare:
//! - φ′ against `(φ(x+h) - φ(x-h)) / 2h`
//! - φ″ against `(φ′(x+h) - φ′(x-h)) / 2h`
//!
//! over a grid of pre-activations, plus points just either side of zero for
//! the piecewise functions (the kink itself has no derivative).

use mlpeval::{Activation, DerivativeOrder};

/// Step for central differences.
const H: f64 = 1e-5;

/// Relative tolerance, with an absolute floor of the same size.
const TOLERANCE: f64 = 1e-5;

fn grid() -> Vec<f64> {
    let mut xs: Vec<f64> = (-12..=12)
        .map(|i| i as f64 * 0.25)
        .filter(|&x| x != 0.0)
        .collect();
    xs.extend([-1e-3, 1e-3, -0.05, 0.05]);
    xs
}

fn assert_close(analytic: f64, numeric: f64, what: &str) {
    let err = (analytic - numeric).abs();
    let bound = TOLERANCE * analytic.abs().max(numeric.abs()).max(1.0);
    assert!(
        err <= bound,
        "{what}: analytic={analytic:.10e} numeric={numeric:.10e} err={err:.3e}"
    );
}

fn value(act: Activation, x: f64) -> f64 {
    act.evaluate(x, DerivativeOrder::Value).value
}

fn slope(act: Activation, x: f64) -> f64 {
    act.evaluate(x, DerivativeOrder::First).first
}

// =============================================================================
// Per-function checks
// =============================================================================

fn check_activation(act: Activation) {
    for x in grid() {
        let analytic = act.evaluate(x, DerivativeOrder::Second);

        let fd_first = (value(act, x + H) - value(act, x - H)) / (2.0 * H);
        assert_close(analytic.first, fd_first, &format!("{act}' at {x}"));

        let fd_second = (slope(act, x + H) - slope(act, x - H)) / (2.0 * H);
        assert_close(analytic.second, fd_second, &format!("{act}'' at {x}"));

        // lower orders must agree with the full evaluation
        assert_eq!(act.evaluate(x, DerivativeOrder::Value).value, analytic.value);
        assert_eq!(act.evaluate(x, DerivativeOrder::First).first, analytic.first);
    }
}

#[test]
fn test_linear_derivatives() {
    check_activation(Activation::Linear);
}

#[test]
fn test_relu_derivatives() {
    check_activation(Activation::Relu);
}

#[test]
fn test_elu_derivatives() {
    check_activation(Activation::Elu);
}

#[test]
fn test_gelu_derivatives() {
    check_activation(Activation::Gelu);
}

#[test]
fn test_selu_derivatives() {
    check_activation(Activation::Selu);
}

#[test]
fn test_sigmoid_derivatives() {
    check_activation(Activation::Sigmoid);
}

#[test]
fn test_swish_derivatives() {
    check_activation(Activation::Swish);
}

#[test]
fn test_tanh_derivatives() {
    check_activation(Activation::Tanh);
}

#[test]
fn test_exponential_derivatives() {
    check_activation(Activation::Exponential);
}

#[test]
fn test_none_derivatives() {
    check_activation(Activation::None);
}

// =============================================================================
// Branch behaviour at zero
// =============================================================================

#[test]
fn test_piecewise_branches_at_zero() {
    // x = 0 takes the non-positive branch
    let relu = Activation::Relu.evaluate(0.0, DerivativeOrder::Second);
    assert_eq!((relu.value, relu.first, relu.second), (0.0, 0.0, 0.0));

    let elu = Activation::Elu.evaluate(0.0, DerivativeOrder::Second);
    assert_eq!((elu.value, elu.first, elu.second), (0.0, 1.0, 1.0));

    let selu = Activation::Selu.evaluate(0.0, DerivativeOrder::Second);
    let slope = mlpeval::activation::SELU_LAMBDA * mlpeval::activation::SELU_ALPHA;
    assert_eq!(selu.value, 0.0);
    assert!((selu.first - slope).abs() < 1e-15);
    assert!((selu.second - slope).abs() < 1e-15);

    let selu_pos = Activation::Selu.evaluate(1e-9, DerivativeOrder::Second);
    assert_eq!(selu_pos.first, mlpeval::activation::SELU_LAMBDA);
    assert_eq!(selu_pos.second, 0.0);
}

#[test]
fn test_elu_first_derivative_continuous() {
    let left = slope(Activation::Elu, -1e-9);
    let right = slope(Activation::Elu, 1e-9);
    assert!((left - right).abs() < 1e-8);
}
