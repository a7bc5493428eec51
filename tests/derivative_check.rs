//! Numerical verification of network Jacobians and Hessians.
//!
//! Random networks (seeded) are evaluated with analytic derivatives and
//! compared against central differences of the network itself:
//! - ∂y/∂x_j  vs `(y(x + h e_j) - y(x - h e_j)) / 2h`
//! - ∂²y/∂x_j∂x_k vs `(∂y/∂x_j(x + h e_k) - ∂y/∂x_j(x - h e_k)) / 2h`

use mlpeval::{Activation, EvalOptions, Network, Scaling};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const H: f64 = 1e-5;
const FIRST_TOLERANCE: f64 = 1e-6;
const SECOND_TOLERANCE: f64 = 1e-5;

/// Builds a network with random weights in [-1, 1] and biases in [-0.5, 0.5].
fn random_network(
    dims: &[usize],
    hidden_activation: Activation,
    input_scaling: Scaling,
    output_scaling: Scaling,
    seed: u64,
) -> Network {
    let mut rng = SmallRng::seed_from_u64(seed);
    let n_in = dims[0];
    let n_out = dims[dims.len() - 1];

    let mut net = Network::new();
    net.define_input_layer(n_in).unwrap();
    net.define_output_layer(n_out).unwrap();
    for &n in &dims[1..dims.len() - 1] {
        net.push_hidden_layer(n).unwrap();
    }
    net.size_weights().unwrap();

    for l in 1..dims.len() {
        let act = if l == dims.len() - 1 {
            Activation::Linear
        } else {
            hidden_activation
        };
        net.set_activation(l, act).unwrap();
        for dest in 0..dims[l] {
            net.set_bias(l, dest, rng.gen_range(-0.5..0.5)).unwrap();
            for source in 0..dims[l - 1] {
                net.set_weight(l - 1, source, dest, rng.gen_range(-1.0..1.0))
                    .unwrap();
            }
        }
    }

    for i in 0..n_in {
        let (a, b) = match input_scaling {
            Scaling::MinMax => (-1.0 - i as f64, 2.0 + i as f64),
            Scaling::Standard | Scaling::Robust => (0.5 * i as f64, 1.5 + i as f64),
        };
        net.set_input_norm(i, a, b).unwrap();
    }
    for i in 0..n_out {
        let (a, b) = match output_scaling {
            Scaling::MinMax => (-3.0, 5.0 + i as f64),
            Scaling::Standard | Scaling::Robust => (10.0, 2.5 + i as f64),
        };
        net.set_output_norm(i, a, b).unwrap();
    }
    net.set_input_scaling(input_scaling);
    net.set_output_scaling(output_scaling);
    net
}

fn random_point(n: usize, rng: &mut SmallRng) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-1.0..1.5)).collect()
}

fn assert_close(analytic: f64, numeric: f64, tol: f64, what: &str) {
    let err = (analytic - numeric).abs();
    let bound = tol * analytic.abs().max(numeric.abs()).max(1.0);
    assert!(
        err <= bound,
        "{what}: analytic={analytic:.10e} numeric={numeric:.10e} err={err:.3e}"
    );
}

fn check_jacobian(net: &mut Network, x: &[f64], label: &str) {
    let n_in = net.n_inputs();
    let n_out = net.n_outputs();
    net.evaluate(x, EvalOptions::gradient()).unwrap();
    let jacobian = net.jacobian().to_vec();

    for j in 0..n_in {
        let mut xp = x.to_vec();
        let mut xm = x.to_vec();
        xp[j] += H;
        xm[j] -= H;
        net.evaluate(&xp, EvalOptions::values()).unwrap();
        let yp = net.outputs().to_vec();
        net.evaluate(&xm, EvalOptions::values()).unwrap();
        let ym = net.outputs().to_vec();

        for i in 0..n_out {
            let numeric = (yp[i] - ym[i]) / (2.0 * H);
            assert_close(
                jacobian[i * n_in + j],
                numeric,
                FIRST_TOLERANCE,
                &format!("{label}: dy{i}/dx{j}"),
            );
        }
    }
}

fn check_hessian(net: &mut Network, x: &[f64], label: &str) {
    let n_in = net.n_inputs();
    let n_out = net.n_outputs();
    net.evaluate(x, EvalOptions::hessian()).unwrap();
    let hessian = net.hessian().to_vec();

    for k in 0..n_in {
        let mut xp = x.to_vec();
        let mut xm = x.to_vec();
        xp[k] += H;
        xm[k] -= H;
        net.evaluate(&xp, EvalOptions::gradient()).unwrap();
        let jp = net.jacobian().to_vec();
        net.evaluate(&xm, EvalOptions::gradient()).unwrap();
        let jm = net.jacobian().to_vec();

        for i in 0..n_out {
            for j in 0..n_in {
                let numeric = (jp[i * n_in + j] - jm[i * n_in + j]) / (2.0 * H);
                let analytic = hessian[(i * n_in + j) * n_in + k];
                assert_close(
                    analytic,
                    numeric,
                    SECOND_TOLERANCE,
                    &format!("{label}: d2y{i}/dx{j}dx{k}"),
                );
            }
        }
    }

    // symmetry
    for i in 0..n_out {
        for j in 0..n_in {
            for k in 0..n_in {
                let a = hessian[(i * n_in + j) * n_in + k];
                let b = hessian[(i * n_in + k) * n_in + j];
                assert!((a - b).abs() <= 1e-12 * a.abs().max(1.0), "{label}: asymmetric");
            }
        }
    }
}

// =============================================================================
// Jacobian
// =============================================================================

#[test]
fn test_jacobian_smooth_activations() {
    let smooth = [
        Activation::Tanh,
        Activation::Sigmoid,
        Activation::Swish,
        Activation::Gelu,
        Activation::Linear,
    ];
    for (s, act) in smooth.into_iter().enumerate() {
        let mut net = random_network(&[3, 8, 6, 2], act, Scaling::MinMax, Scaling::MinMax, 42 + s as u64);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..4 {
            let x = random_point(3, &mut rng);
            check_jacobian(&mut net, &x, act.name());
        }
    }
}

#[test]
fn test_jacobian_all_scalings() {
    for input_scaling in [Scaling::MinMax, Scaling::Standard, Scaling::Robust] {
        for output_scaling in [Scaling::MinMax, Scaling::Standard, Scaling::Robust] {
            let mut net = random_network(&[2, 5, 3], Activation::Tanh, input_scaling, output_scaling, 11);
            let mut rng = SmallRng::seed_from_u64(99);
            let x = random_point(2, &mut rng);
            check_jacobian(&mut net, &x, &format!("{input_scaling}/{output_scaling}"));
        }
    }
}

#[test]
fn test_jacobian_deep_network() {
    let mut net = random_network(
        &[4, 6, 6, 6, 6, 6, 3],
        Activation::Sigmoid,
        Scaling::Standard,
        Scaling::MinMax,
        2024,
    );
    let mut rng = SmallRng::seed_from_u64(5);
    for _ in 0..3 {
        let x = random_point(4, &mut rng);
        check_jacobian(&mut net, &x, "deep sigmoid");
    }
}

#[test]
fn test_jacobian_piecewise_activations() {
    // random points are almost surely away from every kink
    for act in [Activation::Relu, Activation::Elu, Activation::Selu] {
        let mut net = random_network(&[2, 7, 2], act, Scaling::MinMax, Scaling::Robust, 3);
        let mut rng = SmallRng::seed_from_u64(17);
        for _ in 0..4 {
            let x = random_point(2, &mut rng);
            check_jacobian(&mut net, &x, act.name());
        }
    }
}

// =============================================================================
// Hessian
// =============================================================================

#[test]
fn test_hessian_smooth_activations() {
    for act in [
        Activation::Tanh,
        Activation::Sigmoid,
        Activation::Swish,
        Activation::Gelu,
        Activation::Exponential,
    ] {
        let dims: &[usize] = if act == Activation::Exponential {
            &[2, 3, 1]
        } else {
            &[3, 6, 5, 2]
        };
        let mut net = random_network(dims, act, Scaling::MinMax, Scaling::Standard, 77);
        let mut rng = SmallRng::seed_from_u64(8);
        for _ in 0..3 {
            let x = random_point(dims[0], &mut rng);
            check_hessian(&mut net, &x, act.name());
        }
    }
}

#[test]
fn test_hessian_piecewise_activations() {
    // negative-side curvature of elu and selu is non-zero
    for act in [Activation::Elu, Activation::Selu] {
        let mut net = random_network(&[2, 6, 4, 2], act, Scaling::MinMax, Scaling::Standard, 55);
        let mut rng = SmallRng::seed_from_u64(21);
        for _ in 0..3 {
            let x = random_point(2, &mut rng);
            check_hessian(&mut net, &x, act.name());
        }
    }
}

#[test]
fn test_hessian_all_scalings() {
    for input_scaling in [Scaling::MinMax, Scaling::Standard, Scaling::Robust] {
        let mut net = random_network(&[2, 4, 4, 1], Activation::Gelu, input_scaling, Scaling::Robust, 123);
        let mut rng = SmallRng::seed_from_u64(31);
        let x = random_point(2, &mut rng);
        check_hessian(&mut net, &x, &format!("gelu/{input_scaling}"));
    }
}

#[test]
fn test_hessian_linear_network_is_zero() {
    let mut net = random_network(&[3, 4, 2], Activation::Linear, Scaling::MinMax, Scaling::MinMax, 9);
    net.evaluate(&[0.1, 0.2, 0.3], EvalOptions::hessian()).unwrap();
    assert!(net.hessian().iter().all(|&v| v == 0.0));
}

// =============================================================================
// Parallel evaluation
// =============================================================================

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_serial() {
    let mut serial = random_network(&[3, 64, 64, 2], Activation::Tanh, Scaling::MinMax, Scaling::MinMax, 1);
    let mut parallel = serial.clone();
    let x = [0.2, -0.4, 0.9];

    serial
        .evaluate(&x, EvalOptions::hessian().parallel_threshold(usize::MAX))
        .unwrap();
    parallel
        .evaluate(&x, EvalOptions::hessian().parallel_threshold(0))
        .unwrap();

    assert_eq!(serial.outputs(), parallel.outputs());
    assert_eq!(serial.jacobian(), parallel.jacobian());
    assert_eq!(serial.hessian(), parallel.hessian());
}
