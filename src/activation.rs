//! Activation functions with closed-form first and second derivatives.
//!
//! Every layer after the input layer carries one [`Activation`]. The evaluator
//! returns the activation value together with its derivatives w.r.t. the
//! pre-activation, computed only up to the requested [`DerivativeOrder`].
//!
//! # Example
//!
//! ```rust
//! use mlpeval::{Activation, DerivativeOrder};
//!
//! let act: Activation = "tanh".parse().unwrap();
//! let out = act.evaluate(0.0, DerivativeOrder::Second);
//! assert_eq!(out.value, 0.0);
//! assert_eq!(out.first, 1.0);
//! assert_eq!(out.second, 0.0);
//! ```
//!
//! # Formulas
//!
//! | Function | φ(x) | φ′(x) | φ″(x) |
//! |----------|------|-------|-------|
//! | `none` | 0 | 0 | 0 |
//! | `linear` | x | 1 | 0 |
//! | `relu` | max(x, 0) | 1 / 0 | 0 |
//! | `elu` | x / eˣ−1 | 1 / eˣ | 0 / eˣ |
//! | `selu` | λx / λα(eˣ−1) | λ / λαeˣ | 0 / λαeˣ |
//! | `gelu` | xΦ(x) | Φ(x)+xφ(x) | φ(x)(2−x²) |
//! | `sigmoid` | σ | σ(1−σ) | σ(1−σ)(1−2σ) |
//! | `swish` | xσ | σ+xσ(1−σ) | σ(1−σ)(2+x(1−2σ)) |
//! | `tanh` | t | 1−t² | −2t(1−t²) |
//! | `exponential` | eˣ | eˣ | eˣ |
//!
//! Piecewise functions take their positive branch for `x > 0` only.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// SELU scale λ.
pub const SELU_LAMBDA: f64 = 1.050_700_98;

/// SELU negative-branch coefficient α.
pub const SELU_ALPHA: f64 = 1.673_263_24;

/// 1/√(2π), the peak of the standard normal density.
const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// How many derivatives an evaluation has to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DerivativeOrder {
    /// Values only.
    #[default]
    Value,
    /// Values and first derivatives.
    First,
    /// Values, first and second derivatives.
    Second,
}

impl DerivativeOrder {
    /// True when first derivatives are produced.
    #[inline]
    pub fn has_first(self) -> bool {
        self >= DerivativeOrder::First
    }

    /// True when second derivatives are produced.
    #[inline]
    pub fn has_second(self) -> bool {
        self == DerivativeOrder::Second
    }
}

/// Activation value with its derivatives w.r.t. the pre-activation.
///
/// Derivatives beyond the requested order are left at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Activated {
    /// φ(x)
    pub value: f64,
    /// φ′(x)
    pub first: f64,
    /// φ″(x)
    pub second: f64,
}

impl Activated {
    #[inline]
    fn build(
        order: DerivativeOrder,
        value: f64,
        first: impl FnOnce() -> f64,
        second: impl FnOnce() -> f64,
    ) -> Self {
        match order {
            DerivativeOrder::Value => Self {
                value,
                first: 0.0,
                second: 0.0,
            },
            DerivativeOrder::First => Self {
                value,
                first: first(),
                second: 0.0,
            },
            DerivativeOrder::Second => Self {
                value,
                first: first(),
                second: second(),
            },
        }
    }
}

/// Supported activation functions.
///
/// `None` is the tag of the input layer and evaluates to zero everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Activation {
    #[default]
    None,
    Linear,
    Relu,
    Elu,
    Gelu,
    Selu,
    Sigmoid,
    Swish,
    Tanh,
    Exponential,
}

/// Name table used when resolving activation names from architecture files.
const NAME_TABLE: [(&str, Activation); 10] = [
    ("none", Activation::None),
    ("linear", Activation::Linear),
    ("relu", Activation::Relu),
    ("elu", Activation::Elu),
    ("gelu", Activation::Gelu),
    ("selu", Activation::Selu),
    ("sigmoid", Activation::Sigmoid),
    ("swish", Activation::Swish),
    ("tanh", Activation::Tanh),
    ("exponential", Activation::Exponential),
];

impl Activation {
    /// All activation functions, in table order.
    pub const ALL: [Activation; 10] = [
        Activation::None,
        Activation::Linear,
        Activation::Relu,
        Activation::Elu,
        Activation::Gelu,
        Activation::Selu,
        Activation::Sigmoid,
        Activation::Swish,
        Activation::Tanh,
        Activation::Exponential,
    ];

    /// Canonical lowercase name, as it appears in architecture files.
    pub fn name(self) -> &'static str {
        match self {
            Activation::None => "none",
            Activation::Linear => "linear",
            Activation::Relu => "relu",
            Activation::Elu => "elu",
            Activation::Gelu => "gelu",
            Activation::Selu => "selu",
            Activation::Sigmoid => "sigmoid",
            Activation::Swish => "swish",
            Activation::Tanh => "tanh",
            Activation::Exponential => "exponential",
        }
    }

    /// Evaluates the activation at pre-activation `x`.
    ///
    /// Only the derivatives requested by `order` are computed; the others are
    /// returned as zero.
    #[inline]
    pub fn evaluate(self, x: f64, order: DerivativeOrder) -> Activated {
        match self {
            Activation::None => Activated::default(),
            Activation::Linear => Activated::build(order, x, || 1.0, || 0.0),
            Activation::Relu => {
                if x > 0.0 {
                    Activated::build(order, x, || 1.0, || 0.0)
                } else {
                    Activated::default()
                }
            }
            Activation::Elu => {
                if x > 0.0 {
                    Activated::build(order, x, || 1.0, || 0.0)
                } else {
                    let e = x.exp();
                    Activated::build(order, e - 1.0, || e, || e)
                }
            }
            Activation::Selu => {
                if x > 0.0 {
                    Activated::build(order, SELU_LAMBDA * x, || SELU_LAMBDA, || 0.0)
                } else {
                    let slope = SELU_LAMBDA * SELU_ALPHA * x.exp();
                    Activated::build(order, slope - SELU_LAMBDA * SELU_ALPHA, || slope, || slope)
                }
            }
            Activation::Gelu => {
                let cdf = 0.5 * (1.0 + libm::erf(x * std::f64::consts::FRAC_1_SQRT_2));
                let pdf = FRAC_1_SQRT_2PI * (-0.5 * x * x).exp();
                Activated::build(order, x * cdf, || cdf + x * pdf, || pdf * (2.0 - x * x))
            }
            Activation::Sigmoid => {
                let s = sigmoid(x);
                let ds = s * (1.0 - s);
                Activated::build(order, s, || ds, || ds * (1.0 - 2.0 * s))
            }
            Activation::Swish => {
                let s = sigmoid(x);
                let ds = s * (1.0 - s);
                Activated::build(
                    order,
                    x * s,
                    || s + x * ds,
                    || ds * (2.0 + x * (1.0 - 2.0 * s)),
                )
            }
            Activation::Tanh => {
                let t = x.tanh();
                let dt = 1.0 - t * t;
                Activated::build(order, t, || dt, || -2.0 * t * dt)
            }
            Activation::Exponential => {
                let e = x.exp();
                Activated::build(order, e, || e, || e)
            }
        }
    }
}

/// Logistic function, split on sign so neither branch overflows.
#[inline]
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

impl FromStr for Activation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        NAME_TABLE
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|&(_, act)| act)
            .ok_or_else(|| ConfigError::UnknownActivation(name.to_string()))
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
