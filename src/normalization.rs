//! Input and output normalization strategies.
//!
//! Every network input and output carries a parameter pair `(a, b)` whose
//! meaning depends on the strategy selected for that side of the network:
//!
//! | [`Scaling`] | `a` | `b` | trust region |
//! |-------------|-----|-----|--------------|
//! | `MinMax` | minimum | maximum | `a <= x <= b` |
//! | `Standard` | mean | standard deviation | within 2 std |
//! | `Robust` | median | inter-quartile range | within 10 IQR |
//!
//! Both concrete strategies are affine maps `y = (x - origin) / scale`, so the
//! derivative of a normalized quantity w.r.t. its raw counterpart is the
//! constant `1 / scale` and the curvature is zero.
//!
//! # Example
//!
//! ```rust
//! use mlpeval::Scaling;
//!
//! let minmax = Scaling::MinMax.strategy();
//! assert_eq!(minmax.normalize(5.0, (0.0, 10.0)), 0.5);
//! assert_eq!(minmax.scale((0.0, 10.0)), 10.0);
//!
//! let standard = Scaling::Standard.strategy();
//! assert_eq!(standard.denormalize(1.0, (3.0, 2.0)), 5.0);
//! ```

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Reference parameter pair of one variable; meaning depends on the strategy.
pub type NormPair = (f64, f64);

/// Identity parameters under every strategy: zero origin, unit scale.
pub const IDENTITY_NORM: NormPair = (0.0, 1.0);

/// Affine normalization of a single variable.
pub trait NormalizationStrategy: Send + Sync + fmt::Debug {
    /// Raw value that maps to zero.
    fn origin(&self, params: NormPair) -> f64;

    /// Raw distance that maps to one normalized unit.
    fn scale(&self, params: NormPair) -> f64;

    /// Center of the variable's reference range.
    fn offset(&self, params: NormPair) -> f64;

    /// Whether `raw` lies inside the region the network was trained on.
    fn contains(&self, raw: f64, params: NormPair) -> bool;

    /// Labels of the two parameters, for architecture reports.
    fn parameter_labels(&self) -> (&'static str, &'static str);

    /// Maps a raw value into the network's domain.
    #[inline]
    fn normalize(&self, raw: f64, params: NormPair) -> f64 {
        (raw - self.origin(params)) / self.scale(params)
    }

    /// Maps a network-domain value back to raw units.
    #[inline]
    fn denormalize(&self, normalized: f64, params: NormPair) -> f64 {
        self.scale(params) * normalized + self.origin(params)
    }

    /// False when the pair cannot be used to normalize (zero or non-finite scale).
    fn is_valid(&self, params: NormPair) -> bool {
        let scale = self.scale(params);
        scale.is_finite() && scale != 0.0 && self.origin(params).is_finite()
    }
}

/// Min-max normalization onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundedRange;

impl NormalizationStrategy for BoundedRange {
    #[inline]
    fn origin(&self, (min, _): NormPair) -> f64 {
        min
    }

    #[inline]
    fn scale(&self, (min, max): NormPair) -> f64 {
        max - min
    }

    fn offset(&self, (min, max): NormPair) -> f64 {
        0.5 * (min + max)
    }

    fn contains(&self, raw: f64, (min, max): NormPair) -> bool {
        raw >= min && raw <= max
    }

    fn parameter_labels(&self) -> (&'static str, &'static str) {
        ("Lower limit", "Upper limit")
    }
}

/// Shift-and-scale normalization by a location and a spread statistic.
///
/// Covers both standardization (mean, std) and robust scaling (median, IQR);
/// they only differ in how many spread units count as trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistical {
    trust_radius: f64,
    labels: (&'static str, &'static str),
}

impl Statistical {
    /// Creates a statistical strategy trusting `|x - location| <= trust_radius * spread`.
    pub const fn new(trust_radius: f64, labels: (&'static str, &'static str)) -> Self {
        Self {
            trust_radius,
            labels,
        }
    }

    /// Number of spread units inside the trust region.
    pub fn trust_radius(&self) -> f64 {
        self.trust_radius
    }
}

impl NormalizationStrategy for Statistical {
    #[inline]
    fn origin(&self, (location, _): NormPair) -> f64 {
        location
    }

    #[inline]
    fn scale(&self, (_, spread): NormPair) -> f64 {
        spread
    }

    fn offset(&self, (location, _): NormPair) -> f64 {
        location
    }

    fn contains(&self, raw: f64, params: NormPair) -> bool {
        self.normalize(raw, params).abs() <= self.trust_radius
    }

    fn parameter_labels(&self) -> (&'static str, &'static str) {
        self.labels
    }
}

static MIN_MAX: BoundedRange = BoundedRange;
static STANDARD: Statistical = Statistical::new(2.0, ("Mean", "std"));
static ROBUST: Statistical = Statistical::new(10.0, ("Median", "IQ range"));

/// Strategy selector, chosen independently for inputs and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Scaling {
    /// `(min, max)` onto `[0, 1]`.
    #[default]
    MinMax,
    /// `(mean, std)` standardization.
    Standard,
    /// `(median, IQR)` robust scaling.
    Robust,
}

impl Scaling {
    /// The strategy implementing this selector.
    #[inline]
    pub fn strategy(self) -> &'static dyn NormalizationStrategy {
        match self {
            Scaling::MinMax => &MIN_MAX,
            Scaling::Standard => &STANDARD,
            Scaling::Robust => &ROBUST,
        }
    }

    /// Name used in architecture files.
    pub fn name(self) -> &'static str {
        match self {
            Scaling::MinMax => "minmax",
            Scaling::Standard => "standard",
            Scaling::Robust => "robust",
        }
    }

    /// Human readable description of the method.
    pub fn description(self) -> &'static str {
        match self {
            Scaling::MinMax => "minimum-maximum",
            Scaling::Standard => "mean-standard deviation",
            Scaling::Robust => "quantile range",
        }
    }
}

impl FromStr for Scaling {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        [Scaling::MinMax, Scaling::Standard, Scaling::Robust]
            .into_iter()
            .find(|scaling| scaling.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownScaling(name.to_string()))
    }
}

impl fmt::Display for Scaling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
