//! SIMD dot product and axpy used by the layer propagation.
//!
//! Both kernels process four lanes at a time with `wide::f64x4` and finish
//! the tail in scalar code. Lane order is fixed, so results are
//! deterministic across calls.

use wide::f64x4;

const LANES: usize = 4;

#[inline]
fn load(chunk: &[f64]) -> f64x4 {
    f64x4::new([chunk[0], chunk[1], chunk[2], chunk[3]])
}

/// Returns `Σ a[i] * b[i]` over the common length.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len().min(b.len());
    let split = n - n % LANES;

    let mut acc = f64x4::splat(0.0);
    for (ca, cb) in a[..split]
        .chunks_exact(LANES)
        .zip(b[..split].chunks_exact(LANES))
    {
        acc += load(ca) * load(cb);
    }

    let arr: [f64; LANES] = acc.into();
    let mut sum: f64 = arr.iter().sum();
    for i in split..n {
        sum += a[i] * b[i];
    }
    sum
}

/// `y += alpha * x` over the common length.
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len().min(y.len());
    let split = n - n % LANES;

    let scale = f64x4::splat(alpha);
    for (cx, cy) in x[..split]
        .chunks_exact(LANES)
        .zip(y[..split].chunks_exact_mut(LANES))
    {
        let out: [f64; LANES] = (load(cy) + scale * load(cx)).into();
        cy.copy_from_slice(&out);
    }
    for i in split..n {
        y[i] += alpha * x[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_matches_scalar() {
        for n in 0..11 {
            let a: Vec<f64> = (0..n).map(|i| i as f64 * 0.5 - 1.0).collect();
            let b: Vec<f64> = (0..n).map(|i| 2.0 - i as f64 * 0.25).collect();
            let expected: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
            assert!((dot(&a, &b) - expected).abs() < 1e-12, "n = {n}");
        }
    }

    #[test]
    fn test_axpy_matches_scalar() {
        for n in 0..11 {
            let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
            let mut y = vec![1.0; n];
            axpy(-0.5, &x, &mut y);
            for (i, v) in y.iter().enumerate() {
                assert_eq!(*v, 1.0 - 0.5 * i as f64);
            }
        }
    }
}
