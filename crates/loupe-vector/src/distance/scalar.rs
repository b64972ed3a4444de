//! Scalar distance kernels.
//!
//! Sums accumulate in `f64`. Squaring an `f32` component overflows above
//! roughly `1.8e19` and flushes to zero below roughly `1e-23`, which would
//! leave very large or very small vectors with an infinite or zero norm.

#![allow(clippy::cast_possible_truncation)]

/// Squared Euclidean (L2) distance.
///
/// # Panics
///
/// Debug-panics if vectors have different lengths.
#[inline]
#[must_use]
pub fn euclidean_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    squared_distance_wide(a, b) as f32
}

/// Euclidean (L2) distance.
#[inline]
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    squared_distance_wide(a, b).sqrt() as f32
}

/// `1 / (1 + d)` for the Euclidean distance `d`.
#[inline]
#[must_use]
pub fn euclidean_similarity(a: &[f32], b: &[f32]) -> f32 {
    (1.0 / (1.0 + squared_distance_wide(a, b).sqrt())) as f32
}

/// Dot product.
///
/// # Panics
///
/// Debug-panics if vectors have different lengths.
#[inline]
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    dot_product_wide(a, b) as f32
}

/// Squared L2 norm.
#[inline]
#[must_use]
pub fn sum_of_squares(v: &[f32]) -> f32 {
    sum_of_squares_wide(v) as f32
}

/// L2 norm (magnitude).
///
/// Infinite only when the norm itself exceeds `f32::MAX`, and zero only for
/// the zero vector.
#[inline]
#[must_use]
pub fn l2_norm(v: &[f32]) -> f32 {
    sum_of_squares_wide(v).sqrt() as f32
}

/// Cosine similarity from precomputed norms, clamped to `[-1, 1]`.
///
/// Returns 0.0 if either norm is zero.
#[inline]
#[must_use]
pub fn cosine_similarity_with_norms(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let cosine = dot_product_wide(a, b) / (f64::from(norm_a) * f64::from(norm_b));
    (cosine as f32).clamp(-1.0, 1.0)
}

/// Cosine similarity in `[-1, 1]`; 0.0 if either vector is zero.
#[inline]
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity_with_norms(a, b, l2_norm(a), l2_norm(b))
}

#[inline]
fn dot_product_wide(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum()
}

#[inline]
fn squared_distance_wide(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same dimension");
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

#[inline]
fn sum_of_squares_wide(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum()
}
