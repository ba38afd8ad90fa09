//! Quadrature rules for the mortar segment reference domain `[-1, 1]`.
use crate::Real;
use fenris_quadrature::univariate;
use nalgebra::convert;

/// A 1D quadrature rule as (weights, points) on the reference interval `[-1, 1]`.
pub type QuadraturePair1d<T> = (Vec<T>, Vec<T>);

/// Gauss quadrature with the given number of points.
///
/// Given `n` points, the rule integrates polynomials of order up to `2n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss<T: Real>(num_points: usize) -> QuadraturePair1d<T> {
    let (weights, points) = univariate::gauss(num_points);
    let weights = weights.into_iter().map(|w| convert(w)).collect();
    let points = points.into_iter().map(|p| convert(p[0])).collect();
    (weights, points)
}
