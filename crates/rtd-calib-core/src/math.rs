//! Scalar aliases and uncertainty propagation helpers.

pub type Real = f64;

/// Combine independent standard uncertainties in quadrature: `sqrt(Σ e_i²)`.
///
/// Returns `0.0` for an empty input.
pub fn quadrature<I>(errors: I) -> Real
where
    I: IntoIterator<Item = Real>,
{
    errors.into_iter().map(|e| e * e).sum::<Real>().sqrt()
}

/// Returns `true` if `a` and `b` differ by at most `tol`.
#[inline]
pub fn approx_eq(a: Real, b: Real, tol: Real) -> bool {
    (a - b).abs() <= tol
}
