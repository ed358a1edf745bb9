use crate::SfError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, SfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SfError::NonFinite { what, value: v })
    }
}

/// Relative L2 change between two iterates: `sqrt(sum(((new - old) / new)^2))`.
///
/// Entries where `new` is exactly zero contribute their absolute change.
pub fn relative_error_norm(new: &[Real], old: &[Real]) -> Result<Real, SfError> {
    if new.len() != old.len() {
        return Err(SfError::LengthMismatch {
            what: "relative error operands",
            expected: new.len(),
            actual: old.len(),
        });
    }
    let sum: Real = new
        .iter()
        .zip(old)
        .map(|(n, o)| {
            let d = n - o;
            let r = if *n == 0.0 { d } else { d / n };
            r * r
        })
        .sum();
    ensure_finite(sum.sqrt(), "relative error norm")
}

/// Evaluate a polynomial with coefficients ordered from the highest power down.
#[inline]
pub fn polyval(coeffs: &[Real], x: Real) -> Real {
    coeffs.iter().fold(0.0, |acc, c| acc * x + c)
}
