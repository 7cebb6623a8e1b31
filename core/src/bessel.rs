//! Spherical Bessel functions of the first kind.
//!
//! The overlap reduction function expansion in [`crate::orf`] is a linear
//! combination of j₀, j₂, and j₄ evaluated at the frequency-dependent phase
//! parameter α.  The closed trigonometric forms for these orders, e.g.
//!
//! ```text
//! j₂(x) = (3/x³ − 1/x)·sin x − (3/x²)·cos x
//! ```
//!
//! lose all significant digits near x = 0, where the two terms cancel almost
//! exactly (for j₄ the leading terms grow as 105/x⁵ while the function itself
//! falls off as x⁴/945).  Below [`SERIES_CUTOFF`] the ascending power series
//!
//! ```text
//! jₙ(x) = xⁿ/(2n+1)!! · Σₖ (−x²/2)ᵏ / (k!·(2n+3)(2n+5)⋯(2n+2k+1))
//! ```
//!
//! is used instead; it converges in a handful of terms there and yields the
//! exact limits j₀(0) = 1 and jₙ(0) = 0 for n > 0, so a zero-frequency bin
//! evaluates cleanly rather than raising.

/// Crossover between the ascending power series and the closed trigonometric
/// forms.  Below this the closed forms cancel catastrophically; at and above
/// it they are accurate to better than 1e-10 relative for n ≤ 4.
const SERIES_CUTOFF: f64 = 1.0;

/// Spherical Bessel function of the first kind, jₙ(x).
///
/// Orders 0–4 use closed forms for large arguments; higher orders fall back
/// to the upward recurrence jₙ₊₁ = ((2n+1)/x)·jₙ − jₙ₋₁.
pub fn spherical_jn(n: u32, x: f64) -> f64 {
    if x.abs() < SERIES_CUTOFF {
        return series(n, x);
    }

    let (s, c) = (x.sin(), x.cos());
    match n {
        0 => s / x,
        1 => s / x.powi(2) - c / x,
        2 => (3.0 / x.powi(3) - 1.0 / x) * s - 3.0 / x.powi(2) * c,
        3 => (15.0 / x.powi(4) - 6.0 / x.powi(2)) * s - (15.0 / x.powi(3) - 1.0 / x) * c,
        4 => {
            (105.0 / x.powi(5) - 45.0 / x.powi(3) + 1.0 / x) * s
                - (105.0 / x.powi(4) - 10.0 / x.powi(2)) * c
        }
        _ => {
            let mut jm1 = (15.0 / x.powi(4) - 6.0 / x.powi(2)) * s - (15.0 / x.powi(3) - 1.0 / x) * c;
            let mut j = (105.0 / x.powi(5) - 45.0 / x.powi(3) + 1.0 / x) * s
                - (105.0 / x.powi(4) - 10.0 / x.powi(2)) * c;
            for m in 4..n {
                let next = (2 * m + 1) as f64 / x * j - jm1;
                jm1 = j;
                j = next;
            }
            j
        }
    }
}

/// Ascending power series, valid for small |x|.
fn series(n: u32, x: f64) -> f64 {
    // (2n+1)!!
    let mut double_factorial = 1.0;
    let mut i = 3;
    while i <= 2 * n + 1 {
        double_factorial *= i as f64;
        i += 2;
    }

    let x2 = x * x;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..=24u32 {
        term *= -x2 / ((2 * k) as f64 * (2 * (n + k) + 1) as f64);
        sum += term;
        if term.abs() < f64::EPSILON * sum.abs() {
            break;
        }
    }

    x.powi(n as i32) / double_factorial * sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Reference values computed with 50-digit decimal arithmetic from the
    // closed forms.
    const REFERENCE: &[(f64, f64, f64, f64)] = &[
        (0.3, 9.850673555377986e-1, 5.961524868620218e-3, 8.536424265025156e-6),
        (0.5, 9.588510772084060e-1, 1.637110660799341e-2, 6.538960615238971e-5),
        (1.0, 8.414709848078965e-1, 6.203505201137386e-2, 1.011015808413753e-3),
        (2.0, 4.546487134128409e-1, 1.984479490571466e-1, 1.407939276291532e-2),
        (6.3, 2.668873092753923e-3, -7.804224900285682e-2, 1.850931340604189e-1),
    ];

    #[test]
    fn orders_zero_two_four_match_reference() {
        for &(x, j0, j2, j4) in REFERENCE {
            assert_relative_eq!(spherical_jn(0, x), j0, max_relative = 1e-10);
            assert_relative_eq!(spherical_jn(2, x), j2, max_relative = 1e-10);
            assert_relative_eq!(spherical_jn(4, x), j4, max_relative = 1e-10);
        }
    }

    #[test]
    fn value_at_zero_argument() {
        assert_eq!(spherical_jn(0, 0.0), 1.0);
        assert_eq!(spherical_jn(2, 0.0), 0.0);
        assert_eq!(spherical_jn(4, 0.0), 0.0);
    }

    #[test]
    fn continuous_across_series_cutoff() {
        for n in [0, 2, 4] {
            let below = spherical_jn(n, SERIES_CUTOFF - 1e-9);
            let above = spherical_jn(n, SERIES_CUTOFF + 1e-9);
            assert_relative_eq!(below, above, max_relative = 1e-6);
        }
    }

    #[test]
    fn even_orders_are_even_functions() {
        for n in [0, 2, 4] {
            assert_relative_eq!(spherical_jn(n, -1.7), spherical_jn(n, 1.7), max_relative = 1e-14);
        }
    }

    #[test]
    fn recurrence_fallback_matches_closed_form() {
        // j5 via the recurrence arm against the explicit relation at n = 4.
        let x = 3.2;
        let expected = 9.0 / x * spherical_jn(4, x) - spherical_jn(3, x);
        assert_relative_eq!(spherical_jn(5, x), expected, max_relative = 1e-12);
    }
}
