//! Standard normal distribution helpers.

use std::f64::consts::FRAC_1_SQRT_2;

use libm::erf;

/// Standard normal CDF: P(Z <= x) for Z ~ N(0, 1).
///
/// Computed via the error function, accurate to ~1e-15.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x * FRAC_1_SQRT_2))
}

/// Standardize `value` against N(`mean`, `stdev`^2).
///
/// # Panics
///
/// Panics unless `stdev > 0`.
pub fn z_score(value: f64, mean: f64, stdev: f64) -> f64 {
    assert!(stdev > 0.0, "z-score requires a positive stdev");
    (value - mean) / stdev
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdf_at_zero_is_half() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn cdf_is_symmetric() {
        for x in [0.1, 0.5, 1.0, 1.96, 3.0] {
            let sum = normal_cdf(x) + normal_cdf(-x);
            assert!((sum - 1.0).abs() < 1e-12, "asymmetric at {x}");
        }
    }

    #[test]
    fn cdf_matches_reference_values() {
        // Abramowitz & Stegun table values.
        assert!((normal_cdf(1.0) - 0.841_344_746_068_543).abs() < 1e-12);
        assert!((normal_cdf(1.96) - 0.975_002_104_851_780).abs() < 1e-12);
        assert!((normal_cdf(-2.0) - 0.022_750_131_948_179).abs() < 1e-12);
    }

    #[test]
    fn cdf_is_monotone() {
        let mut prev = 0.0;
        for i in -400..=400 {
            let cur = normal_cdf(i as f64 / 100.0);
            assert!(cur >= prev);
            prev = cur;
        }
    }

    #[test]
    fn z_score_standardizes() {
        assert_eq!(z_score(12.0, 10.0, 2.0), 1.0);
        assert_eq!(z_score(10.0, 10.0, 2.0), 0.0);
    }

    #[test]
    #[should_panic(expected = "positive stdev")]
    fn z_score_rejects_zero_stdev() {
        z_score(1.0, 0.0, 0.0);
    }
}
