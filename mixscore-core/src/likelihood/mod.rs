//! Negative log-likelihoods of the nested association models.
//!
//! Each likelihood precomputes a coefficient decomposition of its count
//! matrices once and evaluates in constant time per parameter vector.

pub mod admixture;
pub mod genotype;
pub mod haplotype;

pub use admixture::AdmixtureLikelihood;
pub use genotype::{GenotypeCoefficients, GenotypeLikelihood};
pub use haplotype::HaplotypeLikelihood;

/// Case allele frequency implied by control frequency `p0` and odds ratio `r`.
pub fn odds_ratio_transform(p0: f64, r: f64) -> f64 {
    r * p0 / (1.0 - p0 + r * p0)
}

/// Odds ratio between case frequency `p1` and control frequency `p0`.
pub fn odds_ratio_from_frequencies(p0: f64, p1: f64) -> f64 {
    (p1 / (1.0 - p1)) / (p0 / (1.0 - p0))
}

/// `c * ln(p)` with the convention `0 * ln(0) = 0`.
pub(crate) fn weighted_ln(c: f64, p: f64) -> f64 {
    if c == 0.0 {
        0.0
    } else {
        c * p.ln()
    }
}

/// A negative log-likelihood over a fixed-length parameter vector.
pub trait Likelihood {
    /// Number of parameters `neg_log_likelihood` expects.
    fn arity(&self) -> usize;

    fn neg_log_likelihood(&self, params: &[f64]) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_identity_ratio() {
        for &p in &[1e-5, 0.1, 0.5, 0.9, 1.0 - 1e-5] {
            assert!((odds_ratio_transform(p, 1.0) - p).abs() < 1e-15);
        }
    }

    #[test]
    fn test_transform_round_trip() {
        let p0 = 0.3;
        let r = 2.5;
        let p1 = odds_ratio_transform(p0, r);
        assert!((odds_ratio_from_frequencies(p0, p1) - r).abs() < 1e-12);
    }

    #[test]
    fn test_transform_known_value() {
        // odds 1 doubled to 2 gives frequency 2/3
        assert!((odds_ratio_transform(0.5, 2.0) - 2.0 / 3.0).abs() < 1e-15);
        assert_eq!(odds_ratio_transform(0.4, 0.0), 0.0);
    }

    #[test]
    fn test_weighted_ln_zero() {
        assert_eq!(weighted_ln(0.0, 0.0), 0.0);
        assert!((weighted_ln(2.0, 0.5) - 2.0 * 0.5f64.ln()).abs() < 1e-15);
    }
}
