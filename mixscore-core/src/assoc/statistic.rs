//! Likelihood-ratio statistics of nested model fits.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::model::{ModelFit, ModelKind};

/// Difference in free parameters between nested models.
pub fn degrees_of_freedom(null: ModelKind, alt: ModelKind) -> Result<usize> {
    ensure!(
        null.family() == alt.family(),
        "{:?} and {:?} are fitted to different data",
        null,
        alt
    );
    ensure!(
        alt.arity() > null.arity(),
        "{:?} does not nest {:?}",
        alt,
        null
    );
    Ok(alt.arity() - null.arity())
}

/// Upper-tail chi-square probability; NaN when undefined.
pub fn chi_square_p_value(chi_square: f64, degrees_of_freedom: usize) -> f64 {
    if chi_square.is_nan() || degrees_of_freedom == 0 {
        return f64::NAN;
    }
    if chi_square <= 0.0 {
        return 1.0;
    }
    ChiSquared::new(degrees_of_freedom as f64)
        .map(|d| d.sf(chi_square))
        .unwrap_or(f64::NAN)
}

/// Likelihood-ratio test of a null model against a nesting alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodRatioTest {
    /// `2 * (nll_null - nll_alt)`, not clamped at zero.
    pub chi_square: f64,
    pub degrees_of_freedom: usize,
    pub null: ModelFit,
    pub alt: ModelFit,
}

impl LikelihoodRatioTest {
    pub fn new(null: ModelFit, alt: ModelFit) -> Result<Self> {
        let degrees_of_freedom = degrees_of_freedom(null.kind, alt.kind)?;
        Ok(Self {
            chi_square: 2.0 * (null.neg_log_likelihood - alt.neg_log_likelihood),
            degrees_of_freedom,
            null,
            alt,
        })
    }

    /// Asymptotic p-value from chi-square(df).
    pub fn p_value(&self) -> f64 {
        chi_square_p_value(self.chi_square, self.degrees_of_freedom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(kind: ModelKind, nll: f64) -> ModelFit {
        ModelFit {
            kind,
            neg_log_likelihood: nll,
            parameters: vec![0.5; kind.arity()],
            evaluations: 0,
        }
    }

    #[test]
    fn test_degrees_of_freedom() {
        use ModelKind::*;
        assert_eq!(degrees_of_freedom(SharedOddsRatio, TwoOddsRatios).unwrap(), 1);
        assert_eq!(degrees_of_freedom(FrequencyOnly, TwoOddsRatios).unwrap(), 2);
        assert_eq!(degrees_of_freedom(FrequencyOnly, SharedOddsRatio).unwrap(), 1);
        assert_eq!(degrees_of_freedom(AdmixtureNull, Admixture).unwrap(), 1);
        assert!(degrees_of_freedom(TwoOddsRatios, FrequencyOnly).is_err());
        assert!(degrees_of_freedom(FrequencyOnly, HaplotypeTwoOddsRatios).is_err());
    }

    #[test]
    fn test_chi_square() {
        let t = LikelihoodRatioTest::new(
            fit(ModelKind::FrequencyOnly, 105.0),
            fit(ModelKind::SharedOddsRatio, 102.0),
        )
        .unwrap();
        assert_eq!(t.chi_square, 6.0);
        assert_eq!(t.degrees_of_freedom, 1);
        // P(chi2_1 > 6) = 0.01431
        assert!((t.p_value() - 0.014306).abs() < 1e-5);
    }

    #[test]
    fn test_negative_chi_square_kept() {
        let t = LikelihoodRatioTest::new(
            fit(ModelKind::FrequencyOnly, 10.0),
            fit(ModelKind::SharedOddsRatio, 10.0 + 1e-9),
        )
        .unwrap();
        assert!(t.chi_square < 0.0);
        assert_eq!(t.p_value(), 1.0);
    }

    #[test]
    fn test_p_value_edge_cases() {
        assert!(chi_square_p_value(f64::NAN, 1).is_nan());
        assert!(chi_square_p_value(3.0, 0).is_nan());
        // P(chi2_2 > x) = exp(-x/2)
        assert!((chi_square_p_value(4.0, 2) - (-2.0f64).exp()).abs() < 1e-10);
    }
}
