//! Genotype-level likelihood with local ancestry.
//!
//! A genotype count `g` (rows = ancestry state, columns = non-reference
//! copies) reduces to six coefficients:
//!
//!   c0 = 2 g00 + g01     c1 = 2 g02 + g01
//!   c2 = g10 + g11 / 2   c3 = g12 + g11 / 2
//!   c4 = 2 g20 + g21     c5 = 2 g22 + g21
//!
//! so that with reference-allele frequencies `pa` (pop1) and `pe` (pop2)
//!
//!   -ln L = -((c0 + c2) ln pa + (c1 + c3) ln(1 - pa)
//!             + (c2 + c4) ln pe + (c3 + c5) ln(1 - pe))

use super::{odds_ratio_transform, weighted_ln, Likelihood};
use crate::counts::GenotypeCount;
use crate::model::{DataFamily, ModelKind};

/// Coefficient decomposition of one group's genotype counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenotypeCoefficients {
    /// Weight of `ln pa`.
    pub ref_pop1: f64,
    /// Weight of `ln(1 - pa)`.
    pub alt_pop1: f64,
    /// Weight of `ln pe`.
    pub ref_pop2: f64,
    /// Weight of `ln(1 - pe)`.
    pub alt_pop2: f64,
}

impl GenotypeCoefficients {
    pub fn new(g: &GenotypeCount) -> Self {
        let cell = |r: usize, c: usize| g.get(r, c) as f64;
        let c0 = 2.0 * cell(0, 0) + cell(0, 1);
        let c1 = 2.0 * cell(0, 2) + cell(0, 1);
        let c2 = cell(1, 0) + 0.5 * cell(1, 1);
        let c3 = cell(1, 2) + 0.5 * cell(1, 1);
        let c4 = 2.0 * cell(2, 0) + cell(2, 1);
        let c5 = 2.0 * cell(2, 2) + cell(2, 1);
        Self {
            ref_pop1: c0 + c2,
            alt_pop1: c1 + c3,
            ref_pop2: c2 + c4,
            alt_pop2: c3 + c5,
        }
    }

    pub fn neg_log_likelihood(&self, pa: f64, pe: f64) -> f64 {
        -(weighted_ln(self.ref_pop1, pa)
            + weighted_ln(self.alt_pop1, 1.0 - pa)
            + weighted_ln(self.ref_pop2, pe)
            + weighted_ln(self.alt_pop2, 1.0 - pe))
    }

    /// Maximum-likelihood reference frequencies `[pa, pe]` of this group.
    /// An ancestry with no observations yields NaN.
    pub fn frequency_estimates(&self) -> [f64; 2] {
        [
            self.ref_pop1 / (self.ref_pop1 + self.alt_pop1),
            self.ref_pop2 / (self.ref_pop2 + self.alt_pop2),
        ]
    }
}

/// Joint case/control likelihood of one genotype model.
#[derive(Debug, Clone)]
pub struct GenotypeLikelihood {
    kind: ModelKind,
    cases: GenotypeCoefficients,
    controls: GenotypeCoefficients,
}

impl GenotypeLikelihood {
    pub fn new(kind: ModelKind, cases: &GenotypeCount, controls: &GenotypeCount) -> Self {
        assert_eq!(kind.family(), DataFamily::Genotype);
        Self {
            kind,
            cases: GenotypeCoefficients::new(cases),
            controls: GenotypeCoefficients::new(controls),
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn controls(&self) -> &GenotypeCoefficients {
        &self.controls
    }
}

impl Likelihood for GenotypeLikelihood {
    fn arity(&self) -> usize {
        self.kind.arity()
    }

    fn neg_log_likelihood(&self, params: &[f64]) -> f64 {
        assert_eq!(params.len(), self.arity());
        let (pa, pe) = (params[0], params[1]);
        let (ra, re) = match self.kind {
            ModelKind::SharedOddsRatio => (params[2], params[2]),
            ModelKind::TwoOddsRatios => (params[2], params[3]),
            _ => (1.0, 1.0),
        };
        self.controls.neg_log_likelihood(pa, pe)
            + self
                .cases
                .neg_log_likelihood(odds_ratio_transform(pa, ra), odds_ratio_transform(pe, re))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> GenotypeCount {
        GenotypeCount::new([[10, 20, 5], [8, 12, 4], [3, 9, 30]])
    }

    #[test]
    fn test_coefficients() {
        let c = GenotypeCoefficients::new(&counts());
        // c0 = 40, c1 = 30, c2 = 14, c3 = 10, c4 = 15, c5 = 69
        assert_eq!(c.ref_pop1, 54.0);
        assert_eq!(c.alt_pop1, 40.0);
        assert_eq!(c.ref_pop2, 29.0);
        assert_eq!(c.alt_pop2, 79.0);
    }

    #[test]
    fn test_coefficients_match_haplotype_totals() {
        let g = counts();
        let c = GenotypeCoefficients::new(&g);
        // every individual contributes two haplotypes
        let haplotypes = c.ref_pop1 + c.alt_pop1 + c.ref_pop2 + c.alt_pop2;
        assert_eq!(haplotypes, 2.0 * g.total() as f64);
    }

    #[test]
    fn test_frequency_estimates_minimize() {
        let c = GenotypeCoefficients::new(&counts());
        let [pa, pe] = c.frequency_estimates();
        let best = c.neg_log_likelihood(pa, pe);
        for &(da, de) in &[(0.01, 0.0), (-0.01, 0.0), (0.0, 0.01), (0.0, -0.01)] {
            assert!(c.neg_log_likelihood(pa + da, pe + de) > best);
        }
    }

    #[test]
    fn test_empty_ancestry_is_nan() {
        let g = GenotypeCount::new([[0, 0, 0], [0, 0, 0], [1, 2, 3]]);
        let [pa, pe] = GenotypeCoefficients::new(&g).frequency_estimates();
        assert!(pa.is_nan());
        assert!(pe.is_finite());
    }

    #[test]
    fn test_nested_models_agree_at_unit_ratio() {
        let cases = GenotypeCount::new([[4, 10, 6], [3, 5, 2], [1, 4, 9]]);
        let controls = counts();
        let freq = GenotypeLikelihood::new(ModelKind::FrequencyOnly, &cases, &controls);
        let shared = GenotypeLikelihood::new(ModelKind::SharedOddsRatio, &cases, &controls);
        let full = GenotypeLikelihood::new(ModelKind::TwoOddsRatios, &cases, &controls);

        let f = freq.neg_log_likelihood(&[0.4, 0.3]);
        assert_eq!(shared.neg_log_likelihood(&[0.4, 0.3, 1.0]), f);
        assert_eq!(full.neg_log_likelihood(&[0.4, 0.3, 1.0, 1.0]), f);
        assert_eq!(
            full.neg_log_likelihood(&[0.4, 0.3, 1.7, 1.7]),
            shared.neg_log_likelihood(&[0.4, 0.3, 1.7])
        );
    }

    #[test]
    #[should_panic]
    fn test_wrong_arity_panics() {
        let g = counts();
        GenotypeLikelihood::new(ModelKind::SharedOddsRatio, &g, &g).neg_log_likelihood(&[0.5, 0.5]);
    }
}
