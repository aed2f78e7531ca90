//! Haplotype-level likelihood with local ancestry.
//!
//! Each haplotype is an independent Bernoulli draw at the reference
//! frequency of its ancestry:
//!   -ln L = -(h00 ln pa + h01 ln(1 - pa) + h10 ln pe + h11 ln(1 - pe))

use super::{odds_ratio_transform, weighted_ln, Likelihood};
use crate::counts::AlleleCount;
use crate::model::{DataFamily, ModelKind};

fn allele_neg_log_likelihood(h: &[[f64; 2]; 2], pa: f64, pe: f64) -> f64 {
    -(weighted_ln(h[0][0], pa)
        + weighted_ln(h[0][1], 1.0 - pa)
        + weighted_ln(h[1][0], pe)
        + weighted_ln(h[1][1], 1.0 - pe))
}

fn as_f64(a: &AlleleCount) -> [[f64; 2]; 2] {
    [
        [a.get(0, 0) as f64, a.get(0, 1) as f64],
        [a.get(1, 0) as f64, a.get(1, 1) as f64],
    ]
}

/// Reference frequencies `[pa, pe]` estimated from one group's allele counts.
pub fn frequency_estimates(a: &AlleleCount) -> [f64; 2] {
    let h = as_f64(a);
    [h[0][0] / (h[0][0] + h[0][1]), h[1][0] / (h[1][0] + h[1][1])]
}

#[derive(Debug, Clone)]
pub struct HaplotypeLikelihood {
    kind: ModelKind,
    cases: [[f64; 2]; 2],
    controls: [[f64; 2]; 2],
}

impl HaplotypeLikelihood {
    pub fn new(kind: ModelKind, cases: &AlleleCount, controls: &AlleleCount) -> Self {
        assert_eq!(kind.family(), DataFamily::Haplotype);
        Self {
            kind,
            cases: as_f64(cases),
            controls: as_f64(controls),
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }
}

impl Likelihood for HaplotypeLikelihood {
    fn arity(&self) -> usize {
        self.kind.arity()
    }

    fn neg_log_likelihood(&self, params: &[f64]) -> f64 {
        assert_eq!(params.len(), self.arity());
        let (pa, pe) = (params[0], params[1]);
        let (case_pa, case_pe) = match self.kind {
            ModelKind::HaplotypeTwoOddsRatios => (params[2], params[3]),
            ModelKind::HaplotypeSharedOddsRatio => (
                odds_ratio_transform(pa, params[2]),
                odds_ratio_transform(pe, params[2]),
            ),
            _ => (odds_ratio_transform(pa, 1.0), odds_ratio_transform(pe, 1.0)),
        };
        allele_neg_log_likelihood(&self.controls, pa, pe)
            + allele_neg_log_likelihood(&self.cases, case_pa, case_pe)
    }
}
