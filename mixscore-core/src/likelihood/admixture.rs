//! Admixture-only likelihood over case individuals.
//!
//! A case with genome-wide pop1 proportion `theta` carries `k` pop1
//! haplotypes at the locus with probability proportional to the binomial
//! weights after scaling the pop1 odds by `omega`:
//!   d  = (omega theta)^2 + 2 omega theta (1 - theta) + (1 - theta)^2
//!   q0 = (1 - theta)^2 / d
//!   q1 = 2 omega theta (1 - theta) / d
//!   q2 = (omega theta)^2 / d

use super::Likelihood;

#[derive(Debug, Clone)]
pub struct AdmixtureLikelihood {
    dosages: Vec<u8>,
    proportions: Vec<f64>,
}

impl AdmixtureLikelihood {
    /// `dosages[i]` is the pop1 haplotype count of case `i`, `proportions[i]`
    /// its genome-wide pop1 proportion.
    pub fn new(dosages: Vec<u8>, proportions: Vec<f64>) -> Self {
        assert_eq!(dosages.len(), proportions.len());
        Self { dosages, proportions }
    }

    pub fn len(&self) -> usize {
        self.dosages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dosages.is_empty()
    }

    pub fn neg_log_likelihood_at(&self, omega: f64) -> f64 {
        self.dosages
            .iter()
            .zip(&self.proportions)
            .map(|(&k, &theta)| {
                let pop1 = omega * theta;
                let pop2 = 1.0 - theta;
                let d = pop1 * pop1 + 2.0 * pop1 * pop2 + pop2 * pop2;
                let q = match k {
                    0 => pop2 * pop2,
                    1 => 2.0 * pop1 * pop2,
                    _ => pop1 * pop1,
                } / d;
                -q.ln()
            })
            .sum()
    }
}

impl Likelihood for AdmixtureLikelihood {
    fn arity(&self) -> usize {
        1
    }

    fn neg_log_likelihood(&self, params: &[f64]) -> f64 {
        assert_eq!(params.len(), 1);
        self.neg_log_likelihood_at(params[0])
    }
}
