//! Named association tests and the model pairs they compare.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};

use crate::model::{DataFamily, ModelKind};

/// One nested model pair evaluated by a likelihood-ratio test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub null: ModelKind,
    pub alt: ModelKind,
}

impl Comparison {
    pub const fn new(null: ModelKind, alt: ModelKind) -> Self {
        Self { null, alt }
    }

    pub fn family(&self) -> DataFamily {
        self.alt.family()
    }
}

const SNP1: [Comparison; 1] = [Comparison::new(ModelKind::FrequencyOnly, ModelKind::SharedOddsRatio)];
const HET1: [Comparison; 1] = [Comparison::new(ModelKind::SharedOddsRatio, ModelKind::TwoOddsRatios)];
const HET2: [Comparison; 1] = [Comparison::new(ModelKind::FrequencyOnly, ModelKind::TwoOddsRatios)];
const HAP1: [Comparison; 1] = [Comparison::new(
    ModelKind::HaplotypeFrequencyOnly,
    ModelKind::HaplotypeSharedOddsRatio,
)];
const HAP2: [Comparison; 1] = [Comparison::new(
    ModelKind::HaplotypeFrequencyOnly,
    ModelKind::HaplotypeTwoOddsRatios,
)];
const ADM: [Comparison; 1] = [Comparison::new(ModelKind::AdmixtureNull, ModelKind::Admixture)];
const ADMHAP2: [Comparison; 2] = [HAP2[0], ADM[0]];

/// Association test selected by its legacy name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Algorithm {
    /// Shared odds ratio against frequency-only, genotype level.
    Snp1,
    /// Two odds ratios against a shared one, genotype level.
    Het1,
    /// Two odds ratios against frequency-only, genotype level.
    Het2,
    /// Shared odds ratio against frequency-only, haplotype level.
    Hap1,
    /// Free case frequencies against frequency-only, haplotype level.
    Hap2,
    /// Admixture-only test on cases.
    Adm,
    /// Sum of the HAP2 and ADM statistics.
    AdmHap2,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Snp1,
        Algorithm::Het1,
        Algorithm::Het2,
        Algorithm::Hap1,
        Algorithm::Hap2,
        Algorithm::Adm,
        Algorithm::AdmHap2,
    ];

    /// Model pairs whose statistics are summed into the site statistic.
    pub fn comparisons(&self) -> &'static [Comparison] {
        match self {
            Algorithm::Snp1 => &SNP1,
            Algorithm::Het1 => &HET1,
            Algorithm::Het2 => &HET2,
            Algorithm::Hap1 => &HAP1,
            Algorithm::Hap2 => &HAP2,
            Algorithm::Adm => &ADM,
            Algorithm::AdmHap2 => &ADMHAP2,
        }
    }

    pub fn degrees_of_freedom(&self) -> usize {
        self.comparisons()
            .iter()
            .map(|c| c.alt.arity() - c.null.arity())
            .sum()
    }

    /// Whether per-individual pop1 proportions are required.
    pub fn needs_proportions(&self) -> bool {
        self.comparisons()
            .iter()
            .any(|c| c.family() == DataFamily::Admixture)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Snp1 => "SNP1",
            Algorithm::Het1 => "HET1",
            Algorithm::Het2 => "HET2",
            Algorithm::Hap1 => "HAP1",
            Algorithm::Hap2 => "HAP2",
            Algorithm::Adm => "ADM",
            Algorithm::AdmHap2 => "ADMHAP2",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match Algorithm::ALL.iter().find(|a| a.name() == upper) {
            Some(a) => Ok(*a),
            None => bail!(
                "unknown algorithm '{}', expected one of SNP1, HET1, HET2, HAP1, HAP2, ADM, ADMHAP2",
                s
            ),
        }
    }
}
