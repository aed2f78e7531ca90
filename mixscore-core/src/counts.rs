//! Ancestry-stratified count aggregation.
//!
//! Per-site inputs are haplotype-level arrays: individual `i` occupies
//! columns `2i` and `2i + 1`. Ancestry labels are 0 (pop1) and 1 (pop2);
//! alleles are 0 (reference) and 1 (non-reference).

use serde::{Deserialize, Serialize};

/// Genotype counts stratified by local ancestry.
///
/// Rows: ancestry state {pop1/pop1, mixed, pop2/pop2}.
/// Columns: copies of the non-reference allele {0, 1, 2}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenotypeCount {
    pub cells: [[u64; 3]; 3],
}

impl GenotypeCount {
    pub fn new(cells: [[u64; 3]; 3]) -> Self {
        Self { cells }
    }

    /// Tabulate individuals from haplotype-level ancestry and allele arrays.
    pub fn from_haplotype_arrays(individuals: &[usize], ancestry: &[u8], alleles: &[u8]) -> Self {
        assert_eq!(ancestry.len(), alleles.len());
        let mut counts = Self::default();
        for &i in individuals {
            let state = ancestry[2 * i] + ancestry[2 * i + 1];
            let genotype = alleles[2 * i] + alleles[2 * i + 1];
            counts.increment(state as usize, genotype as usize);
        }
        counts
    }

    /// Tabulate individuals whose genotype is given directly (one entry per
    /// individual) while ancestry stays haplotype-level.
    pub fn from_genotypes(individuals: &[usize], ancestry: &[u8], genotypes: &[u8]) -> Self {
        assert_eq!(ancestry.len(), 2 * genotypes.len());
        let mut counts = Self::default();
        for &i in individuals {
            let state = ancestry[2 * i] + ancestry[2 * i + 1];
            counts.increment(state as usize, genotypes[i] as usize);
        }
        counts
    }

    pub fn increment(&mut self, ancestry_state: usize, genotype: usize) {
        self.cells[ancestry_state][genotype] += 1;
    }

    pub fn get(&self, ancestry_state: usize, genotype: usize) -> u64 {
        self.cells[ancestry_state][genotype]
    }

    pub fn row_total(&self, ancestry_state: usize) -> u64 {
        self.cells[ancestry_state].iter().sum()
    }

    /// Number of individuals tabulated.
    pub fn total(&self) -> u64 {
        (0..3).map(|r| self.row_total(r)).sum()
    }
}

/// Allele counts stratified by haplotype ancestry.
///
/// Rows: haplotype ancestry {pop1, pop2}. Columns: {reference, non-reference}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlleleCount {
    pub cells: [[u64; 2]; 2],
}

impl AlleleCount {
    pub fn new(cells: [[u64; 2]; 2]) -> Self {
        Self { cells }
    }

    /// Tabulate both haplotypes of every listed individual.
    pub fn from_haplotypes(individuals: &[usize], ancestry: &[u8], alleles: &[u8]) -> Self {
        assert_eq!(ancestry.len(), alleles.len());
        let mut counts = Self::default();
        for &i in individuals {
            for h in [2 * i, 2 * i + 1] {
                counts.cells[ancestry[h] as usize][alleles[h] as usize] += 1;
            }
        }
        counts
    }

    pub fn get(&self, ancestry: usize, allele: usize) -> u64 {
        self.cells[ancestry][allele]
    }

    /// Number of haplotypes tabulated.
    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }
}

/// Number of pop1 haplotypes (0, 1 or 2) carried by each listed individual.
pub fn admixture_dosages(individuals: &[usize], ancestry: &[u8]) -> Vec<u8> {
    individuals
        .iter()
        .map(|&i| 2 - (ancestry[2 * i] + ancestry[2 * i + 1]))
        .collect()
}

/// Genome-wide pop1 proportions of the listed individuals.
pub fn pop1_proportions(individuals: &[usize], proportions: &[f64]) -> Vec<f64> {
    individuals.iter().map(|&i| proportions[i]).collect()
}
