//! mixscore-core: Admixture-aware association tests
//!
//! Implements ancestry-stratified count aggregation, the nested
//! genotype/haplotype/admixture likelihood models, bounded numerical
//! optimizers (CMA-ES and Brent), likelihood-ratio statistics,
//! permutation and adaptive bootstrap significance, and legacy report
//! rendering.

pub mod assoc;
pub mod bootstrap;
pub mod counts;
pub mod likelihood;
pub mod model;
pub mod optim;
pub mod permutation;
pub mod report;
