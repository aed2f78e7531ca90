//! Likelihood-ratio association tests.
//!
//! Sites are tested independently: per-site counts feed the nested model
//! fits of the selected algorithm, whose likelihood-ratio statistics are
//! summed into the site statistic, optionally followed by case/control
//! permutations.

pub mod algorithm;
pub mod scan;
pub mod site;
pub mod statistic;

pub use algorithm::{Algorithm, Comparison};
pub use scan::{scan_sites, AssocConfig, SiteReport};
pub use site::{test_site, Cohort, ComparisonResult, Site, SiteTest};
pub use statistic::{chi_square_p_value, degrees_of_freedom, LikelihoodRatioTest};
