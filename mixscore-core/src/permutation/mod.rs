//! Permutation-based significance.
//!
//! [`run_permutations`] relabels cases and controls and tallies permuted
//! statistics against the observed one, stopping early once the observed
//! value is clearly unremarkable. [`run_adaptive`] grows a replicate
//! budget in increments until the empirical p-value is large enough or
//! the cap is reached.

pub mod adaptive;
pub mod engine;
pub mod tally;

pub use adaptive::{run_adaptive, AdaptiveConfig, AdaptiveOutcome};
pub use engine::{run_permutations, PermutationConfig, PermutationOutcome, PermutationStatus};
pub use tally::PermutationTally;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Independent generator for one draw: keyed by seed, with the draw index
/// as stream so results do not depend on scheduling.
pub(crate) fn draw_rng(seed: u64, draw: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(draw);
    rng
}
