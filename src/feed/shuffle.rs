//! Fisher–Yates shuffle over an injected random source

use rand::seq::SliceRandom;
use rand::Rng;

/// Uniform in-place permutation.
///
/// `SliceRandom::shuffle` walks from the last index down to 1, swapping each
/// slot with one drawn uniformly from `[0, i]`. Slices of length 0 or 1 are
/// left untouched and draw nothing from `rng`.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}
