//! Single-elimination bracket layout.
//!
//! Players are shuffled and spread over `2^rounds` slots: even slots first, then odd ones.
//! Slots left empty are byes. With 5 players, 8 slots are allocated and the three byes end up
//! facing players rather than each other.

use rand::{seq::SliceRandom, Rng};

/// Number of rounds needed to get a single survivor out of `players` players.
pub fn rounds_for(players: usize) -> u32 {
    if players <= 1 {
        0
    } else {
        players.next_power_of_two().trailing_zeros()
    }
}

/// Shuffles `players` into the first round of a bracket.
pub fn allocate<T: Clone>(players: &[T], rng: &mut impl Rng) -> Vec<Option<T>> {
    let mut shuffled = players.to_vec();
    shuffled.shuffle(rng);

    let size = 1usize << rounds_for(players.len());
    let mut slots = vec![None; size];
    let indices = (0..size).step_by(2).chain((1..size).step_by(2));
    for (index, player) in indices.zip(shuffled) {
        slots[index] = Some(player);
    }
    slots
}

/// Panics unless `len` slots can be paired down to one.
pub fn assert_power_of_two(len: usize) {
    assert!(
        len.is_power_of_two(),
        "bracket round with {len} slots, expected a power of two"
    );
}
