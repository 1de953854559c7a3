//! Sparse bitmap of initialized ticks
//!
//! Compressed tick `tick / spacing` (floored) maps to word `compressed >> 8`
//! and bit `compressed & 0xff`. Words that become empty are dropped, so the map
//! only holds words with at least one initialized tick.

use primitive_types::U256;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickBitmap {
    words: HashMap<i16, U256>,
}

fn compress(tick: i32, tick_spacing: i32) -> i32 {
    tick.div_euclid(tick_spacing)
}

fn position(compressed: i32) -> (i16, u8) {
    ((compressed >> 8) as i16, (compressed & 0xff) as u8)
}

fn most_significant_bit(word: U256) -> u8 {
    (255 - word.leading_zeros()) as u8
}

fn least_significant_bit(word: U256) -> u8 {
    word.trailing_zeros() as u8
}

impl TickBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the bit of an aligned tick
    pub fn flip_tick(&mut self, tick: i32, tick_spacing: i32) {
        let (word_pos, bit_pos) = position(compress(tick, tick_spacing));
        let mask = U256::one() << bit_pos;
        let word = self.words.get(&word_pos).copied().unwrap_or_default() ^ mask;
        if word.is_zero() {
            self.words.remove(&word_pos);
        } else {
            self.words.insert(word_pos, word);
        }
    }

    pub fn is_initialized(&self, tick: i32, tick_spacing: i32) -> bool {
        let (word_pos, bit_pos) = position(compress(tick, tick_spacing));
        self.words
            .get(&word_pos)
            .map(|word| word.bit(bit_pos as usize))
            .unwrap_or(false)
    }

    /// Number of words currently holding at least one set bit
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Next initialized tick inside the word of `tick`.
    ///
    /// `lte` searches at or below `tick`; otherwise strictly above. When the
    /// word has no candidate, returns the word boundary with `false`. The
    /// returned tick may lie outside the global tick bounds.
    pub fn next_initialized_tick_within_one_word(
        &self,
        tick: i32,
        tick_spacing: i32,
        lte: bool,
    ) -> (i32, bool) {
        let compressed = compress(tick, tick_spacing);

        if lte {
            let (word_pos, bit_pos) = position(compressed);
            // all bits at or to the right of bit_pos
            let mask = (U256::one() << bit_pos) - U256::one() + (U256::one() << bit_pos);
            let masked = self.words.get(&word_pos).copied().unwrap_or_default() & mask;

            if masked.is_zero() {
                ((compressed - bit_pos as i32) * tick_spacing, false)
            } else {
                let offset = bit_pos as i32 - most_significant_bit(masked) as i32;
                ((compressed - offset) * tick_spacing, true)
            }
        } else {
            let (word_pos, bit_pos) = position(compressed + 1);
            // all bits at or to the left of bit_pos
            let mask = !((U256::one() << bit_pos) - U256::one());
            let masked = self.words.get(&word_pos).copied().unwrap_or_default() & mask;

            if masked.is_zero() {
                ((compressed + 1 + (255 - bit_pos as i32)) * tick_spacing, false)
            } else {
                let offset = least_significant_bit(masked) as i32 - bit_pos as i32;
                ((compressed + 1 + offset) * tick_spacing, true)
            }
        }
    }
}
