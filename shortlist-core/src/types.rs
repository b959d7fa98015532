use core::cmp::{max, min};

/// Position of a word inside a sentence.
pub type Link = u16;
/// Interned token id; 0 is reserved for NULL.
pub type Token = u32;

#[cfg(feature = "double-precision")]
pub type Count = f64;
#[cfg(not(feature = "double-precision"))]
pub type Count = f32;

/// Normalized probability stored in lexicon and shortlist tables.
pub type Prob = f64;

pub const NULL_LINK: Link = 0xffff;
pub const NULL_TOKEN: Token = 0;
pub const NULL_WORD: &str = "NULL";

pub const MAX_SENT_LEN: usize = 0x400;

pub const JUMP_ARRAY_LEN: usize = 0x80;
pub const JUMP_ALPHA: Count = 0.5;

/// Fixed-point scale for expected counts; integer sums keep the
/// parallel reduction exact and order independent.
pub const COUNT_SCALE: f64 = (1u64 << 20) as f64;

/// Lower bound for a lexical probability that was never observed.
pub const LEX_FLOOR: Prob = 1e-7;

/// Position on the diagonal for generated position `j`.
#[inline]
pub fn diagonal(j: usize, cond_len: usize, gen_len: usize) -> usize {
    j * cond_len / gen_len
}

#[inline]
pub fn get_jump_index(i: usize, diag: usize) -> usize {
    let z = i as isize - diag as isize + (JUMP_ARRAY_LEN as isize) / 2;
    max(0, min((JUMP_ARRAY_LEN as isize) - 1, z)) as usize
}

#[inline]
pub fn to_fixed(p: Count) -> u64 {
    (p as f64 * COUNT_SCALE).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_index_is_centered_and_clamped() {
        assert_eq!(get_jump_index(3, 3), JUMP_ARRAY_LEN / 2);
        assert_eq!(get_jump_index(4, 3), JUMP_ARRAY_LEN / 2 + 1);
        assert_eq!(get_jump_index(0, 5000), 0);
        assert_eq!(get_jump_index(5000, 0), JUMP_ARRAY_LEN - 1);
    }

    #[test]
    fn diagonal_scales_with_lengths() {
        assert_eq!(diagonal(1, 2, 2), 1);
        assert_eq!(diagonal(3, 2, 4), 1);
        assert_eq!(diagonal(0, 7, 3), 0);
    }
}
