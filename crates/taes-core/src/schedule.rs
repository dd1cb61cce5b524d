//! Rijndael key schedule for 128, 192 and 256-bit keys.

use crate::key::{Key, RoundKeys, MAX_ROUND_KEYS};
use crate::sbox::{sbox, RCON};

const MAX_WORDS: usize = 4 * MAX_ROUND_KEYS;

fn rot_word(word: u32) -> u32 {
    word.rotate_left(8)
}

fn sub_word(word: u32) -> u32 {
    u32::from_be_bytes(word.to_be_bytes().map(sbox))
}

/// Expands `key` into `Nr + 1` round keys.
///
/// Words are big-endian (`w[i]` is key bytes `4i..4i+4`) and round key `r` is
/// words `4r..4r+4` laid out column by column.
pub fn expand_key(key: &Key) -> RoundKeys {
    let size = key.size();
    let nk = size.nk();
    let rounds = size.rounds();
    let total = 4 * (rounds + 1);

    let mut w = [0u32; MAX_WORDS];
    for (slot, chunk) in w.iter_mut().zip(key.as_bytes().chunks_exact(4)) {
        *slot = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    for i in nk..total {
        let mut temp = w[i - 1];
        if i % nk == 0 {
            temp = sub_word(rot_word(temp)) ^ (u32::from(RCON[i / nk - 1]) << 24);
        } else if nk > 6 && i % nk == 4 {
            temp = sub_word(temp);
        }
        w[i] = w[i - nk] ^ temp;
    }

    let round_keys = RoundKeys::from_fn(rounds, |round| {
        let mut block = [0u8; 16];
        for (word_idx, dst) in block.chunks_exact_mut(4).enumerate() {
            dst.copy_from_slice(&w[round * 4 + word_idx].to_be_bytes());
        }
        block
    });
    zeroize::Zeroize::zeroize(&mut w);
    round_keys
}
