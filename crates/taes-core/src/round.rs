//! AES round transformations over the 4x4 state matrix.

use crate::block::{Block, State};
use crate::gf::{gmul, xtime};
use crate::sbox::{inv_sbox, sbox};

/// Applies SubBytes to the state in place.
#[inline]
pub fn sub_bytes(state: &mut State) {
    for byte in state.0.iter_mut().flatten() {
        *byte = sbox(*byte);
    }
}

/// Applies the inverse SubBytes transformation.
#[inline]
pub fn inv_sub_bytes(state: &mut State) {
    for byte in state.0.iter_mut().flatten() {
        *byte = inv_sbox(*byte);
    }
}

/// Performs ShiftRows in place: row `r` rotates left by `r` positions.
#[inline]
pub fn shift_rows(state: &mut State) {
    for (r, row) in state.0.iter_mut().enumerate() {
        row.rotate_left(r);
    }
}

/// Performs the inverse of ShiftRows in place.
#[inline]
pub fn inv_shift_rows(state: &mut State) {
    for (r, row) in state.0.iter_mut().enumerate() {
        row.rotate_right(r);
    }
}

fn mix_single_column(col: [u8; 4]) -> [u8; 4] {
    let [s0, s1, s2, s3] = col;
    [
        xtime(s0) ^ (xtime(s1) ^ s1) ^ s2 ^ s3,
        s0 ^ xtime(s1) ^ (xtime(s2) ^ s2) ^ s3,
        s0 ^ s1 ^ xtime(s2) ^ (xtime(s3) ^ s3),
        (xtime(s0) ^ s0) ^ s1 ^ s2 ^ xtime(s3),
    ]
}

fn inv_mix_single_column(col: [u8; 4]) -> [u8; 4] {
    let [s0, s1, s2, s3] = col;
    [
        gmul(s0, 0x0e) ^ gmul(s1, 0x0b) ^ gmul(s2, 0x0d) ^ gmul(s3, 0x09),
        gmul(s0, 0x09) ^ gmul(s1, 0x0e) ^ gmul(s2, 0x0b) ^ gmul(s3, 0x0d),
        gmul(s0, 0x0d) ^ gmul(s1, 0x09) ^ gmul(s2, 0x0e) ^ gmul(s3, 0x0b),
        gmul(s0, 0x0b) ^ gmul(s1, 0x0d) ^ gmul(s2, 0x09) ^ gmul(s3, 0x0e),
    ]
}

/// MixColumns over all four columns.
#[inline]
pub fn mix_columns(state: &mut State) {
    for col in 0..4 {
        let mixed = mix_single_column(state.column(col));
        state.set_column(col, mixed);
    }
}

/// Inverse MixColumns over all four columns.
#[inline]
pub fn inv_mix_columns(state: &mut State) {
    for col in 0..4 {
        let mixed = inv_mix_single_column(state.column(col));
        state.set_column(col, mixed);
    }
}

/// Adds (XORs) a round key into the state; key byte `i` meets state `[i % 4][i / 4]`.
#[inline]
pub fn add_round_key(state: &mut State, round_key: &Block) {
    for (i, k) in round_key.iter().enumerate() {
        state.0[i % 4][i / 4] ^= *k;
    }
}

/// InvMixColumns applied to a flat block.
#[cfg(test)]
pub(crate) fn inv_mix_block(block: &Block) -> Block {
    let mut state = State::from_block(block);
    inv_mix_columns(&mut state);
    state.to_block()
}
