//! Portable tweakable AES over the explicit state matrix.

use crate::block::{Block, State};
use crate::key::{Key, KeySize, RoundKeys};
use crate::round::{
    add_round_key, inv_mix_columns, inv_shift_rows, inv_sub_bytes, mix_columns, shift_rows,
    sub_bytes,
};
use crate::schedule::expand_key;
use crate::tweak::{tweak_round, CombinePolicy, Tweak};

/// Software cipher bound to one expanded key.
#[derive(Clone, Debug)]
pub struct SoftwareCipher {
    key_size: KeySize,
    round_keys: RoundKeys,
    combine: CombinePolicy,
}

impl SoftwareCipher {
    /// Expands `key` and binds the combine policy.
    pub fn new(key: &Key, combine: CombinePolicy) -> Self {
        Self {
            key_size: key.size(),
            round_keys: expand_key(key),
            combine,
        }
    }

    /// Expanded round keys.
    pub fn round_keys(&self) -> &RoundKeys {
        &self.round_keys
    }

    /// Key size this cipher was built for.
    pub fn key_size(&self) -> KeySize {
        self.key_size
    }

    /// Tweak combine policy.
    pub fn combine(&self) -> CombinePolicy {
        self.combine
    }

    fn middle_key(&self, round: usize, tweak: Option<&Tweak>) -> Block {
        let rk = self.round_keys.get(round);
        match tweak {
            Some(t) if round == tweak_round(self.key_size) => self.combine.combine(rk, t),
            _ => *rk,
        }
    }

    /// Encrypts one block.
    pub fn encrypt(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        let nr = self.round_keys.rounds();
        let mut state = State::from_block(block);

        add_round_key(&mut state, self.round_keys.get(0));
        for round in 1..nr {
            sub_bytes(&mut state);
            shift_rows(&mut state);
            mix_columns(&mut state);
            add_round_key(&mut state, &self.middle_key(round, tweak));
        }
        sub_bytes(&mut state);
        shift_rows(&mut state);
        add_round_key(&mut state, self.round_keys.get(nr));

        state.to_block()
    }

    /// Decrypts one block.
    pub fn decrypt(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        let nr = self.round_keys.rounds();
        let mut state = State::from_block(block);

        add_round_key(&mut state, self.round_keys.get(nr));
        for round in (1..nr).rev() {
            inv_shift_rows(&mut state);
            inv_sub_bytes(&mut state);
            // The tweaked key goes in before InvMixColumns, mirroring encryption.
            add_round_key(&mut state, &self.middle_key(round, tweak));
            inv_mix_columns(&mut state);
        }
        inv_shift_rows(&mut state);
        inv_sub_bytes(&mut state);
        add_round_key(&mut state, self.round_keys.get(0));

        state.to_block()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore};

    fn cipher(hex_key: &str, combine: CombinePolicy) -> SoftwareCipher {
        let key = Key::from_bytes(&hex::decode(hex_key).expect("hex")).expect("key");
        SoftwareCipher::new(&key, combine)
    }

    fn block(hex_str: &str) -> Block {
        hex::decode(hex_str).expect("hex").try_into().expect("16 bytes")
    }

    #[test]
    fn fips197_appendix_c_vectors() {
        let pt = block("00112233445566778899aabbccddeeff");
        let cases = [
            ("000102030405060708090a0b0c0d0e0f", "69c4e0d86a7b0430d8cdb78070b4c55a"),
            (
                "000102030405060708090a0b0c0d0e0f1011121314151617",
                "dda97ca4864cdfe06eaf70a0ec0d7191",
            ),
            (
                "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
                "8ea2b7ca516745bfeafc49904b496089",
            ),
        ];
        for (key_hex, ct_hex) in cases {
            let c = cipher(key_hex, CombinePolicy::Xor);
            assert_eq!(c.encrypt(&pt, None), block(ct_hex), "key {key_hex}");
            assert_eq!(c.decrypt(&block(ct_hex), None), pt, "key {key_hex}");
        }
    }

    #[test]
    fn tweak_changes_ciphertext_and_round_trips() {
        let mut rng = rand::thread_rng();
        for size in KeySize::ALL {
            for policy in [CombinePolicy::Xor, CombinePolicy::Add] {
                for _ in 0..20 {
                    let mut key_bytes = vec![0u8; size.key_len()];
                    rng.fill_bytes(&mut key_bytes);
                    let c = SoftwareCipher::new(&Key::new(size, &key_bytes).expect("key"), policy);
                    let pt: Block = rng.gen();
                    let mut t: Block = rng.gen();
                    t[0] |= 1;
                    let tweak = Tweak::new(t);

                    let plain_ct = c.encrypt(&pt, None);
                    let tweaked_ct = c.encrypt(&pt, Some(&tweak));
                    assert_ne!(plain_ct, tweaked_ct);
                    assert_eq!(c.decrypt(&tweaked_ct, Some(&tweak)), pt);
                    assert_eq!(c.decrypt(&plain_ct, None), pt);
                }
            }
        }
    }

    #[test]
    fn zero_tweak_with_xor_is_plain_aes() {
        let c = cipher("2b7e151628aed2a6abf7158809cf4f3c", CombinePolicy::Xor);
        let pt = block("6bc1bee22e409f96e93d7e117393172a");
        let zero = Tweak::new([0u8; 16]);
        assert_eq!(c.encrypt(&pt, Some(&zero)), c.encrypt(&pt, None));
    }

    #[test]
    fn policies_disagree_when_carries_occur() {
        let c_xor = cipher("2b7e151628aed2a6abf7158809cf4f3c", CombinePolicy::Xor);
        let c_add = cipher("2b7e151628aed2a6abf7158809cf4f3c", CombinePolicy::Add);
        let pt = block("6bc1bee22e409f96e93d7e117393172a");
        let tweak = Tweak::new([0xff; 16]);
        assert_ne!(c_xor.encrypt(&pt, Some(&tweak)), c_add.encrypt(&pt, Some(&tweak)));
    }
}
