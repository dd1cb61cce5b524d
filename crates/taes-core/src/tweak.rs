//! Tweak values, the tweak round and the round-key combine policies.
//!
//! The tweak is folded into exactly one middle round key: round 5 for
//! AES-128, 6 for AES-192 and 7 for AES-256. How it is folded in is decided
//! by [`CombinePolicy`]; the two policies produce different ciphertexts and
//! are not interoperable.

use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::block::{Block, BLOCK_LEN};
use crate::error::{Error, Result};
use crate::key::KeySize;

/// How a tweak is merged into its round key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombinePolicy {
    /// Bytewise XOR.
    Xor,
    /// Addition modulo 2^128, little-endian (byte 0 is least significant).
    Add,
}

impl CombinePolicy {
    /// Policy compiled into this build (`Add` with the `tweak-add` feature).
    #[cfg(not(feature = "tweak-add"))]
    pub const ACTIVE: CombinePolicy = CombinePolicy::Xor;

    /// Policy compiled into this build (`Add` with the `tweak-add` feature).
    #[cfg(feature = "tweak-add")]
    pub const ACTIVE: CombinePolicy = CombinePolicy::Add;

    /// Merges `tweak` into `round_key`.
    pub fn combine(self, round_key: &Block, tweak: &Tweak) -> Block {
        match self {
            Self::Xor => core::array::from_fn(|i| round_key[i] ^ tweak.0[i]),
            Self::Add => {
                let mut out = [0u8; BLOCK_LEN];
                let mut carry = 0u16;
                for (dst, (&k, &t)) in out.iter_mut().zip(round_key.iter().zip(tweak.0.iter())) {
                    let sum = u16::from(k) + u16::from(t) + carry;
                    *dst = sum as u8;
                    carry = sum >> 8;
                }
                out
            }
        }
    }
}

impl Default for CombinePolicy {
    fn default() -> Self {
        Self::ACTIVE
    }
}

impl fmt::Display for CombinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xor => f.write_str("xor"),
            Self::Add => f.write_str("add"),
        }
    }
}

/// Round index whose key receives the tweak.
pub const fn tweak_round(key_size: KeySize) -> usize {
    match key_size {
        KeySize::Aes128 => 5,
        KeySize::Aes192 => 6,
        KeySize::Aes256 => 7,
    }
}

/// A 16-byte tweak.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Tweak(Block);

impl Tweak {
    /// Wraps 16 tweak bytes.
    pub const fn new(bytes: Block) -> Self {
        Self(bytes)
    }

    /// Parses an optional tweak: empty means "no tweak", otherwise exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Option<Self>> {
        match bytes.len() {
            0 => Ok(None),
            BLOCK_LEN => {
                let mut block = [0u8; BLOCK_LEN];
                block.copy_from_slice(bytes);
                Ok(Some(Self(block)))
            }
            other => Err(Error::config(format!(
                "tweak must be empty or 16 bytes, got {other}"
            ))),
        }
    }

    /// Tweak bytes.
    pub fn as_bytes(&self) -> &Block {
        &self.0
    }

    /// This tweak advanced by `index` as a little-endian 128-bit counter (wrapping).
    pub fn offset(&self, index: u64) -> Self {
        let value = u128::from_le_bytes(self.0).wrapping_add(u128::from(index));
        Self(value.to_le_bytes())
    }
}

impl From<Block> for Tweak {
    fn from(value: Block) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Tweak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tweak(..)")
    }
}

/// Tweak for block `index` of a message whose first block uses `base`.
///
/// A pure function of the index, so blocks can be processed in any order.
pub fn tweak_for_index(base: Option<&Tweak>, index: u64) -> Option<Tweak> {
    base.map(|tweak| tweak.offset(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweak_rounds_per_key_size() {
        assert_eq!(tweak_round(KeySize::Aes128), 5);
        assert_eq!(tweak_round(KeySize::Aes192), 6);
        assert_eq!(tweak_round(KeySize::Aes256), 7);
    }

    #[test]
    fn xor_combine() {
        let key = [0xffu8; 16];
        let tweak = Tweak::new(core::array::from_fn(|i| i as u8));
        let combined = CombinePolicy::Xor.combine(&key, &tweak);
        assert_eq!(combined, core::array::from_fn(|i| 0xff ^ i as u8));
    }

    #[test]
    fn add_combine_propagates_carry_from_byte_zero() {
        let mut key = [0u8; 16];
        key[0] = 0xff;
        key[1] = 0xff;
        let mut t = [0u8; 16];
        t[0] = 0x01;
        let combined = CombinePolicy::Add.combine(&key, &Tweak::new(t));
        let mut expected = [0u8; 16];
        expected[2] = 0x01;
        assert_eq!(combined, expected);
    }

    #[test]
    fn add_combine_drops_final_carry() {
        let key = [0xffu8; 16];
        let mut t = [0u8; 16];
        t[0] = 0x02;
        let combined = CombinePolicy::Add.combine(&key, &Tweak::new(t));
        let mut expected = [0u8; 16];
        expected[0] = 0x01;
        assert_eq!(combined, expected);
    }

    #[test]
    fn add_combine_matches_u128_arithmetic() {
        let key: Block = core::array::from_fn(|i| (i as u8).wrapping_mul(37).wrapping_add(200));
        let tweak: Block = core::array::from_fn(|i| (i as u8).wrapping_mul(91).wrapping_add(17));
        let expected = u128::from_le_bytes(key)
            .wrapping_add(u128::from_le_bytes(tweak))
            .to_le_bytes();
        assert_eq!(CombinePolicy::Add.combine(&key, &Tweak::new(tweak)), expected);
    }

    #[test]
    fn tweak_for_index_counts_little_endian() {
        let mut base = [0u8; 16];
        base[0] = 0xfe;
        let base = Tweak::new(base);

        let next = tweak_for_index(Some(&base), 1).expect("tweak");
        assert_eq!(next.as_bytes()[0], 0xff);
        assert_eq!(next.as_bytes()[1], 0x00);

        let wrapped = tweak_for_index(Some(&base), 2).expect("tweak");
        assert_eq!(wrapped.as_bytes()[0], 0x00);
        assert_eq!(wrapped.as_bytes()[1], 0x01);

        assert_eq!(tweak_for_index(Some(&base), 0), Some(base.clone()));
        assert_eq!(tweak_for_index(None, 5), None);
    }

    #[test]
    fn tweak_counter_wraps_at_2_pow_128() {
        let base = Tweak::new([0xff; 16]);
        assert_eq!(base.offset(1), Tweak::new([0u8; 16]));
    }

    #[test]
    fn tweak_slice_parsing() {
        assert_eq!(Tweak::from_slice(&[]), Ok(None));
        assert_eq!(Tweak::from_slice(&[9u8; 16]), Ok(Some(Tweak::new([9u8; 16]))));
        assert!(matches!(Tweak::from_slice(&[0u8; 8]), Err(Error::Configuration(_))));
    }
}
