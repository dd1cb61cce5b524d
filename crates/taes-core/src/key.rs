//! Key sizes, master keys and expanded round keys.

use core::fmt;
use core::str::FromStr;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::block::Block;
use crate::error::{Error, Result};

/// Largest round-key count (AES-256: 14 rounds + 1).
pub const MAX_ROUND_KEYS: usize = 15;

/// Supported AES key sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeySize {
    /// 128-bit key, 10 rounds.
    Aes128,
    /// 192-bit key, 12 rounds.
    Aes192,
    /// 256-bit key, 14 rounds.
    Aes256,
}

impl KeySize {
    /// All key sizes, smallest first.
    pub const ALL: [KeySize; 3] = [KeySize::Aes128, KeySize::Aes192, KeySize::Aes256];

    /// Maps a bit count to a key size.
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            128 => Ok(Self::Aes128),
            192 => Ok(Self::Aes192),
            256 => Ok(Self::Aes256),
            other => Err(Error::config(format!(
                "unsupported key size {other}, expected 128, 192 or 256"
            ))),
        }
    }

    /// Key size in bits.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Aes128 => 128,
            Self::Aes192 => 192,
            Self::Aes256 => 256,
        }
    }

    /// Key length in bytes.
    pub const fn key_len(self) -> usize {
        self.bits() as usize / 8
    }

    /// Number of 32-bit words in the key (`Nk`).
    pub const fn nk(self) -> usize {
        self.key_len() / 4
    }

    /// Number of rounds (`Nr`).
    pub const fn rounds(self) -> usize {
        self.nk() + 6
    }
}

impl FromStr for KeySize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bits: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("unsupported key size {s:?}")))?;
        Self::from_bits(bits)
    }
}

impl fmt::Display for KeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AES-{}", self.bits())
    }
}

/// Master key bytes together with their declared size.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    #[zeroize(skip)]
    size: KeySize,
    bytes: [u8; 32],
}

impl Key {
    /// Creates a key, rejecting byte lengths that disagree with `size`.
    pub fn new(size: KeySize, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != size.key_len() {
            return Err(Error::config(format!(
                "{size} needs a {}-byte key, got {} bytes",
                size.key_len(),
                bytes.len()
            )));
        }
        let mut buf = [0u8; 32];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { size, bytes: buf })
    }

    /// Creates a key whose size is implied by its length (16, 24 or 32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bits = u32::try_from(bytes.len() * 8)
            .map_err(|_| Error::config("key is far too long"))?;
        Self::new(KeySize::from_bits(bits)?, bytes)
    }

    /// Declared key size.
    pub fn size(&self) -> KeySize {
        self.size
    }

    /// Key bytes (exactly `size().key_len()` of them).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.size.key_len()]
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("size", &self.size).finish_non_exhaustive()
    }
}

/// Expanded round keys, indexed `0..=rounds`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RoundKeys {
    keys: [Block; MAX_ROUND_KEYS],
    rounds: usize,
}

impl RoundKeys {
    pub(crate) fn from_fn(rounds: usize, mut f: impl FnMut(usize) -> Block) -> Self {
        debug_assert!(rounds < MAX_ROUND_KEYS);
        let mut keys = [[0u8; 16]; MAX_ROUND_KEYS];
        for (round, slot) in keys.iter_mut().enumerate().take(rounds + 1) {
            *slot = f(round);
        }
        Self { keys, rounds }
    }

    /// Number of rounds `Nr`; there are `Nr + 1` round keys.
    #[inline]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Returns the round key at the requested index (`0..=rounds`).
    #[inline]
    pub fn get(&self, round: usize) -> &Block {
        &self.keys[..=self.rounds][round]
    }

    /// All round keys in order.
    pub fn as_slice(&self) -> &[Block] {
        &self.keys[..=self.rounds]
    }
}

impl fmt::Debug for RoundKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundKeys")
            .field("rounds", &self.rounds)
            .finish_non_exhaustive()
    }
}
