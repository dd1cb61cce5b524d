//! Tweakable AES (T-AES) block cipher core.
//!
//! AES-128/192/256 with a 16-byte tweak folded into one middle round key,
//! in two interchangeable backends:
//! - a portable software implementation over the FIPS-197 state matrix;
//! - an AES-NI implementation whose key schedule and round keys match the
//!   software path byte for byte.
//!
//! [`stealing`] chains the block cipher over messages of any length of at
//! least one block without padding.
//!
//! Nothing here is constant-time on the software path; it should not be
//! treated as side-channel hardened.

#![deny(missing_docs)]

mod block;
mod cipher;
mod error;
mod gf;
mod key;
pub mod ni;
mod round;
mod sbox;
mod schedule;
mod soft;
pub mod stealing;
mod tweak;

pub use crate::block::{block_from_slice, Block, BLOCK_LEN};
pub use crate::cipher::{Backend, BlockCipher, Cipher, CipherConfig};
pub use crate::error::{Error, Result};
pub use crate::key::{Key, KeySize, RoundKeys};
pub use crate::ni::HardwareCipher;
pub use crate::schedule::expand_key;
pub use crate::soft::SoftwareCipher;
pub use crate::stealing::{decrypt_message, encrypt_message, Direction, StealingWindow, WindowSummary};
pub use crate::tweak::{tweak_for_index, tweak_round, CombinePolicy, Tweak};
