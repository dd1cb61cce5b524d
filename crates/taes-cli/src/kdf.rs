//! Passphrase to key/tweak derivation.
//!
//! A single SHA-256 pass: the key is the first `key_size / 8` digest bytes
//! and the tweak the first 16 bytes of a separate digest. There is no salt
//! and no work factor.

use sha2::{Digest, Sha256};
use taes_core::{Key, KeySize, Tweak, BLOCK_LEN};
use zeroize::Zeroize;

/// SHA-256 digest of `passphrase`.
pub fn digest(passphrase: &[u8]) -> [u8; 32] {
    Sha256::digest(passphrase).into()
}

/// Derives a key of `size` from `passphrase`.
pub fn derive_key(size: KeySize, passphrase: &[u8]) -> taes_core::Result<Key> {
    let mut digest = digest(passphrase);
    let key = Key::new(size, &digest[..size.key_len()]);
    digest.zeroize();
    key
}

/// Derives a tweak from `passphrase`.
pub fn derive_tweak(passphrase: &[u8]) -> Tweak {
    let mut digest = digest(passphrase);
    let mut block = [0u8; BLOCK_LEN];
    block.copy_from_slice(&digest[..BLOCK_LEN]);
    digest.zeroize();
    Tweak::new(block)
}
