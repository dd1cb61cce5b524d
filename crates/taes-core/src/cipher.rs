//! Backend selection and the block-level cipher interface.

use core::fmt;
use core::str::FromStr;

use crate::block::{block_from_slice, Block};
use crate::error::{Error, Result};
use crate::key::{Key, KeySize};
use crate::ni::{self, HardwareCipher};
use crate::soft::SoftwareCipher;
use crate::tweak::{CombinePolicy, Tweak};

/// Which implementation performs the rounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Portable table-free implementation.
    Software,
    /// AES-NI. Fails on CPUs without the instructions.
    Hardware,
    /// Hardware when available, software otherwise. Resolved once at construction.
    #[default]
    Auto,
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "software" | "soft" | "sw" => Ok(Self::Software),
            "hardware" | "hw" | "aesni" => Ok(Self::Hardware),
            "auto" => Ok(Self::Auto),
            other => Err(Error::config(format!("unknown backend '{other}'"))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Software => f.pad("software"),
            Self::Hardware => f.pad("hardware"),
            Self::Auto => f.pad("auto"),
        }
    }
}

/// Construction parameters for a [`Cipher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CipherConfig {
    /// Expected key size. The key passed to [`Cipher::new`] must match.
    pub key_size: KeySize,
    /// Requested backend.
    pub backend: Backend,
    /// Tweak combine policy.
    pub combine: CombinePolicy,
}

impl CipherConfig {
    /// Config for `key_size` with the automatic backend and build policy.
    pub fn new(key_size: KeySize) -> Self {
        Self {
            key_size,
            ..Self::default()
        }
    }

    /// Replaces the backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Replaces the combine policy.
    pub fn with_combine(mut self, combine: CombinePolicy) -> Self {
        self.combine = combine;
        self
    }
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            key_size: KeySize::Aes128,
            backend: Backend::Auto,
            combine: CombinePolicy::ACTIVE,
        }
    }
}

/// Single-block tweakable encryption and decryption.
pub trait BlockCipher {
    /// Encrypts one block, folding `tweak` into the tweak round when present.
    fn encrypt_block(&self, block: &Block, tweak: Option<&Tweak>) -> Block;

    /// Inverse of [`BlockCipher::encrypt_block`] under the same tweak.
    fn decrypt_block(&self, block: &Block, tweak: Option<&Tweak>) -> Block;

    /// Slice variant of [`BlockCipher::encrypt_block`].
    fn encrypt_slice(&self, input: &[u8], tweak: Option<&Tweak>) -> Result<Block> {
        Ok(self.encrypt_block(&block_from_slice(input)?, tweak))
    }

    /// Slice variant of [`BlockCipher::decrypt_block`].
    fn decrypt_slice(&self, input: &[u8], tweak: Option<&Tweak>) -> Result<Block> {
        Ok(self.decrypt_block(&block_from_slice(input)?, tweak))
    }
}

impl BlockCipher for SoftwareCipher {
    fn encrypt_block(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        self.encrypt(block, tweak)
    }

    fn decrypt_block(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        self.decrypt(block, tweak)
    }
}

impl BlockCipher for HardwareCipher {
    fn encrypt_block(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        self.encrypt(block, tweak)
    }

    fn decrypt_block(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        self.decrypt(block, tweak)
    }
}

/// A configured cipher with its backend fixed for its whole lifetime.
#[derive(Clone, Debug)]
pub enum Cipher {
    /// Software rounds.
    Software(SoftwareCipher),
    /// AES-NI rounds.
    Hardware(HardwareCipher),
}

impl Cipher {
    /// Expands `key` for the backend named in `config`.
    ///
    /// `Auto` is resolved here by querying CPU support once. An explicit
    /// `Hardware` request on an unsupported CPU fails instead of silently
    /// running in software.
    pub fn new(config: CipherConfig, key: &Key) -> Result<Self> {
        if key.size() != config.key_size {
            return Err(Error::config(format!(
                "{} key supplied to a cipher configured for {}",
                key.size(),
                config.key_size
            )));
        }
        let backend = match config.backend {
            Backend::Auto if ni::is_supported() => Backend::Hardware,
            Backend::Auto => Backend::Software,
            explicit => explicit,
        };
        let cipher = match backend {
            Backend::Hardware => Self::Hardware(HardwareCipher::new(key, config.combine)?),
            _ => Self::Software(SoftwareCipher::new(key, config.combine)),
        };
        tracing::debug!(
            key_size = %config.key_size,
            requested = %config.backend,
            backend = %cipher.backend(),
            combine = %config.combine,
            "cipher ready"
        );
        Ok(cipher)
    }

    /// Software cipher with the build's combine policy.
    pub fn software(key: &Key) -> Self {
        Self::Software(SoftwareCipher::new(key, CombinePolicy::ACTIVE))
    }

    /// Key size of the bound key.
    pub fn key_size(&self) -> KeySize {
        match self {
            Self::Software(c) => c.key_size(),
            Self::Hardware(c) => c.key_size(),
        }
    }

    /// Tweak combine policy.
    pub fn combine(&self) -> CombinePolicy {
        match self {
            Self::Software(c) => c.combine(),
            Self::Hardware(c) => c.combine(),
        }
    }

    /// Backend actually in use (never `Auto`).
    pub fn backend(&self) -> Backend {
        match self {
            Self::Software(_) => Backend::Software,
            Self::Hardware(_) => Backend::Hardware,
        }
    }
}

impl BlockCipher for Cipher {
    fn encrypt_block(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        match self {
            Self::Software(c) => c.encrypt(block, tweak),
            Self::Hardware(c) => c.encrypt(block, tweak),
        }
    }

    fn decrypt_block(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        match self {
            Self::Software(c) => c.decrypt(block, tweak),
            Self::Hardware(c) => c.decrypt(block, tweak),
        }
    }
}

impl<C: BlockCipher + ?Sized> BlockCipher for &C {
    fn encrypt_block(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        (**self).encrypt_block(block, tweak)
    }

    fn decrypt_block(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        (**self).decrypt_block(block, tweak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    const NIST_PLAIN: [u8; 16] = [
        0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93, 0x17,
        0x2a,
    ];

    fn nist_cases() -> [(KeySize, &'static str, &'static str); 3] {
        [
            (
                KeySize::Aes128,
                "2b7e151628aed2a6abf7158809cf4f3c",
                "3ad77bb40d7a3660a89ecaf32466ef97",
            ),
            (
                KeySize::Aes192,
                "8e73b0f7da0e6452c810f32b809079e562f8ead2522c6b7b",
                "bd334f1d6e45f25ff712a214571fa5cc",
            ),
            (
                KeySize::Aes256,
                "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4",
                "f3eed1bdb5d2a03c064b5a7e3db181f8",
            ),
        ]
    }

    fn available_backends() -> Vec<Backend> {
        let mut backends = vec![Backend::Software, Backend::Auto];
        if ni::is_supported() {
            backends.push(Backend::Hardware);
        }
        backends
    }

    #[test]
    fn nist_vectors_on_every_available_backend() {
        for backend in available_backends() {
            for (size, key_hex, ct_hex) in nist_cases() {
                let key = Key::new(size, &hex::decode(key_hex).expect("hex")).expect("key");
                let cipher =
                    Cipher::new(CipherConfig::new(size).with_backend(backend), &key).expect("cipher");
                let ct = cipher.encrypt_block(&NIST_PLAIN, None);
                assert_eq!(hex::encode(ct), ct_hex, "{backend} {size}");
                assert_eq!(cipher.decrypt_block(&ct, None), NIST_PLAIN);
            }
        }
    }

    #[test]
    fn auto_never_reports_auto() {
        let key = Key::new(KeySize::Aes128, &[7u8; 16]).expect("key");
        let cipher = Cipher::new(CipherConfig::default(), &key).expect("cipher");
        assert_ne!(cipher.backend(), Backend::Auto);
    }

    #[test]
    fn explicit_hardware_request_fails_without_aes_ni() {
        if ni::is_supported() {
            return;
        }
        let key = Key::new(KeySize::Aes128, &[7u8; 16]).expect("key");
        let config = CipherConfig::default().with_backend(Backend::Hardware);
        assert_eq!(
            Cipher::new(config, &key).map(|c| c.backend()),
            Err(Error::HardwareUnsupported)
        );
    }

    #[test]
    fn key_size_must_match_config() {
        let key = Key::new(KeySize::Aes256, &[1u8; 32]).expect("key");
        let err = Cipher::new(CipherConfig::new(KeySize::Aes128), &key).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn slice_helpers_reject_wrong_lengths() {
        let cipher = Cipher::software(&Key::new(KeySize::Aes128, &[0u8; 16]).expect("key"));
        for len in [0usize, 15, 17, 32] {
            let buf = vec![0u8; len];
            assert_eq!(
                cipher.encrypt_slice(&buf, None),
                Err(Error::InvalidBlockSize { actual: len })
            );
            assert_eq!(
                cipher.decrypt_slice(&buf, None),
                Err(Error::InvalidBlockSize { actual: len })
            );
        }
        assert!(cipher.encrypt_slice(&[0u8; 16], None).is_ok());
    }

    #[test]
    fn backends_agree_with_tweaks() {
        if !ni::is_supported() {
            eprintln!("Skipping: AES-NI not detected");
            return;
        }
        let mut rng = ChaCha20Rng::from_seed([50u8; 32]);
        for size in KeySize::ALL {
            for combine in [CombinePolicy::Xor, CombinePolicy::Add] {
                let mut key_bytes = vec![0u8; size.key_len()];
                rng.fill_bytes(&mut key_bytes);
                let key = Key::new(size, &key_bytes).expect("key");
                let config = CipherConfig::new(size).with_combine(combine);
                let sw = Cipher::new(config.with_backend(Backend::Software), &key).expect("sw");
                let hw = Cipher::new(config.with_backend(Backend::Hardware), &key).expect("hw");
                for _ in 0..100 {
                    let pt: Block = rng.gen();
                    let tweak = Tweak::new(rng.gen());
                    let ct = sw.encrypt_block(&pt, Some(&tweak));
                    assert_eq!(hw.encrypt_block(&pt, Some(&tweak)), ct);
                    assert_eq!(hw.decrypt_block(&ct, Some(&tweak)), pt);
                    assert_eq!(sw.decrypt_block(&ct, Some(&tweak)), pt);
                }
            }
        }
    }

    #[test]
    fn tweak_changes_about_half_the_output_bits() {
        let mut rng = ChaCha20Rng::from_seed([51u8; 32]);
        let mut key_bytes = [0u8; 16];
        rng.fill_bytes(&mut key_bytes);
        let cipher = Cipher::software(&Key::new(KeySize::Aes128, &key_bytes).expect("key"));

        let trials = 2_000u32;
        let mut total = 0u32;
        for _ in 0..trials {
            let pt: Block = rng.gen();
            let t1 = Tweak::new(rng.gen());
            let t2 = Tweak::new(rng.gen());
            let a = cipher.encrypt_block(&pt, Some(&t1));
            let b = cipher.encrypt_block(&pt, Some(&t2));
            total += a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum::<u32>();
        }
        let mean = f64::from(total) / f64::from(trials);
        assert!((60.0..=68.0).contains(&mean), "mean hamming distance {mean}");
    }

    #[test]
    fn backend_parsing() {
        assert_eq!("software".parse::<Backend>(), Ok(Backend::Software));
        assert_eq!("HW".parse::<Backend>(), Ok(Backend::Hardware));
        assert_eq!("auto".parse::<Backend>(), Ok(Backend::Auto));
        assert!("gpu".parse::<Backend>().is_err());
    }
}
