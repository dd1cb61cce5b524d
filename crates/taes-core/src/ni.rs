//! Tweakable AES on the x86 AES-NI instruction set.
//!
//! Round keys are produced with `aeskeygenassist` and kept as byte blocks so
//! they can be compared with the software schedule; each call loads them into
//! `__m128i` registers. Decryption uses the equivalent inverse cipher, so
//! every middle round key is passed through `aesimc` up front. The tweaked
//! round key is combined first and transformed afterwards.

use std::sync::OnceLock;

use crate::block::Block;
use crate::error::{Error, Result};
use crate::key::{Key, KeySize, RoundKeys};
use crate::tweak::{tweak_round, CombinePolicy, Tweak};

/// Returns whether this CPU can run the hardware backend. Detection runs once.
pub fn is_supported() -> bool {
    static SUPPORTED: OnceLock<bool> = OnceLock::new();
    *SUPPORTED.get_or_init(detect)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn detect() -> bool {
    std::is_x86_feature_detected!("aes") && std::is_x86_feature_detected!("sse2")
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn detect() -> bool {
    false
}

/// Runs the hardware key schedule.
pub fn expand_key(key: &Key) -> Result<RoundKeys> {
    if !is_supported() {
        return Err(Error::HardwareUnsupported);
    }
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        // SAFETY: AES-NI and SSE2 availability was checked above.
        Ok(unsafe { x86::expand_key(key) })
    }
    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    {
        let _ = key;
        Err(Error::HardwareUnsupported)
    }
}

/// Hardware cipher bound to one expanded key.
#[derive(Clone, Debug)]
pub struct HardwareCipher {
    key_size: KeySize,
    enc_keys: RoundKeys,
    dec_keys: RoundKeys,
    combine: CombinePolicy,
    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    unsupported: core::convert::Infallible,
}

impl HardwareCipher {
    /// Expands `key` with AES-NI. Fails with [`Error::HardwareUnsupported`]
    /// when the CPU lacks the instructions; there is no software fallback.
    pub fn new(key: &Key, combine: CombinePolicy) -> Result<Self> {
        let enc_keys = expand_key(key)?;
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            // SAFETY: expand_key succeeded, so the CPU supports AES-NI.
            let dec_keys = unsafe { x86::inverse_keys(&enc_keys) };
            Ok(Self {
                key_size: key.size(),
                enc_keys,
                dec_keys,
                combine,
            })
        }
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        {
            let _ = (enc_keys, combine);
            Err(Error::HardwareUnsupported)
        }
    }

    /// Encryption round keys (identical to the software schedule).
    pub fn round_keys(&self) -> &RoundKeys {
        &self.enc_keys
    }

    /// Key size this cipher was built for.
    pub fn key_size(&self) -> KeySize {
        self.key_size
    }

    /// Tweak combine policy.
    pub fn combine(&self) -> CombinePolicy {
        self.combine
    }

    /// Round keys for the equivalent inverse cipher (`aesimc` on `1..Nr`).
    pub fn decryption_round_keys(&self) -> &RoundKeys {
        &self.dec_keys
    }

    fn tweaked_round(&self, tweak: Option<&Tweak>) -> Option<(usize, Block)> {
        let round = tweak_round(self.key_size);
        tweak.map(|t| (round, self.combine.combine(self.enc_keys.get(round), t)))
    }

    /// Encrypts one block.
    pub fn encrypt(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            // SAFETY: instances only exist when AES-NI was detected.
            unsafe { x86::encrypt(block, &self.enc_keys, self.tweaked_round(tweak)) }
        }
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        {
            let _ = (block, tweak);
            match self.unsupported {}
        }
    }

    /// Decrypts one block.
    pub fn decrypt(&self, block: &Block, tweak: Option<&Tweak>) -> Block {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            // SAFETY: instances only exist when AES-NI was detected.
            unsafe {
                x86::decrypt(
                    block,
                    &self.enc_keys,
                    &self.dec_keys,
                    self.tweaked_round(tweak),
                )
            }
        }
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        {
            let _ = (block, tweak);
            match self.unsupported {}
        }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86 {
    #[cfg(target_arch = "x86")]
    use core::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use core::arch::x86_64::*;

    use crate::block::Block;
    use crate::key::{Key, KeySize, RoundKeys, MAX_ROUND_KEYS};
    use crate::sbox::RCON;

    #[inline(always)]
    unsafe fn load(block: &Block) -> __m128i {
        _mm_loadu_si128(block.as_ptr().cast())
    }

    #[inline(always)]
    unsafe fn store(reg: __m128i) -> Block {
        let mut out = [0u8; 16];
        _mm_storeu_si128(out.as_mut_ptr().cast(), reg);
        out
    }

    /// `[a, b, c, d] -> [a, a^b, a^b^c, a^b^c^d]` over 32-bit lanes.
    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn prefix_xor(mut value: __m128i) -> __m128i {
        let mut shifted = _mm_slli_si128(value, 4);
        value = _mm_xor_si128(value, shifted);
        shifted = _mm_slli_si128(shifted, 4);
        value = _mm_xor_si128(value, shifted);
        shifted = _mm_slli_si128(shifted, 4);
        _mm_xor_si128(value, shifted)
    }

    #[inline]
    #[target_feature(enable = "aes,sse2")]
    unsafe fn step_128(prev: __m128i, assist: __m128i) -> __m128i {
        // Lane 3 of the assist holds RotWord(SubWord(w3)) ^ rcon.
        _mm_xor_si128(prefix_xor(prev), _mm_shuffle_epi32(assist, 0xff))
    }

    #[target_feature(enable = "aes,sse2")]
    unsafe fn expand_128(key: &[u8]) -> [__m128i; 11] {
        let mut rk = [_mm_setzero_si128(); 11];
        let mut first = [0u8; 16];
        first.copy_from_slice(&key[..16]);
        rk[0] = load(&first);

        macro_rules! round {
            ($i:literal) => {
                let assist = _mm_aeskeygenassist_si128(rk[$i - 1], RCON[$i - 1] as i32);
                rk[$i] = step_128(rk[$i - 1], assist);
            };
        }
        round!(1);
        round!(2);
        round!(3);
        round!(4);
        round!(5);
        round!(6);
        round!(7);
        round!(8);
        round!(9);
        round!(10);
        rk
    }

    /// Advances the six-word AES-192 window held in `lo` (words 0..4) and the
    /// low half of `hi` (words 4..6).
    #[inline]
    #[target_feature(enable = "aes,sse2")]
    unsafe fn step_192(lo: &mut __m128i, hi: &mut __m128i, assist: __m128i) {
        // Lane 1 of the assist holds RotWord(SubWord(w5)) ^ rcon.
        *lo = _mm_xor_si128(prefix_xor(*lo), _mm_shuffle_epi32(assist, 0x55));
        let carry = _mm_shuffle_epi32(*lo, 0xff);
        *hi = _mm_xor_si128(*hi, _mm_slli_si128(*hi, 4));
        *hi = _mm_xor_si128(*hi, carry);
    }

    /// Low 64 bits of `a` then low 64 bits of `b`.
    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn join_low(a: __m128i, b: __m128i) -> __m128i {
        _mm_castpd_si128(_mm_shuffle_pd(_mm_castsi128_pd(a), _mm_castsi128_pd(b), 0))
    }

    /// High 64 bits of `a` then low 64 bits of `b`.
    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn join_high_low(a: __m128i, b: __m128i) -> __m128i {
        _mm_castpd_si128(_mm_shuffle_pd(_mm_castsi128_pd(a), _mm_castsi128_pd(b), 1))
    }

    #[target_feature(enable = "aes,sse2")]
    unsafe fn expand_192(key: &[u8]) -> [__m128i; 13] {
        let mut rk = [_mm_setzero_si128(); 13];
        let mut first = [0u8; 16];
        first.copy_from_slice(&key[..16]);
        // Words 4 and 5; the upper half of the register is never emitted.
        let mut tail = [0u8; 16];
        tail[..8].copy_from_slice(&key[16..24]);

        let mut lo = load(&first);
        let mut hi = load(&tail);
        rk[0] = lo;

        // Every three round keys cover two six-word generations. The first
        // generation's tail shares a register with the head of the next.
        macro_rules! split {
            ($i:literal, $r:literal) => {
                let prev_hi = hi;
                let assist = _mm_aeskeygenassist_si128(hi, RCON[$r] as i32);
                step_192(&mut lo, &mut hi, assist);
                rk[$i] = join_low(prev_hi, lo);
                rk[$i + 1] = join_high_low(lo, hi);
            };
        }
        macro_rules! aligned {
            ($i:literal, $r:literal) => {
                let assist = _mm_aeskeygenassist_si128(hi, RCON[$r] as i32);
                step_192(&mut lo, &mut hi, assist);
                rk[$i] = lo;
            };
        }

        split!(1, 0);
        aligned!(3, 1);
        split!(4, 2);
        aligned!(6, 3);
        split!(7, 4);
        aligned!(9, 5);
        split!(10, 6);
        aligned!(12, 7);
        rk
    }

    #[inline]
    #[target_feature(enable = "aes,sse2")]
    unsafe fn even_256(even: __m128i, assist: __m128i) -> __m128i {
        // Lane 3: RotWord(SubWord(w7)) ^ rcon.
        _mm_xor_si128(prefix_xor(even), _mm_shuffle_epi32(assist, 0xff))
    }

    #[inline]
    #[target_feature(enable = "aes,sse2")]
    unsafe fn odd_256(even: __m128i, odd: __m128i) -> __m128i {
        // Lane 2 of a zero-rcon assist is SubWord(w3) without rotation.
        let assist = _mm_aeskeygenassist_si128(even, 0x00);
        _mm_xor_si128(prefix_xor(odd), _mm_shuffle_epi32(assist, 0xaa))
    }

    #[target_feature(enable = "aes,sse2")]
    unsafe fn expand_256(key: &[u8]) -> [__m128i; 15] {
        let mut rk = [_mm_setzero_si128(); 15];
        let mut first = [0u8; 16];
        let mut second = [0u8; 16];
        first.copy_from_slice(&key[..16]);
        second.copy_from_slice(&key[16..32]);
        let mut even = load(&first);
        let mut odd = load(&second);
        rk[0] = even;
        rk[1] = odd;

        macro_rules! pair {
            ($i:literal, $r:literal) => {
                even = even_256(even, _mm_aeskeygenassist_si128(odd, RCON[$r] as i32));
                rk[$i] = even;
                odd = odd_256(even, odd);
                rk[$i + 1] = odd;
            };
        }
        pair!(2, 0);
        pair!(4, 1);
        pair!(6, 2);
        pair!(8, 3);
        pair!(10, 4);
        pair!(12, 5);
        rk[14] = even_256(even, _mm_aeskeygenassist_si128(odd, RCON[6] as i32));
        rk
    }

    fn to_round_keys(regs: &[__m128i]) -> RoundKeys {
        debug_assert!(regs.len() <= MAX_ROUND_KEYS);
        // SAFETY: storing a register needs nothing beyond SSE2, which every
        // caller has already established.
        RoundKeys::from_fn(regs.len() - 1, |round| unsafe { store(regs[round]) })
    }

    #[target_feature(enable = "aes,sse2")]
    pub(super) unsafe fn expand_key(key: &Key) -> RoundKeys {
        let bytes = key.as_bytes();
        match key.size() {
            KeySize::Aes128 => to_round_keys(&expand_128(bytes)),
            KeySize::Aes192 => to_round_keys(&expand_192(bytes)),
            KeySize::Aes256 => to_round_keys(&expand_256(bytes)),
        }
    }

    #[target_feature(enable = "aes,sse2")]
    pub(super) unsafe fn inverse_keys(enc: &RoundKeys) -> RoundKeys {
        let nr = enc.rounds();
        RoundKeys::from_fn(nr, |round| {
            let rk = enc.get(round);
            if round == 0 || round == nr {
                *rk
            } else {
                store(_mm_aesimc_si128(load(rk)))
            }
        })
    }

    #[target_feature(enable = "aes,sse2")]
    pub(super) unsafe fn encrypt(
        block: &Block,
        keys: &RoundKeys,
        tweaked: Option<(usize, Block)>,
    ) -> Block {
        let nr = keys.rounds();
        let mut state = _mm_xor_si128(load(block), load(keys.get(0)));
        for round in 1..nr {
            let rk = match &tweaked {
                Some((at, combined)) if *at == round => load(combined),
                _ => load(keys.get(round)),
            };
            state = _mm_aesenc_si128(state, rk);
        }
        state = _mm_aesenclast_si128(state, load(keys.get(nr)));
        store(state)
    }

    #[target_feature(enable = "aes,sse2")]
    pub(super) unsafe fn decrypt(
        block: &Block,
        enc: &RoundKeys,
        dec: &RoundKeys,
        tweaked: Option<(usize, Block)>,
    ) -> Block {
        let nr = enc.rounds();
        let mut state = _mm_xor_si128(load(block), load(enc.get(nr)));
        for round in (1..nr).rev() {
            let rk = match &tweaked {
                // InvMixColumns of (key + tweak), not of each half.
                Some((at, combined)) if *at == round => _mm_aesimc_si128(load(combined)),
                _ => load(dec.get(round)),
            };
            state = _mm_aesdec_si128(state, rk);
        }
        state = _mm_aesdeclast_si128(state, load(enc.get(0)));
        store(state)
    }
}
