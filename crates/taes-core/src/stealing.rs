//! Length-preserving messages via ciphertext stealing.
//!
//! [`StealingWindow`] keeps at most two blocks: one full block held back
//! (`pending`) and the bytes of the next one still being filled. A full block
//! is only released once a further full block shows up, because the last
//! full block may still have to donate bytes to a short tail.
//!
//! Block `i` of a message is processed under `tweak_for_index(base, i)`. For
//! a message of `n` full blocks plus `r` trailing bytes the layout is:
//!
//! ```text
//! plaintext:  P0 .. P(n-2) | P(n-1) (16) | Pn (r)
//! ciphertext: C0 .. C(n-2) | CC[..r] (r)  | E_n(Pn || CC[r..]) (16)
//! where CC = E_(n-1)(P(n-1))
//! ```

use crate::block::{Block, BLOCK_LEN};
use crate::cipher::BlockCipher;
use crate::error::{Error, Result};
use crate::tweak::{tweak_for_index, Tweak};

/// Which way a [`StealingWindow`] runs the cipher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Plaintext in, ciphertext out.
    Encrypt,
    /// Ciphertext in, plaintext out.
    Decrypt,
}

/// Totals reported once a window is finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowSummary {
    /// Full 16-byte cipher invocations performed.
    pub blocks: u64,
    /// Bytes consumed (and produced).
    pub bytes: u64,
    /// Bytes moved between the last two blocks, zero if no stealing happened.
    pub stolen: usize,
}

/// Two-block sliding window implementing ciphertext stealing over a stream.
pub struct StealingWindow<C> {
    cipher: C,
    direction: Direction,
    tweak: Option<Tweak>,
    pending: Option<Block>,
    current: Block,
    filled: usize,
    next_index: u64,
    bytes: u64,
}

impl<C: BlockCipher> StealingWindow<C> {
    /// Creates a window. `tweak` is the base tweak for block 0.
    pub fn new(cipher: C, direction: Direction, tweak: Option<Tweak>) -> Self {
        Self {
            cipher,
            direction,
            tweak,
            pending: None,
            current: [0u8; BLOCK_LEN],
            filled: 0,
            next_index: 0,
            bytes: 0,
        }
    }

    /// Shorthand for an encrypting window.
    pub fn encryptor(cipher: C, tweak: Option<Tweak>) -> Self {
        Self::new(cipher, Direction::Encrypt, tweak)
    }

    /// Shorthand for a decrypting window.
    pub fn decryptor(cipher: C, tweak: Option<Tweak>) -> Self {
        Self::new(cipher, Direction::Decrypt, tweak)
    }

    /// Direction of this window.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn apply(&self, block: &Block, index: u64) -> Block {
        let tweak = tweak_for_index(self.tweak.as_ref(), index);
        match self.direction {
            Direction::Encrypt => self.cipher.encrypt_block(block, tweak.as_ref()),
            Direction::Decrypt => self.cipher.decrypt_block(block, tweak.as_ref()),
        }
    }

    /// Feeds `input`, appending every block that can no longer be affected by
    /// stealing to `out`.
    pub fn push(&mut self, mut input: &[u8], out: &mut Vec<u8>) {
        self.bytes += input.len() as u64;
        while !input.is_empty() {
            let take = (BLOCK_LEN - self.filled).min(input.len());
            self.current[self.filled..self.filled + take].copy_from_slice(&input[..take]);
            self.filled += take;
            input = &input[take..];

            if self.filled == BLOCK_LEN {
                if let Some(prev) = self.pending.take() {
                    let index = self.next_index;
                    out.extend_from_slice(&self.apply(&prev, index));
                    tracing::trace!(index, "block released");
                    self.next_index += 1;
                }
                self.pending = Some(self.current);
                self.filled = 0;
            }
        }
    }

    /// Flushes the window, handling a short final block.
    ///
    /// Fails with [`Error::InsufficientInput`] when the whole message was
    /// shorter than one block; nothing has been written in that case.
    pub fn finish(mut self, out: &mut Vec<u8>) -> Result<WindowSummary> {
        let r = self.filled;
        let mut summary = WindowSummary {
            blocks: self.next_index,
            bytes: self.bytes,
            stolen: 0,
        };

        let Some(prev) = self.pending.take() else {
            if r == 0 {
                return Ok(summary);
            }
            return Err(Error::InsufficientInput { actual: r });
        };
        let index = self.next_index;

        if r == 0 {
            out.extend_from_slice(&self.apply(&prev, index));
            summary.blocks += 1;
            return Ok(summary);
        }

        let tail = &self.current[..r];
        match self.direction {
            Direction::Encrypt => {
                let cc = self.apply(&prev, index);
                let mut last = [0u8; BLOCK_LEN];
                last[..r].copy_from_slice(tail);
                last[r..].copy_from_slice(&cc[r..]);
                let last = self.apply(&last, index + 1);
                out.extend_from_slice(&cc[..r]);
                out.extend_from_slice(&last);
            }
            Direction::Decrypt => {
                // `prev` holds CC[..r] followed by the head of the full block.
                let mut full = [0u8; BLOCK_LEN];
                full[..BLOCK_LEN - r].copy_from_slice(&prev[r..]);
                full[BLOCK_LEN - r..].copy_from_slice(tail);
                let opened = self.apply(&full, index + 1);

                let mut cc = [0u8; BLOCK_LEN];
                cc[..r].copy_from_slice(&prev[..r]);
                cc[r..].copy_from_slice(&opened[r..]);
                out.extend_from_slice(&self.apply(&cc, index));
                out.extend_from_slice(&opened[..r]);
            }
        }
        summary.blocks += 2;
        summary.stolen = BLOCK_LEN - r;
        tracing::trace!(index, stolen = summary.stolen, "final blocks stolen");
        Ok(summary)
    }
}

/// Encrypts a whole message; output length equals input length.
pub fn encrypt_message<C: BlockCipher>(
    cipher: C,
    tweak: Option<&Tweak>,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    run(cipher, Direction::Encrypt, tweak, plaintext)
}

/// Inverse of [`encrypt_message`].
pub fn decrypt_message<C: BlockCipher>(
    cipher: C,
    tweak: Option<&Tweak>,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    run(cipher, Direction::Decrypt, tweak, ciphertext)
}

fn run<C: BlockCipher>(
    cipher: C,
    direction: Direction,
    tweak: Option<&Tweak>,
    input: &[u8],
) -> Result<Vec<u8>> {
    if !input.is_empty() && input.len() < BLOCK_LEN {
        return Err(Error::InsufficientInput {
            actual: input.len(),
        });
    }
    let mut out = Vec::with_capacity(input.len());
    let mut window = StealingWindow::new(cipher, direction, tweak.cloned());
    window.push(input, &mut out);
    window.finish(&mut out)?;
    Ok(out)
}
