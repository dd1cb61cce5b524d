//! Reader/writer adapters for tweakable AES with ciphertext stealing.
//!
//! The wire format is raw block bytes: no header, no length prefix, and the
//! output is exactly as long as the input. Block `i` of a stream uses the
//! base tweak advanced by `i` (see [`taes_core::tweak_for_index`]).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::io::{self, Read, Write};

use taes_core::{BlockCipher, Direction, StealingWindow, Tweak};
use thiserror::Error;

/// Bytes requested from the reader per call.
pub const CHUNK_LEN: usize = 64 * 1024;

/// Errors raised while streaming.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The cipher core rejected the input (for example fewer than 16 bytes).
    #[error(transparent)]
    Cipher(#[from] taes_core::Error),
    /// Reading the source or writing the sink failed.
    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;

/// What a completed stream operation processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Cipher block invocations.
    pub blocks: u64,
    /// Bytes read, which equals bytes written.
    pub bytes: u64,
    /// Bytes moved by ciphertext stealing at the end of the stream.
    pub stolen: usize,
}

/// Encrypts everything `reader` yields into `writer`.
pub fn encrypt_stream<C, R, W>(
    cipher: C,
    tweak: Option<&Tweak>,
    reader: R,
    writer: W,
) -> Result<StreamSummary>
where
    C: BlockCipher,
    R: Read,
    W: Write,
{
    run(cipher, Direction::Encrypt, tweak, reader, writer)
}

/// Decrypts everything `reader` yields into `writer`.
pub fn decrypt_stream<C, R, W>(
    cipher: C,
    tweak: Option<&Tweak>,
    reader: R,
    writer: W,
) -> Result<StreamSummary>
where
    C: BlockCipher,
    R: Read,
    W: Write,
{
    run(cipher, Direction::Decrypt, tweak, reader, writer)
}

/// Reads until `buf` is full or the reader is exhausted.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

fn run<C, R, W>(
    cipher: C,
    direction: Direction,
    tweak: Option<&Tweak>,
    mut reader: R,
    mut writer: W,
) -> Result<StreamSummary>
where
    C: BlockCipher,
    R: Read,
    W: Write,
{
    tracing::debug!(?direction, tweaked = tweak.is_some(), "stream started");
    let mut window = StealingWindow::new(cipher, direction, tweak.cloned());
    let mut input = vec![0u8; CHUNK_LEN];
    let mut output = Vec::with_capacity(CHUNK_LEN + 16);

    loop {
        let n = fill(&mut reader, &mut input)?;
        if n == 0 {
            break;
        }
        window.push(&input[..n], &mut output);
        writer.write_all(&output)?;
        output.clear();
    }

    let summary = window.finish(&mut output)?;
    writer.write_all(&output)?;
    writer.flush()?;

    tracing::debug!(
        ?direction,
        blocks = summary.blocks,
        bytes = summary.bytes,
        stolen = summary.stolen,
        "stream finished"
    );
    Ok(StreamSummary {
        blocks: summary.blocks,
        bytes: summary.bytes,
        stolen: summary.stolen,
    })
}
