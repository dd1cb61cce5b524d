//! Block and state representation helpers.

use crate::error::{Error, Result};

/// Block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// AES block of 16 bytes.
pub type Block = [u8; BLOCK_LEN];

/// Borrows a slice as a block, rejecting anything that is not 16 bytes long.
pub fn block_from_slice(bytes: &[u8]) -> Result<Block> {
    bytes
        .try_into()
        .map_err(|_| Error::InvalidBlockSize {
            actual: bytes.len(),
        })
}

/// The software cipher state: a 4x4 byte matrix indexed `[row][column]`.
///
/// Byte `i` of a flat block lives at `[i % 4][i / 4]` (column-major).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct State(pub [[u8; 4]; 4]);

impl State {
    /// Loads a flat block into the matrix.
    pub fn from_block(block: &Block) -> Self {
        let mut rows = [[0u8; 4]; 4];
        for (i, byte) in block.iter().enumerate() {
            rows[i % 4][i / 4] = *byte;
        }
        Self(rows)
    }

    /// Flattens the matrix back into a block.
    pub fn to_block(&self) -> Block {
        let mut block = [0u8; BLOCK_LEN];
        for (i, byte) in block.iter_mut().enumerate() {
            *byte = self.0[i % 4][i / 4];
        }
        block
    }

    /// Returns column `col` top to bottom.
    #[inline]
    pub fn column(&self, col: usize) -> [u8; 4] {
        [self.0[0][col], self.0[1][col], self.0[2][col], self.0[3][col]]
    }

    /// Overwrites column `col`.
    #[inline]
    pub fn set_column(&mut self, col: usize, values: [u8; 4]) {
        for (row, value) in values.into_iter().enumerate() {
            self.0[row][col] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_major_layout() {
        let block: Block = core::array::from_fn(|i| i as u8);
        let state = State::from_block(&block);
        assert_eq!(state.0[0], [0, 4, 8, 12]);
        assert_eq!(state.0[3], [3, 7, 11, 15]);
        assert_eq!(state.column(2), [8, 9, 10, 11]);
        assert_eq!(state.to_block(), block);
    }

    #[test]
    fn slice_length_is_checked() {
        assert!(block_from_slice(&[0u8; 16]).is_ok());
        assert_eq!(
            block_from_slice(&[0u8; 15]),
            Err(Error::InvalidBlockSize { actual: 15 })
        );
        assert_eq!(
            block_from_slice(&[0u8; 17]),
            Err(Error::InvalidBlockSize { actual: 17 })
        );
    }
}
