//! Error type for the bzip2 decompressor.
//!
//! Every stream error is fatal: the decompressor moves to its end-of-stream state and later
//! calls return `EndOfStream` instead of retrying corrupt data. The two usage errors
//! (`Closed`, `AlreadyClosed`) leave the state untouched.

use std::io;

/// Errors raised while decoding a bzip2 stream.
///
/// ```text
///   DecompressError
///   ├── framing:  BadStreamMagic, InvalidBlockSize, BadBlockHeader, StreamCrcMismatch,
///   │             InvalidTableCount, InvalidAlphabetSize, InvalidSelectorCount,
///   │             InvalidSelector, InvalidCodeLength
///   ├── payload:  SelectorsExhausted, InvalidHuffmanCode, BlockOverflow,
///   │             InvalidStartPointer, BlockCrcMismatch
///   └── usage:    Closed, AlreadyClosed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecompressError {
    /// The first three bytes were not `BZh`.
    #[error("unexpected stream identifier contents, mismatched bzip2 protocol version?")]
    BadStreamMagic,

    /// The fourth byte was not an ASCII digit `'1'..='9'`.
    #[error("block size is invalid (found byte {0:#04x})")]
    InvalidBlockSize(u8),

    /// Neither a block header nor an end-of-stream marker followed the previous block.
    #[error("bad block header")]
    BadBlockHeader,

    /// The combined CRC stored after the end-of-stream marker disagrees with the fold of
    /// the block CRCs.
    #[error("stream CRC error (stored {stored:#010x}, computed {computed:#010x})")]
    StreamCrcMismatch { stored: u32, computed: u32 },

    /// The CRC stored in a block header disagrees with the CRC of the decoded block.
    #[error("block CRC error (stored {stored:#010x}, computed {computed:#010x})")]
    BlockCrcMismatch { stored: u32, computed: u32 },

    #[error("incorrect huffman groups number: {0}")]
    InvalidTableCount(u32),

    #[error("incorrect alphabet size: {0}")]
    InvalidAlphabetSize(usize),

    #[error("incorrect selectors number: {0}")]
    InvalidSelectorCount(u32),

    /// A unary selector run pointed past the last huffman table.
    #[error("selector index {index} out of range for {tables} tables")]
    InvalidSelector { index: usize, tables: usize },

    /// A delta-coded huffman code length left the range 1..=20.
    #[error("invalid huffman code length: {0}")]
    InvalidCodeLength(i32),

    /// The payload needed more 50-symbol groups than there are selectors.
    #[error("error decoding block: ran out of selectors")]
    SelectorsExhausted,

    #[error("a valid huffman code was not recognised")]
    InvalidHuffmanCode,

    #[error("block exceeds declared block size")]
    BlockOverflow,

    #[error("start pointer {pointer} invalid for a block of {length} bytes")]
    InvalidStartPointer { pointer: usize, length: usize },

    #[error("decompressor closed")]
    Closed,

    #[error("decompressor already closed")]
    AlreadyClosed,
}

impl DecompressError {
    /// True for errors caused by calling the decompressor in the wrong state, as opposed to
    /// errors in the compressed data.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, DecompressError::Closed | DecompressError::AlreadyClosed)
    }
}

impl From<DecompressError> for io::Error {
    fn from(err: DecompressError) -> Self {
        let kind = if err.is_usage_error() {
            io::ErrorKind::Other
        } else {
            io::ErrorKind::InvalidData
        };
        io::Error::new(kind, err)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DecompressError>;
