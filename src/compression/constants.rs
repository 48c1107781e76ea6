//! Constants of the bzip2 container format.

/// "BZh" as a 24-bit value.
pub const MAGIC_NUMBER: u32 = (b'B' as u32) << 16 | (b'Z' as u32) << 8 | b'h' as u32;

/// Block header magic, pi in BCD, split into two 24-bit halves.
pub const BLOCK_HEADER_MAGIC_1: u32 = 0x31_4159;
pub const BLOCK_HEADER_MAGIC_2: u32 = 0x26_5359;

/// End of stream magic, sqrt(pi) in BCD, split into two 24-bit halves.
pub const END_OF_STREAM_MAGIC_1: u32 = 0x17_7245;
pub const END_OF_STREAM_MAGIC_2: u32 = 0x38_5090;

/// Block sizes are the header digit times this.
pub const BASE_BLOCK_SIZE: usize = 100_000;
pub const MIN_BLOCK_SIZE: u8 = 1;
pub const MAX_BLOCK_SIZE: u8 = 9;

/// Bits needed before an INIT_BLOCK attempt: two magics plus a CRC.
pub const BLOCK_HEADER_BITS: usize = 24 + 24 + 32;

pub const HUFFMAN_MAX_ALPHABET_SIZE: usize = 258;
/// Two RUN symbols plus the end-of-block symbol need at least one real symbol with them.
pub const HUFFMAN_MIN_ALPHABET_SIZE: usize = 3;

/// Longest code length an encoder may produce.
pub const HUFFMAN_ENCODE_MAX_CODE_LENGTH: i32 = 20;
/// Longest code the decoder will try before giving up.
pub const HUFFMAN_DECODE_MAX_CODE_LENGTH: usize = 23;

pub const HUFFMAN_SYMBOL_RUNA: u16 = 0;
pub const HUFFMAN_SYMBOL_RUNB: u16 = 1;

/// Symbols per used-group bitmap.
pub const HUFFMAN_SYMBOL_RANGE_SIZE: usize = 16;

/// Longest unary selector code: five 1-bits and the closing 0-bit.
pub const HUFFMAN_SELECTOR_LIST_MAX_LENGTH: usize = 6;

/// Symbols decoded with one table before the next selector applies.
pub const HUFFMAN_GROUP_RUN_LENGTH: usize = 50;

pub const MAX_SELECTORS: u32 = 2 + (900_000 / HUFFMAN_GROUP_RUN_LENGTH) as u32;

pub const HUFFMAN_MINIMUM_TABLES: u32 = 2;
pub const HUFFMAN_MAXIMUM_TABLES: usize = 6;
