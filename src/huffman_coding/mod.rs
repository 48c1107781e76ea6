//! The huffman module decodes the Huffman stage of the Rust version of the standard BZIP2 library.
//!
//! The huffman coding algorithm as used by BZIP2 is both block and chunk oriented. Within each
//! block, groups of 50 symbols are encoded separately using one of two to six huffman tables. The
//! selector list says which table each group uses.
//!
//! Codes are canonical and at most 20 bits long, so a table is fully described by its code lengths.
//!
pub mod huffman;
