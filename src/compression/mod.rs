//! The compression module holds the decompression side of BZIP2, organised so that it can be fed
//! a stream a few bytes at a time.
//!
//! A BZIP2 stream is a small header, a sequence of blocks, and a footer carrying the CRC of the
//! whole stream. Each block is decoded in the following steps:
//! - Block header: block CRC, randomised flag and the BWT start pointer.
//! - Huffman tables: symbol map, table count, selectors and code lengths.
//! - Huffman decoding with RLE 2: Expand all runs of the zero byte (RUNA/RUNB) while undoing
//!   the MTF transform.
//! - BWT reversal: Restore the original data from the BWT transform.
//! - RLE 1: Expand all runs of 4+ identical bytes.
//!
//! Every step may run out of input part way through. The Decompressor keeps its position in an
//! explicit state and picks up again on the next call, so callers never block on the decoder.
//!
//! The reader module wraps all of this into a plain `std::io::Read` for blocking callers.
//!

pub mod block_decompress;
pub mod constants;
pub mod decompress;
pub mod reader;
