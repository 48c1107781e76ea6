//! Streaming bzip2 decompression.
//!
//! Decompresses data in the bzip2 format when the compressed bytes arrive in arbitrary pieces, as
//! they do from a socket or a pipe. The [`Decompressor`] never blocks and never asks for more input
//! than it is given: each call consumes what it can, and either hands back a finished block,
//! reports the end of the stream, or says it needs more bytes.
//!
//! ```no_run
//! use bzip2_stream::{Decompressed, Decompressor, HeapAllocator};
//!
//! # fn next_chunk() -> Vec<u8> { Vec::new() }
//! let mut decoder = Decompressor::new();
//! let mut output = Vec::new();
//! loop {
//!     let chunk = next_chunk();
//!     let mut input = &chunk[..];
//!     loop {
//!         match decoder.decompress(&mut input, &mut HeapAllocator).unwrap() {
//!             Decompressed::Block(block) => output.extend_from_slice(&block),
//!             Decompressed::EndOfStream => return,
//!             Decompressed::Suspended => break,
//!         }
//!     }
//! }
//! ```
//!
//! Blocking callers can use [`DecompressReader`] instead, which wraps any `std::io::Read`.
//!
pub mod bitstream;
pub mod compression;
pub mod error;
pub mod huffman_coding;
pub mod tools;

pub use compression::decompress::{Decompressed, Decompressor, HeapAllocator, OutputAllocator};
pub use compression::reader::DecompressReader;
pub use error::{DecompressError, Result};
