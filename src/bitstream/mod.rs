//! The bitstream module forms the I/O subsystem for the Rust version of the standard BZIP2 library.
//!
//! BZIP2 is a block-oriented approach to compress data, but almost none of its fields line up
//! with byte boundaries. The decoder therefore reads everything through a BitReader.
//!
//! Input arrives in chunks of whatever size the transport hands over. The BitReader is bound to
//! one chunk per decompress call and carries the few bits (and, after a suspension, the few
//! bytes) that the next call will need in a `BitState`.
//!
//! The BitWriter is only built for tests, where it assembles hand-made streams.
//!
pub mod bitreader;
#[cfg(test)]
pub mod bitwriter;
