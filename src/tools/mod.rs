//! The tools module provides the small helpers the decompressor is built from.
//!
//! The tools are:
//! - cli: Command line interface for the bzip2-stream binary.
//! - crc: CRC32 checksum for BZIP2, both block and stream versions.
//! - mtf: Move-To-Front table used to decode selectors and block symbols.
//! - rand_table: The legacy randomisation table for blocks written with the randomised flag set.
//! - symbol_map: Decode the symbol map used in BZIP2.
//!
pub mod cli;
pub mod crc;
pub mod mtf;
pub mod rand_table;
pub mod symbol_map;
