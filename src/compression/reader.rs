//! Blocking `std::io::Read` adapter over the streaming decompressor.

use std::io::{self, Read};
use std::mem;

use log::trace;

use crate::compression::decompress::{Decompressed, Decompressor};

/// Default number of compressed bytes read from the source at a time.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Reads bzip2 compressed data from `source` and serves the decompressed bytes.
pub struct DecompressReader<R> {
    source: R,
    decompressor: Decompressor,
    /// Compressed bytes read from the source and not yet handed to the decompressor.
    input: Vec<u8>,
    input_pos: usize,
    /// Decompressed block being served.
    output: Vec<u8>,
    output_pos: usize,
    chunk_size: usize,
    source_done: bool,
}

impl<R: Read> DecompressReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    /// Read at most `chunk_size` compressed bytes from the source per refill.
    pub fn with_chunk_size(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            decompressor: Decompressor::new(),
            input: Vec::new(),
            input_pos: 0,
            output: Vec::new(),
            output_pos: 0,
            chunk_size: chunk_size.max(1),
            source_done: false,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// True once the whole stream has been decoded.
    pub fn is_finished(&self) -> bool {
        self.decompressor.is_finished()
    }

    /// Refill the compressed buffer from the source.
    fn fill_input(&mut self) -> io::Result<()> {
        self.input.resize(self.chunk_size, 0);
        let received = loop {
            match self.source.read(&mut self.input) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        self.input.truncate(received);
        self.input_pos = 0;
        if received == 0 {
            self.source_done = true;
        }
        Ok(())
    }
}

impl<R: Read> Read for DecompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.output_pos < self.output.len() {
                let n = buf.len().min(self.output.len() - self.output_pos);
                buf[..n].copy_from_slice(&self.output[self.output_pos..self.output_pos + n]);
                self.output_pos += n;
                return Ok(n);
            }
            if self.decompressor.is_finished() {
                return Ok(0);
            }
            if self.input_pos == self.input.len() && !self.source_done {
                self.fill_input()?;
            }

            // The served block's buffer is reused for the next one
            let Self {
                decompressor,
                input,
                input_pos,
                output,
                ..
            } = self;
            let mut chunk = &input[*input_pos..];
            let available = chunk.len();
            let mut recycle = |capacity: usize| {
                let mut buffer = mem::take(output);
                buffer.reserve(capacity);
                buffer
            };
            let result = decompressor.decompress(&mut chunk, &mut recycle)?;
            *input_pos += available - chunk.len();

            match result {
                Decompressed::Block(block) => {
                    trace!("\rServing a block of {} bytes.", block.len());
                    self.output = block;
                    self.output_pos = 0;
                }
                Decompressed::EndOfStream => return Ok(0),
                Decompressed::Suspended => {
                    if self.source_done {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "compressed file ends unexpectedly",
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::DecompressReader;
    use bzip2::{write::BzEncoder, Compression};
    use std::io::{self, Read, Write};

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn sample_text() -> Vec<u8> {
        let mut text = Vec::new();
        for i in 0..20_000_u32 {
            text.extend_from_slice(format!("line {} of the sample, {}\n", i, i % 7).as_bytes());
        }
        text
    }

    /// Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn read_to_end_test() {
        let text = sample_text();
        let compressed = compress(&text);
        let mut reader = DecompressReader::new(&compressed[..]);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, text);
        assert!(reader.is_finished());
        // Further reads keep returning 0
        assert_eq!(reader.read(&mut [0; 16]).unwrap(), 0);
    }

    #[test]
    fn small_chunks_test() {
        let text = sample_text();
        let compressed = compress(&text);
        let source = Trickle {
            data: &compressed,
            step: 3,
        };
        let mut reader = DecompressReader::with_chunk_size(source, 7);
        let mut out = Vec::new();
        let mut buf = [0; 100];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, text);
        assert!(reader.get_ref().data.is_empty());
    }

    #[test]
    fn empty_input_test() {
        let compressed = compress(b"");
        let mut reader = DecompressReader::new(&compressed[..]);
        let mut out = Vec::new();
        assert_eq!(reader.read_to_end(&mut out).unwrap(), 0);
    }

    #[test]
    fn truncated_test() {
        let compressed = compress(b"a few bytes that will not all arrive");
        let mut reader = DecompressReader::new(&compressed[..compressed.len() - 5]);
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn corrupt_test() {
        let mut compressed = compress(b"a few bytes that will be mangled");
        compressed[2] = b'x';
        let mut reader = DecompressReader::new(&compressed[..]);
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        // The decompressor gave up on the stream
        assert_eq!(reader.read(&mut [0; 4]).unwrap(), 0);
    }

    #[test]
    fn into_inner_test() {
        let compressed = compress(b"abc");
        let source = io::Cursor::new(compressed.clone());
        let mut reader = DecompressReader::new(source);
        assert_eq!(reader.get_mut().position(), 0);
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
        assert_eq!(reader.into_inner().into_inner(), compressed);
    }
}
