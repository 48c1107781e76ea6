//! Block payload decoding: huffman symbols to BWT bytes, then inverse BWT and RLE1 back to the
//! original data.
//!
//! The huffman side is re-entrant. `decode_huffman_data` checks that a whole symbol's worth of
//! bits is available before every symbol, so the RUNA/RUNB accumulator and the MTF value are
//! the only things that have to survive a suspension, and they live in the struct.

use log::{debug, trace};

use crate::bitstream::bitreader::BitReader;
use crate::compression::constants::{
    HUFFMAN_DECODE_MAX_CODE_LENGTH, HUFFMAN_SYMBOL_RUNA, HUFFMAN_SYMBOL_RUNB,
};
use crate::error::{DecompressError, Result};
use crate::huffman_coding::huffman::HuffmanStageDecoder;
use crate::tools::crc::Crc32;
use crate::tools::mtf::MoveToFrontTable;
use crate::tools::rand_table::BlockRandomiser;

/// Working storage for one block. Handed from block to block so the (up to 900k entry)
/// vectors are only allocated once per stream.
#[derive(Debug, Default)]
pub struct BlockBuffers {
    /// BWT output, as decoded from the huffman stage.
    bwt_block: Vec<u8>,
    /// Inverse BWT vector: `(next index << 8) | byte`.
    merged_pointers: Vec<u32>,
}

impl BlockBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the buffers and make sure a block of `block_size` fits without reallocation.
    fn reset(&mut self, block_size: usize) {
        self.bwt_block.clear();
        self.bwt_block.reserve(block_size);
        self.merged_pointers.clear();
    }

    pub fn capacity(&self) -> usize {
        self.bwt_block.capacity()
    }
}

/// Decoder for the payload of a single block.
#[derive(Debug)]
pub struct BlockDecompressor {
    /// CRC stored in the block header.
    block_crc: u32,
    /// CRC of the bytes returned by `read()` so far.
    crc: Crc32,
    randomiser: Option<BlockRandomiser>,

    /// Byte value for each used symbol, in order.
    huffman_symbol_map: Vec<u8>,
    huffman_end_of_block_symbol: u16,
    symbol_mtf: MoveToFrontTable,

    /// Declared maximum block length (header digit * 100k).
    block_size: usize,
    bwt_start_pointer: usize,
    bwt_byte_counts: [u32; 256],
    buffers: BlockBuffers,

    // Huffman stage state carried across suspensions
    repeat_count: usize,
    repeat_increment: usize,
    mtf_value: usize,

    // Inverse BWT and RLE1 state
    current_merged_pointer: u32,
    bwt_bytes_decoded: usize,
    rle_last_decoded_byte: Option<u8>,
    rle_accumulator: u32,
    rle_repeat: u32,
}

impl BlockDecompressor {
    pub fn new(
        block_size: usize,
        block_crc: u32,
        randomised: bool,
        bwt_start_pointer: usize,
        mut buffers: BlockBuffers,
    ) -> Self {
        buffers.reset(block_size);
        Self {
            block_crc,
            crc: Crc32::new(),
            randomiser: randomised.then(BlockRandomiser::new),
            huffman_symbol_map: Vec::new(),
            huffman_end_of_block_symbol: 0,
            symbol_mtf: MoveToFrontTable::new(256),
            block_size,
            bwt_start_pointer,
            bwt_byte_counts: [0; 256],
            buffers,
            repeat_count: 0,
            repeat_increment: 1,
            mtf_value: 0,
            current_merged_pointer: 0,
            bwt_bytes_decoded: 0,
            rle_last_decoded_byte: None,
            rle_accumulator: 0,
            rle_repeat: 0,
        }
    }

    /// Set the bytes used in this block (from the symbol map). The end-of-block symbol is
    /// one past the last MTF symbol.
    pub fn set_symbol_map(&mut self, symbols: Vec<u8>) {
        self.huffman_end_of_block_symbol = symbols.len() as u16 + 1;
        self.huffman_symbol_map = symbols;
    }

    pub fn symbol_count(&self) -> usize {
        self.huffman_symbol_map.len()
    }

    /// Decode huffman symbols until the end-of-block symbol (returns true) or until the bits run
    /// out (returns false; call again with more input).
    pub fn decode_huffman_data(
        &mut self,
        huffman: &mut HuffmanStageDecoder,
        br: &mut BitReader<'_>,
    ) -> Result<bool> {
        loop {
            if !br.has_bits(HUFFMAN_DECODE_MAX_CODE_LENGTH) {
                trace!("\rSuspending block at {} bytes {}", self.buffers.bwt_block.len(), br.loc());
                return Ok(false);
            }
            let next_symbol = huffman.next_symbol(br)?;

            match next_symbol {
                HUFFMAN_SYMBOL_RUNA => {
                    self.repeat_count += self.repeat_increment;
                    self.repeat_increment <<= 1;
                    self.zero_bomb(self.repeat_count)?;
                }
                HUFFMAN_SYMBOL_RUNB => {
                    self.repeat_count += self.repeat_increment << 1;
                    self.repeat_increment <<= 1;
                    self.zero_bomb(self.repeat_count)?;
                }
                symbol => {
                    // Flush any pending run of the front symbol first
                    if self.repeat_count > 0 {
                        self.zero_bomb(self.repeat_count)?;
                        let next_byte = self.huffman_symbol_map[self.mtf_value];
                        self.bwt_byte_counts[next_byte as usize] += self.repeat_count as u32;
                        let new_len = self.buffers.bwt_block.len() + self.repeat_count;
                        self.buffers.bwt_block.resize(new_len, next_byte);
                        self.repeat_count = 0;
                        self.repeat_increment = 1;
                    }

                    if symbol == self.huffman_end_of_block_symbol {
                        break;
                    }

                    self.zero_bomb(1)?;
                    self.mtf_value = self.symbol_mtf.index_to_front(symbol as usize - 1) as usize;
                    let next_byte = *self
                        .huffman_symbol_map
                        .get(self.mtf_value)
                        .ok_or(DecompressError::InvalidHuffmanCode)?;
                    self.bwt_byte_counts[next_byte as usize] += 1;
                    self.buffers.bwt_block.push(next_byte);
                }
            }
        }

        self.initialise_inverse_bwt()?;
        debug!(
            "Block huffman stage done: {} BWT bytes, start pointer {}.",
            self.buffers.bwt_block.len(),
            self.bwt_start_pointer
        );
        Ok(true)
    }

    /// Fail if adding `extra` bytes would take the block past its declared size.
    fn zero_bomb(&self, extra: usize) -> Result<()> {
        if self.buffers.bwt_block.len() + extra > self.block_size {
            return Err(DecompressError::BlockOverflow);
        }
        Ok(())
    }

    /// Build the merged pointer vector used to walk the BWT back to the original order.
    fn initialise_inverse_bwt(&mut self) -> Result<()> {
        let length = self.buffers.bwt_block.len();
        if self.bwt_start_pointer >= length {
            return Err(DecompressError::InvalidStartPointer {
                pointer: self.bwt_start_pointer,
                length,
            });
        }

        // Convert the byte counts to the position of the first occurrence of each byte in the
        // sorted block
        let mut character_base = [0_usize; 256];
        let mut total = 0;
        for (base, &count) in character_base.iter_mut().zip(self.bwt_byte_counts.iter()) {
            *base = total;
            total += count as usize;
        }

        let BlockBuffers {
            bwt_block,
            merged_pointers,
        } = &mut self.buffers;
        merged_pointers.resize(length, 0);
        for (i, &byte) in bwt_block.iter().enumerate() {
            let slot = &mut character_base[byte as usize];
            merged_pointers[*slot] = (i as u32) << 8 | byte as u32;
            *slot += 1;
        }

        self.current_merged_pointer = merged_pointers[self.bwt_start_pointer];
        Ok(())
    }

    /// Number of BWT bytes in the block. The RLE1 output may be longer.
    pub fn block_length(&self) -> usize {
        self.buffers.bwt_block.len()
    }

    fn decode_next_bwt_byte(&mut self) -> u8 {
        let merged_pointer = self.current_merged_pointer;
        let mut next_byte = merged_pointer as u8;
        self.current_merged_pointer = self.buffers.merged_pointers[(merged_pointer >> 8) as usize];
        if let Some(randomiser) = self.randomiser.as_mut() {
            next_byte ^= randomiser.next_mask();
        }
        self.bwt_bytes_decoded += 1;
        next_byte
    }

    /// Return the next decoded byte of the block, or None when the block is exhausted.
    /// Only valid after `decode_huffman_data` returned true.
    pub fn read(&mut self) -> Option<u8> {
        while self.rle_repeat < 1 {
            if self.bwt_bytes_decoded == self.buffers.bwt_block.len() {
                return None;
            }
            let next_byte = self.decode_next_bwt_byte();
            if self.rle_last_decoded_byte != Some(next_byte) {
                self.rle_last_decoded_byte = Some(next_byte);
                self.rle_repeat = 1;
                self.rle_accumulator = 1;
                self.crc.update(next_byte);
            } else {
                self.rle_accumulator += 1;
                if self.rle_accumulator == 4 {
                    // The fourth equal byte is followed by a count of extra copies. A block
                    // ending right after the fourth byte has no count.
                    let repeat = if self.bwt_bytes_decoded < self.buffers.bwt_block.len() {
                        self.decode_next_bwt_byte() as u32 + 1
                    } else {
                        1
                    };
                    self.rle_repeat = repeat;
                    self.rle_accumulator = 0;
                    self.crc.update_repeated(next_byte, repeat);
                } else {
                    self.rle_repeat = 1;
                    self.crc.update(next_byte);
                }
            }
        }
        self.rle_repeat -= 1;
        self.rle_last_decoded_byte
    }

    /// Verify the CRC of everything read against the stored block CRC, returning the CRC.
    pub fn check_crc(&self) -> Result<u32> {
        let computed = self.crc.value();
        if computed != self.block_crc {
            return Err(DecompressError::BlockCrcMismatch {
                stored: self.block_crc,
                computed,
            });
        }
        Ok(computed)
    }

    /// Give the working buffers back for the next block.
    pub fn into_buffers(self) -> BlockBuffers {
        self.buffers
    }
}

#[cfg(test)]
mod test {
    use super::{BlockBuffers, BlockDecompressor};
    use crate::bitstream::bitreader::{BitReader, BitState};
    use crate::bitstream::bitwriter::BitWriter;
    use crate::error::DecompressError;
    use crate::huffman_coding::huffman::HuffmanStageDecoder;
    use crate::tools::crc::do_crc;

    /// A huffman stage where every symbol of a small alphabet has a 3 bit code (code == symbol).
    fn flat_huffman(alphabet_size: usize) -> HuffmanStageDecoder {
        let mut huf = HuffmanStageDecoder::new(2, alphabet_size);
        huf.set_selector_count(4);
        for i in 0..4 {
            huf.set_selector(i, 0).unwrap();
        }
        for table in 0..2 {
            for symbol in 0..alphabet_size {
                huf.set_code_length(table, symbol, 3).unwrap();
            }
        }
        huf.create_huffman_decoding_tables();
        huf
    }

    fn symbols_to_bits(symbols: &[u32]) -> Vec<u8> {
        let mut bw = BitWriter::new();
        symbols.iter().for_each(|&s| bw.out(3, s));
        // Padding so every symbol has its 23 bit window available
        bw.out(24, 0);
        bw.finish()
    }

    /// BWT of "banana" is "nnbaaa" with the original at row 3.
    /// Symbol map [a, b, n] => MTF of "nnbaaa": 2, 0, 2, 2, 0, 0 => symbols 3, RUNA, 3, 3, RUNB
    fn banana_block() -> (BlockDecompressor, Vec<u8>) {
        let mut block =
            BlockDecompressor::new(100_000, do_crc(0, b"banana"), false, 3, BlockBuffers::new());
        block.set_symbol_map(b"abn".to_vec());
        // EOB is 4; RUNA = 0, RUNB = 1
        (block, symbols_to_bits(&[3, 0, 3, 3, 1, 4]))
    }

    #[test]
    fn banana_test() {
        let (mut block, data) = banana_block();
        let mut huf = flat_huffman(5);
        let mut br = BitReader::bind(BitState::new(), &data);
        assert_eq!(block.decode_huffman_data(&mut huf, &mut br), Ok(true));
        assert_eq!(block.block_length(), 6);
        let out: Vec<u8> = std::iter::from_fn(|| block.read()).collect();
        assert_eq!(out, b"banana");
        assert_eq!(block.check_crc(), Ok(do_crc(0, b"banana")));
    }

    #[test]
    fn resumes_between_symbols_test() {
        let (mut block, data) = banana_block();
        let mut huf = flat_huffman(5);
        // Not enough bits for even one symbol window
        let mut br = BitReader::bind(BitState::new(), &data[..2]);
        assert_eq!(block.decode_huffman_data(&mut huf, &mut br), Ok(false));
        let state = br.suspend();
        let mut br = BitReader::bind(state, &data[2..]);
        assert_eq!(block.decode_huffman_data(&mut huf, &mut br), Ok(true));
        let out: Vec<u8> = std::iter::from_fn(|| block.read()).collect();
        assert_eq!(out, b"banana");
    }

    #[test]
    fn rle1_run_test() {
        // "aaaa\x03" is four a's and a count of 3 extra. Its BWT is "aaaa\x03" with the
        // original at row 4; over the map [0x03, a] the MTF/RUN symbols are 2, RUNA, RUNA, 2, EOB.
        let expected = b"aaaaaaa";
        let mut block =
            BlockDecompressor::new(100_000, do_crc(0, expected), false, 4, BlockBuffers::new());
        block.set_symbol_map(vec![0x03, b'a']);
        let data = symbols_to_bits(&[2, 0, 0, 2, 3]);
        let mut huf = flat_huffman(4);
        let mut br = BitReader::bind(BitState::new(), &data);
        assert_eq!(block.decode_huffman_data(&mut huf, &mut br), Ok(true));
        assert_eq!(block.block_length(), 5);
        let out: Vec<u8> = std::iter::from_fn(|| block.read()).collect();
        assert_eq!(out, expected);
        assert!(block.check_crc().is_ok());
    }

    #[test]
    fn rle1_missing_count_test() {
        // A block ending on the fourth equal byte has no count byte: "aaaa" at row 0
        let mut block =
            BlockDecompressor::new(100_000, do_crc(0, b"aaaa"), false, 0, BlockBuffers::new());
        block.set_symbol_map(vec![b'a']);
        // Four copies of the front symbol: RUNB (2 * 1) then RUNA (1 * 2)
        let data = symbols_to_bits(&[1, 0, 2]);
        let mut huf = flat_huffman(3);
        let mut br = BitReader::bind(BitState::new(), &data);
        assert_eq!(block.decode_huffman_data(&mut huf, &mut br), Ok(true));
        let out: Vec<u8> = std::iter::from_fn(|| block.read()).collect();
        assert_eq!(out, b"aaaa");
        assert!(block.check_crc().is_ok());
    }

    #[test]
    fn block_crc_mismatch_test() {
        let mut block = BlockDecompressor::new(100_000, 0x1234, false, 3, BlockBuffers::new());
        block.set_symbol_map(b"abn".to_vec());
        let data = symbols_to_bits(&[3, 0, 3, 3, 1, 4]);
        let mut huf = flat_huffman(5);
        let mut br = BitReader::bind(BitState::new(), &data);
        assert_eq!(block.decode_huffman_data(&mut huf, &mut br), Ok(true));
        while block.read().is_some() {}
        assert_eq!(
            block.check_crc(),
            Err(DecompressError::BlockCrcMismatch {
                stored: 0x1234,
                computed: do_crc(0, b"banana")
            })
        );
    }

    #[test]
    fn overflow_test() {
        // Declared block size 4, payload of 6 bytes
        let mut block = BlockDecompressor::new(4, 0, false, 0, BlockBuffers::new());
        block.set_symbol_map(b"abn".to_vec());
        let data = symbols_to_bits(&[3, 0, 3, 3, 1, 4]);
        let mut huf = flat_huffman(5);
        let mut br = BitReader::bind(BitState::new(), &data);
        assert_eq!(
            block.decode_huffman_data(&mut huf, &mut br),
            Err(DecompressError::BlockOverflow)
        );
    }

    #[test]
    fn run_overflow_test() {
        // RUNB RUNB RUNB RUNB = 2 + 4 + 8 + 16 = 30 copies, in a block of 20
        let mut block = BlockDecompressor::new(20, 0, false, 0, BlockBuffers::new());
        block.set_symbol_map(b"abn".to_vec());
        let data = symbols_to_bits(&[1, 1, 1, 1, 4]);
        let mut huf = flat_huffman(5);
        let mut br = BitReader::bind(BitState::new(), &data);
        assert_eq!(
            block.decode_huffman_data(&mut huf, &mut br),
            Err(DecompressError::BlockOverflow)
        );
    }

    #[test]
    fn start_pointer_test() {
        let mut block = BlockDecompressor::new(100_000, 0, false, 6, BlockBuffers::new());
        block.set_symbol_map(b"abn".to_vec());
        let data = symbols_to_bits(&[3, 0, 3, 3, 1, 4]);
        let mut huf = flat_huffman(5);
        let mut br = BitReader::bind(BitState::new(), &data);
        assert_eq!(
            block.decode_huffman_data(&mut huf, &mut br),
            Err(DecompressError::InvalidStartPointer {
                pointer: 6,
                length: 6
            })
        );
    }

    #[test]
    fn buffers_are_recycled_test() {
        let (mut block, data) = banana_block();
        let mut huf = flat_huffman(5);
        let mut br = BitReader::bind(BitState::new(), &data);
        block.decode_huffman_data(&mut huf, &mut br).unwrap();
        let buffers = block.into_buffers();
        assert!(buffers.capacity() >= 100_000);
        let block = BlockDecompressor::new(100_000, 0, false, 0, buffers);
        assert_eq!(block.block_length(), 0);
    }
}
