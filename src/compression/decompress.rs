//! Resumable bzip2 decompressor.
//!
//! `Decompressor::decompress` takes whatever input is available, walks the bzip2 container
//! one field at a time and returns as soon as it either finishes a block, reaches the end of
//! the stream, or runs out of bits. Running out of bits is not an error: the unread tail of
//! the chunk is carried in the decompressor and the next call picks up at the same bit.
//!
//! Every state checks that all the bits it needs are present before it reads any of them, so a
//! suspension never has to undo a partial read. The two loops that can be longer than one input
//! chunk (selectors and huffman code lengths) keep their position in the state itself.

use std::mem;

use log::{debug, info, trace};

use crate::bitstream::bitreader::{BitReader, BitState};
use crate::compression::block_decompress::{BlockBuffers, BlockDecompressor};
use crate::compression::constants::*;
use crate::error::{DecompressError, Result};
use crate::huffman_coding::huffman::HuffmanStageDecoder;
use crate::tools::crc::do_stream_crc;
use crate::tools::symbol_map::decode_sym_map;

/// Result of one call to [`Decompressor::decompress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decompressed {
    /// Out of input. The whole chunk was consumed; call again with more.
    Suspended,
    /// One complete, CRC-checked block of decompressed data.
    Block(Vec<u8>),
    /// The end-of-stream marker was reached and the stream CRC matched.
    EndOfStream,
}

/// Supplies the buffer each decompressed block is written into.
pub trait OutputAllocator {
    /// Return an empty buffer. `capacity` is a size hint (the block's pre-RLE1 length).
    fn allocate(&mut self, capacity: usize) -> Vec<u8>;
}

/// Allocates a fresh `Vec` for every block.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl OutputAllocator for HeapAllocator {
    fn allocate(&mut self, capacity: usize) -> Vec<u8> {
        Vec::with_capacity(capacity)
    }
}

impl<F> OutputAllocator for F
where
    F: FnMut(usize) -> Vec<u8>,
{
    fn allocate(&mut self, capacity: usize) -> Vec<u8> {
        let mut buffer = self(capacity);
        buffer.clear();
        buffer
    }
}

/// Position inside the huffman code length list, kept across suspensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LengthCursor {
    /// Table being read.
    group: usize,
    /// Running code length, None until the 5-bit start length of the table is read.
    length: Option<i32>,
    /// Symbol whose length is being read.
    symbol: usize,
    /// An alter bit was read and its direction bit is still due.
    modify_length: bool,
}

#[derive(Debug)]
enum State {
    Init,
    InitBlock,
    InitBlockParams {
        block_crc: u32,
    },
    ReceiveHuffmanUsedMap {
        block: Box<BlockDecompressor>,
    },
    ReceiveHuffmanUsedBitmaps {
        block: Box<BlockDecompressor>,
        in_use16: u16,
    },
    ReceiveSelectorsNumber {
        block: Box<BlockDecompressor>,
        huffman: Box<HuffmanStageDecoder>,
    },
    ReceiveSelectors {
        block: Box<BlockDecompressor>,
        huffman: Box<HuffmanStageDecoder>,
        selector: usize,
    },
    ReceiveHuffmanLength {
        block: Box<BlockDecompressor>,
        huffman: Box<HuffmanStageDecoder>,
        cursor: LengthCursor,
    },
    DecodeHuffmanData {
        block: Box<BlockDecompressor>,
        huffman: Box<HuffmanStageDecoder>,
    },
    Eof,
    Closed,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Init => "INIT",
            State::InitBlock => "INIT_BLOCK",
            State::InitBlockParams { .. } => "INIT_BLOCK_PARAMS",
            State::ReceiveHuffmanUsedMap { .. } => "RECEIVE_HUFFMAN_USED_MAP",
            State::ReceiveHuffmanUsedBitmaps { .. } => "RECEIVE_HUFFMAN_USED_BITMAPS",
            State::ReceiveSelectorsNumber { .. } => "RECEIVE_SELECTORS_NUMBER",
            State::ReceiveSelectors { .. } => "RECEIVE_SELECTORS",
            State::ReceiveHuffmanLength { .. } => "RECEIVE_HUFFMAN_LENGTH",
            State::DecodeHuffmanData { .. } => "DECODE_HUFFMAN_DATA",
            State::Eof => "EOF",
            State::Closed => "CLOSED",
        }
    }
}

/// What the state loop does after one step.
enum Flow {
    /// Move to the next state and keep going.
    Continue(State),
    /// Store the state and return to the caller.
    Yield(State, Decompressed),
}

impl Flow {
    fn suspend(state: State) -> Result<Flow> {
        Ok(Flow::Yield(state, Decompressed::Suspended))
    }
}

/// Streaming bzip2 decompressor for a single bzip2 stream.
#[derive(Debug)]
pub struct Decompressor {
    state: State,
    /// Maximum block length for this stream (header digit * 100k).
    block_size: usize,
    /// Fold of the CRCs of all blocks decoded so far.
    stream_crc: u32,
    /// Bits carried between calls.
    bits: BitState,
    /// Working buffers, lent to the current block.
    buffers: BlockBuffers,
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor {
    pub fn new() -> Self {
        Self {
            state: State::Init,
            block_size: 0,
            stream_crc: 0,
            bits: BitState::new(),
            buffers: BlockBuffers::new(),
        }
    }

    /// Decode as much of `input` as possible.
    ///
    /// On `Suspended` the whole of `input` has been consumed. On `Block` and `EndOfStream`,
    /// `input` is left pointing at the bytes that were not needed yet (after end of stream,
    /// whatever follows the stream). An empty `input` is fine: bits carried from earlier calls
    /// may be enough to make progress.
    ///
    /// Any error in the data is final. The decompressor moves to the end-of-stream state and
    /// later calls return `EndOfStream`.
    pub fn decompress<A>(&mut self, input: &mut &[u8], allocator: &mut A) -> Result<Decompressed>
    where
        A: OutputAllocator + ?Sized,
    {
        match self.state {
            State::Closed => return Err(DecompressError::Closed),
            State::Eof => return Ok(Decompressed::EndOfStream),
            _ => {}
        }

        let chunk = *input;
        let mut br = BitReader::bind(mem::take(&mut self.bits), chunk);
        let output = self.advance(&mut br, allocator)?;

        if matches!(output, Decompressed::Suspended) {
            self.bits = br.suspend();
            *input = &chunk[chunk.len()..];
        } else {
            let (bits, used) = br.release();
            self.bits = bits;
            *input = &chunk[used..];
        }
        Ok(output)
    }

    /// Run the state machine until it yields. An error leaves the state at EOF.
    fn advance<A>(&mut self, br: &mut BitReader<'_>, allocator: &mut A) -> Result<Decompressed>
    where
        A: OutputAllocator + ?Sized,
    {
        loop {
            let state = mem::replace(&mut self.state, State::Eof);
            match self.step(state, br, allocator)? {
                Flow::Continue(next) => self.state = next,
                Flow::Yield(next, output) => {
                    if matches!(output, Decompressed::Suspended) {
                        trace!("\r{} Suspended in {}.", br.loc(), next.name());
                    }
                    self.state = next;
                    return Ok(output);
                }
            }
        }
    }

    fn step<A>(&mut self, state: State, br: &mut BitReader<'_>, allocator: &mut A) -> Result<Flow>
    where
        A: OutputAllocator + ?Sized,
    {
        match state {
            State::Init => {
                if !br.has_bytes(4) {
                    return Flow::suspend(State::Init);
                }
                if br.bint(24) != MAGIC_NUMBER {
                    return Err(DecompressError::BadStreamMagic);
                }
                let digit = br.bint(8) as u8;
                let size = digit.wrapping_sub(b'0');
                if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&size) {
                    return Err(DecompressError::InvalidBlockSize(digit));
                }
                self.block_size = size as usize * BASE_BLOCK_SIZE;
                self.stream_crc = 0;
                info!("Found a valid bzip2 signature, block size {}k.", size as usize * 100);
                Ok(Flow::Continue(State::InitBlock))
            }

            State::InitBlock => {
                if !br.has_bits(BLOCK_HEADER_BITS) {
                    return Flow::suspend(State::InitBlock);
                }
                let magic1 = br.bint(24);
                let magic2 = br.bint(24);
                if magic1 == END_OF_STREAM_MAGIC_1 && magic2 == END_OF_STREAM_MAGIC_2 {
                    let stored = br.fixed32();
                    if stored != self.stream_crc {
                        return Err(DecompressError::StreamCrcMismatch {
                            stored,
                            computed: self.stream_crc,
                        });
                    }
                    info!("Found the stream footer, stream CRC {:#010x}.", stored);
                    return Ok(Flow::Yield(State::Eof, Decompressed::EndOfStream));
                }
                if magic1 != BLOCK_HEADER_MAGIC_1 || magic2 != BLOCK_HEADER_MAGIC_2 {
                    return Err(DecompressError::BadBlockHeader);
                }
                let block_crc = br.fixed32();
                info!("Found a valid block header, CRC {:#010x}.", block_crc);
                Ok(Flow::Continue(State::InitBlockParams { block_crc }))
            }

            State::InitBlockParams { block_crc } => {
                if !br.has_bits(25) {
                    return Flow::suspend(State::InitBlockParams { block_crc });
                }
                let randomised = br.bool_bit();
                let bwt_start_pointer = br.bint(24) as usize;
                if randomised {
                    info!("Block is randomised.");
                }
                trace!("\r{} Key is {}.", br.loc(), bwt_start_pointer);
                let block = Box::new(BlockDecompressor::new(
                    self.block_size,
                    block_crc,
                    randomised,
                    bwt_start_pointer,
                    mem::take(&mut self.buffers),
                ));
                Ok(Flow::Continue(State::ReceiveHuffmanUsedMap { block }))
            }

            State::ReceiveHuffmanUsedMap { block } => {
                if !br.has_bits(16) {
                    return Flow::suspend(State::ReceiveHuffmanUsedMap { block });
                }
                let in_use16 = br.bint(16) as u16;
                Ok(Flow::Continue(State::ReceiveHuffmanUsedBitmaps { block, in_use16 }))
            }

            State::ReceiveHuffmanUsedBitmaps {
                mut block,
                in_use16,
            } => {
                // One 16-bit map per used group, then the 3-bit table count
                let groups = in_use16.count_ones() as usize;
                if !br.has_bits(groups * HUFFMAN_SYMBOL_RANGE_SIZE + 3) {
                    return Flow::suspend(State::ReceiveHuffmanUsedBitmaps { block, in_use16 });
                }
                let mut sym_map = Vec::with_capacity(groups + 1);
                sym_map.push(in_use16);
                for _ in 0..groups {
                    sym_map.push(br.bint(16) as u16);
                }
                let symbols = decode_sym_map(&sym_map);
                let alphabet_size = symbols.len() + 2;

                let total_tables = br.bint(3);
                let table_range = HUFFMAN_MINIMUM_TABLES..=HUFFMAN_MAXIMUM_TABLES as u32;
                if !table_range.contains(&total_tables) {
                    return Err(DecompressError::InvalidTableCount(total_tables));
                }
                let alphabet_range = HUFFMAN_MIN_ALPHABET_SIZE..=HUFFMAN_MAX_ALPHABET_SIZE;
                if !alphabet_range.contains(&alphabet_size) {
                    return Err(DecompressError::InvalidAlphabetSize(alphabet_size));
                }
                block.set_symbol_map(symbols);
                debug!(
                    "Found {} symbols and {} huffman tables.",
                    block.symbol_count(),
                    total_tables
                );
                let huffman = Box::new(HuffmanStageDecoder::new(
                    total_tables as usize,
                    alphabet_size,
                ));
                Ok(Flow::Continue(State::ReceiveSelectorsNumber { block, huffman }))
            }

            State::ReceiveSelectorsNumber { block, mut huffman } => {
                if !br.has_bits(15) {
                    return Flow::suspend(State::ReceiveSelectorsNumber { block, huffman });
                }
                let total_selectors = br.bint(15);
                if !(1..=MAX_SELECTORS).contains(&total_selectors) {
                    return Err(DecompressError::InvalidSelectorCount(total_selectors));
                }
                huffman.set_selector_count(total_selectors as usize);
                Ok(Flow::Continue(State::ReceiveSelectors {
                    block,
                    huffman,
                    selector: 0,
                }))
            }

            State::ReceiveSelectors {
                block,
                mut huffman,
                mut selector,
            } => {
                let total_selectors = huffman.selector_count();
                let total_tables = huffman.total_tables();
                // Each selector is a run of 1s ended by a 0, at most 6 bits long
                while selector < total_selectors {
                    if !br.has_bits(HUFFMAN_SELECTOR_LIST_MAX_LENGTH) {
                        return Flow::suspend(State::ReceiveSelectors {
                            block,
                            huffman,
                            selector,
                        });
                    }
                    let mut index = 0;
                    while br.bool_bit() {
                        index += 1;
                        if index >= total_tables {
                            return Err(DecompressError::InvalidSelector {
                                index,
                                tables: total_tables,
                            });
                        }
                    }
                    huffman.set_selector(selector, index)?;
                    selector += 1;
                }
                debug!("Read {} selectors.", total_selectors);
                Ok(Flow::Continue(State::ReceiveHuffmanLength {
                    block,
                    huffman,
                    cursor: LengthCursor::default(),
                }))
            }

            State::ReceiveHuffmanLength {
                block,
                mut huffman,
                mut cursor,
            } => {
                let total_tables = huffman.total_tables();
                let alphabet_size = huffman.alphabet_size();

                while cursor.group < total_tables {
                    let mut length = match cursor.length {
                        Some(length) => length,
                        None => {
                            if !br.has_bits(5) {
                                return Flow::suspend(State::ReceiveHuffmanLength {
                                    block,
                                    huffman,
                                    cursor,
                                });
                            }
                            br.bint(5) as i32
                        }
                    };

                    while cursor.symbol < alphabet_size {
                        if !br.is_readable() {
                            cursor.length = Some(length);
                            return Flow::suspend(State::ReceiveHuffmanLength {
                                block,
                                huffman,
                                cursor,
                            });
                        }
                        // 1 = alter the length using the next bit, 0 = keep it for this symbol
                        if cursor.modify_length || br.bool_bit() {
                            if !br.is_readable() {
                                cursor.length = Some(length);
                                cursor.modify_length = true;
                                return Flow::suspend(State::ReceiveHuffmanLength {
                                    block,
                                    huffman,
                                    cursor,
                                });
                            }
                            // 1 = decrement, 0 = increment
                            length += if br.bool_bit() { -1 } else { 1 };
                            cursor.modify_length = false;
                        } else {
                            huffman.set_code_length(cursor.group, cursor.symbol, length)?;
                            cursor.symbol += 1;
                        }
                    }

                    cursor = LengthCursor {
                        group: cursor.group + 1,
                        ..LengthCursor::default()
                    };
                }

                huffman.create_huffman_decoding_tables();
                Ok(Flow::Continue(State::DecodeHuffmanData { block, huffman }))
            }

            State::DecodeHuffmanData {
                mut block,
                mut huffman,
            } => {
                let consumed = br.consumed();
                if !block.decode_huffman_data(&mut huffman, br)? {
                    return Flow::suspend(State::DecodeHuffmanData { block, huffman });
                }
                // A block that finished using only carried bits still takes a byte of this
                // chunk, so a call that returns data also shows input progress.
                if br.consumed() == consumed && br.remaining() > 0 {
                    br.refill();
                }

                let mut output = allocator.allocate(block.block_length());
                while let Some(byte) = block.read() {
                    output.push(byte);
                }
                let block_crc = block.check_crc()?;
                self.stream_crc = do_stream_crc(self.stream_crc, block_crc);
                info!(
                    "Decoded a block of {} bytes, CRC {:#010x}.",
                    output.len(),
                    block_crc
                );

                self.buffers = block.into_buffers();
                Ok(Flow::Yield(State::InitBlock, Decompressed::Block(output)))
            }

            // Both are answered in `decompress` before the loop runs
            done @ (State::Eof | State::Closed) => Ok(Flow::Yield(done, Decompressed::EndOfStream)),
        }
    }

    /// True once the end of the stream was reached (or a fatal error occurred), or after
    /// `close()`.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Eof | State::Closed)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Close the decompressor. Later calls to `decompress` fail with `Closed`.
    pub fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Err(DecompressError::AlreadyClosed);
        }
        self.state = State::Closed;
        self.bits = BitState::new();
        self.buffers = BlockBuffers::new();
        Ok(())
    }

    /// Fold of the CRCs of the blocks decoded so far.
    pub fn stream_crc(&self) -> u32 {
        self.stream_crc
    }

    /// Maximum block length declared in the stream header (0 before the header is read).
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}
