use log::{debug, trace};

use crate::bitstream::bitreader::BitReader;
use crate::compression::constants::{
    HUFFMAN_DECODE_MAX_CODE_LENGTH, HUFFMAN_ENCODE_MAX_CODE_LENGTH, HUFFMAN_GROUP_RUN_LENGTH,
    HUFFMAN_MAXIMUM_TABLES, HUFFMAN_MAX_ALPHABET_SIZE,
};
use crate::error::{DecompressError, Result};
use crate::tools::mtf::MoveToFrontTable;

const MAX_LEN: usize = HUFFMAN_DECODE_MAX_CODE_LENGTH;

/// Canonical decoding information for one huffman table.
#[derive(Debug, Clone)]
struct DecodeTable {
    /// Shortest code length in the table. Decoding always starts by reading this many bits.
    minimum_length: usize,
    /// For each length, the first code of that length minus the number of shorter symbols.
    bases: [i32; MAX_LEN + 2],
    /// For each length, the last code of that length (-1 when there is none).
    limits: [i32; MAX_LEN + 1],
    /// Symbols sorted by code length, then by symbol value.
    symbols: [u16; HUFFMAN_MAX_ALPHABET_SIZE],
}

impl DecodeTable {
    /// Build the table from the code length of every symbol (lengths are 1..=20).
    fn new(code_lengths: &[u8]) -> Self {
        let minimum_length = code_lengths.iter().copied().min().unwrap_or(1) as usize;
        let maximum_length = code_lengths.iter().copied().max().unwrap_or(0) as usize;

        let mut bases = [0_i32; MAX_LEN + 2];
        let mut limits = [-1_i32; MAX_LEN + 1];
        let mut symbols = [0_u16; HUFFMAN_MAX_ALPHABET_SIZE];

        // Count the symbols of each length (one slot up), then turn the counts into the number
        // of symbols shorter than each length.
        for &length in code_lengths {
            bases[length as usize + 1] += 1;
        }
        for i in 1..bases.len() {
            bases[i] += bases[i - 1];
        }

        // Codes of one length are consecutive. Record the last code of each length and the
        // offset from a code to its place in the symbol list.
        let mut code = 0_i32;
        for length in minimum_length..=maximum_length {
            let base = code;
            code += bases[length + 1] - bases[length];
            bases[length] = base - bases[length];
            limits[length] = code - 1;
            code <<= 1;
        }

        let mut code_index = 0;
        for length in minimum_length..=maximum_length {
            for (symbol, &symbol_length) in code_lengths.iter().enumerate() {
                if symbol_length as usize == length {
                    symbols[code_index] = symbol as u16;
                    code_index += 1;
                }
            }
        }

        Self {
            minimum_length,
            bases,
            limits,
            symbols,
        }
    }
}

/// Huffman stage of a block: collects the selector list and the code lengths while the block
/// header streams in, then decodes payload symbols with the table chosen for each group of 50.
#[derive(Debug, Clone)]
pub struct HuffmanStageDecoder {
    total_tables: usize,
    alphabet_size: usize,
    /// Table index for each group of 50 symbols.
    selectors: Vec<u8>,
    /// MTF over table indices, used to undo the selector transform.
    table_mtf: MoveToFrontTable,
    code_lengths: [[u8; HUFFMAN_MAX_ALPHABET_SIZE]; HUFFMAN_MAXIMUM_TABLES],
    tables: Vec<DecodeTable>,
    current_table: usize,
    /// Next selector to apply.
    group_index: usize,
    /// Symbols decoded so far in this block.
    group_position: usize,
}

impl HuffmanStageDecoder {
    /// Table count (2..=6) and alphabet size (3..=258) are validated by the caller.
    pub fn new(total_tables: usize, alphabet_size: usize) -> Self {
        Self {
            total_tables,
            alphabet_size,
            selectors: Vec::new(),
            table_mtf: MoveToFrontTable::new(total_tables),
            code_lengths: [[0; HUFFMAN_MAX_ALPHABET_SIZE]; HUFFMAN_MAXIMUM_TABLES],
            tables: Vec::with_capacity(total_tables),
            current_table: 0,
            group_index: 0,
            group_position: 0,
        }
    }

    pub fn total_tables(&self) -> usize {
        self.total_tables
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    pub fn set_selector_count(&mut self, count: usize) {
        self.selectors = vec![0; count];
    }

    pub fn selector_count(&self) -> usize {
        self.selectors.len()
    }

    pub fn selectors(&self) -> &[u8] {
        &self.selectors
    }

    /// Store selector `position` given its MTF-coded value (the length of its unary run).
    pub fn set_selector(&mut self, position: usize, mtf_index: usize) -> Result<()> {
        if mtf_index >= self.total_tables {
            return Err(DecompressError::InvalidSelector {
                index: mtf_index,
                tables: self.total_tables,
            });
        }
        self.selectors[position] = self.table_mtf.index_to_front(mtf_index);
        Ok(())
    }

    /// Store the code length of `symbol` in `table`. Lengths must be 1..=20.
    pub fn set_code_length(&mut self, table: usize, symbol: usize, length: i32) -> Result<()> {
        if !(1..=HUFFMAN_ENCODE_MAX_CODE_LENGTH).contains(&length) {
            return Err(DecompressError::InvalidCodeLength(length));
        }
        self.code_lengths[table][symbol] = length as u8;
        Ok(())
    }

    /// Build the canonical decoding tables. Called once, after every code length is known.
    pub fn create_huffman_decoding_tables(&mut self) {
        let alphabet_size = self.alphabet_size;
        self.tables = self.code_lengths[..self.total_tables]
            .iter()
            .map(|lengths| DecodeTable::new(&lengths[..alphabet_size]))
            .collect();
        for (i, table) in self.tables.iter().enumerate() {
            trace!("\rTable {} minimum code length {}", i, table.minimum_length);
        }
        debug!(
            "Built {} huffman tables for {} symbols and {} selectors.",
            self.total_tables,
            alphabet_size,
            self.selectors.len()
        );
    }

    /// Decode the next symbol. The caller guarantees 23 readable bits, so this never suspends.
    pub fn next_symbol(&mut self, br: &mut BitReader<'_>) -> Result<u16> {
        // Move to the next selector at the start of every group of 50 symbols
        if self.group_position % HUFFMAN_GROUP_RUN_LENGTH == 0 {
            let selector = *self
                .selectors
                .get(self.group_index)
                .ok_or(DecompressError::SelectorsExhausted)?;
            self.current_table = selector as usize;
            self.group_index += 1;
        }
        self.group_position += 1;

        let table = self
            .tables
            .get(self.current_table)
            .ok_or(DecompressError::InvalidHuffmanCode)?;

        // Start with the shortest code and add a bit at a time until the code fits a length.
        let mut length = table.minimum_length;
        let mut code = br.bint(length as u32) as i32;
        loop {
            if code <= table.limits[length] {
                return usize::try_from(code - table.bases[length])
                    .ok()
                    .and_then(|index| table.symbols.get(index))
                    .copied()
                    .ok_or(DecompressError::InvalidHuffmanCode);
            }
            if length == MAX_LEN {
                return Err(DecompressError::InvalidHuffmanCode);
            }
            code = code << 1 | br.bint(1) as i32;
            length += 1;
        }
    }
}
