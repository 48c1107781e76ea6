//! BitReader: A module for the Rust version of the standard BZIP2 library.
//!
//! Reads a packed bitstream, most significant bit first, from input that arrives in
//! arbitrary chunks. A `BitReader` is bound to one chunk for the length of a single
//! decompress call; everything that has to survive until the next chunk lives in a
//! [`BitState`].
//!
//! NOTE: Callers always ask `has_bits()` before reading. A read is never attempted "to see
//! if it works", so suspending on a short chunk has no side effects.
//!

/// Bits carried from one decompress call to the next.
#[derive(Debug, Default)]
pub struct BitState {
    /// Bit accumulator. Only the low `bit_count` bits are meaningful.
    bit_buffer: u64,
    /// Count of valid bits in the accumulator.
    bit_count: u32,
    /// Unread bytes left over from a chunk the decoder suspended on.
    carry: Vec<u8>,
}

impl BitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits held between calls (accumulator plus carried bytes).
    pub fn pending_bits(&self) -> usize {
        self.bit_count as usize + self.carry.len() * 8
    }
}

/// Reads bits from the carried state followed by the currently bound chunk.
#[derive(Debug)]
pub struct BitReader<'a> {
    state: BitState,
    carry_cursor: usize,
    input: &'a [u8],
    cursor: usize,
}

impl<'a> BitReader<'a> {
    /// Attach a new chunk, keeping whatever the previous call left behind.
    pub fn bind(state: BitState, input: &'a [u8]) -> Self {
        Self {
            state,
            carry_cursor: 0,
            input,
            cursor: 0,
        }
    }

    /// Count of bits that can be read right now.
    fn available_bits(&self) -> usize {
        let bytes =
            (self.state.carry.len() - self.carry_cursor) + (self.input.len() - self.cursor);
        self.state.bit_count as usize + bytes * 8
    }

    /// True if at least `n` bits can be read without more input.
    pub fn has_bits(&self, n: usize) -> bool {
        self.available_bits() >= n
    }

    /// True if at least `n` whole bytes worth of bits can be read without more input.
    pub fn has_bytes(&self, n: usize) -> bool {
        self.has_bits(n * 8)
    }

    /// True if at least one bit can be read.
    pub fn is_readable(&self) -> bool {
        self.has_bits(1)
    }

    /// Move the next byte (carry first, then the bound chunk) into the accumulator.
    /// Returns false if there is no more data.
    fn pull_byte(&mut self) -> bool {
        let byte = if self.carry_cursor < self.state.carry.len() {
            let byte = self.state.carry[self.carry_cursor];
            self.carry_cursor += 1;
            byte
        } else if self.cursor < self.input.len() {
            let byte = self.input[self.cursor];
            self.cursor += 1;
            byte
        } else {
            return false;
        };
        self.state.bit_buffer = self.state.bit_buffer << 8 | byte as u64;
        self.state.bit_count += 8;
        true
    }

    /// Return the next n bits (n <= 32). Must only be called after `has_bits(n)`.
    pub fn bint(&mut self, n: u32) -> u32 {
        debug_assert!(n <= 32, "bint reads at most 32 bits");
        debug_assert!(self.has_bits(n as usize), "bint called without enough bits");

        // Pull only as many bytes as this read needs, leaving fewer than 8 bits behind.
        while self.state.bit_count < n {
            if !self.pull_byte() {
                break;
            }
        }
        let mask = (1_u64 << n) - 1;
        if self.state.bit_count < n {
            // Out of data. Only reachable if the caller skipped has_bits(); pad with zeros.
            let value = (self.state.bit_buffer << (n - self.state.bit_count)) & mask;
            self.state.bit_count = 0;
            return value as u32;
        }
        self.state.bit_count -= n;
        ((self.state.bit_buffer >> self.state.bit_count) & mask) as u32
    }

    /// Return *true* if the next bit is 1, *false* if 0, consuming the bit.
    pub fn bool_bit(&mut self) -> bool {
        self.bint(1) == 1
    }

    /// Return the next 32 bits as a big-endian value. Used for CRC fields.
    pub fn fixed32(&mut self) -> u32 {
        self.bint(32)
    }

    /// Pull one more byte into the accumulator, if one is available.
    ///
    /// This is the one read that can leave 8 or more bits buffered (up to 15). They stay in the
    /// `BitState` and are read first on the next call.
    pub fn refill(&mut self) {
        if self.state.bit_count <= 56 {
            self.pull_byte();
        }
    }

    /// Bytes of the bound chunk moved into the accumulator so far during this call.
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// Bytes of the bound chunk not yet touched.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.cursor
    }

    /// End the call after running out of bits: the unread tail of the chunk moves into the
    /// carry, so the whole chunk counts as consumed.
    pub fn suspend(mut self) -> BitState {
        self.state.carry.drain(..self.carry_cursor);
        self.state.carry.extend_from_slice(&self.input[self.cursor..]);
        self.state
    }

    /// End the call leaving the unread tail of the chunk with the caller. Returns the carried
    /// state and the number of chunk bytes used.
    pub fn release(mut self) -> (BitState, usize) {
        self.state.carry.drain(..self.carry_cursor);
        (self.state, self.cursor)
    }

    /// Debugging function. Report current position as [chunk byte.buffered bits].
    pub fn loc(&self) -> String {
        format!("[{}.{}]", self.cursor, self.state.bit_count)
    }
}
