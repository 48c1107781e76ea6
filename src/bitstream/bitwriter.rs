//! BitWriter: packs fields MSB first into a byte vec. Test support for building bzip2
//! streams (valid or deliberately broken) one field at a time.

/// Creates a bitstream in memory.
pub struct BitWriter {
    output: Vec<u8>,
    /// Private queue to hold bits that are waiting to be put as bytes into the output buffer.
    queue: u64,
    /// Count of valid bits in the queue.
    q_bits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            output: Vec::new(),
            queue: 0,
            q_bits: 0,
        }
    }

    /// Internal bitstream write function common to all out functions.
    fn push_queue(&mut self) {
        while self.q_bits > 7 {
            let byte = (self.queue >> (self.q_bits - 8)) as u8;
            self.output.push(byte); //push the packed byte out
            self.q_bits -= 8; //adjust the count of bits left in the queue
        }
    }

    /// Write the low `depth` bits of `data` (depth <= 32).
    pub fn out(&mut self, depth: u32, data: u32) {
        let mask = (1_u64 << depth) - 1;
        self.queue = self.queue << depth | (data as u64 & mask);
        self.q_bits += depth;
        self.push_queue();
    }

    pub fn out_bit(&mut self, bit: bool) {
        self.out(1, bit as u32);
    }

    /// Write raw bytes (which need not be byte aligned on the stream).
    pub fn out_bytes(&mut self, data: &[u8]) {
        data.iter().for_each(|&b| self.out(8, b as u32));
    }

    /// Flushes the remaining bits (1-7) from the buffer, padding with 0s in the least
    /// signficant bits, and returns the stream.
    pub fn finish(mut self) -> Vec<u8> {
        if self.q_bits > 0 {
            let pad = 8 - self.q_bits;
            self.out(pad, 0);
        }
        self.output
    }

    /// Debugging function to return the number of bytes.bits output so far
    pub fn loc(&self) -> String {
        let bits = self.output.len() * 8 + self.q_bits as usize;
        format!("[{}.{}]", bits / 8, bits % 8)
    }
}

#[cfg(test)]
mod test {
    use super::BitWriter;

    #[test]
    fn out_bytes_test() {
        let mut bw = BitWriter::new();
        bw.out_bytes(b"x");
        assert_eq!(bw.finish(), "x".as_bytes());
    }

    #[test]
    fn last_bits_test() {
        let mut bw = BitWriter::new();
        bw.out(8, 255);
        bw.out(8, 1);
        bw.out(3, 0b111);
        assert_eq!(bw.loc(), "[2.3]");
        assert_eq!(bw.finish(), vec![255, 1, 224]);
    }

    #[test]
    fn unaligned_test() {
        let mut bw = BitWriter::new();
        bw.out_bit(true);
        bw.out(32, 0x8000_0001);
        assert_eq!(bw.finish(), vec![0xc0, 0x00, 0x00, 0x00, 0x80]);
    }
}
