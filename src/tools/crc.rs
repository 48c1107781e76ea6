//! CRC32 checksum for BZIP2, both block and stream versions.
//!
//! BZIP2 uses the big-endian CRC-32 (polynomial 0x04c11db7, initial value and final xor of all
//! ones). The stream CRC is not a CRC at all: it folds every block CRC into a running value with
//! a one-bit rotate and an xor.

const POLYNOMIAL: u32 = 0x04c1_1db7;

const CRC_TABLE: [u32; 256] = make_table();

const fn make_table() -> [u32; 256] {
    let mut table = [0_u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Running block CRC, updated a byte (or a run of identical bytes) at a time.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    value: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { value: 0xffff_ffff }
    }

    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.value = (self.value << 8) ^ CRC_TABLE[((self.value >> 24) ^ byte as u32) as usize];
    }

    /// Same as calling `update(byte)` `count` times.
    pub fn update_repeated(&mut self, byte: u8, count: u32) {
        for _ in 0..count {
            self.update(byte);
        }
    }

    pub fn update_slice(&mut self, data: &[u8]) {
        data.iter().for_each(|&byte| self.update(byte));
    }

    /// The finished CRC of everything seen so far.
    pub fn value(&self) -> u32 {
        !self.value
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Continue the finished CRC `crc` over `data`. `do_crc(0, data)` is the CRC of `data` alone.
pub fn do_crc(crc: u32, data: &[u8]) -> u32 {
    let mut running = Crc32 { value: !crc };
    running.update_slice(data);
    running.value()
}

/// Fold a block CRC into the stream CRC.
pub fn do_stream_crc(stream_crc: u32, block_crc: u32) -> u32 {
    stream_crc.rotate_left(1) ^ block_crc
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn check_value_test() {
        // Standard check value for CRC-32/BZIP2
        assert_eq!(do_crc(0, b"123456789"), 0xfc89_1918);
    }

    #[test]
    fn empty_test() {
        assert_eq!(do_crc(0, &[]), 0);
        assert_eq!(Crc32::new().value(), 0);
    }

    #[test]
    fn chained_test() {
        let whole = do_crc(0, b"hello, hello, hello, hello world\n");
        let part = do_crc(0, b"hello, hello, ");
        assert_eq!(do_crc(part, b"hello, hello world\n"), whole);
        assert_eq!(whole, 0xff74_5d86);
    }

    #[test]
    fn repeated_test() {
        let mut crc = Crc32::new();
        crc.update(b'a');
        crc.update_repeated(b'b', 7);
        assert_eq!(crc.value(), do_crc(0, b"abbbbbbb"));
    }

    #[test]
    fn stream_crc_test() {
        assert_eq!(do_stream_crc(0, 0x1234_5678), 0x1234_5678);
        assert_eq!(do_stream_crc(0x8000_0001, 0), 0x0000_0003);
        let folded = [0xdead_beef_u32, 0x0bad_f00d, 0x1234_5678]
            .iter()
            .fold(0, |acc, &crc| do_stream_crc(acc, crc));
        let expected =
            ((0xdead_beef_u32.rotate_left(1) ^ 0x0bad_f00d).rotate_left(1)) ^ 0x1234_5678;
        assert_eq!(folded, expected);
    }
}
