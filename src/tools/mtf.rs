/// Move To Front table used to undo the MTF transform, both for the huffman table selectors
/// and for the block symbols.
#[derive(Debug, Clone)]
pub struct MoveToFrontTable {
    symbols: [u8; 256],
    len: usize,
}

impl MoveToFrontTable {
    /// Create a table holding 0..len in order (len <= 256).
    pub fn new(len: usize) -> Self {
        debug_assert!(len <= 256);
        let mut symbols = [0_u8; 256];
        for (i, symbol) in symbols.iter_mut().enumerate() {
            *symbol = i as u8;
        }
        Self {
            symbols,
            len: len.min(256),
        }
    }

    /// Return the symbol at `idx` and move it to the front of the table.
    pub fn index_to_front(&mut self, mut idx: usize) -> u8 {
        debug_assert!(idx < self.len);
        let temp_sym = self.symbols[idx];

        // Shift each symbol in front of idx back one. Do this first in blocks for speed.
        while idx > 3 {
            self.symbols[idx] = self.symbols[idx - 1];
            self.symbols[idx - 1] = self.symbols[idx - 2];
            self.symbols[idx - 2] = self.symbols[idx - 3];
            self.symbols[idx - 3] = self.symbols[idx - 4];
            idx -= 4;
        }
        // ...then clean up any odd ones
        while idx > 0 {
            self.symbols[idx] = self.symbols[idx - 1];
            idx -= 1;
        }
        // ...and finally move this symbol to the front.
        self.symbols[0] = temp_sym;
        temp_sym
    }

    /// Current order of the table.
    pub fn as_slice(&self) -> &[u8] {
        &self.symbols[..self.len]
    }
}
