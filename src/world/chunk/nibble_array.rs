//! Packed 4-bit storage for per-voxel light intensities.
//!
//! Light values only span [0, 15], so two cells share one byte. The raw
//! byte view is part of the chunk serialization format and must stay
//! stable: cell `i` lives in byte `i / 2`, even cells in the low nibble,
//! odd cells in the high nibble.

/// A fixed-size array of 4-bit values.
#[derive(Clone, PartialEq, Eq)]
pub struct NibbleArray {
    data: Vec<u8>,
    len: usize,
}

impl NibbleArray {
    /// Creates a zero-filled array holding `len` 4-bit cells.
    pub fn new(len: usize) -> Self {
        NibbleArray {
            data: vec![0; len.div_ceil(2)],
            len,
        }
    }

    /// Number of 4-bit cells.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the array holds no cells.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads cell `index`. The caller is responsible for bounds checking;
    /// chunk accessors validate coordinates before indexing.
    pub fn get(&self, index: usize) -> u8 {
        let byte = self.data[index / 2];
        if index % 2 == 0 {
            byte & 0x0F
        } else {
            byte >> 4
        }
    }

    /// Writes cell `index`. Values above 15 are masked down.
    pub fn set(&mut self, index: usize, value: u8) {
        let byte = &mut self.data[index / 2];
        if index % 2 == 0 {
            *byte = (*byte & 0xF0) | (value & 0x0F);
        } else {
            *byte = (*byte & 0x0F) | ((value & 0x0F) << 4);
        }
    }

    /// The packed byte representation, used by the chunk codec.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Rebuilds an array from its packed byte representation.
    ///
    /// Returns `None` when `bytes` is not the packed size for `len` cells.
    pub fn from_raw_bytes(len: usize, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != len.div_ceil(2) {
            return None;
        }
        Some(NibbleArray {
            data: bytes.to_vec(),
            len,
        })
    }
}
