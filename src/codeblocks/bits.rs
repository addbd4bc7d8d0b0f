//! Packed bit view over codeblock storage
//!
//! Bits are stored most significant first: bit 0 of the view is the MSB of
//! the first byte.

/// Fixed-length bit view over a byte slice
#[derive(Debug)]
pub struct BitBuffer<B> {
    bytes: B,
    nof_bits: usize,
}

impl<B: AsRef<[u8]>> BitBuffer<B> {
    /// Wrap `bytes` as a view of `nof_bits` bits
    pub fn new(bytes: B, nof_bits: usize) -> Self {
        let capacity = bytes.as_ref().len() * 8;
        assert!(
            nof_bits <= capacity,
            "bit view of {} bits exceeds {} bits of storage",
            nof_bits,
            capacity
        );
        Self { bytes, nof_bits }
    }

    /// Number of bits in the view
    pub fn len(&self) -> usize {
        self.nof_bits
    }

    /// Whether the view holds no bits
    pub fn is_empty(&self) -> bool {
        self.nof_bits == 0
    }

    /// Read one bit
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.nof_bits, "bit {} out of range", index);
        let byte = self.bytes.as_ref()[index / 8];
        (byte >> (7 - index % 8)) & 1 == 1
    }

    /// Read `count` bits starting at `start` as an integer, first bit most significant
    pub fn extract(&self, start: usize, count: usize) -> u64 {
        assert!(count <= 64, "cannot extract more than 64 bits at once");
        assert!(
            start + count <= self.nof_bits,
            "bits {}..{} out of range",
            start,
            start + count
        );
        (start..start + count).fold(0u64, |value, index| (value << 1) | self.get(index) as u64)
    }

    /// Bytes backing the view
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes.as_ref()[..self.nof_bits.div_ceil(8)]
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BitBuffer<B> {
    /// Write one bit
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.nof_bits, "bit {} out of range", index);
        let mask = 1u8 << (7 - index % 8);
        let byte = &mut self.bytes.as_mut()[index / 8];
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Write the `count` low bits of `value` starting at `start`, most significant first
    pub fn insert(&mut self, value: u64, start: usize, count: usize) {
        assert!(count <= 64, "cannot insert more than 64 bits at once");
        assert!(
            start + count <= self.nof_bits,
            "bits {}..{} out of range",
            start,
            start + count
        );
        for offset in 0..count {
            let bit = (value >> (count - 1 - offset)) & 1;
            self.set(start + offset, bit == 1);
        }
    }

    /// Clear the bytes backing the view
    pub fn zero(&mut self) {
        let len = self.nof_bits.div_ceil(8);
        self.bytes.as_mut()[..len].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_first_layout() {
        let mut storage = [0u8; 2];
        let mut bits = BitBuffer::new(&mut storage[..], 12);
        bits.set(0, true);
        bits.set(9, true);
        assert_eq!(bits.as_bytes(), &[0x80, 0x40]);
    }

    #[test]
    fn test_insert_then_extract() {
        let mut storage = [0u8; 2];
        let mut bits = BitBuffer::new(&mut storage[..], 16);
        bits.insert(0b1011, 3, 4);
        assert_eq!(bits.extract(3, 4), 0b1011);
        assert_eq!(bits.extract(0, 8), 0b0001_0110);
        assert!(!bits.get(4));
        assert!(bits.get(5));
    }

    #[test]
    fn test_zero_clears_view() {
        let mut storage = [0xffu8; 3];
        let mut bits = BitBuffer::new(&mut storage[..], 10);
        bits.zero();
        assert_eq!(bits.extract(0, 10), 0);
        assert_eq!(storage, [0, 0, 0xff]);
    }

    #[test]
    fn test_read_only_view() {
        let storage = [0b1010_0000u8];
        let bits = BitBuffer::new(&storage[..], 3);
        assert_eq!(bits.len(), 3);
        assert_eq!(bits.extract(0, 3), 0b101);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn test_view_larger_than_storage_panics() {
        let storage = [0u8; 1];
        let _ = BitBuffer::new(&storage[..], 9);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_get_past_end_panics() {
        let storage = [0u8; 1];
        let bits = BitBuffer::new(&storage[..], 5);
        bits.get(5);
    }
}
