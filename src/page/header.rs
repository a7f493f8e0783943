//! Page header bitmap.
//!
//! The header occupies the first bytes of each heap page and holds one
//! occupancy bit per slot:
//! ```text
//! byte i / 8, bit i % 8 (least significant first)  ->  slot i
//! 1 = occupied, 0 = empty
//! ```
//! Bits past the last slot in the final byte are always zero.

/// Slot occupancy bitmap with an incrementally maintained popcount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBitmap {
    bits: Vec<u8>,
    num_slots: usize,
    used: usize,
}

impl HeaderBitmap {
    /// Create an all-empty bitmap for `num_slots` slots
    #[cfg(test)]
    pub(crate) fn new(num_slots: usize) -> Self {
        Self {
            bits: vec![0u8; num_slots.div_ceil(8)],
            num_slots,
            used: 0,
        }
    }

    /// Read a bitmap from the first `ceil(num_slots / 8)` bytes.
    ///
    /// Returns `None` if `bytes` is too short. Bits past `num_slots` are
    /// cleared.
    pub fn read(bytes: &[u8], num_slots: usize) -> Option<Self> {
        let size = num_slots.div_ceil(8);
        let mut bits = bytes.get(..size)?.to_vec();

        let tail = num_slots % 8;
        if tail != 0 {
            if let Some(last) = bits.last_mut() {
                *last &= (1u8 << tail) - 1;
            }
        }

        let used = bits.iter().map(|b| b.count_ones() as usize).sum();
        Some(Self {
            bits,
            num_slots,
            used,
        })
    }

    /// Write this bitmap to the front of `out`
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.bits);
    }

    /// Check whether slot `index` is occupied
    pub fn is_set(&self, index: usize) -> bool {
        index < self.num_slots && self.bits[index / 8] & (1 << (index % 8)) != 0
    }

    /// Set or clear slot `index`, keeping the occupied count in step
    pub fn set(&mut self, index: usize, occupied: bool) {
        debug_assert!(index < self.num_slots);
        let was = self.is_set(index);
        let mask = 1u8 << (index % 8);
        if occupied {
            self.bits[index / 8] |= mask;
            if !was {
                self.used += 1;
            }
        } else {
            self.bits[index / 8] &= !mask;
            if was {
                self.used -= 1;
            }
        }
    }

    /// Number of occupied slots
    pub fn used(&self) -> usize {
        self.used
    }

    /// Lowest-indexed empty slot, if any
    pub fn first_empty(&self) -> Option<usize> {
        if self.used == self.num_slots {
            return None;
        }
        self.bits
            .iter()
            .enumerate()
            .find(|(_, &b)| b != 0xFF)
            .map(|(i, &b)| i * 8 + (!b).trailing_zeros() as usize)
            .filter(|&slot| slot < self.num_slots)
    }

    /// Popcount of the raw bits, for invariant checks
    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }
}
