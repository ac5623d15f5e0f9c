//! Bounds-checked access to a module's linear memory.
//!
//! Pointers arriving from a module are `i32` values reinterpreted as
//! unsigned byte offsets. Every access computes the full range first and
//! refuses to touch memory if any part of it falls outside.

use crate::error::MarshalError;
use std::ops::Range;

/// A flat byte buffer addressed by offsets.
///
/// Implemented for `[u8]` and `Vec<u8>`, which is what an engine hands out
/// when it lends the memory of a running instance.
pub trait LinearMemory {
    fn bytes(&self) -> &[u8];

    fn bytes_mut(&mut self) -> &mut [u8];

    /// Current size in bytes.
    fn size(&self) -> usize {
        self.bytes().len()
    }

    /// Resolve `offset..offset + len`, failing if it leaves the memory.
    fn range(&self, offset: usize, len: usize) -> Result<Range<usize>, MarshalError> {
        let size = self.size();
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(offset..end),
            _ => Err(MarshalError::OutOfBounds {
                offset,
                len,
                memory_size: size,
            }),
        }
    }

    fn read(&self, offset: usize, len: usize) -> Result<&[u8], MarshalError> {
        let range = self.range(offset, len)?;
        Ok(&self.bytes()[range])
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), MarshalError> {
        let range = self.range(offset, data.len())?;
        self.bytes_mut()[range].copy_from_slice(data);
        Ok(())
    }

    /// Read a little-endian `u32`.
    fn read_u32(&self, offset: usize) -> Result<u32, MarshalError> {
        let raw = self.read(offset, 4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }
}

impl LinearMemory for [u8] {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl LinearMemory for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self.as_slice()
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

/// 16-bit views must start on an even byte.
pub fn check_aligned(offset: usize) -> Result<(), MarshalError> {
    if offset % 2 == 0 {
        Ok(())
    } else {
        Err(MarshalError::Misaligned { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_inside_bounds() {
        let mut mem = vec![0u8; 16];
        mem.write(4, &[1, 2, 3]).unwrap();
        assert_eq!(mem.read(4, 3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn write_past_end_leaves_memory_untouched() {
        let mut mem = vec![0u8; 8];
        let err = mem.write(6, &[9, 9, 9, 9]).unwrap_err();
        assert_eq!(
            err,
            MarshalError::OutOfBounds {
                offset: 6,
                len: 4,
                memory_size: 8
            }
        );
        assert!(mem.iter().all(|b| *b == 0));
    }

    #[test]
    fn range_rejects_overflowing_offsets() {
        let mem = vec![0u8; 8];
        assert!(mem.range(usize::MAX, 2).is_err());
    }

    #[test]
    fn zero_length_access_at_the_end_is_allowed() {
        let mem = vec![0u8; 8];
        assert_eq!(mem.read(8, 0).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn negative_pointers_map_to_high_offsets() {
        let ptr = -2i32 as u32 as usize;
        assert_eq!(ptr, u32::MAX as usize - 1);
        let mem = vec![0u8; 8];
        assert!(mem.read(ptr, 2).is_err());
    }

    #[test]
    fn read_u32_is_little_endian() {
        let mem = vec![0x78, 0x56, 0x34, 0x12];
        assert_eq!(mem.read_u32(0).unwrap(), 0x1234_5678);
    }

    #[test]
    fn alignment_check() {
        assert!(check_aligned(0).is_ok());
        assert!(check_aligned(1024).is_ok());
        assert_eq!(check_aligned(3), Err(MarshalError::Misaligned { offset: 3 }));
    }
}
