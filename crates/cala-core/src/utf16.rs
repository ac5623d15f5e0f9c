//! UTF-16 marshalling between host strings and linear memory.
//!
//! Strings cross the boundary as little-endian 16-bit code units, one unit
//! per slot. Lengths are always counted in code units, so a character
//! outside the Basic Multilingual Plane counts as two.
//!
//! Decoding goes unit by unit. Surrogate pairs recombine into the astral
//! character; an unpaired surrogate cannot be represented in a Rust string
//! and becomes U+FFFD. That loss is the documented behaviour, not an error.

use crate::error::MarshalError;
use crate::memory::{check_aligned, LinearMemory};

/// Encode a host string as UTF-16 code units.
pub fn encode(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Length of `text` in UTF-16 code units.
pub fn unit_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Turn code units back into text, replacing unpaired surrogates.
pub fn decode(units: &[u16]) -> String {
    char::decode_utf16(units.iter().copied())
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Read `len` code units starting at byte offset `ptr`.
pub fn read_units<M: LinearMemory + ?Sized>(
    memory: &M,
    ptr: u32,
    len: u32,
) -> Result<Vec<u16>, MarshalError> {
    let offset = ptr as usize;
    check_aligned(offset)?;
    let byte_len = (len as usize)
        .checked_mul(2)
        .ok_or(MarshalError::OutOfBounds {
            offset,
            len: usize::MAX,
            memory_size: memory.size(),
        })?;
    let raw = memory.read(offset, byte_len)?;
    Ok(raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Write code units starting at byte offset `ptr`. Returns bytes written.
///
/// The whole destination range is checked before the first byte changes.
pub fn write_units<M: LinearMemory + ?Sized>(
    memory: &mut M,
    ptr: u32,
    units: &[u16],
) -> Result<usize, MarshalError> {
    let offset = ptr as usize;
    check_aligned(offset)?;
    let range = memory.range(offset, units.len() * 2)?;
    let dest = &mut memory.bytes_mut()[range];
    for (slot, unit) in dest.chunks_exact_mut(2).zip(units) {
        slot.copy_from_slice(&unit.to_le_bytes());
    }
    Ok(units.len() * 2)
}

/// The decode helper behind the console imports.
pub fn read_string<M: LinearMemory + ?Sized>(
    memory: &M,
    ptr: u32,
    len: u32,
) -> Result<String, MarshalError> {
    read_units(memory, ptr, len).map(|units| decode(&units))
}
