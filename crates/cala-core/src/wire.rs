//! Length-prefixed UTF-16 frames.
//!
//! ```text
//! ptr      ptr+4                       ptr+4+2n
//! ┌────────┬───────┬───────┬─────┬───────┐
//! │ n: u32 │ unit0 │ unit1 │ ... │ unitn │
//! └────────┴───────┴───────┴─────┴───────┘
//! ```
//!
//! All values little-endian. A frame carries its own length, so a reader
//! never depends on an earlier call having reported it.

use crate::error::MarshalError;
use crate::memory::{check_aligned, LinearMemory};
use crate::utf16;

/// Size of the unit-count prefix.
pub const PREFIX_LEN: usize = 4;

/// Bytes needed for a frame holding `units` code units.
pub fn frame_len(units: usize) -> usize {
    PREFIX_LEN + units * 2
}

/// Write a frame at `ptr`. Returns bytes written.
pub fn write_frame<M: LinearMemory + ?Sized>(
    memory: &mut M,
    ptr: u32,
    units: &[u16],
) -> Result<usize, MarshalError> {
    let offset = ptr as usize;
    check_aligned(offset)?;
    // Check the whole frame before writing the prefix.
    memory.range(offset, frame_len(units.len()))?;
    memory.write(offset, &(units.len() as u32).to_le_bytes())?;
    let body = offset + PREFIX_LEN;
    utf16::write_units(memory, body as u32, units)?;
    Ok(frame_len(units.len()))
}

/// Read the code units of the frame at `ptr`.
pub fn read_frame<M: LinearMemory + ?Sized>(
    memory: &M,
    ptr: u32,
) -> Result<Vec<u16>, MarshalError> {
    let offset = ptr as usize;
    check_aligned(offset)?;
    let count = memory.read_u32(offset)?;
    let body = offset
        .checked_add(PREFIX_LEN)
        .filter(|b| *b <= u32::MAX as usize)
        .ok_or(MarshalError::OutOfBounds {
            offset,
            len: PREFIX_LEN,
            memory_size: memory.size(),
        })?;
    utf16::read_units(memory, body as u32, count)
}

pub fn read_frame_string<M: LinearMemory + ?Sized>(
    memory: &M,
    ptr: u32,
) -> Result<String, MarshalError> {
    read_frame(memory, ptr).map(|units| utf16::decode(&units))
}
