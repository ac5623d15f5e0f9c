//! Host strings waiting to be copied into a module.
//!
//! Two ways to hand a dynamic string to a module that has to allocate the
//! destination itself:
//!
//! - [`PendingString`] serves the legacy length/pointer import pair. The
//!   length call stashes the string, the pointer call writes whatever was
//!   stashed last. There is no token tying the two calls together, so a
//!   second length call before the write replaces the first string.
//! - [`StringTable`] issues a handle per request. Length and write calls
//!   name the handle, so requests can interleave freely.

use crate::error::{CalaError, HandleError, MarshalError};
use crate::memory::LinearMemory;
use crate::types::StringHandle;
use crate::utf16;
use crate::wire;
use std::collections::HashMap;
use std::num::NonZeroU32;

/// Single slot backing the legacy `*_Len` / `*_Ptr` imports.
#[derive(Debug, Clone, Default)]
pub struct PendingString {
    units: Vec<u16>,
}

impl PendingString {
    /// Stash `text` for the next write and return its length in code units.
    ///
    /// Last writer wins.
    pub fn stash(&mut self, text: &str) -> usize {
        self.units = utf16::encode(text);
        self.units.len()
    }

    /// Length recorded by the last [`stash`](Self::stash).
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Copy the stashed string to `ptr`. Returns bytes written.
    ///
    /// The slot is left as is; writing twice writes the same string twice.
    pub fn write_into<M: LinearMemory + ?Sized>(
        &self,
        memory: &mut M,
        ptr: u32,
    ) -> Result<usize, MarshalError> {
        utf16::write_units(memory, ptr, &self.units)
    }

    pub fn peek(&self) -> String {
        utf16::decode(&self.units)
    }
}

/// Handle-addressed host strings.
///
/// An entry lives until it is taken or released. The table is owned by one
/// session, so anything left over is dropped with it.
#[derive(Debug, Clone)]
pub struct StringTable {
    next: u32,
    entries: HashMap<StringHandle, Vec<u16>>,
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            next: 1,
            entries: HashMap::new(),
        }
    }

    /// Register `text` and return a fresh handle for it.
    pub fn open(&mut self, text: &str) -> Result<StringHandle, HandleError> {
        if self.next > i32::MAX as u32 {
            return Err(HandleError::Exhausted);
        }
        let raw = NonZeroU32::new(self.next).ok_or(HandleError::Exhausted)?;
        self.next += 1;
        let handle = StringHandle::from_raw(raw);
        self.entries.insert(handle, utf16::encode(text));
        Ok(handle)
    }

    /// Length of the string behind `handle`, in code units.
    pub fn len(&self, handle: StringHandle) -> Result<usize, HandleError> {
        self.entries
            .get(&handle)
            .map(Vec::len)
            .ok_or(HandleError::Unknown(handle.as_i32()))
    }

    /// Bytes needed to take the string behind `handle` as a frame.
    pub fn frame_len(&self, handle: StringHandle) -> Result<usize, HandleError> {
        self.len(handle).map(wire::frame_len)
    }

    /// Write the string behind `handle` as a length-prefixed frame at `ptr`
    /// and release the handle. Returns bytes written.
    ///
    /// `capacity` is the size of the buffer the module set aside. If the
    /// frame does not fit, or the buffer is outside memory, nothing is
    /// written and the handle stays live so the module can retry.
    pub fn take_into<M: LinearMemory + ?Sized>(
        &mut self,
        memory: &mut M,
        handle: StringHandle,
        ptr: u32,
        capacity: u32,
    ) -> Result<usize, CalaError> {
        let units = self
            .entries
            .get(&handle)
            .ok_or(HandleError::Unknown(handle.as_i32()))?;
        let needed = wire::frame_len(units.len());
        if needed > capacity as usize {
            return Err(MarshalError::InsufficientCapacity {
                needed,
                capacity: capacity as usize,
            }
            .into());
        }
        let written = wire::write_frame(memory, ptr, units)?;
        self.entries.remove(&handle);
        Ok(written)
    }

    /// Drop a handle without writing it.
    pub fn release(&mut self, handle: StringHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    /// Number of handles issued and not yet taken.
    pub fn live(&self) -> usize {
        self.entries.len()
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}
