//! # Cala Core
//!
//! Core types for the Cala WebAssembly host bridge.
//!
//! Nothing in this crate knows about a wasm engine. Linear memory is any
//! byte slice, so everything here can be exercised against a plain
//! `Vec<u8>` and reused by whichever embedding owns the real memory:
//!
//! - **utf16** - encode host strings to code units, decode code units back
//! - **memory** - bounds-checked reads and writes over linear memory
//! - **strings** - the legacy pending-string slot and the handle table
//! - **wire** - length-prefixed UTF-16 frames
//! - **console** - the warn/info/debug/alert channels a module logs into
//! - **types** - capability flags, load strategies, host identity
//!
//! ## Quick Start
//!
//! ```rust
//! use cala_core::prelude::*;
//!
//! let mut memory = vec![0u8; 64];
//! let mut pending = PendingString::default();
//!
//! let len = pending.stash("Mozilla/5.0");
//! pending.write_into(memory.as_mut_slice(), 8).unwrap();
//!
//! let text = utf16::read_string(memory.as_slice(), 8, len as u32).unwrap();
//! assert_eq!(text, "Mozilla/5.0");
//! ```

pub mod console;
pub mod error;
pub mod memory;
pub mod prelude;
pub mod strings;
pub mod types;
pub mod utf16;
pub mod wire;
