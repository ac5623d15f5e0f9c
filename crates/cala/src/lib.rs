//! # Cala
//!
//! Run WebAssembly modules against a browser-style host bridge.
//!
//! A module compiled for the browser expects a handful of functions under
//! `env`: the user agent string, console output and `alert`. Cala provides
//! those imports on top of `wasmtime`, moves text across the boundary as
//! UTF-16 and picks a load strategy from the host's capabilities.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cala::prelude::*;
//!
//! let loader = Loader::new(LoaderConfig::default())?
//!     .with_identity(HostIdentity::new("Mozilla/5.0 (X11; Linux x86_64)"));
//!
//! match loader.load(&FileSource::new("cala.wasm")).await? {
//!     LoadOutcome::Ran(session) => println!("ran with {}", session.strategy()),
//!     LoadOutcome::Degraded => println!("no wasm runtime"),
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`cala_core`] - UTF-16 marshalling, string slots and handles, console channels
//! - [`cala_runtime`] - Module sources, streaming validation, host imports, the loader
//!
//! ## Load Strategies
//!
//! | Capabilities | Strategy | Console line |
//! |--------------|----------|--------------|
//! | no wasm | Degraded | `Using asm.js (fallback)...` |
//! | wasm, no streaming | Buffered | `Using non-streaming WASM (fallback)...` |
//! | wasm + streaming | Streaming | `Using streaming WASM (most efficient)...` |
//!
//! ## Host Imports
//!
//! | Import | Signature | What It Does |
//! |--------|-----------|--------------|
//! | `navigator_userAgent_Len` | `() -> i32` | Stash the user agent, return its length in UTF-16 units |
//! | `navigator_userAgent_Ptr` | `(ptr)` | Copy the stashed string to `ptr` |
//! | `console_warn` / `console_info` / `console_debug` | `(ptr, len)` | Log UTF-16 text |
//! | `alert` | `(ptr, len)` | Show UTF-16 text to the user |
//! | `navigator_userAgent_open` | `() -> i32` | Open a handle on the user agent |
//! | `host_string_len` | `(h) -> i32` | Frame size for a handle |
//! | `host_string_take` | `(h, ptr, cap) -> i32` | Write a length-prefixed frame |
//! | `host_string_release` | `(h) -> i32` | Drop a handle without reading it |
//! | `host_log` | `(level, ptr)` | Log a length-prefixed frame |

pub use cala_core as core;
pub use cala_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust
/// use cala::prelude::*;
///
/// let caps = Capabilities::without_streaming();
/// assert_eq!(caps.select_strategy(), LoadStrategy::Buffered);
/// ```
pub mod prelude {
    // Core types
    pub use cala_core::types::{
        default_user_agent, Capabilities, Channel, HostIdentity, LoadStrategy, StringHandle,
    };

    // Consoles
    pub use cala_core::console::{ConsoleLine, HostConsole, RecordingConsole, TracingConsole};

    // Marshalling
    pub use cala_core::memory::LinearMemory;
    pub use cala_core::strings::{PendingString, StringTable};
    pub use cala_core::{utf16, wire};

    // Error types
    pub use cala_core::error::{CalaError, ConfigError, HandleError, MarshalError};

    // Runtime
    pub use cala_runtime::{HostState, LoadError, LoadResult, SourceError};
    pub use cala_runtime::{LoadOutcome, Loader, LoaderConfig, Session};
    pub use cala_runtime::{source_for, BytesSource, FileSource, ModuleSource};
    pub use cala_runtime::{ExportReport, ImportReport, ModuleReport};

    #[cfg(feature = "http")]
    pub use cala_runtime::HttpSource;
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
