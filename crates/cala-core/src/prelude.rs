//! Cala Core Prelude: convenient imports for common usage.
//!
//! ```rust
//! use cala_core::prelude::*;
//! ```

// Re-export commonly used types
pub use crate::types::{
    default_user_agent, Capabilities, Channel, HostIdentity, LoadStrategy, StringHandle,
};

// Re-export the console sinks
pub use crate::console::{ConsoleLine, HostConsole, RecordingConsole, TracingConsole};

// Re-export the memory trait
pub use crate::memory::LinearMemory;

// Re-export string slots
pub use crate::strings::{PendingString, StringTable};

// Re-export the codec modules
pub use crate::{utf16, wire};

// Re-export error types
pub use crate::error::{CalaError, ConfigError, HandleError, MarshalError, Result};
