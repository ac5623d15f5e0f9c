//! Error types for bridge operations.
//!
//! Marshalling across the module boundary reports structured errors
//! instead of writing past the end of linear memory.

use std::error::Error;
use std::fmt;

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, CalaError>;

/// Errors that can occur while servicing a module's host calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalaError {
    /// Linear-memory access errors.
    Marshal(MarshalError),
    /// String-handle errors.
    Handle(HandleError),
    /// Configuration errors.
    Config(ConfigError),
    /// A console channel code the bridge does not know.
    UnknownChannel(i32),
}

impl fmt::Display for CalaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalaError::Marshal(e) => write!(f, "Marshal error: {}", e),
            CalaError::Handle(e) => write!(f, "Handle error: {}", e),
            CalaError::Config(e) => write!(f, "Config error: {}", e),
            CalaError::UnknownChannel(code) => write!(f, "Unknown console channel: {}", code),
        }
    }
}

impl Error for CalaError {}

impl From<MarshalError> for CalaError {
    fn from(e: MarshalError) -> Self {
        CalaError::Marshal(e)
    }
}

impl From<HandleError> for CalaError {
    fn from(e: HandleError) -> Self {
        CalaError::Handle(e)
    }
}

impl From<ConfigError> for CalaError {
    fn from(e: ConfigError) -> Self {
        CalaError::Config(e)
    }
}

/// Linear-memory access errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    /// The range `offset..offset + len` is not inside the memory.
    OutOfBounds {
        offset: usize,
        len: usize,
        memory_size: usize,
    },
    /// A 16-bit view was requested at an odd byte offset.
    Misaligned { offset: usize },
    /// The destination buffer declared by the module is too small.
    InsufficientCapacity { needed: usize, capacity: usize },
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalError::OutOfBounds {
                offset,
                len,
                memory_size,
            } => write!(
                f,
                "Range {}..{} is outside linear memory of {} bytes",
                offset,
                offset.saturating_add(*len),
                memory_size
            ),
            MarshalError::Misaligned { offset } => {
                write!(f, "Offset {} is not aligned to 2 bytes", offset)
            }
            MarshalError::InsufficientCapacity { needed, capacity } => write!(
                f,
                "Buffer of {} bytes cannot hold {} bytes",
                capacity, needed
            ),
        }
    }
}

impl Error for MarshalError {}

/// String-handle errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The handle was never issued or was already taken.
    Unknown(i32),
    /// Every positive `i32` has been issued.
    Exhausted,
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Unknown(h) => write!(f, "Unknown string handle: {}", h),
            HandleError::Exhausted => write!(f, "String handles exhausted"),
        }
    }
}

impl Error for HandleError {}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid value.
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    /// Missing required field.
    MissingField(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => {
                write!(f, "Invalid value for {}: {} ({})", field, value, reason)
            }
            ConfigError::MissingField(field) => write!(f, "Missing required field: {}", field),
        }
    }
}

impl Error for ConfigError {}

// Convenience constructors
impl CalaError {
    pub fn out_of_bounds(offset: usize, len: usize, memory_size: usize) -> Self {
        CalaError::Marshal(MarshalError::OutOfBounds {
            offset,
            len,
            memory_size,
        })
    }

    pub fn unknown_handle(handle: i32) -> Self {
        CalaError::Handle(HandleError::Unknown(handle))
    }

    pub fn invalid_config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalaError::Config(ConfigError::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        })
    }
}
