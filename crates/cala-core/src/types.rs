//! Shared types: capability flags, load strategies, console channels and
//! the identity the host presents to a module.

use crate::error::CalaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// What the host can do with a binary module.
///
/// The two flags mirror the two feature checks a loader performs before
/// fetching anything: is there a wasm runtime at all, and can it compile
/// from a response that is still arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default = "default_true")]
    pub wasm: bool,
    #[serde(default = "default_true")]
    pub streaming: bool,
}

fn default_true() -> bool {
    true
}

impl Capabilities {
    /// A native host embeds a full engine, so both are available.
    pub fn detect() -> Self {
        Self {
            wasm: true,
            streaming: true,
        }
    }

    /// No wasm runtime: only the degraded branch is possible.
    pub fn without_wasm() -> Self {
        Self {
            wasm: false,
            streaming: false,
        }
    }

    /// A wasm runtime that must buffer the whole module first.
    pub fn without_streaming() -> Self {
        Self {
            wasm: true,
            streaming: false,
        }
    }

    /// Pick the one branch a load will take. Evaluated once per load.
    pub fn select_strategy(&self) -> LoadStrategy {
        if !self.wasm {
            LoadStrategy::Degraded
        } else if !self.streaming {
            LoadStrategy::Buffered
        } else {
            LoadStrategy::Streaming
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// The three mutually exclusive load branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    /// No wasm runtime. The asm.js-style fallback is not implemented.
    Degraded,
    /// Fetch everything, then compile from the buffer.
    Buffered,
    /// Validate chunks as they arrive, then compile.
    Streaming,
}

impl LoadStrategy {
    /// The informational line a load emits on the module console.
    pub fn announcement(&self) -> &'static str {
        match self {
            LoadStrategy::Degraded => "Using asm.js (fallback)...",
            LoadStrategy::Buffered => "Using non-streaming WASM (fallback)...",
            LoadStrategy::Streaming => "Using streaming WASM (most efficient)...",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoadStrategy::Degraded => "degraded",
            LoadStrategy::Buffered => "buffered",
            LoadStrategy::Streaming => "streaming",
        }
    }
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Console channels a module can write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Warn,
    Info,
    Debug,
    /// Blocking: the host may wait for acknowledgement before returning.
    Alert,
}

impl Channel {
    /// Decode the `level` argument of `host_log`.
    pub fn from_code(code: i32) -> Result<Self, CalaError> {
        match code {
            0 => Ok(Channel::Warn),
            1 => Ok(Channel::Info),
            2 => Ok(Channel::Debug),
            3 => Ok(Channel::Alert),
            other => Err(CalaError::UnknownChannel(other)),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Channel::Warn => 0,
            Channel::Info => 1,
            Channel::Debug => 2,
            Channel::Alert => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Warn => "warn",
            Channel::Info => "info",
            Channel::Debug => "debug",
            Channel::Alert => "alert",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The identity a host presents to the module it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    user_agent: String,
}

impl HostIdentity {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl Default for HostIdentity {
    fn default() -> Self {
        Self::new(default_user_agent())
    }
}

/// `cala/<version> (<os>; <arch>)`
pub fn default_user_agent() -> String {
    format!(
        "cala/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Token for a host string waiting to be copied into the module.
///
/// Always positive when seen from the module, so zero and negative values
/// stay free for status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringHandle(NonZeroU32);

impl StringHandle {
    pub(crate) fn from_raw(raw: NonZeroU32) -> Self {
        Self(raw)
    }

    /// Decode a handle passed back by the module.
    pub fn from_i32(value: i32) -> Option<Self> {
        if value <= 0 {
            return None;
        }
        NonZeroU32::new(value as u32).map(Self)
    }

    pub fn as_i32(&self) -> i32 {
        self.0.get() as i32
    }
}

impl fmt::Display for StringHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
