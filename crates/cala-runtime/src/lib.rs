//! # Cala Runtime
//!
//! `wasmtime` embedding for the Cala host bridge.
//!
//! A [`Loader`] picks one of three strategies from the host's capability
//! flags, pulls module bytes from a [`ModuleSource`], links the bridge
//! imports under `env`, binds the module's memory export and calls its entry
//! export.
//!
//! ## Features
//!
//! - `http`: fetch modules over HTTP(S) with `reqwest`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cala_runtime::prelude::*;
//!
//! let loader = Loader::new(LoaderConfig::default())?;
//! let outcome = loader.load(&FileSource::new("cala.wasm")).await?;
//! ```

pub mod bridge;
pub mod error;
pub mod inspect;
pub mod loader;
pub mod source;
pub mod streaming;

pub use bridge::HostState;
pub use error::{LoadError, LoadResult, SourceError};
pub use inspect::{ExportReport, ImportReport, ModuleReport};
pub use loader::{LoadOutcome, Loader, LoaderConfig, Session};
pub use source::{fetch_all, source_for, BytesSource, ChunkStream, FileSource, ModuleSource};
pub use streaming::StreamingValidator;

#[cfg(feature = "http")]
pub use source::HttpSource;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{HostState, LoadError, LoadResult, SourceError};
    pub use crate::{LoadOutcome, Loader, LoaderConfig, Session};
    pub use crate::{BytesSource, FileSource, ModuleSource};
    pub use crate::ModuleReport;

    #[cfg(feature = "http")]
    pub use crate::HttpSource;
}
