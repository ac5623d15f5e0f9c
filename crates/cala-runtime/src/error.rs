//! Runtime error types.

use thiserror::Error;

/// Errors raised while fetching module bytes.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid module location: {0}")]
    InvalidLocation(String),
}

/// Errors raised by a load. Every failure of the fetch, compile,
/// instantiate, run sequence ends up here.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] SourceError),

    #[error("Invalid module: {0}")]
    Validate(String),

    #[error("Compilation failed: {0}")]
    Compile(String),

    #[error("Unresolved import {module}::{name}")]
    UnresolvedImport { module: String, name: String },

    #[error("Import {module}::{name} has type {found}, the host defines {expected}")]
    ImportMismatch {
        module: String,
        name: String,
        expected: String,
        found: String,
    },

    #[error("Linking failed: {0}")]
    Link(String),

    #[error("Instantiation failed: {0}")]
    Instantiate(String),

    #[error("Entry export `{0}` is missing or is not a `() -> ()` function")]
    MissingEntry(String),

    #[error("Entry export `{name}` trapped: {message}")]
    Entry { name: String, message: String },

    #[error("Engine setup failed: {0}")]
    Engine(String),
}

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;
