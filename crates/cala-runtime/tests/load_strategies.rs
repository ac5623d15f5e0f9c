//! Load Strategy Selection
//!
//! Each capability set runs exactly one branch, and the branch shows up as
//! the first console line. Failures come back as errors without running
//! the entry export or writing anything else to the console.

use async_trait::async_trait;
use cala_core::prelude::{Capabilities, Channel, LoadStrategy, RecordingConsole};
use cala_runtime::prelude::*;
use cala_runtime::ChunkStream;
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Logs "entry ran" on the info channel when its entry export is called.
const ENTRY_LOGS: &str = r#"
(module
  (import "env" "console_info" (func $info (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "e\00n\00t\00r\00y\00 \00r\00a\00n\00")
  (func (export "exported_func")
    (call $info (i32.const 0) (i32.const 9))))
"#;

fn module_bytes() -> Vec<u8> {
    wat::parse_str(ENTRY_LOGS).unwrap()
}

fn loader(capabilities: Capabilities, console: Arc<RecordingConsole>) -> Loader {
    Loader::new(LoaderConfig::default().with_capabilities(capabilities))
        .unwrap()
        .with_console(console)
}

/// Counts fetches, then serves the wrapped bytes.
struct CountingSource {
    inner: BytesSource,
    fetches: AtomicUsize,
}

impl CountingSource {
    fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: BytesSource::new("counted.wasm", bytes).with_chunk_size(7),
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ModuleSource for CountingSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self) -> Result<ChunkStream, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch().await
    }
}

/// Refuses to connect.
struct RefusedSource;

#[async_trait]
impl ModuleSource for RefusedSource {
    fn name(&self) -> &str {
        "http://127.0.0.1:9/cala.wasm"
    }

    async fn fetch(&self) -> Result<ChunkStream, SourceError> {
        Err(SourceError::Network("connection refused".to_string()))
    }
}

/// Delivers the first chunk, then drops the connection.
struct DroppedSource(Vec<u8>);

#[async_trait]
impl ModuleSource for DroppedSource {
    fn name(&self) -> &str {
        "dropped.wasm"
    }

    async fn fetch(&self) -> Result<ChunkStream, SourceError> {
        let head = self.0[..self.0.len() / 2].to_vec();
        let chunks = vec![
            Ok(head),
            Err(SourceError::Network("connection reset".to_string())),
        ];
        Ok(stream::iter(chunks).boxed())
    }
}

#[tokio::test]
async fn no_wasm_takes_the_degraded_branch_only() {
    let console = Arc::new(RecordingConsole::new());
    let source = CountingSource::new(module_bytes());

    let outcome = loader(Capabilities::without_wasm(), console.clone())
        .load(&source)
        .await
        .unwrap();

    assert!(matches!(outcome, LoadOutcome::Degraded));
    assert_eq!(outcome.strategy(), LoadStrategy::Degraded);
    assert_eq!(console.messages(Channel::Info), vec!["Using asm.js (fallback)..."]);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_streaming_takes_the_buffered_branch() {
    let console = Arc::new(RecordingConsole::new());
    let source = CountingSource::new(module_bytes());

    let outcome = loader(Capabilities::without_streaming(), console.clone())
        .load(&source)
        .await
        .unwrap();

    assert_eq!(outcome.strategy(), LoadStrategy::Buffered);
    assert_eq!(
        console.messages(Channel::Info),
        vec!["Using non-streaming WASM (fallback)...", "entry ran"]
    );
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn full_capabilities_take_the_streaming_branch() {
    let console = Arc::new(RecordingConsole::new());
    let source = CountingSource::new(module_bytes());

    let outcome = loader(Capabilities::detect(), console.clone())
        .load(&source)
        .await
        .unwrap();

    assert_eq!(outcome.strategy(), LoadStrategy::Streaming);
    assert_eq!(
        console.messages(Channel::Info),
        vec!["Using streaming WASM (most efficient)...", "entry ran"]
    );
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refused_fetch_never_runs_the_entry() {
    for caps in [Capabilities::without_streaming(), Capabilities::detect()] {
        let console = Arc::new(RecordingConsole::new());
        let err = loader(caps, console.clone())
            .load(&RefusedSource)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, LoadError::Fetch(SourceError::Network(_))));
        // Only the strategy line: no entry output, no error line.
        assert_eq!(console.len(), 1);
        assert!(console.messages(Channel::Warn).is_empty());
        assert!(!console.messages(Channel::Info).contains(&"entry ran".to_string()));
    }
}

#[tokio::test]
async fn dropped_connection_surfaces_as_fetch_error() {
    for caps in [Capabilities::without_streaming(), Capabilities::detect()] {
        let console = Arc::new(RecordingConsole::new());
        let err = loader(caps, console.clone())
            .load(&DroppedSource(module_bytes()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Fetch(_)), "{}", err);
        assert_eq!(console.len(), 1);
    }
}

#[tokio::test]
async fn streaming_rejects_a_non_module_body_while_validating() {
    let console = Arc::new(RecordingConsole::new());
    let source = BytesSource::new("404.html", b"<!DOCTYPE html><title>Not Found</title>".to_vec());
    let err = loader(Capabilities::detect(), console)
        .load(&source)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, LoadError::Validate(_)));
}

#[tokio::test]
async fn buffered_rejects_a_non_module_body_at_compile() {
    let console = Arc::new(RecordingConsole::new());
    let source = BytesSource::new("404.html", b"<!DOCTYPE html><title>Not Found</title>".to_vec());
    let err = loader(Capabilities::without_streaming(), console)
        .load(&source)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, LoadError::Compile(_)));
}

#[tokio::test]
async fn unresolved_import_fails_before_instantiation() {
    let bytes = wat::parse_str(
        r#"(module
             (import "env" "document_title" (func (result i32)))
             (func (export "exported_func")))"#,
    )
    .unwrap();
    let console = Arc::new(RecordingConsole::new());
    let err = loader(Capabilities::detect(), console.clone())
        .load(&BytesSource::new("m.wasm", bytes))
        .await
        .err()
        .unwrap();
    match err {
        LoadError::UnresolvedImport { module, name } => {
            assert_eq!(module, "env");
            assert_eq!(name, "document_title");
        }
        other => panic!("expected unresolved import, got {}", other),
    }
    assert_eq!(console.len(), 1);
}

#[tokio::test]
async fn mistyped_import_fails_before_instantiation() {
    let bytes = wat::parse_str(
        r#"(module
             (import "env" "console_info" (func (param i32)))
             (memory (export "memory") 1)
             (func (export "exported_func")))"#,
    )
    .unwrap();
    let console = Arc::new(RecordingConsole::new());
    let loader = loader(Capabilities::detect(), console.clone());

    let report = loader.inspect(&bytes).unwrap();
    assert!(!report.is_loadable());

    let err = loader
        .load(&BytesSource::new("m.wasm", bytes))
        .await
        .err()
        .unwrap();
    match err {
        LoadError::ImportMismatch { name, expected, found, .. } => {
            assert_eq!(name, "console_info");
            assert_eq!(expected, "(func (param i32 i32))");
            assert_eq!(found, "(func (param i32))");
        }
        other => panic!("expected an import mismatch, got {}", other),
    }
    assert_eq!(console.len(), 1);
}

#[tokio::test]
async fn missing_entry_export_is_reported() {
    let bytes = wat::parse_str(r#"(module (func (export "main")))"#).unwrap();
    let err = loader(Capabilities::detect(), Arc::new(RecordingConsole::new()))
        .load(&BytesSource::new("m.wasm", bytes))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, LoadError::MissingEntry(ref name) if name == "exported_func"));
}

#[tokio::test]
async fn configured_entry_export_is_called() {
    let bytes = wat::parse_str(
        r#"(module
             (import "env" "console_info" (func $info (param i32 i32)))
             (memory (export "memory") 1)
             (data (i32.const 0) "m\00")
             (func (export "main") (call $info (i32.const 0) (i32.const 1))))"#,
    )
    .unwrap();
    let console = Arc::new(RecordingConsole::new());
    Loader::new(LoaderConfig::default().with_entry_export("main"))
        .unwrap()
        .with_console(console.clone())
        .load(&BytesSource::new("m.wasm", bytes))
        .await
        .unwrap();
    assert_eq!(console.messages(Channel::Info)[1], "m");
}

#[tokio::test]
async fn file_source_loads_through_both_branches() {
    let mut file = tempfile::Builder::new().suffix(".wasm").tempfile().unwrap();
    file.write_all(&module_bytes()).unwrap();

    for caps in [Capabilities::without_streaming(), Capabilities::detect()] {
        let console = Arc::new(RecordingConsole::new());
        let source = FileSource::new(file.path()).with_chunk_size(5);
        loader(caps, console.clone()).load(&source).await.unwrap();
        assert_eq!(console.messages(Channel::Info)[1], "entry ran");
    }
}

#[tokio::test]
async fn inspect_does_not_run_the_module() {
    let console = Arc::new(RecordingConsole::new());
    let report = loader(Capabilities::detect(), console.clone())
        .inspect(&module_bytes())
        .unwrap();
    assert!(report.is_loadable());
    assert!(console.is_empty());
}
