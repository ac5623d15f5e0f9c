//! Fetch, compile, instantiate, run.
//!
//! A load picks exactly one strategy from the capability flags, announces
//! it on the module console, and either stops there (degraded) or carries
//! the module through to its entry export. Every failure comes back as a
//! [`LoadError`]; nothing is retried and nothing is logged to the module
//! console on failure, so the caller decides how to report it.
//!
//! ```text
//! Capabilities ──> LoadStrategy
//!                    │
//!      ┌─────────────┼──────────────────────┐
//!      ▼             ▼                      ▼
//!   Degraded      Buffered              Streaming
//!   (stop)     fetch_all ─┐     chunk ─> StreamingValidator
//!                         ▼                 │
//!                    Module::from_binary <──┘
//!                         │
//!                 check imports, link, instantiate
//!                         │
//!                 bind memory export, call entry export
//! ```

use crate::bridge::{self, HostState};
use crate::error::{LoadError, LoadResult};
use crate::inspect::{check_imports, inspect_module, ModuleReport};
use crate::source::{fetch_all, ModuleSource};
use crate::streaming::StreamingValidator;
use cala_core::console::{HostConsole, TracingConsole};
use cala_core::types::{Capabilities, HostIdentity, LoadStrategy};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wasmtime::{Engine, Instance, Linker, Module, Store};

/// Default name of the export invoked after instantiation.
pub const DEFAULT_ENTRY_EXPORT: &str = "exported_func";

/// Default name of the memory export the bridge binds to.
pub const DEFAULT_MEMORY_EXPORT: &str = "memory";

/// Configuration for a [`Loader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub entry_export: String,
    pub memory_export: String,
    pub capabilities: Capabilities,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            entry_export: DEFAULT_ENTRY_EXPORT.to_string(),
            memory_export: DEFAULT_MEMORY_EXPORT.to_string(),
            capabilities: Capabilities::detect(),
        }
    }
}

impl LoaderConfig {
    /// Set the entry export name.
    pub fn with_entry_export(mut self, name: impl Into<String>) -> Self {
        self.entry_export = name.into();
        self
    }

    /// Set the memory export name.
    pub fn with_memory_export(mut self, name: impl Into<String>) -> Self {
        self.memory_export = name.into();
        self
    }

    /// Set the capability flags.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Result of a successful load.
pub enum LoadOutcome {
    /// No wasm runtime. Nothing was fetched and nothing ran.
    Degraded,
    /// The module was instantiated and its entry export returned.
    Ran(Session),
}

impl LoadOutcome {
    pub fn strategy(&self) -> LoadStrategy {
        match self {
            LoadOutcome::Degraded => LoadStrategy::Degraded,
            LoadOutcome::Ran(session) => session.strategy(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            LoadOutcome::Degraded => None,
            LoadOutcome::Ran(session) => Some(session),
        }
    }

    pub fn into_session(self) -> Option<Session> {
        match self {
            LoadOutcome::Degraded => None,
            LoadOutcome::Ran(session) => Some(session),
        }
    }
}

/// A live module instance together with its store.
pub struct Session {
    store: Store<HostState>,
    instance: Instance,
    strategy: LoadStrategy,
}

impl Session {
    pub fn strategy(&self) -> LoadStrategy {
        self.strategy
    }

    pub fn host(&self) -> &HostState {
        self.store.data()
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn store_mut(&mut self) -> &mut Store<HostState> {
        &mut self.store
    }

    /// Current contents of the bound memory.
    pub fn memory(&self) -> Option<&[u8]> {
        self.host().memory().map(|memory| memory.data(&self.store))
    }

    /// Call a `() -> ()` export.
    pub fn call_entry(&mut self, name: &str) -> LoadResult<()> {
        let entry = self
            .instance
            .get_typed_func::<(), ()>(&mut self.store, name)
            .map_err(|_| LoadError::MissingEntry(name.to_string()))?;
        debug!(entry = name, "invoking entry export");
        entry
            .call(&mut self.store, ())
            .map_err(|e| LoadError::Entry {
                name: name.to_string(),
                message: format!("{:#}", e),
            })
    }
}

/// Loads modules with one engine and one host profile.
pub struct Loader {
    engine: Engine,
    config: LoaderConfig,
    identity: HostIdentity,
    console: Arc<dyn HostConsole>,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> LoadResult<Self> {
        let engine = Engine::new(&wasmtime::Config::new())
            .map_err(|e| LoadError::Engine(format!("{:#}", e)))?;
        Ok(Self {
            engine,
            config,
            identity: HostIdentity::default(),
            console: Arc::new(TracingConsole),
        })
    }

    /// Route module console output to `console`.
    pub fn with_console(mut self, console: Arc<dyn HostConsole>) -> Self {
        self.console = console;
        self
    }

    /// Present `identity` to loaded modules.
    pub fn with_identity(mut self, identity: HostIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The strategy the next load will take.
    pub fn strategy(&self) -> LoadStrategy {
        self.config.capabilities.select_strategy()
    }

    /// Load `source` and run its entry export.
    pub async fn load(&self, source: &dyn ModuleSource) -> LoadResult<LoadOutcome> {
        let strategy = self.strategy();
        self.console.info(strategy.announcement());
        info!(strategy = %strategy, source = source.name(), "loading module");

        let module = match strategy {
            LoadStrategy::Degraded => {
                warn!("no wasm runtime available, degraded mode is not implemented");
                return Ok(LoadOutcome::Degraded);
            }
            LoadStrategy::Buffered => self.compile_buffered(source).await?,
            LoadStrategy::Streaming => self.compile_streaming(source).await?,
        };

        let mut session = self.instantiate(&module, strategy)?;
        session.call_entry(&self.config.entry_export)?;
        info!(entry = %self.config.entry_export, "entry export returned");
        Ok(LoadOutcome::Ran(session))
    }

    /// Compile a module from bytes already in memory.
    pub fn compile(&self, bytes: &[u8]) -> LoadResult<Module> {
        Module::from_binary(&self.engine, bytes).map_err(|e| LoadError::Compile(format!("{:#}", e)))
    }

    /// Check a module against the bridge without running it.
    pub fn inspect(&self, bytes: &[u8]) -> LoadResult<ModuleReport> {
        let module = self.compile(bytes)?;
        Ok(inspect_module(&module, &self.config))
    }

    async fn compile_buffered(&self, source: &dyn ModuleSource) -> LoadResult<Module> {
        let bytes = fetch_all(source).await?;
        debug!(bytes = bytes.len(), "module fetched");
        self.compile(&bytes)
    }

    async fn compile_streaming(&self, source: &dyn ModuleSource) -> LoadResult<Module> {
        let mut chunks = source.fetch().await?;
        let mut validator = StreamingValidator::new();
        while let Some(chunk) = chunks.next().await {
            validator.push(&chunk?)?;
        }
        let bytes = validator.finish()?;
        self.compile(&bytes)
    }

    /// Link the bridge imports, instantiate `module` and bind its memory.
    pub fn instantiate(&self, module: &Module, strategy: LoadStrategy) -> LoadResult<Session> {
        check_imports(module)?;

        let mut linker = Linker::new(&self.engine);
        bridge::register(&mut linker).map_err(|e| LoadError::Link(format!("{:#}", e)))?;

        let state = HostState::new(self.identity.clone(), Arc::clone(&self.console));
        let mut store = Store::new(&self.engine, state);
        let instance = linker
            .instantiate(&mut store, module)
            .map_err(|e| LoadError::Instantiate(format!("{:#}", e)))?;

        match instance.get_memory(&mut store, &self.config.memory_export) {
            Some(memory) => store.data_mut().bind_memory(memory),
            None => warn!(
                export = %self.config.memory_export,
                "module exports no memory, string imports will trap"
            ),
        }

        Ok(Session {
            store,
            instance,
            strategy,
        })
    }
}
