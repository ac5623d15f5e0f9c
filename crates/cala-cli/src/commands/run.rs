//! Load a module and call its entry export.

use anyhow::{Context, Result};
use cala::prelude::*;
use colored::Colorize;
use std::sync::Arc;

use crate::config::Config;
use crate::console::TerminalConsole;

/// Command-line values that take precedence over cala.toml.
#[derive(Debug, Default)]
pub struct Overrides {
    pub module: Option<String>,
    pub user_agent: Option<String>,
    pub entry: Option<String>,
    pub no_wasm: bool,
    pub no_streaming: bool,
    pub origin: Option<String>,
}

impl Overrides {
    pub fn apply(self, config: &mut Config) {
        if let Some(module) = self.module {
            config.loader.module = module;
        }
        if let Some(user_agent) = self.user_agent {
            config.host.user_agent = user_agent;
        }
        if let Some(entry) = self.entry {
            config.loader.entry_export = entry;
        }
        if let Some(origin) = self.origin {
            config.loader.origin = Some(origin);
        }
        if self.no_wasm {
            config.capabilities.wasm = false;
        }
        if self.no_streaming {
            config.capabilities.streaming = false;
        }
    }
}

/// Where the module bytes come from: next to the origin when one is set,
/// otherwise a path or absolute URL.
pub fn module_source(config: &Config) -> Result<Box<dyn ModuleSource>> {
    if config.loader.module.trim().is_empty() {
        return Err(ConfigError::MissingField("loader.module".to_string()).into());
    }
    let source: Box<dyn ModuleSource> = match &config.loader.origin {
        Some(origin) => Box::new(HttpSource::same_origin(origin, &config.loader.module)?),
        None => source_for(&config.loader.module)?,
    };
    Ok(source)
}

pub async fn run(overrides: Overrides, verbose: bool) -> Result<()> {
    let mut config = Config::load()?;
    overrides.apply(&mut config);

    let loader = Loader::new(config.loader_config()?)?
        .with_identity(config.identity())
        .with_console(Arc::new(TerminalConsole::new(config.console.alert_blocking)));
    let source = module_source(&config)?;

    println!(
        "{} Loading {} ({})",
        "→".blue(),
        source.name().cyan(),
        loader.strategy()
    );

    let outcome = loader
        .load(source.as_ref())
        .await
        .with_context(|| format!("Failed to load {}", source.name()))?;

    println!();
    match outcome {
        LoadOutcome::Degraded => {
            println!(
                "{} No wasm runtime: degraded mode has no implementation, nothing ran",
                "•".yellow()
            );
        }
        LoadOutcome::Ran(session) => {
            println!(
                "{} {} returned",
                "✓".green().bold(),
                config.loader.entry_export.cyan()
            );
            if verbose {
                let host = session.host();
                let memory = session.memory().map(<[u8]>::len).unwrap_or(0);
                println!("  Strategy:        {}", session.strategy());
                println!("  Memory:          {} bytes", memory.to_string().cyan());
                println!("  Pending string:  {} units", host.pending().len());
                println!("  Open handles:    {}", host.strings().live());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let mut config = Config::default();
        config.loader.module = "from-file.wasm".to_string();

        Overrides {
            module: Some("app.wasm".to_string()),
            entry: Some("main".to_string()),
            no_streaming: true,
            ..Overrides::default()
        }
        .apply(&mut config);

        assert_eq!(config.loader.module, "app.wasm");
        assert_eq!(config.loader.entry_export, "main");
        assert_eq!(
            config.loader_config().unwrap().capabilities.select_strategy(),
            LoadStrategy::Buffered
        );
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let mut config = Config::default();
        config.host.user_agent = "from-file".to_string();
        Overrides::default().apply(&mut config);
        assert_eq!(config.host.user_agent, "from-file");
        assert!(config.capabilities.streaming);
    }

    #[test]
    fn origin_resolves_the_module_next_to_it() {
        let mut config = Config::default();
        config.loader.module = "pkg/cala.wasm".to_string();
        config.loader.origin = Some("http://localhost:8000/app/".to_string());
        let source = module_source(&config).unwrap();
        assert_eq!(source.name(), "http://localhost:8000/app/pkg/cala.wasm");
    }

    #[test]
    fn empty_module_is_a_missing_field() {
        let mut config = Config::default();
        config.loader.module = String::new();
        let err = module_source(&config).err().unwrap();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingField("loader.module".to_string()))
        );
    }

    #[test]
    fn plain_paths_are_files() {
        let config = Config::default();
        let source = module_source(&config).unwrap();
        assert!(source.name().ends_with("cala.wasm"));
    }
}
