//! Check a module against the bridge without running it.

use anyhow::{Context, Result};
use cala::prelude::*;
use cala::runtime::fetch_all;
use colored::Colorize;

use crate::config::Config;

pub async fn run(module: &str, json: bool) -> Result<()> {
    let config = Config::load()?;
    let loader = Loader::new(config.loader_config()?)?;

    let source = source_for(module)?;
    let bytes = fetch_all(source.as_ref())
        .await
        .with_context(|| format!("Failed to fetch {}", source.name()))?;
    let report = loader
        .inspect(&bytes)
        .with_context(|| format!("Failed to compile {}", source.name()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", format!("Module {}", source.name()).white().bold());
    println!("{}", "═".repeat(40).dimmed());
    println!("  Size:            {} bytes", bytes.len().to_string().cyan());
    println!();

    println!("{}", "Imports".blue().bold());
    if report.imports.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for import in &report.imports {
        let mark = if import.satisfied { "✓".green() } else { "✗".red() };
        println!("  {} {}.{} ({})", mark, import.module, import.name, import.kind);
        if let (false, Some(expected)) = (import.satisfied, &import.expected) {
            println!("      {} {}", "host defines".dimmed(), expected);
        }
    }
    println!();

    println!("{}", "Exports".blue().bold());
    if report.exports.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for export in &report.exports {
        println!("  • {} ({})", export.name, export.kind);
    }
    println!();

    println!("{}", "Bridge".blue().bold());
    println!("  Entry export:    {} {}", report.entry_export.cyan(), status(report.entry_ok));
    println!("  Memory export:   {} {}", report.memory_export.cyan(), status(report.memory_ok));
    println!();

    if report.is_loadable() {
        println!("{} Module can be loaded", "✓".green().bold());
    } else {
        let missing = report.unresolved().count();
        println!(
            "{} Module cannot be loaded ({} unsatisfied import(s))",
            "✗".red().bold(),
            missing
        );
    }

    Ok(())
}

fn status(ok: bool) -> colored::ColoredString {
    if ok {
        "ok".green()
    } else {
        "missing".red()
    }
}
