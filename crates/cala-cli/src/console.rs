//! Terminal output for module console lines.

use cala::prelude::*;
use colored::Colorize;
use std::io::{BufRead, IsTerminal, Write};

/// Prints module output to the terminal, one line per message.
///
/// Warnings go to stderr. Alerts are boxed and, when `alert_blocking` is
/// set and stdin is a terminal, wait for Enter before the module resumes.
pub struct TerminalConsole {
    alert_blocking: bool,
}

impl TerminalConsole {
    pub fn new(alert_blocking: bool) -> Self {
        Self { alert_blocking }
    }

    fn alert(&self, message: &str) {
        println!("{}", "┌─ alert".magenta().bold());
        for line in message.lines() {
            println!("{} {}", "│".magenta(), line);
        }
        println!("{}", "└─".magenta());

        if !self.alert_blocking || !std::io::stdin().is_terminal() {
            return;
        }
        print!("{}", "  Press Enter to continue...".dimmed());
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
            tracing::debug!(error = %e, "could not wait for alert acknowledgement");
        }
    }
}

impl HostConsole for TerminalConsole {
    fn emit(&self, channel: Channel, message: &str) {
        match channel {
            Channel::Warn => eprintln!("{} {}", "warn ".yellow().bold(), message),
            Channel::Info => println!("{} {}", "info ".blue(), message),
            Channel::Debug => println!("{} {}", "debug".dimmed(), message.dimmed()),
            Channel::Alert => self.alert(message),
        }
    }
}
