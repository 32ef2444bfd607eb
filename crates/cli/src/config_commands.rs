use {
    anyhow::Result,
    fsbot_config::{LoadedConfig, Severity, validate},
};

use crate::Cli;

/// Load the config file, then apply env and command-line overrides.
pub fn load(cli: &Cli) -> Result<LoadedConfig> {
    let mut loaded = fsbot_config::discover_and_load(cli.config.as_deref())?;
    fsbot_config::apply_env_overrides(&mut loaded.config)?;
    if let Some(bind) = &cli.bind {
        loaded.config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        loaded.config.server.port = port;
    }
    Ok(loaded)
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn check(cli: &Cli, verbose: bool) -> Result<()> {
    let loaded = load(cli)?;
    let mut result = validate::validate(&loaded.config, loaded.raw.as_ref());
    result.config_path = loaded.path;

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults and environment.\n");
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}
