// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threadline - conversation threads and handoffs for agent workflows.
//!
//! This is the binary entry point for the Threadline control plane.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use threadline_config::{ConfigError, ThreadlineConfig};

/// Threadline - conversation threads and handoffs for agent workflows.
#[derive(Parser, Debug)]
#[command(name = "threadline", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway and serve conversation operations.
    Serve,
    /// Print the effective configuration with secrets redacted.
    Config,
}

fn load(path: Option<&std::path::Path>) -> Result<ThreadlineConfig, Vec<ConfigError>> {
    match path {
        Some(path) => threadline_config::load_and_validate_path(path),
        None => threadline_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            threadline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("threadline serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config.redacted()) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("threadline config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("threadline: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_global_config_flag() {
        let cli = Cli::try_parse_from(["threadline", "serve", "--config", "/tmp/t.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/t.toml")));
    }

    #[test]
    fn redacted_config_renders_as_toml() {
        let mut config = ThreadlineConfig::default();
        config.engine.api_key = Some("engine-secret".into());
        let rendered = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(rendered.contains("[engine]"));
        assert!(!rendered.contains("engine-secret"));
    }
}
