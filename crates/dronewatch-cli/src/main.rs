//! dronewatch CLI
//!
//! Command-line interface and terminal dashboard for an RF drone-detection
//! backend.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dronewatch_core::Config;

mod commands;
mod output;
mod tui;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "dronewatch")]
#[command(about = "dronewatch - monitor and control an RF drone-detection backend")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backend URL (overrides api_url from the config)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI dashboard
    Tui,
    /// Show the latest detection result
    Latest,
    /// List recent detection events
    Events {
        /// Number of events to fetch (1-500, default from config)
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Start the detection worker
    Start,
    /// Stop the detection worker
    Stop,
    /// Show or set the detection threshold
    Threshold {
        /// New threshold in [0, 1]
        #[arg(allow_negative_numbers = true)]
        value: Option<f64>,
    },
    /// Show the backend's log tail
    Logs {
        /// Number of lines (10-500)
        #[arg(short = 'n', long, default_value_t = 200)]
        lines: u32,
    },
    /// Poll and print each change, one line at a time
    Watch,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (api_url, poll_interval_ms, events_limit,
        /// default_threshold, log_file)
        key: String,
        /// Configuration value ("none" clears log_file)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work on the file itself
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let mut config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }

    // Handle TUI (default when no command given)
    let command = match cli.command {
        None | Some(Commands::Tui) => return tui::run(config).await,
        Some(command) => command,
    };

    init_cli_logging();

    match command {
        Commands::Latest => commands::latest::show(&commands::client(&config), &output).await,
        Commands::Events { limit } => {
            let limit = limit.unwrap_or(config.events_limit);
            commands::latest::events(&commands::client(&config), limit, &output).await
        }
        Commands::Start => commands::worker::start(&commands::monitor(&config), &output).await,
        Commands::Stop => commands::worker::stop(&commands::monitor(&config), &output).await,
        Commands::Threshold { value } => {
            let monitor = commands::monitor(&config);
            match value {
                Some(value) => commands::threshold::apply(&monitor, value, &output).await,
                None => commands::threshold::show(&monitor, &output).await,
            }
        }
        Commands::Logs { lines } => {
            commands::logs::tail(&commands::client(&config), lines, &output).await
        }
        Commands::Watch => commands::watch::run(commands::monitor(&config), &output).await,
        Commands::Tui | Commands::Config { .. } => Ok(()), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Log to stderr, only if DRONEWATCH_LOG is set
fn init_cli_logging() {
    let Ok(log_level) = std::env::var("DRONEWATCH_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "dronewatch_core={},dronewatch={}",
        log_level, log_level
    ));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_is_tui() {
        let cli = Cli::try_parse_from(["dronewatch"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dronewatch",
            "events",
            "--limit",
            "5",
            "--json",
            "--api-url",
            "http://pi:8000/",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.api_url.as_deref(), Some("http://pi:8000/"));
        assert!(matches!(cli.command, Some(Commands::Events { limit: Some(5) })));
    }

    #[test]
    fn test_threshold_value_optional() {
        let cli = Cli::try_parse_from(["dronewatch", "threshold", "0.7"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Threshold { value: Some(v) }) if v == 0.7
        ));

        let cli = Cli::try_parse_from(["dronewatch", "threshold"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Threshold { value: None })
        ));

        assert!(Cli::try_parse_from(["dronewatch", "threshold", "high"]).is_err());
    }

    #[test]
    fn test_logs_default_lines() {
        let cli = Cli::try_parse_from(["dronewatch", "logs"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Logs { lines: 200 })));
    }

    #[test]
    fn test_config_set() {
        let cli = Cli::try_parse_from([
            "dronewatch",
            "--config",
            "/tmp/dw.toml",
            "config",
            "set",
            "events_limit",
            "50",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/dw.toml")));
        match cli.command {
            Some(Commands::Config {
                command: Some(ConfigCommands::Set { key, value }),
            }) => {
                assert_eq!(key, "events_limit");
                assert_eq!(value, "50");
            }
            _ => panic!("expected config set"),
        }
    }
}
