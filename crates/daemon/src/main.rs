//! RemoFS Daemon
//!
//! Read-only filesystem explorer served over HTTP.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use daemon::config::{default_config_path, Config};
use daemon::explorer::Explorer;
use daemon::orchestrator::{DaemonOrchestrator, OrchestratorEvent};
use daemon::protocol::{
    human_size, DriveInfo, EntryInfo, EntryKind, ItemsResponse, ListingOptions, SortBy,
};
use tracing_subscriber::EnvFilter;

/// RemoFS Daemon - read-only filesystem explorer over HTTP.
#[derive(Parser, Debug)]
#[command(name = "remofs-daemon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the daemon.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the HTTP API until interrupted
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(long, short)]
        port: Option<u16>,

        /// Permitted root directory (overrides config)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// List a directory, or the device root when given "/"
    List {
        /// Path to list
        #[arg(default_value = "/")]
        path: String,

        /// Keep only names containing this text (case-insensitive)
        #[arg(long, short)]
        search: Option<String>,

        /// Sort key: name, size or modified
        #[arg(long, default_value = "name")]
        sort_by: SortBy,

        /// Reverse the sort order
        #[arg(long, short)]
        reverse: bool,

        /// Include hidden entries
        #[arg(long, short)]
        all: bool,

        /// Count the children of each folder
        #[arg(long)]
        count: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List mounted drives
    Drives {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show information about this device
    Device {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();

    init_tracing(cli.verbose, &config.daemon.log_level);

    match cli.command {
        Commands::Config(command) => run_config_command(command, &config_path, &config),
        Commands::Serve { host, port, root } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(root) = root {
                config.explorer.root = Some(root);
            }
            config.validate()?;

            tracing::info!("Using config file: {:?}", config_path);
            let mut orchestrator = DaemonOrchestrator::new(config)?;
            run_headless(&mut orchestrator).await
        }
        Commands::List {
            path,
            search,
            sort_by,
            reverse,
            all,
            count,
            json,
        } => {
            config.validate()?;
            let explorer = Explorer::from_config(&config.explorer)?;

            let mut options = ListingOptions::default()
                .with_sort_by(sort_by)
                .with_reverse(reverse)
                .with_show_hidden(all)
                .with_count_children(count || explorer.count_children_default());
            if let Some(search) = search {
                options = options.with_search(search);
            }

            let response = tokio::task::spawn_blocking(move || explorer.items(&path, &options))
                .await
                .context("Listing task failed")??;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_items(&response);
            }
            Ok(())
        }
        Commands::Drives { json } => {
            config.validate()?;
            let explorer = Explorer::from_config(&config.explorer)?;
            let drives = tokio::task::spawn_blocking(move || explorer.drives())
                .await
                .context("Drive enumeration task failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&drives)?);
            } else {
                print_drives(&drives);
            }
            Ok(())
        }
        Commands::Device { json } => {
            config.validate()?;
            let explorer = Explorer::from_config(&config.explorer)?;
            let device = tokio::task::spawn_blocking(move || explorer.device())
                .await
                .context("Device query task failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&device)?);
            } else {
                println!("Name:     {}", device.name);
                println!("Platform: {}", device.platform);
                println!(
                    "Space:    {} free of {} ({} used)",
                    human_size(device.free_space),
                    human_size(device.total_space),
                    human_size(device.used_space)
                );
            }
            Ok(())
        }
    }
}

/// Install the tracing subscriber.
///
/// `--verbose` wins, then `RUST_LOG`, then the configured level.
fn init_tracing(verbose: bool, log_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_config_command(
    command: ConfigCommands,
    config_path: &Path,
    config: &Config,
) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default().save(config_path)?;
            println!("Wrote default configuration to {}", config_path.display());
        }
        ConfigCommands::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigCommands::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}

async fn run_headless(orchestrator: &mut DaemonOrchestrator) -> anyhow::Result<()> {
    // Subscribe before starting so no lifecycle event is missed
    let mut events = orchestrator.subscribe();

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                OrchestratorEvent::StateChanged(state) => {
                    tracing::info!("Orchestrator state: {:?}", state);
                }
                OrchestratorEvent::Listening { addr } => {
                    tracing::debug!("Listener bound to {}", addr);
                }
                OrchestratorEvent::Error { message } => {
                    tracing::error!("Orchestrator error: {}", message);
                }
            }
        }
    });

    orchestrator.start().await?;

    wait_for_shutdown_signal().await?;
    tracing::info!("Received shutdown signal");

    orchestrator.stop().await?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => tracing::debug!("SIGTERM received"),
        _ = sigint.recv() => tracing::debug!("SIGINT received"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")
}

fn print_items(response: &ItemsResponse) {
    match response {
        ItemsResponse::Root(root) => {
            println!("{} ({})", root.device.name, root.device.platform);
            println!();
            print_drives(&root.drives);
        }
        ItemsResponse::Directory(listing) => {
            if listing.folders.is_empty() && listing.files.is_empty() {
                println!("Directory is empty.");
                return;
            }
            for entry in &listing.folders {
                print_entry(entry);
            }
            for entry in &listing.files {
                print_entry(entry);
            }
            println!();
            println!(
                "Total: {} folder(s), {} file(s)",
                listing.folders.len(),
                listing.files.len()
            );
        }
    }
}

fn print_entry(entry: &EntryInfo) {
    let size = match entry.kind {
        EntryKind::Folder => match entry.children {
            Some(counts) => format!("{}d {}f", counts.folders, counts.files),
            None => "-".to_string(),
        },
        EntryKind::File => human_size(entry.size),
    };
    let suffix = match entry.kind {
        EntryKind::Folder => "/",
        EntryKind::File => "",
    };
    println!("{:>12}  {}{}", size, entry.name, suffix);
}

fn print_drives(drives: &[DriveInfo]) {
    if drives.is_empty() {
        println!("No drives found.");
        return;
    }

    let mount_width = drives
        .iter()
        .map(|d| d.mount_point.len())
        .max()
        .unwrap_or(10)
        .max(10);

    println!(
        "{:<width$}  {:<12}  {:>10}  {:>10}  {:>10}",
        "MOUNT",
        "LABEL",
        "FREE",
        "USED",
        "TOTAL",
        width = mount_width
    );
    println!("{}", "-".repeat(mount_width + 52));

    for drive in drives {
        println!(
            "{:<width$}  {:<12}  {:>10}  {:>10}  {:>10}",
            drive.mount_point,
            truncate_str(drive.label.as_deref().unwrap_or("-"), 12),
            human_size(drive.free_space),
            human_size(drive.used_space),
            human_size(drive.total_space),
            width = mount_width
        );
    }
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::try_parse_from(["remofs-daemon", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { host, port, root } => {
                assert!(host.is_none());
                assert!(port.is_none());
                assert!(root.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "remofs-daemon",
            "serve",
            "--host",
            "0.0.0.0",
            "-p",
            "9000",
            "--root",
            "/srv",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve { host, port, root } => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
                assert_eq!(root, Some(PathBuf::from("/srv")));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::try_parse_from(["remofs-daemon", "list"]).unwrap();
        match cli.command {
            Commands::List {
                path,
                search,
                sort_by,
                reverse,
                all,
                count,
                json,
            } => {
                assert_eq!(path, "/");
                assert!(search.is_none());
                assert_eq!(sort_by, SortBy::Name);
                assert!(!reverse && !all && !count && !json);
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_list_options() {
        let cli = Cli::try_parse_from([
            "remofs-daemon",
            "list",
            "/home",
            "--sort-by",
            "size",
            "-r",
            "-a",
            "-s",
            "report",
        ])
        .unwrap();
        match cli.command {
            Commands::List {
                path,
                search,
                sort_by,
                reverse,
                all,
                ..
            } => {
                assert_eq!(path, "/home");
                assert_eq!(search.as_deref(), Some("report"));
                assert_eq!(sort_by, SortBy::Size);
                assert!(reverse);
                assert!(all);
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_list_rejects_unknown_sort() {
        assert!(Cli::try_parse_from(["remofs-daemon", "list", "--sort-by", "color"]).is_err());
    }

    #[test]
    fn test_config_commands() {
        let cli = Cli::try_parse_from(["remofs-daemon", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Init { force: true })
        ));

        let cli = Cli::try_parse_from(["remofs-daemon", "-c", "/tmp/x.toml", "config", "path"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
        assert!(matches!(cli.command, Commands::Config(ConfigCommands::Path)));
    }

    #[test]
    fn test_global_verbose() {
        let cli = Cli::try_parse_from(["remofs-daemon", "drives", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Drives { json: false }));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 12), "short");
        assert_eq!(truncate_str("a-very-long-label", 8), "a-ver...");
    }
}
