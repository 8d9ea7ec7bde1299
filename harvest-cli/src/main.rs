//! Harvest CLI - batch-clone repositories and collect package folders

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use harvest_core::{Config, ConfigOverrides, Secrets};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{RunArgs, SecretsArgs};

/// Harvest: clone a list of repositories and collect matching folders
#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/harvest/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Environment file to load (defaults to ./.env when present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Clone every repository in the table and collect matching folders
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Manage the secrets file
    Secrets(SecretsArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| {
                anyhow::anyhow!("Failed to load environment file {}: {}", path.display(), e)
            })?;
        }
        None => {
            if let Err(e) = dotenvy::dotenv() {
                if !e.not_found() {
                    tracing::warn!("Failed to load .env file: {}", e);
                }
            }
        }
    }

    let overrides = match &cli.command {
        Some(Commands::Run(args)) => args.overrides(),
        _ => ConfigOverrides::default(),
    };
    let config = Config::load_with_overrides(cli.config.as_deref(), overrides)?;

    if cli.verbose {
        tracing::info!(
            sources = %config.sources.path.display(),
            clone_root = %config.sources.clone_root.display(),
            filter = ?config.collect.filter,
            cutoff = ?config.history.cutoff,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("harvest {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Run(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Secrets(args)) => {
            args.execute()?;
        }
        Some(Commands::Config) => {
            print_config(&config, cli.config.as_deref());
        }
        None => {
            println!("Harvest - clone repositories and collect package folders");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config, explicit_path: Option<&std::path::Path>) {
    let unset = "(not set)";

    println!("Harvest Configuration");
    println!("=====================");
    println!();
    println!("Sources:");
    println!("  path: {}", config.sources.path.display());
    println!("  clone_root: {}", config.sources.clone_root.display());
    println!();
    println!("Collect:");
    println!("  filter: {}", config.collect.filter.as_deref().unwrap_or(unset));
    println!(
        "  output_root: {}",
        config
            .collect
            .output_root
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| unset.to_string())
    );
    println!("  manifest: {}", config.collect.manifest.display());
    let roots: Vec<String> = config
        .collect
        .search_roots
        .iter()
        .map(|p| {
            if p.components().all(|c| c == std::path::Component::CurDir) {
                "(clone root)".to_string()
            } else {
                p.display().to_string()
            }
        })
        .collect();
    println!("  search_roots: {}", roots.join(", "));
    println!();
    println!("History:");
    println!(
        "  cutoff: {}",
        config
            .history
            .cutoff
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("(none)")
    );
    println!();

    match Secrets::load().map(Secrets::with_env_overrides) {
        Ok(secrets) => {
            println!("Credentials:");
            println!(
                "  username: {}",
                secrets.github.username.as_deref().unwrap_or(unset)
            );
            let token = match secrets.github.token.as_deref() {
                Some(t) if !t.is_empty() => "(set)",
                _ => unset,
            };
            println!("  access_token: {}", token);
        }
        Err(e) => println!("Credentials: {}", e),
    }
    println!();

    let path = explicit_path
        .map(|p| p.to_path_buf())
        .or_else(Config::default_config_path);
    if let Some(path) = path {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "harvest",
            "run",
            "--filter",
            "tutorial",
            "-o",
            "collected",
            "--search-root",
            ".",
            "--search-root",
            "",
            "--search-root",
            "app/src",
            "--cutoff",
            "2024-05-01 08:00:00",
        ])
        .unwrap();

        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run command");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.filter.as_deref(), Some("tutorial"));
        assert_eq!(overrides.output_root, Some(PathBuf::from("collected")));
        assert_eq!(
            overrides.search_roots,
            vec![PathBuf::from("."), PathBuf::new(), PathBuf::from("app/src")]
        );
        assert!(overrides.sources.is_none());
    }
}
