//! academiadepolitie-mcp: MCP server for AcademiaDePolitie student data
//!
//! Serves MCP over stdio by default. The `install` subcommand registers the
//! server in the MCP client's configuration file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use academiadepolitie_mcp::backend::BackendClient;
use academiadepolitie_mcp::config::{self, Config};
use academiadepolitie_mcp::install;
use academiadepolitie_mcp::mcp::{Dispatcher, McpServer};
use academiadepolitie_mcp::tools::ToolContext;

/// MCP server for AcademiaDePolitie student data.
///
/// Exposes the internal student-data API to AI assistants over stdio.
/// The bearer token is read from the environment
/// (`ACADEMIADEPOLITIE_JWT_TOKEN` unless configured otherwise).
#[derive(Parser, Debug)]
#[command(name = "academiadepolitie-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Override the backend API base URL
    #[arg(long, value_name = "URL", global = true)]
    api_base_url: Option<String>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register this server in the MCP client's configuration file
    Install {
        /// JWT from the AcademiaDePolitie account settings page
        #[arg(long)]
        token: String,

        /// Client configuration file (default: platform-specific location)
        #[arg(long, value_name = "FILE")]
        client_config: Option<PathBuf>,
    },
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Builds the log filter.
///
/// A non-empty `RUST_LOG` is used as-is unless `-v`/`-q` was given, in which
/// case the flag level is layered on top of it.
fn build_filter(level: Level, explicit: bool, rust_log: Option<&str>) -> EnvFilter {
    match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) if !explicit => EnvFilter::new(directives),
        Some(directives) => EnvFilter::new(directives).add_directive(level.into()),
        None => EnvFilter::default().add_directive(level.into()),
    }
}

/// Initialises the tracing subscriber. Logs go to stderr; stdout carries
/// protocol messages only.
fn init_tracing(filter: EnvFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the academiadepolitie-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(url) = args.api_base_url {
        cfg.api.base_url = url;
        if let Err(e) = cfg.api.validate() {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    }

    let level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    init_tracing(build_filter(
        level,
        args.verbose > 0 || args.quiet,
        rust_log.as_deref(),
    ));

    match args.command {
        Some(Command::Install {
            token,
            client_config,
        }) => run_install(&token, client_config.as_deref(), &cfg),
        None => run_server(&cfg),
    }
}

fn run_install(token: &str, client_config: Option<&std::path::Path>, cfg: &Config) -> ExitCode {
    match install::install(token, client_config, &cfg.api.token_env) {
        Ok(path) => {
            eprintln!("Server registered in {}", path.display());
            eprintln!("Restart the MCP client to activate it.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Installation failed");
            eprintln!("Installation failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_server(cfg: &Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting academiadepolitie-mcp server"
    );

    let token = cfg.api.token_from_env();
    if token.is_none() {
        warn!(
            env = %cfg.api.token_env,
            "Bearer token is not set; backend requests will be rejected"
        );
    }

    let backend = match BackendClient::new(&cfg.api, token) {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, "Failed to create backend client");
            return ExitCode::FAILURE;
        }
    };
    info!(url = %backend.url(), "Backend configured");

    let dispatcher = Dispatcher::new(ToolContext {
        backend,
        resource_user_id: cfg.resources.user_id,
    });
    let mut server = McpServer::stdio(dispatcher);

    info!("MCP server ready, waiting for client connection...");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_precedence() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "info"), Level::INFO);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
    }

    #[test]
    fn rust_log_wins_over_config_level() {
        let filter = build_filter(Level::WARN, false, Some("debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn config_level_applies_without_rust_log() {
        let filter = build_filter(Level::INFO, false, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));

        let blank = build_filter(Level::ERROR, false, Some("  "));
        assert_eq!(blank.max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn verbose_flag_raises_level_over_rust_log() {
        let filter = build_filter(Level::TRACE, true, Some("warn"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn parse_install_subcommand() {
        let args = Args::parse_from([
            "academiadepolitie-mcp",
            "install",
            "--token",
            "eyJabc",
            "--client-config",
            "/tmp/claude.json",
        ]);
        let Some(Command::Install {
            token,
            client_config,
        }) = args.command
        else {
            panic!("Expected install subcommand");
        };
        assert_eq!(token, "eyJabc");
        assert_eq!(client_config, Some(PathBuf::from("/tmp/claude.json")));
    }
}
