//! hello-service: a minimal HTTP service.
//!
//! This is the application entry point. With no arguments it loads the
//! configuration (defaults, optional TOML file, `PORT`/`HOST` overrides),
//! initializes tracing and serves until SIGTERM/SIGINT. The `descriptor`
//! subcommands validate and render deployment descriptors.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use const_format::formatcp;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hello_service::config::{AppConfig, LogFormat, DEFAULT_BIND_ADDR, DEFAULT_LOG_FILTER};
use hello_service::descriptor::{self, DeploymentDescriptor};
use hello_service::Error;

/// hello-service: answers GET / with "Hello World"
#[derive(Parser, Debug)]
#[command(
    name = "hello-service",
    version,
    about,
    after_help = formatcp!("Serves on HOST:PORT from the environment, default {}", DEFAULT_BIND_ADDR)
)]
struct Args {
    /// Path to an optional TOML configuration file (used when serving)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "hello_service=debug,tower_http=info")
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve HTTP (the default), listening on HOST:PORT (default 0.0.0.0:3000)
    Serve,
    /// Work with deployment descriptors
    #[command(subcommand)]
    Descriptor(DescriptorCommand),
}

#[derive(Subcommand, Debug)]
enum DescriptorCommand {
    /// Validate a descriptor file
    Check {
        path: PathBuf,
        /// Also require containerPort to equal this port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the descriptor as Kubernetes objects (JSON)
    Render { path: PathBuf },
}

/// Where log lines go: the server logs to stdout, descriptor commands keep
/// stdout for their own output and log to stderr.
#[derive(Clone, Copy)]
enum LogTarget {
    Stdout,
    Stderr,
}

fn init_tracing(log_level: Option<String>, format: LogFormat, target: LogTarget) {
    // Priority: CLI > env > default
    let log_filter = log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));

    match (format, target) {
        (LogFormat::Text, LogTarget::Stdout) => {
            registry.with(tracing_subscriber::fmt::layer()).init()
        }
        (LogFormat::Json, LogTarget::Stdout) => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        (LogFormat::Text, LogTarget::Stderr) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        (LogFormat::Json, LogTarget::Stderr) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let result = match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            // PORT/HOST only matter when binding, so only serving reads them
            let config = match AppConfig::load(args.config.as_deref()) {
                Ok(config) => config,
                Err(e) => {
                    // Tracing is not up yet; the log format may come from this very file
                    eprintln!("hello-service: {}", e);
                    return Error::from(e).exit_code();
                }
            };
            init_tracing(args.log_level, config.logging.format, LogTarget::Stdout);
            serve(config).await
        }
        Command::Descriptor(command) => {
            init_tracing(args.log_level, LogFormat::Text, LogTarget::Stderr);
            run_descriptor(command)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            e.exit_code()
        }
    }
}

async fn serve(config: AppConfig) -> Result<(), Error> {
    tracing::info!(
        host = %config.http.host,
        port = config.http.port,
        descriptor = ?config.deployment.descriptor,
        "Loaded configuration"
    );
    hello_service::run(config).await
}

fn run_descriptor(command: DescriptorCommand) -> Result<(), Error> {
    match command {
        DescriptorCommand::Check { path, port } => {
            let descriptor = DeploymentDescriptor::load(&path)?;
            if let Some(port) = port {
                descriptor.ensure_port_matches(port)?;
            }
            println!("{}: ok ({})", path.display(), descriptor);
        }
        DescriptorCommand::Render { path } => {
            let descriptor = DeploymentDescriptor::load(&path)?;
            let manifest = descriptor::render(&descriptor);
            println!("{:#}", manifest);
        }
    }
    Ok(())
}
