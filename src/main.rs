use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use tungsten_console::capture::{host_subscriber, install_panic_hook};
use tungsten_console::config::{Config, ConfigLoader};
use tungsten_console::{Console, HttpBridge, Severity};

/// Demo host embedding the Tungsten console
#[derive(Parser, Debug)]
#[command(name = "tungsten-console")]
#[command(about = "Runs a host loop with the diagnostic console and its browser inspector bridge")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// IP address the inspector bridge binds to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port the inspector bridge listens on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding the inspector's static files
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Host loop ticks per second
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> Result<Config> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::at(path),
        None => ConfigLoader::new()?,
    };
    let mut config = loader
        .load_or_create()
        .with_context(|| format!("Failed to load {}", loader.config_path().display()))?;

    if let Some(host) = &args.host {
        config.http.ip = host.clone();
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(assets) = &args.assets {
        config.http.assets_dir = assets.clone();
    }
    Ok(config)
}

fn register_commands(console: &Console) -> Result<()> {
    console.register_command("help", "List available commands", |console, _| {
        console.print_help();
        Ok(())
    })?;

    console.register_command("echo", "Print the arguments", |console, args| {
        console.log(args.join(" "), Severity::Info, false);
        Ok(())
    })?;

    console.register_command("history", "Show submitted command lines", |console, _| {
        for (i, line) in console.command_history().iter().enumerate() {
            console.log(format!("{i}: {line}"), Severity::Info, false);
        }
        Ok(())
    })?;

    let save_help = "Save the log history: save [directory] [prefix]";
    console.register_command("save", save_help, |console, args| {
        let dir = args.first().map(String::as_str).unwrap_or("");
        let prefix = args.get(1).map(String::as_str).unwrap_or("console");
        let path = console.save_history_to_file(dir, prefix, true)?;
        console.log(format!("History saved to {}", path.display()), Severity::Info, false);
        Ok(())
    })?;

    console.register_command("clear", "Clear the log history", |console, _| {
        console.clear_logs();
        Ok(())
    })?;

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config warnings are printed before the console exists.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_level))
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || load_config(&args))?;

    let console = Console::new(config.console.clone());

    host_subscriber(&console, config.capture.clone(), &args.log_level).init();

    if config.capture.panics {
        install_panic_hook(&console);
    }

    register_commands(&console)?;

    info!("Starting Tungsten console v{}", env!("CARGO_PKG_VERSION"));

    let mut bridge = if config.http.enabled {
        match HttpBridge::start(console.clone(), &config.http) {
            Ok(bridge) => {
                info!("Inspector assets served from {}", config.http.assets_dir.display());
                Some(bridge)
            }
            Err(e) => {
                warn!("Inspector bridge disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    console.log("Console ready. Type 'help' for a list of commands.", Severity::Info, false);

    let tick = Duration::from_secs_f64(1.0 / f64::from(args.tick_rate.max(1)));
    let mut ticker = tokio::time::interval(tick);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(bridge) = &bridge {
                    bridge.run_pending();
                }
            }
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down gracefully...");
                break;
            }
        }
    }

    if let Some(bridge) = bridge.as_mut() {
        bridge.shutdown();
    }

    info!("Console stopped");
    Ok(())
}
