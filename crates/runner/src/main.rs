use anyhow::Context;
use execstream_runner::{ConsoleSink, DEFAULT_CONFIG_PATH, build_supervisor, load_config};
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn print_help() {
    eprintln!(
        r#"execstream - private execution stream listener

USAGE:
    execstream [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file (default: config.json)
    --help              Print this help message

ENVIRONMENT VARIABLES:
    BYBIT_API_KEY       API key (overrides config file)
    BYBIT_API_SECRET    API secret (overrides config file)
    BYBIT_WS_URL        Private WebSocket URL (overrides config file)
    RUST_LOG            Log level filter (default: execstream=info)

EXAMPLES:
    # Run with ./config.json
    execstream

    # Credentials from the environment
    BYBIT_API_KEY=... BYBIT_API_SECRET=... execstream --config testnet.json
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("execstream=info"))
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = args[i].clone();
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    info!("Loading configuration from: {}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Invalid configuration in {}", config_path))?;
    info!("Endpoint: {}", config.exchange.ws_url);
    info!("Topics: {}", config.session.topics.join(", "));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("[SYS] Ctrl+C received, shutting down");
                cancel.cancel();
            }
        }
    });

    let supervisor = build_supervisor(&config, Arc::new(ConsoleSink::stdout()), cancel);
    let report = supervisor.run().await;

    info!(
        "Stopped after {} connection attempts ({} failed)",
        report.attempts, report.failures
    );
    Ok(())
}
