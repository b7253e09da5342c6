//! ChainPerm CLI.
//!
//! # Commands
//! ```text
//! chainperm listen   [--config <file.yaml>] [--endpoint <ws-url>] [--log-path <file>]
//! chainperm simulate [--config <file.yaml>] --tx CreateAsset:a1,true,alice --tx ...
//! chainperm info     [--config <file.yaml>]
//! ```

use anyhow::{anyhow, bail, Context, Result};
use chainperm_core::config::ChainpermConfig;
use chainperm_gateway::{ConnectOptions, Gateway, InMemoryLedger, WsGateway};
use chainperm_listener::EventListener;
use chainperm_observability::{init_tracing, ListenerMetrics};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "chainperm",
    about = "Append chaincode events from a permissioned ledger to a JSON-lines log",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Overrides {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Gateway event relay endpoint (ws:// or wss://)
    #[arg(long)]
    endpoint: Option<String>,
    /// Channel name
    #[arg(long)]
    channel: Option<String>,
    /// Chaincode name
    #[arg(long)]
    chaincode: Option<String>,
    /// Log file that records are appended to
    #[arg(long)]
    log_path: Option<PathBuf>,
    /// Emit JSON-structured diagnostics
    #[arg(long)]
    json_logs: bool,
}

impl Overrides {
    fn resolve(&self) -> Result<ChainpermConfig> {
        let mut config = match &self.config {
            Some(path) => ChainpermConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ChainpermConfig::default(),
        };
        if let Some(endpoint) = &self.endpoint {
            config.gateway.endpoint = endpoint.clone();
        }
        if let Some(channel) = &self.channel {
            config.listener.channel = channel.clone();
        }
        if let Some(chaincode) = &self.chaincode {
            config.listener.chaincode = chaincode.clone();
        }
        if let Some(log_path) = &self.log_path {
            config.listener.log_path = log_path.clone();
        }
        if self.json_logs {
            config.log.json = true;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for chaincode events and append them to the log file until Ctrl-C
    Listen {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Run transactions on an in-process ledger and log the resulting events
    Simulate {
        #[command(flatten)]
        overrides: Overrides,
        /// Transaction as Function:arg1,arg2,... (repeatable)
        #[arg(long = "tx", required = true)]
        transactions: Vec<String>,
    },

    /// Print the resolved configuration
    Info {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Listen { overrides } => cmd_listen(overrides.resolve()?).await,
        Commands::Simulate {
            overrides,
            transactions,
        } => cmd_simulate(overrides.resolve()?, &transactions).await,
        Commands::Info { overrides } => cmd_info(&overrides.resolve()?),
    }
}

async fn cmd_listen(config: ChainpermConfig) -> Result<()> {
    init_tracing(&config.log);

    let options = ConnectOptions::from_config(&config.gateway)?;
    let gateway = WsGateway::connect(options).context("failed to connect to gateway")?;
    info!(endpoint = gateway.endpoint(), channel = %config.listener.channel, "gateway ready");
    let network = gateway.network(&config.listener.channel);

    let handle = EventListener::new(config.listener.clone())
        .with_metrics(ListenerMetrics::global())
        .start(network.as_ref())
        .await
        .context("failed to start chaincode event listening")?;

    info!(
        log_path = %config.listener.log_path.display(),
        "listening, press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for Ctrl-C")?;

    info!("shutting down");
    let stats = handle.stats();
    handle.cancel();
    if let Err(e) = handle.join().await {
        warn!(error = %e, "listener task ended abnormally");
    }
    gateway.close().await;

    info!(
        logged = stats.logged(),
        dropped = stats.dropped(),
        write_errors = stats.write_errors(),
        "listener stopped"
    );
    Ok(())
}

async fn cmd_simulate(config: ChainpermConfig, transactions: &[String]) -> Result<()> {
    init_tracing(&config.log);

    let ledger = InMemoryLedger::new(&config.listener.channel, &config.listener.chaincode);
    let network = ledger.network(&config.listener.channel);
    let handle = EventListener::new(config.listener.clone())
        .with_metrics(ListenerMetrics::global())
        .start(network.as_ref())
        .await
        .context("failed to start chaincode event listening")?;
    let stats = handle.stats();

    for raw in transactions {
        let (function, args) = parse_transaction(raw)?;
        match ledger.submit(function, &args) {
            Ok(status) => println!(
                "✓ {function} committed in block {} (tx {})",
                status.block_number, status.transaction_id
            ),
            Err(e) => println!("✗ {function} failed: {e}"),
        }
    }

    // Closing ends the subscription after queued events are written.
    ledger.close().await;
    handle
        .join()
        .await
        .map_err(|e| anyhow!("listener task failed: {e}"))?;

    println!(
        "\n{} event(s) logged to {} ({} dropped, {} write errors)",
        stats.logged(),
        config.listener.log_path.display(),
        stats.dropped(),
        stats.write_errors()
    );
    Ok(())
}

fn cmd_info(config: &ChainpermConfig) -> Result<()> {
    println!("ChainPerm v{}", env!("CARGO_PKG_VERSION"));
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

/// Split "Function:arg1,arg2" into its function name and arguments.
fn parse_transaction(raw: &str) -> Result<(&str, Vec<&str>)> {
    let (function, args) = raw.split_once(':').unwrap_or((raw, ""));
    if function.is_empty() {
        bail!("transaction '{raw}' has no function name");
    }
    let args = if args.is_empty() {
        Vec::new()
    } else {
        args.split(',').collect()
    };
    Ok((function, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transaction_argument() {
        let (f, args) = parse_transaction("CreateAsset:a1,true,alice").unwrap();
        assert_eq!(f, "CreateAsset");
        assert_eq!(args, vec!["a1", "true", "alice"]);

        let (f, args) = parse_transaction("ReadAsset:a1").unwrap();
        assert_eq!(f, "ReadAsset");
        assert_eq!(args, vec!["a1"]);

        assert!(parse_transaction(":a1").is_err());
    }

    #[test]
    fn flags_override_config() {
        let overrides = Overrides {
            config: None,
            endpoint: Some("ws://peer0:9000/events".into()),
            channel: None,
            chaincode: Some("permission".into()),
            log_path: Some("/tmp/contract.log".into()),
            json_logs: true,
        };
        let config = overrides.resolve().unwrap();
        assert_eq!(config.gateway.endpoint, "ws://peer0:9000/events");
        assert_eq!(config.listener.channel, "mychannel");
        assert_eq!(config.listener.chaincode, "permission");
        assert_eq!(config.listener.log_path, PathBuf::from("/tmp/contract.log"));
        assert!(config.log.json);
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
