//! `magic-spend` command line.
//!
//! ```text
//!   owner key (env) ──▶ node RPC ──▶ SimpleAccount address
//!                                        │
//!   bundler + paymaster RPC ◀────────────┘
//!     contracts · stakes · allowance · withdrawal · user operation
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use magic_spend::config::{self, parse_amount, DemoConfig, ObservabilityConfig};
use magic_spend::observability::logging::init_logging;
use magic_spend::{FlowError, WithdrawalFlow};

#[derive(Parser)]
#[command(name = "magic-spend")]
#[command(about = "Withdraw staked funds through a MagicSpend paymaster", long_about = None)]
struct Cli {
    /// TOML config file. Defaults plus environment variables when omitted.
    #[arg(short, long, env = "MAGIC_SPEND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the owner and smart account addresses
    Account,
    /// Show the MagicSpend stake and withdrawal manager addresses
    Contracts,
    /// List the owner's stakes in the configured token
    Stakes,
    /// Run the full allowance and withdrawal procedure
    Withdraw {
        /// Amount in ether; overrides the configured amount
        #[arg(short, long)]
        amount: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let dotenv_error = dotenv_problem(dotenvy::dotenv());
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&ObservabilityConfig::default());
            report_dotenv(dotenv_error.as_ref());
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };
    init_logging(&config.observability);
    report_dotenv(dotenv_error.as_ref());

    tracing::info!(
        chain_id = config.network.chain_id,
        entry_point = %config.bundler.entry_point,
        token = %config.magic_spend.token,
        "Configuration loaded"
    );

    if let Err(e) = run(cli.command, config).await {
        tracing::error!(error = %e, "magic-spend failed");
        std::process::exit(1);
    }
}

/// A missing `.env` is normal; a present but unreadable one is not.
fn dotenv_problem<T>(result: dotenvy::Result<T>) -> Option<dotenvy::Error> {
    match result {
        Ok(_) => None,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => Some(e),
    }
}

fn report_dotenv(error: Option<&dotenvy::Error>) {
    if let Some(e) = error {
        tracing::warn!(error = %e, "Ignoring .env file");
    }
}

fn load(path: Option<&std::path::Path>) -> Result<DemoConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config(path),
        None => config::load_from_env(),
    }
}

async fn run(command: Commands, config: DemoConfig) -> Result<(), FlowError> {
    let default_amount = config.magic_spend.amount.clone();
    let flow = WithdrawalFlow::connect(config).await?;

    match command {
        Commands::Account => print_json(&flow.account_summary().await?),
        Commands::Contracts => print_json(&flow.contracts().await?),
        Commands::Stakes => print_json(&flow.stakes().await?),
        Commands::Withdraw { amount } => {
            let raw = amount.unwrap_or(default_amount);
            let amount = parse_amount(&raw)
                .map_err(|e| config::ConfigError::Validation(vec![e]))?;

            let outcome = flow.withdraw(amount).await?;
            print_json(&outcome);
            println!("Transaction hash: {}", outcome.transaction_hash);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::error!(error = %e, "Failed to render output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_missing_dotenv_is_ignored() {
        let missing = dotenvy::Error::Io(io::Error::from(io::ErrorKind::NotFound));
        assert!(dotenv_problem::<()>(Err(missing)).is_none());
        assert!(dotenv_problem(Ok(PathBuf::from(".env"))).is_none());
    }

    #[test]
    fn test_unreadable_dotenv_is_reported() {
        let denied = dotenvy::Error::Io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(dotenv_problem::<()>(Err(denied)).is_some());

        let malformed = dotenvy::Error::LineParse("MAGIC_SPEND_AMOUNT 0.1".to_string(), 18);
        assert!(dotenv_problem::<()>(Err(malformed)).is_some());
    }
}
