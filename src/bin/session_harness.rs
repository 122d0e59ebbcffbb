//! Scripted session harness.
//!
//! Wires a [`SimulatedWallet`] to a [`SessionClient`] and walks the session
//! through a full scenario (connect, account switch, chain switch,
//! disconnect), logging every transition. Useful as an executable smoke test
//! and as a reference for how hosts consume the client.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use clap::Parser;
use tokio::time::timeout;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wallet_session::{ClientConfig, SessionClient, SessionSignal, SimulatedWallet};

#[derive(Parser)]
#[command(name = "session-harness")]
#[command(about = "Scripted wallet session scenario against a simulated wallet")]
struct Args {
    /// Account address the simulated wallet exposes
    #[arg(long, default_value = "0xABCDEF0123456789ABCDEF0123456789ABCDEF01")]
    address: String,

    /// Chain id the simulated wallet starts on
    #[arg(long, default_value_t = 1)]
    chain_id: u64,

    /// Native balance in wei
    #[arg(long, default_value = "1500000000000000000")]
    balance_wei: String,

    /// Chain id the wallet switches to mid-session
    #[arg(long, default_value_t = 8453)]
    switch_to: u64,
}

fn print_session(label: &str, client: &SessionClient) {
    let session = client.current_state();
    println!(
        "[{label}] status={:?} address={:?} network={:?} balance={:?}",
        session.status,
        session.address,
        session.network.as_ref().map(|n| n.name.as_str()),
        session.balance_formatted(),
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let address = Address::from_str(&args.address)?;
    let balance = U256::from_str(&args.balance_wei)?;

    let wallet = SimulatedWallet::new(address, args.chain_id, balance);
    let client = SessionClient::new(Arc::new(wallet.clone()), ClientConfig::default());
    let mut signals = client.signals();

    info!("connecting");
    client.connect().await?;
    print_session("connected", &client);

    info!("simulating account revocation");
    wallet.emit_accounts_changed(vec![]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    print_session("after revocation", &client);

    info!("reconnecting");
    client.connect().await?;
    print_session("reconnected", &client);

    info!(chain_id = args.switch_to, "simulating chain switch");
    wallet.emit_chain_changed(args.switch_to);
    match timeout(Duration::from_secs(1), signals.recv()).await {
        Ok(Some(SessionSignal::NetworkInvalidated { chain_id })) => {
            println!("[signal] network invalidated, wallet now on chain {chain_id}");
        }
        other => println!("[signal] unexpected outcome: {other:?}"),
    }
    print_session("after chain switch", &client);

    client.disconnect();
    print_session("disconnected", &client);

    Ok(())
}
