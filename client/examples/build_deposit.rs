//! Example: Build a deposit and inspect the resulting transactions
//!
//! Nothing is signed or sent. Set `RPC_URL` to use another mainnet endpoint and
//! `USER_ADDRESS` to build for a specific account.

use anyhow::Context;
use lendpool_client::{ClientConfig, LendingClient, ProtocolAddresses, SupplyRequest};

const POOL: &str = "0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2";
const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("lendpool_client=info")
        .init();

    println!("=== Lending Pool Deposit Example ===\n");

    let mut config = ClientConfig::mainnet()
        .with_addresses(ProtocolAddresses::default().with_pool(POOL.parse()?));
    if let Ok(rpc_url) = std::env::var("RPC_URL") {
        config.rpc_url = rpc_url;
    }
    println!("RPC URL: {}", config.rpc_url);

    let client = LendingClient::new(config).context("invalid client configuration")?;

    match client.health_check().await {
        Ok(true) => println!("✓ Node serves chain {}\n", client.config().chain_id),
        Ok(false) => println!("✗ Node serves a different chain\n"),
        Err(e) => {
            eprintln!("✗ Health check failed: {}\n", e);
            return Err(e.into());
        }
    }

    let user = std::env::var("USER_ADDRESS")
        .unwrap_or_else(|_| "0x0000000000000000000000000000000000000001".to_string());

    let token = client.pool().erc20().token_data(USDC.parse()?).await?;
    println!(
        "Depositing 100 {} ({}, {} decimals)\n",
        token.symbol, token.name, token.decimals
    );

    let intents = client
        .pool()
        .deposit(SupplyRequest {
            user,
            reserve: USDC.to_string(),
            amount: "100".to_string(),
            ..Default::default()
        })
        .await
        .context("failed to build deposit")?;

    println!("Built {} transaction(s):", intents.len());
    for (index, intent) in intents.iter().enumerate() {
        println!("  {}. {} {:?} -> {:?}", index + 1, intent.kind, intent.action, intent.to);
        println!("     calldata: {}", intent.calldata()?);

        match intent.gas(false).await {
            Ok(gas) => println!(
                "     gas limit {} at {} wei",
                gas.gas_limit, gas.gas_price
            ),
            Err(e) => println!("     gas estimate unavailable: {}", e),
        }
    }

    Ok(())
}
