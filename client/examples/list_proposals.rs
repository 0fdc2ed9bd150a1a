//! Example: List governance proposals with their IPFS metadata

use lendpool_client::{ClientConfig, LendingClient, ProtocolAddresses};

const GOVERNANCE: &str = "0xEC568fffba86c094cf06b22134B23074DFE2252c";
const GOVERNANCE_HELPER: &str = "0x16ff7583ea21055Bf5F929Ec4B896D997Ff35847";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("lendpool_client=info")
        .init();

    let addresses = ProtocolAddresses::default()
        .with_governance(GOVERNANCE.parse()?, Some(GOVERNANCE_HELPER.parse()?));
    let client = LendingClient::new(ClientConfig::mainnet().with_addresses(addresses))?;

    let proposals = client.governance().get_proposals(0, 5).await?;

    for proposal in &proposals {
        println!(
            "#{} [{}] {}",
            proposal.id, proposal.state, proposal.metadata.title
        );
        println!(
            "    for {} / against {} | blocks {}..{}",
            proposal.for_votes, proposal.against_votes, proposal.start_block, proposal.end_block
        );
        println!("    ipfs: {}", proposal.metadata.ipfs_hash);
    }

    Ok(())
}
