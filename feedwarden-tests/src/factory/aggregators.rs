use chrono::Utc;
use feedwarden::{resolve_chain_id, AggregatorStatus, DiscoveredAggregator};

pub fn discovered_aggregator(chain_name: &'static str, address: &str) -> DiscoveredAggregator {
    let chain_id =
        resolve_chain_id(chain_name).unwrap_or_else(|| panic!("unknown chain {chain_name}"));

    DiscoveredAggregator {
        address: address.to_lowercase(),
        description: "ETH / USD".to_string(),
        chain_id,
        chain_name,
        status: AggregatorStatus::Active,
        discovered_at: Utc::now(),
    }
}
