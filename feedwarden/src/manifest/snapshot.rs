use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::discovery::DiscoveredAggregator;

/// Namespace label isolating one generated configuration's persisted data
/// from another's. Content-only: two runs over an identical aggregator set
/// derive the same identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIdentity {
    pub label: String,
    pub digest: String,
}

impl ConfigIdentity {
    pub fn derive(chains: &BTreeMap<String, Vec<String>>) -> Self {
        let canonical = chains
            .iter()
            .map(|(chain_name, addresses)| format!("{chain_name}:{}", addresses.join(",")))
            .collect::<Vec<_>>()
            .join("|");

        let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
        let total_addresses: usize = chains.values().map(Vec::len).sum();
        let label = format!("agg_{}c_{}a_{}", chains.len(), total_addresses, &digest[..8]);

        Self { label, digest }
    }
}

/// The generated contract-configuration payload for the dependent worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    /// Chain name to sorted, deduplicated aggregator addresses.
    pub chains: BTreeMap<String, Vec<String>>,
    pub start_blocks: BTreeMap<String, i64>,
    pub identity: ConfigIdentity,
    pub generated_at: DateTime<Utc>,
}

impl ConfigSnapshot {
    pub fn total_aggregators(&self) -> usize {
        self.chains.values().map(Vec::len).sum()
    }
}

/// Groups aggregators by chain name with lexicographically sorted,
/// deduplicated addresses. Chain keys iterate in sorted order; this
/// ordering is what makes rendered configurations reproducible.
pub fn group_by_chain(aggregators: &[DiscoveredAggregator]) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for aggregator in aggregators {
        groups
            .entry(aggregator.chain_name.to_string())
            .or_default()
            .insert(aggregator.address.clone());
    }

    groups
        .into_iter()
        .map(|(chain_name, addresses)| (chain_name, addresses.into_iter().collect()))
        .collect()
}
