use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Contract block the discovery-only worker indexes; its per-network start
/// blocks seed the aggregator block on the same chain.
pub const FEED_REGISTRY_CONTRACT: &str = "feed_registry";
/// The one contract block this system rewrites.
pub const AGGREGATORS_CONTRACT: &str = "aggregators";
/// Interface definition the aggregator block decodes events with.
pub const AGGREGATOR_ABI: &str = "Aggregator";

/// The dependent worker's declarative manifest, modeled as a typed tree so
/// mutation replaces a node instead of searching for textual markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerManifest {
    pub app: AppSection,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkSection>,
    #[serde(default)]
    pub contracts: BTreeMap<String, ContractSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSection {
    pub name: String,
    /// Top-level entry point the worker boots from.
    pub entry: String,
    /// Interface definitions the contract blocks may reference.
    #[serde(default)]
    pub abis: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSection {
    pub chain_id: i64,
    pub rpc_url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContractSection {
    pub abi: String,
    #[serde(default)]
    pub networks: BTreeMap<String, ContractNetworkSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractNetworkSection {
    #[serde(default)]
    pub addresses: Vec<String>,
    pub start_block: i64,
}

impl IndexerManifest {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn render(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Start block already configured for the feed registry on a chain.
    pub fn registry_start_block(&self, chain_name: &str) -> Option<i64> {
        self.contracts
            .get(FEED_REGISTRY_CONTRACT)?
            .networks
            .get(chain_name)
            .map(|network| network.start_block)
    }

    pub fn has_abi(&self, abi: &str) -> bool {
        self.app.abis.iter().any(|known| known == abi)
    }
}
