/// Numeric network ID as stored in the discovery store
pub type ChainId = i64;

/// Chains the dependent indexer knows how to monitor.
/// Feeds on any other chain are skipped during discovery.
const CHAIN_NAMES: &[(ChainId, &str)] = &[
    (1, "ethereum"),
    (10, "optimism"),
    (56, "bsc"),
    (100, "gnosis"),
    (137, "polygon"),
    (250, "fantom"),
    (1088, "metis"),
    (8453, "base"),
    (42161, "arbitrum"),
    (42220, "celo"),
    (43114, "avalanche"),
    (59144, "linea"),
    (534352, "scroll"),
];

/// Resolves a chain ID to its symbolic network name.
pub fn resolve_chain_name(chain_id: ChainId) -> Option<&'static str> {
    CHAIN_NAMES.iter().find(|(id, _)| *id == chain_id).map(|(_, name)| *name)
}

/// Resolves a symbolic network name back to its chain ID.
pub fn resolve_chain_id(chain_name: &str) -> Option<ChainId> {
    CHAIN_NAMES.iter().find(|(_, name)| *name == chain_name).map(|(id, _)| *id)
}
