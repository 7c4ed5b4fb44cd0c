mod document;
mod mutator;
mod snapshot;

pub use document::{
    AppSection, ContractNetworkSection, ContractSection, IndexerManifest, NetworkSection,
    AGGREGATORS_CONTRACT, AGGREGATOR_ABI, FEED_REGISTRY_CONTRACT,
};
pub use mutator::{ConfigMutator, ManifestError};
pub use snapshot::{group_by_chain, ConfigIdentity, ConfigSnapshot};
