use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use derive_more::Display;
use tokio::fs;
use tracing::{info, warn};

use crate::config::DEFAULT_START_BLOCK;
use crate::discovery::DiscoveredAggregator;

use super::document::{
    ContractNetworkSection, ContractSection, IndexerManifest, AGGREGATORS_CONTRACT, AGGREGATOR_ABI,
};
use super::snapshot::{group_by_chain, ConfigIdentity, ConfigSnapshot};

#[derive(Debug, Display)]
pub enum ManifestError {
    Io(String),
    Parse(String),
    Render(String),
    #[display("generated manifest failed validation")]
    Invalid,
}

/// Rewrites the dependent worker's manifest from a discovered aggregator
/// set. Owns the manifest file for the duration of a
/// generate-validate-activate sequence; the backup-before-write discipline
/// is the sole consistency mechanism.
pub struct ConfigMutator {
    manifest_path: PathBuf,
    backup_dir: PathBuf,
    default_start_block: i64,
}

impl ConfigMutator {
    pub fn new(manifest_path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            backup_dir: backup_dir.into(),
            default_start_block: DEFAULT_START_BLOCK,
        }
    }

    pub fn with_default_start_block(mut self, default_start_block: i64) -> Self {
        self.default_start_block = default_start_block;

        self
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Produces the configuration snapshot and the full rewritten manifest
    /// text. Nothing is persisted here.
    pub async fn generate(
        &self,
        aggregators: &[DiscoveredAggregator],
    ) -> Result<(ConfigSnapshot, String), ManifestError> {
        let prior_text = fs::read_to_string(&self.manifest_path)
            .await
            .map_err(|error| ManifestError::Io(error.to_string()))?;
        let mut manifest = IndexerManifest::parse(&prior_text)
            .map_err(|error| ManifestError::Parse(error.to_string()))?;

        let chains = group_by_chain(aggregators);

        let mut start_blocks = BTreeMap::new();
        for chain_name in chains.keys() {
            let start_block = match manifest.registry_start_block(chain_name) {
                Some(start_block) => start_block,
                None => {
                    warn!(
                        chain = %chain_name,
                        fallback = self.default_start_block,
                        "no feed registry start block configured for chain"
                    );
                    self.default_start_block
                }
            };
            start_blocks.insert(chain_name.clone(), start_block);
        }

        let identity = ConfigIdentity::derive(&chains);
        let snapshot = ConfigSnapshot {
            chains,
            start_blocks,
            identity,
            generated_at: Utc::now(),
        };

        apply_snapshot(&mut manifest, &snapshot);

        let text = manifest.render().map_err(|error| ManifestError::Render(error.to_string()))?;

        Ok((snapshot, text))
    }

    /// Structural sanity check of rendered manifest text: it must parse (a
    /// delimiter imbalance fails here), declare the worker's entry point,
    /// and import the aggregator interface definition.
    pub fn validate(text: &str) -> bool {
        match IndexerManifest::parse(text) {
            Ok(manifest) => !manifest.app.entry.is_empty() && manifest.has_abi(AGGREGATOR_ABI),
            Err(_) => false,
        }
    }

    /// Backs up the current manifest, writes the new text, and returns the
    /// storage-schema selector for the next worker start. Invalid text is
    /// rejected before anything touches disk; a write that fails the
    /// post-write check is rolled back from the backup.
    pub async fn activate(
        &self,
        snapshot: &ConfigSnapshot,
        text: &str,
    ) -> Result<String, ManifestError> {
        if !Self::validate(text) {
            return Err(ManifestError::Invalid);
        }

        let backup_path = self.backup_path();
        fs::copy(&self.manifest_path, &backup_path)
            .await
            .map_err(|error| ManifestError::Io(error.to_string()))?;

        fs::write(&self.manifest_path, text)
            .await
            .map_err(|error| ManifestError::Io(error.to_string()))?;

        let written = fs::read_to_string(&self.manifest_path)
            .await
            .map_err(|error| ManifestError::Io(error.to_string()))?;
        if !Self::validate(&written) {
            fs::copy(&backup_path, &self.manifest_path)
                .await
                .map_err(|error| ManifestError::Io(error.to_string()))?;

            return Err(ManifestError::Invalid);
        }

        info!(
            schema = %snapshot.identity.label,
            chains = snapshot.chains.len(),
            aggregators = snapshot.total_aggregators(),
            backup = %backup_path.display(),
            "activated dependent worker configuration"
        );

        Ok(snapshot.identity.label.clone())
    }

    fn backup_path(&self) -> PathBuf {
        let file_name = self
            .manifest_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "manifest".to_string());

        self.backup_dir
            .join(format!("{file_name}.{}.bak", Utc::now().format("%Y%m%d%H%M%S")))
    }
}

/// Replaces (or inserts) the aggregators contract block and makes sure the
/// aggregator interface is importable by the worker.
fn apply_snapshot(manifest: &mut IndexerManifest, snapshot: &ConfigSnapshot) {
    let mut networks = BTreeMap::new();
    for (chain_name, addresses) in &snapshot.chains {
        networks.insert(
            chain_name.clone(),
            ContractNetworkSection {
                addresses: addresses.clone(),
                start_block: snapshot.start_blocks[chain_name],
            },
        );
    }

    manifest.contracts.insert(
        AGGREGATORS_CONTRACT.to_string(),
        ContractSection {
            abi: AGGREGATOR_ABI.to_string(),
            networks,
        },
    );

    if !manifest.has_abi(AGGREGATOR_ABI) {
        manifest.app.abis.push(AGGREGATOR_ABI.to_string());
    }
}
