use std::path::{Path, PathBuf};

pub const ETHEREUM_REGISTRY_START_BLOCK: i64 = 12_864_088;

/// A dependent-worker manifest as it looks before any aggregators have
/// been discovered: the feed registry block only, on ethereum.
pub const MANIFEST_TEMPLATE: &str = r#"[app]
name = "feed-indexer"
entry = "bin/feed-indexer"
abis = ["FeedRegistry", "Aggregator"]

[networks.ethereum]
chain_id = 1
rpc_url = "https://eth.example.com/rpc"

[networks.base]
chain_id = 8453
rpc_url = "https://base.example.com/rpc"

[contracts.feed_registry]
abi = "FeedRegistry"

[contracts.feed_registry.networks.ethereum]
addresses = ["0x47fb2585d2c56fe188d0e6ec628a38b74fceeedf"]
start_block = 12864088
"#;

pub fn write_manifest(dir: &Path) -> PathBuf {
    let manifest_path = dir.join("indexer.toml");
    std::fs::write(&manifest_path, MANIFEST_TEMPLATE).unwrap();

    manifest_path
}
