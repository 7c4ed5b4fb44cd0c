use chrono::Utc;
use feedwarden::{ChainId, UnsavedFeed};
use rand::Rng;

pub fn random_address() -> String {
    let bytes: [u8; 20] = rand::thread_rng().gen();

    let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("0x{hex}")
}

/// A feed that qualifies for discovery: active, not ignored, with a
/// resolved aggregator address.
pub fn discoverable_feed(chain_id: &ChainId) -> UnsavedFeed {
    UnsavedFeed::new(
        &random_address(),
        Some(&random_address()),
        "ETH / USD",
        chain_id,
        Utc::now(),
    )
}

/// A feed still waiting on aggregator resolution.
pub fn unresolved_feed(chain_id: &ChainId) -> UnsavedFeed {
    UnsavedFeed::new(&random_address(), None, "BTC / USD", chain_id, Utc::now())
}

/// A feed flagged as a non-price feed.
pub fn ignored_feed(chain_id: &ChainId) -> UnsavedFeed {
    let mut feed = discoverable_feed(chain_id);
    feed.ignored = true;

    feed
}

/// A feed whose lifecycle flag has been lowered.
pub fn inactive_feed(chain_id: &ChainId) -> UnsavedFeed {
    let mut feed = discoverable_feed(chain_id);
    feed.status = "inactive".to_string();

    feed
}
