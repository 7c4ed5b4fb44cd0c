use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use derive_more::Display;
use diesel::{Identifiable, Insertable, Queryable};
use ethers::types::Address;
use tracing::{debug, warn};

use crate::chains::{self, ChainId};
use crate::diesel::schema::feeds;
use crate::repos::{Repo, RepoError};

/// N/B: The order has to match ./diesel.rs to stop diesel from mixing up fields
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable)]
#[diesel(table_name = feeds)]
#[diesel(primary_key(id))]
pub struct Feed {
    pub id: i32,
    pub address: String,
    pub aggregator_address: Option<String>,
    pub description: String,
    pub chain_id: i64,
    pub status: String,
    pub ignored: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = feeds)]
pub struct UnsavedFeed {
    pub address: String,
    pub aggregator_address: Option<String>,
    pub description: String,
    pub chain_id: i64,
    pub status: String,
    pub ignored: bool,
    pub created_at: DateTime<Utc>,
}

impl UnsavedFeed {
    pub fn new(
        address: &str,
        aggregator_address: Option<&str>,
        description: &str,
        chain_id: &ChainId,
        created_at: DateTime<Utc>,
    ) -> Self {
        UnsavedFeed {
            address: address.to_lowercase().to_string(),
            aggregator_address: aggregator_address.map(|a| a.to_lowercase().to_string()),
            description: description.to_string(),
            chain_id: *chain_id,
            status: "active".to_string(),
            ignored: false,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AggregatorStatus {
    Active,
}

/// An aggregator contract found behind a registered feed.
///
/// The pair `(chain_id, address)` is its identity: re-discovering the same
/// pair refreshes `discovered_at` and never duplicates the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredAggregator {
    pub address: String,
    pub description: String,
    pub chain_id: ChainId,
    pub chain_name: &'static str,
    pub status: AggregatorStatus,
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredAggregator {
    pub fn identity(&self) -> (ChainId, String) {
        (self.chain_id, self.address.clone())
    }
}

/// Maps a stored feed row into a discovered aggregator.
///
/// Returns `None` for feeds on chains outside the static chain table, feeds
/// without a resolved aggregator address, and addresses that fail to parse.
pub fn map_feed_row(feed: &Feed, discovered_at: DateTime<Utc>) -> Option<DiscoveredAggregator> {
    let chain_name = chains::resolve_chain_name(feed.chain_id)?;
    let address: Address = feed.aggregator_address.as_deref()?.parse().ok()?;

    Some(DiscoveredAggregator {
        address: format!("{address:#x}"),
        description: feed.description.clone(),
        chain_id: feed.chain_id,
        chain_name,
        status: AggregatorStatus::Active,
        discovered_at,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryStats {
    pub total: usize,
    pub by_chain: HashMap<&'static str, usize>,
    pub by_status: HashMap<String, usize>,
}

/// In-memory bookkeeping of every aggregator seen so far, keyed by
/// `(chain_id, address)`. Owned by the orchestrator and passed by handle.
#[derive(Debug, Default)]
pub struct AggregatorRegistry {
    by_identity: HashMap<(ChainId, String), DiscoveredAggregator>,
}

impl AggregatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an aggregator, returning whether its identity was new.
    /// Re-recording a known identity refreshes the stored entry.
    pub fn record(&mut self, aggregator: DiscoveredAggregator) -> bool {
        self.by_identity.insert(aggregator.identity(), aggregator).is_none()
    }

    pub fn get(&self, chain_id: ChainId, address: &str) -> Option<&DiscoveredAggregator> {
        self.by_identity.get(&(chain_id, address.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    /// Every known aggregator in a stable (chain name, address) order.
    pub fn all(&self) -> Vec<DiscoveredAggregator> {
        let mut aggregators: Vec<_> = self.by_identity.values().cloned().collect();
        aggregators.sort_by(|a, b| (a.chain_name, &a.address).cmp(&(b.chain_name, &b.address)));

        aggregators
    }

    pub fn stats(&self) -> DiscoveryStats {
        let mut by_chain: HashMap<&'static str, usize> = HashMap::new();
        let mut by_status: HashMap<String, usize> = HashMap::new();

        for aggregator in self.by_identity.values() {
            *by_chain.entry(aggregator.chain_name).or_default() += 1;
            *by_status.entry(aggregator.status.to_string()).or_default() += 1;
        }

        DiscoveryStats {
            total: self.by_identity.len(),
            by_chain,
            by_status,
        }
    }
}

#[derive(Debug, Display)]
pub enum DiscoveryError {
    Repo(RepoError),
}

impl From<RepoError> for DiscoveryError {
    fn from(value: RepoError) -> Self {
        DiscoveryError::Repo(value)
    }
}

/// One discovery cycle: reads qualifying feeds from the store and records
/// each mapped aggregator in the registry.
///
/// The returned list carries no duplicate `(chain_id, address)` pairs.
pub async fn discover<'a, R: Repo>(
    conn: &mut R::Conn<'a>,
    registry: &mut AggregatorRegistry,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<DiscoveredAggregator>, DiscoveryError> {
    let feed_rows = R::load_discoverable_feeds(conn, since).await?;
    let discovered_at = Utc::now();

    let mut discovered = Vec::new();
    let mut seen_in_pass = HashSet::new();
    let mut skipped = 0_usize;

    for feed in &feed_rows {
        match map_feed_row(feed, discovered_at) {
            Some(aggregator) => {
                registry.record(aggregator.clone());

                if seen_in_pass.insert(aggregator.identity()) {
                    discovered.push(aggregator);
                }
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "skipped feeds without a mappable chain or aggregator address");
    }
    debug!(discovered = discovered.len(), since = ?since, "discovery cycle complete");

    Ok(discovered)
}
