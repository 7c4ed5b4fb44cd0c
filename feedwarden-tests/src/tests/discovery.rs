#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::factory::{
        discoverable_feed, discovered_aggregator, ignored_feed, inactive_feed, unresolved_feed,
    };
    use crate::test_runner;
    use feedwarden::discovery::{self, map_feed_row, Feed};
    use feedwarden::{
        resolve_chain_id, resolve_chain_name, AggregatorRegistry, FeedwardenRepo, Repo,
    };

    fn feed_row(chain_id: i64, aggregator_address: Option<&str>) -> Feed {
        Feed {
            id: 1,
            address: "0x47fb2585d2c56fe188d0e6ec628a38b74fceeedf".to_string(),
            aggregator_address: aggregator_address.map(str::to_string),
            description: "ETH / USD".to_string(),
            chain_id,
            status: "active".to_string(),
            ignored: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn resolves_known_chains() {
        assert_eq!(resolve_chain_name(1), Some("ethereum"));
        assert_eq!(resolve_chain_name(8453), Some("base"));
        assert_eq!(resolve_chain_id("arbitrum"), Some(42161));
    }

    #[test]
    fn skips_unknown_chains() {
        assert_eq!(resolve_chain_name(999_999), None);

        let feed = feed_row(999_999, Some("0xE62B71cf983019BFf55bC83B48601ce8419650CC"));
        assert_eq!(map_feed_row(&feed, Utc::now()), None);
    }

    #[test]
    fn skips_feeds_without_an_aggregator_address() {
        let feed = feed_row(1, None);
        assert_eq!(map_feed_row(&feed, Utc::now()), None);
    }

    #[test]
    fn normalizes_aggregator_addresses() {
        let feed = feed_row(1, Some("0xE62B71cf983019BFf55bC83B48601ce8419650CC"));

        let aggregator = map_feed_row(&feed, Utc::now()).unwrap();
        assert_eq!(aggregator.address, "0xe62b71cf983019bff55bc83b48601ce8419650cc");
        assert_eq!(aggregator.chain_name, "ethereum");
    }

    #[test]
    fn registry_deduplicates_by_chain_and_address() {
        let mut registry = AggregatorRegistry::new();

        let first = discovered_aggregator("ethereum", "0xaa");
        let mut second = first.clone();
        second.discovered_at = first.discovered_at + Duration::seconds(60);

        assert!(registry.record(first.clone()));
        assert!(!registry.record(second.clone()));

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(first.chain_id, &first.address).unwrap().discovered_at,
            second.discovered_at
        );
    }

    #[test]
    fn same_address_on_two_chains_is_two_entries() {
        let mut registry = AggregatorRegistry::new();

        registry.record(discovered_aggregator("ethereum", "0xaa"));
        registry.record(discovered_aggregator("base", "0xaa"));

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registry_stats_aggregate_by_chain_and_status() {
        let mut registry = AggregatorRegistry::new();

        registry.record(discovered_aggregator("ethereum", "0xaa"));
        registry.record(discovered_aggregator("ethereum", "0xbb"));
        registry.record(discovered_aggregator("base", "0xcc"));

        let stats = registry.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_chain.get("ethereum"), Some(&2));
        assert_eq!(stats.by_chain.get("base"), Some(&1));
        assert_eq!(stats.by_status.get("Active"), Some(&3));
    }

    #[test]
    fn registry_lists_in_stable_order() {
        let mut registry = AggregatorRegistry::new();

        registry.record(discovered_aggregator("ethereum", "0xbb"));
        registry.record(discovered_aggregator("base", "0xcc"));
        registry.record(discovered_aggregator("ethereum", "0xaa"));

        let listed: Vec<_> = registry
            .all()
            .into_iter()
            .map(|aggregator| (aggregator.chain_name, aggregator.address))
            .collect();

        assert_eq!(
            listed,
            vec![
                ("base", "0xcc".to_string()),
                ("ethereum", "0xaa".to_string()),
                ("ethereum", "0xbb".to_string()),
            ]
        );
    }

    // Needs a running Postgres at TEST_DATABASE_URL; run with --ignored
    #[ignore]
    #[tokio::test]
    pub async fn discovers_only_qualifying_feeds() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let ethereum = 1;

            FeedwardenRepo::create_feeds(
                &mut conn,
                &[
                    discoverable_feed(&ethereum),
                    unresolved_feed(&ethereum),
                    ignored_feed(&ethereum),
                    inactive_feed(&ethereum),
                ],
            )
            .await;

            let mut registry = AggregatorRegistry::new();
            let discovered =
                discovery::discover::<FeedwardenRepo>(&mut conn, &mut registry, None)
                    .await
                    .unwrap();

            assert_eq!(discovered.len(), 1);
            assert_eq!(registry.len(), 1);
        })
        .await;
    }

    // Needs a running Postgres at TEST_DATABASE_URL; run with --ignored
    #[ignore]
    #[tokio::test]
    pub async fn incremental_discovery_honours_the_time_bound() {
        let pool = test_runner::get_pool().await;

        test_runner::run_test(&pool, |mut conn| async move {
            let ethereum = 1;
            FeedwardenRepo::create_feeds(&mut conn, &[discoverable_feed(&ethereum)]).await;

            let mut registry = AggregatorRegistry::new();
            let since = Some(Utc::now() + Duration::hours(1));
            let discovered =
                discovery::discover::<FeedwardenRepo>(&mut conn, &mut registry, since)
                    .await
                    .unwrap();

            assert!(discovered.is_empty());
        })
        .await;
    }
}
