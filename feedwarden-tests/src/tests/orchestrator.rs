#[cfg(test)]
mod tests {
    use std::time::Duration;

    use feedwarden::orchestrator::{
        health_action, probe_ready, reconfigure_due, wait_until_ready, HealthAction,
    };
    use feedwarden::ProcessHealth;

    fn stopped_worker(restarts: u32) -> ProcessHealth {
        ProcessHealth {
            running: false,
            uptime_secs: 0,
            restarts,
        }
    }

    #[test]
    fn running_workers_are_left_alone() {
        let health = ProcessHealth {
            running: true,
            uptime_secs: 120,
            restarts: 3,
        };

        assert_eq!(health_action(&health, 5), HealthAction::Wait);
    }

    #[test]
    fn stopped_workers_under_the_ceiling_are_restarted() {
        assert_eq!(health_action(&stopped_worker(0), 5), HealthAction::Restart);
        assert_eq!(health_action(&stopped_worker(4), 5), HealthAction::Restart);
    }

    #[test]
    fn workers_at_the_ceiling_are_flagged_not_restarted() {
        assert_eq!(health_action(&stopped_worker(5), 5), HealthAction::Flag);
        assert_eq!(health_action(&stopped_worker(9), 5), HealthAction::Flag);
    }

    #[test]
    fn reconfiguration_is_threshold_gated() {
        // A delta of threshold - 1 must not trigger, exactly threshold must
        assert!(!reconfigure_due(0, 2, 3));
        assert!(reconfigure_due(0, 3, 3));

        assert!(!reconfigure_due(10, 12, 3));
        assert!(reconfigure_due(10, 13, 3));
        assert!(reconfigure_due(10, 20, 3));
    }

    #[test]
    fn a_shrinking_registry_never_triggers_reconfiguration() {
        assert!(!reconfigure_due(10, 10, 3));
        assert!(!reconfigure_due(10, 8, 3));
    }

    #[tokio::test]
    async fn probe_treats_an_unreachable_endpoint_as_not_ready() {
        let client = reqwest::Client::new();

        // Nothing listens on port 1
        assert!(!probe_ready(&client, "http://127.0.0.1:1").await);
    }

    #[tokio::test]
    async fn readiness_wait_gives_up_at_the_absolute_timeout() {
        let ready = wait_until_ready(
            "http://127.0.0.1:1",
            Duration::from_millis(50),
            Duration::from_millis(300),
        )
        .await;

        assert!(!ready);
    }
}
