#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use feedwarden::supervisor::{classify, OutputClass};
    use feedwarden::{ProcessRole, ProcessSupervisor, WorkerSpec};

    fn quick_supervisor() -> ProcessSupervisor {
        crate::test_runner::init_tracing();

        ProcessSupervisor::new()
            .with_settle_window(Duration::from_millis(200))
            .with_grace_window(Duration::from_secs(1))
            .with_restart_delay(Duration::from_millis(100))
    }

    fn long_running_worker() -> WorkerSpec {
        WorkerSpec::new("sleep").add_arg("30")
    }

    #[test]
    fn classifies_worker_output_lines() {
        assert_eq!(classify("ERROR failed to fetch logs"), OutputClass::WorkerError);
        assert_eq!(classify("api listening on port 42069"), OutputClass::Listening);
        assert_eq!(classify("historical sync 45% complete"), OutputClass::SyncProgress);
        assert_eq!(classify("starting indexer service"), OutputClass::Startup);
        assert_eq!(classify("GET /graphql 200 3ms"), OutputClass::Noise);
    }

    #[tokio::test]
    async fn start_fails_for_a_missing_program() {
        let supervisor = quick_supervisor();
        supervisor
            .manage(ProcessRole::Indexer, WorkerSpec::new("feedwarden-no-such-binary"))
            .await;

        assert!(!supervisor.start(ProcessRole::Indexer).await);
    }

    #[tokio::test]
    async fn start_fails_for_an_unregistered_role() {
        let supervisor = quick_supervisor();

        assert!(!supervisor.start(ProcessRole::Server).await);
    }

    #[tokio::test]
    async fn settle_check_catches_immediate_exits() {
        let supervisor = quick_supervisor();
        supervisor
            .manage(ProcessRole::Indexer, WorkerSpec::new("sh").add_arg("-c").add_arg("exit 1"))
            .await;

        assert!(!supervisor.start(ProcessRole::Indexer).await);

        let health = supervisor.health_status().await;
        assert!(!health[&ProcessRole::Indexer].running);
    }

    #[tokio::test]
    async fn reports_health_for_a_running_worker() {
        let supervisor = quick_supervisor();
        supervisor.manage(ProcessRole::Indexer, long_running_worker()).await;

        assert!(supervisor.start(ProcessRole::Indexer).await);

        let health = supervisor.health_status().await;
        assert!(health[&ProcessRole::Indexer].running);
        assert_eq!(health[&ProcessRole::Indexer].restarts, 0);

        supervisor.stop(ProcessRole::Indexer).await;
    }

    #[tokio::test]
    async fn absent_workers_report_not_running_with_zero_uptime() {
        let supervisor = quick_supervisor();
        supervisor.manage(ProcessRole::Server, long_running_worker()).await;

        let health = supervisor.health_status().await;
        assert!(!health[&ProcessRole::Server].running);
        assert_eq!(health[&ProcessRole::Server].uptime_secs, 0);

        // Stopping a worker that never started is a no-op
        assert!(supervisor.stop(ProcessRole::Server).await);
    }

    #[tokio::test]
    async fn stops_a_cooperative_worker_within_the_grace_window() {
        let supervisor = quick_supervisor();
        supervisor.manage(ProcessRole::Indexer, long_running_worker()).await;
        assert!(supervisor.start(ProcessRole::Indexer).await);

        let begun = Instant::now();
        assert!(supervisor.stop(ProcessRole::Indexer).await);
        assert!(begun.elapsed() < Duration::from_secs(1));

        let health = supervisor.health_status().await;
        assert!(!health[&ProcessRole::Indexer].running);
        assert_eq!(health[&ProcessRole::Indexer].uptime_secs, 0);
    }

    #[tokio::test]
    async fn escalates_to_a_forced_kill_after_the_grace_window() {
        let supervisor = quick_supervisor();
        supervisor
            .manage(
                ProcessRole::Indexer,
                WorkerSpec::new("sh")
                    .add_arg("-c")
                    .add_arg("trap '' TERM; while true; do sleep 1; done"),
            )
            .await;
        assert!(supervisor.start(ProcessRole::Indexer).await);

        let begun = Instant::now();
        assert!(supervisor.stop(ProcessRole::Indexer).await);
        let elapsed = begun.elapsed();

        // No earlier than the grace window, no later than grace plus epsilon
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn restart_increments_the_restart_count_up_front() {
        let supervisor = quick_supervisor();
        supervisor.manage(ProcessRole::Server, long_running_worker()).await;
        assert!(supervisor.start(ProcessRole::Server).await);

        assert!(supervisor.restart(ProcessRole::Server).await);
        assert_eq!(supervisor.restart_count(ProcessRole::Server).await, 1);

        assert!(supervisor.restart(ProcessRole::Server).await);
        assert_eq!(supervisor.restart_count(ProcessRole::Server).await, 2);

        let health = supervisor.health_status().await;
        assert!(health[&ProcessRole::Server].running);
        assert_eq!(health[&ProcessRole::Server].restarts, 2);

        supervisor.stop(ProcessRole::Server).await;
    }

    #[tokio::test]
    async fn workers_receive_the_activated_storage_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema_out = dir.path().join("schema.txt");

        let supervisor = quick_supervisor();
        supervisor
            .manage(
                ProcessRole::Server,
                WorkerSpec::new("sh")
                    .add_arg("-c")
                    .add_arg(&format!("echo $STORAGE_SCHEMA > {}; sleep 30", schema_out.display()))
                    .with_schema("agg_1c_1a_0a1b2c3d"),
            )
            .await;

        assert!(supervisor.start(ProcessRole::Server).await);
        assert_eq!(
            std::fs::read_to_string(&schema_out).unwrap().trim(),
            "agg_1c_1a_0a1b2c3d"
        );
        supervisor.stop(ProcessRole::Server).await;

        supervisor.update_schema(ProcessRole::Server, "agg_2c_5a_11223344").await;
        assert!(supervisor.start(ProcessRole::Server).await);
        assert_eq!(
            std::fs::read_to_string(&schema_out).unwrap().trim(),
            "agg_2c_5a_11223344"
        );
        supervisor.stop(ProcessRole::Server).await;
    }
}
