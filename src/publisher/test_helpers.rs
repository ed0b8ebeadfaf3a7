//! Shared test helpers for creating SnapshotPublisher instances in tests.

use crate::channels::ChannelRegistry;
use crate::config::Config;
use crate::db::Database;
use crate::engine::test_helpers::{VecSource, binding};
use crate::publisher::SnapshotPublisher;
use crate::sink::KeyValueSink;
use std::sync::Arc;
use tempfile::tempdir;

/// Registry with `regions` (5 rows) and `currencies` (2 rows)
pub(crate) fn test_registry() -> ChannelRegistry {
    ChannelRegistry::new()
        .with(binding("regions", Arc::new(VecSource::with_ids(1..=5))))
        .unwrap()
        .with(binding("currencies", Arc::new(VecSource::with_ids([100, 200]))))
        .unwrap()
}

/// Helper to create a test SnapshotPublisher with a persistent database.
/// Returns the publisher and the tempdir (which must be kept alive).
pub(crate) async fn create_test_publisher() -> (SnapshotPublisher, tempfile::TempDir) {
    let (publisher, _sink, temp_dir) = create_test_publisher_with(|_| {}).await;
    (publisher, temp_dir)
}

/// Like [`create_test_publisher`], with a config tweak and access to the sink
pub(crate) async fn create_test_publisher_with(
    configure: impl FnOnce(&mut Config),
) -> (SnapshotPublisher, Arc<KeyValueSink>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("test.db");
    config.publish.batch_size = 2;
    configure(&mut config);

    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();
    let sink = Arc::new(KeyValueSink::new());

    let publisher = SnapshotPublisher::assemble(
        config,
        Arc::new(db),
        Arc::new(test_registry()),
        sink.clone(),
    );

    (publisher, sink, temp_dir)
}

/// Poll until the run reaches a terminal status
pub(crate) async fn wait_for_terminal(
    publisher: &SnapshotPublisher,
    id: crate::types::RunId,
) -> crate::types::ProcessInfo {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let info = publisher.process(id).await.unwrap();
        if info.status.is_terminal() {
            return info;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "run {id} did not finish, last status {}",
            info.status
        );
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
