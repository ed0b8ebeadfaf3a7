//! Common test utilities for snapshot-publisher integration tests

#![allow(dead_code)]

use serde_json::json;
use snapshot_publisher::channels::{FieldKeyExtractor, FieldProjection, SqliteTableSource};
use snapshot_publisher::sink::SinkDescriptor;
use snapshot_publisher::{
    ChannelBinding, ChannelRegistry, Config, KeyValueSink, ProcessInfo, RunId, SnapshotPublisher,
};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Reference database with `regions` (5 rows), `currencies` (3 rows) and an empty `planets` table
pub async fn reference_pool(dir: &Path) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.join("reference.db"))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::query("CREATE TABLE regions (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    for (id, name) in [
        (1, "North"),
        (2, "South"),
        (3, "East"),
        (4, "West"),
        (5, "Central"),
    ] {
        sqlx::query("INSERT INTO regions (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(&pool)
            .await
            .unwrap();
    }

    sqlx::query(
        "CREATE TABLE currencies (code TEXT PRIMARY KEY, label TEXT NOT NULL, minor_units INTEGER)",
    )
    .execute(&pool)
    .await
    .unwrap();
    for (code, label, minor) in [("CHF", "Swiss franc", 2), ("EUR", "Euro", 2), ("JPY", "Yen", 0)] {
        sqlx::query("INSERT INTO currencies (code, label, minor_units) VALUES (?, ?, ?)")
            .bind(code)
            .bind(label)
            .bind(minor)
            .execute(&pool)
            .await
            .unwrap();
    }

    sqlx::query("CREATE TABLE planets (id INTEGER PRIMARY KEY, name TEXT)")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

/// Registry publishing the three reference tables
pub fn reference_registry(pool: &SqlitePool) -> ChannelRegistry {
    ChannelRegistry::new()
        .with(
            ChannelBinding::new("regions")
                .with_source(SqliteTableSource::new(pool.clone(), "regions", "id").unwrap())
                .with_converter(FieldProjection::new().field("id").field("name"))
                .with_key_extractor(FieldKeyExtractor::new("id"))
                .with_sink(SinkDescriptor::new("regions")),
        )
        .unwrap()
        .with(
            ChannelBinding::new("currencies")
                .with_source(SqliteTableSource::new(pool.clone(), "currencies", "code").unwrap())
                .with_converter(
                    FieldProjection::new()
                        .field("code")
                        .rename("label", "display_name"),
                )
                .with_key_extractor(FieldKeyExtractor::new("code"))
                .with_sink(SinkDescriptor::new("currencies")),
        )
        .unwrap()
        .with(
            ChannelBinding::new("planets")
                .with_source(SqliteTableSource::new(pool.clone(), "planets", "id").unwrap())
                .with_converter(FieldProjection::new().field("id"))
                .with_key_extractor(FieldKeyExtractor::new("id"))
                .with_sink(SinkDescriptor::new("planets")),
        )
        .unwrap()
}

/// Config writing its database into `dir`, two rows per page
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("publisher.db");
    config.publish.batch_size = 2;
    config
}

/// Everything a test needs, kept alive together
pub struct TestEnv {
    pub publisher: SnapshotPublisher,
    pub sink: Arc<KeyValueSink>,
    pub pool: SqlitePool,
    pub dir: TempDir,
}

/// Publisher over the reference tables, queue processor not started
pub async fn test_env() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let pool = reference_pool(dir.path()).await;
    let sink = Arc::new(KeyValueSink::new());

    let publisher = SnapshotPublisher::new(
        test_config(dir.path()),
        Arc::new(reference_registry(&pool)),
        sink.clone(),
    )
    .await
    .unwrap();

    TestEnv {
        publisher,
        sink,
        pool,
        dir,
    }
}

/// Poll until the run reaches a terminal status
pub async fn wait_for_terminal(publisher: &SnapshotPublisher, id: RunId) -> ProcessInfo {
    let poll = async {
        loop {
            let info = publisher.process(id).await.unwrap();
            if info.status.is_terminal() {
                return info;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };

    tokio::time::timeout(Duration::from_secs(10), poll)
        .await
        .unwrap_or_else(|_| panic!("run {id} did not reach a terminal status"))
}

/// Expected published object of a region row
pub fn region(id: i64, name: &str) -> serde_json::Value {
    json!({ "id": id, "name": name })
}
