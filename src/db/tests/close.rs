use crate::db::*;
use crate::types::{ProcessInfo, RunId};
use tempfile::NamedTempFile;

/// Querying after the pool is closed returns an error rather than hanging or panicking.
#[tokio::test]
async fn test_get_process_after_pool_close_returns_error() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let info = ProcessInfo::created(RunId::new(), None);
    db.insert_process(&info).await.unwrap();
    assert!(db.get_process(info.id).await.unwrap().is_some());

    db.pool().close().await;

    let result = db.get_process(info.id).await;
    assert!(
        result.is_err(),
        "get_process after pool close should return an error, got: {:?}",
        result
    );
}

#[tokio::test]
async fn test_save_continuation_after_pool_close_returns_error() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    db.pool().close().await;

    let state = crate::engine::PublishState::initial(RunId::new(), vec!["a".into()], 10);
    assert!(
        db.save_continuation(crate::types::Priority::High, &state)
            .await
            .is_err()
    );
}
