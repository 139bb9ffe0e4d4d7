mod helpers;

use helpers::{test_engine, test_engine_with_backup};

fn snapshot_count(dir: &std::path::Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.starts_with("memory_backup_") && name.ends_with(".zip")
            })
            .count(),
        Err(_) => 0,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_stores_produce_exactly_one_snapshot() {
    let ctx = test_engine_with_backup(1);
    let engine = ctx.engine.clone();

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .store(&format!("concurrent fact number {i}"), "stress", &[])
                .await
        }));
    }
    for handle in handles {
        let envelope = handle.await.unwrap();
        assert!(envelope.is_ok(), "store failed: {}", envelope.message());
    }

    assert_eq!(
        snapshot_count(&ctx.config.resolved_backup_path()),
        1,
        "exactly one snapshot per interval, regardless of writer count"
    );
}

#[tokio::test]
async fn later_writes_within_the_interval_do_not_snapshot_again() {
    let ctx = test_engine_with_backup(1);

    let stored = ctx.engine.store("first write", "t", &[]).await;
    assert_eq!(snapshot_count(&ctx.config.resolved_backup_path()), 1);

    let memory_id = stored.get("memory_id").unwrap().as_str().unwrap().to_string();
    ctx.engine.update(&memory_id, Some("second write"), None, None).await;
    ctx.engine.delete(&memory_id);

    assert_eq!(snapshot_count(&ctx.config.resolved_backup_path()), 1);
}

#[tokio::test]
async fn disabled_backups_never_snapshot() {
    let ctx = test_engine();

    ctx.engine.store("no backup for this", "t", &[]).await;

    assert_eq!(snapshot_count(&ctx.config.resolved_backup_path()), 0);
}

#[tokio::test]
async fn snapshot_contains_both_store_files() {
    let ctx = test_engine_with_backup(1);
    ctx.engine.store("snapshot me", "t", &[]).await;

    let backup_dir = ctx.config.resolved_backup_path();
    let snapshot = std::fs::read_dir(&backup_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().starts_with("memory_backup_"))
        .expect("snapshot file");

    let restored = backup_dir.join("restored");
    engram::backup::extract_archive(&snapshot.path(), &restored).unwrap();

    assert!(restored.join("memory.sqlite").exists());
    assert!(restored.join("chroma").join("vectors.sqlite").exists());
}

#[tokio::test]
async fn snapshot_filenames_carry_parseable_timestamps() {
    let ctx = test_engine_with_backup(1);
    ctx.engine.store("stamp me", "t", &[]).await;

    let backup_dir = ctx.config.resolved_backup_path();
    for entry in std::fs::read_dir(&backup_dir).unwrap().filter_map(|e| e.ok()) {
        assert!(
            engram::backup::parse_backup_timestamp(&entry.path()).is_some(),
            "unparseable snapshot name: {:?}",
            entry.file_name()
        );
    }
}
