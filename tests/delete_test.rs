mod helpers;

use helpers::{env_str, test_engine};

#[tokio::test]
async fn delete_removes_summary_embeddings() {
    let ctx = test_engine();

    let stored = ctx
        .engine
        .store("a fact with a summary", "facts", &[])
        .await;
    let memory_id = env_str(&stored, "memory_id");
    let summary_id = env_str(&stored, "summary_id");

    // Probe the vector summaries collection directly before and after.
    assert!(ctx.engine.vector().get_summary(&summary_id).unwrap().is_some());

    let deleted = ctx.engine.delete(&memory_id);
    assert!(deleted.is_ok(), "delete failed: {}", deleted.message());
    assert_eq!(deleted.get("deleted_summaries").unwrap(), 1);

    assert!(
        ctx.engine.vector().get_summary(&summary_id).unwrap().is_none(),
        "summary embedding must not survive the delete"
    );
}

#[tokio::test]
async fn delete_leaves_no_trace_in_either_store() {
    let ctx = test_engine();
    let stored = ctx.engine.store("ephemeral fact", "facts", &[]).await;
    let memory_id = env_str(&stored, "memory_id");

    ctx.engine.delete(&memory_id);

    assert!(ctx.engine.relational().get_memory(&memory_id).unwrap().is_none());
    assert!(ctx.engine.relational().list_summaries(&memory_id).unwrap().is_empty());
    assert!(ctx.engine.vector().memory_ids().unwrap().is_empty());
    assert!(ctx.engine.vector().summary_ids().unwrap().is_empty());

    let results =
        ctx.engine
            .retrieve("ephemeral fact", 5, None, engram::engine::ReturnType::FullText);
    assert_eq!(results[0]["status"], "ok");
    assert!(results[0].get("content").is_none());
}

#[tokio::test]
async fn second_delete_is_not_found_without_side_effects() {
    let ctx = test_engine();
    let keep = ctx.engine.store("memory that stays", "facts", &[]).await;
    let stored = ctx.engine.store("memory that goes", "facts", &[]).await;
    let memory_id = env_str(&stored, "memory_id");

    assert!(ctx.engine.delete(&memory_id).is_ok());

    let again = ctx.engine.delete(&memory_id);
    assert!(!again.is_ok());
    assert_eq!(again.to_value()["error_details"]["kind"], "not_found");

    // The surviving memory is untouched.
    let keep_id = env_str(&keep, "memory_id");
    assert!(ctx.engine.relational().get_memory(&keep_id).unwrap().is_some());
    assert_eq!(ctx.engine.vector().memory_ids().unwrap(), vec![keep_id]);
}

#[tokio::test]
async fn delete_of_unknown_id_is_not_found() {
    let ctx = test_engine();
    let result = ctx.engine.delete("never-existed");
    assert!(!result.is_ok());
    assert_eq!(result.to_value()["error_details"]["kind"], "not_found");
}
