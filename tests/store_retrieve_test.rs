mod helpers;

use helpers::{env_bool, env_str, test_engine};

#[tokio::test]
async fn tiny_tier_store_uses_content_as_summary() {
    let ctx = test_engine();

    let result = ctx
        .engine
        .store(
            "I prefer tabs over spaces",
            "user_preferences",
            &["style".to_string()],
        )
        .await;

    assert!(result.is_ok(), "store failed: {}", result.message());
    assert!(env_bool(&result, "summary_generated"));
    assert_eq!(env_str(&result, "summary_tier"), "tiny");
    let summary_id = env_str(&result, "summary_id");

    // The persisted summary text is the content itself — no LLM involved.
    let summary = ctx
        .engine
        .relational()
        .get_summary_by_id(&summary_id)
        .unwrap()
        .unwrap();
    assert_eq!(summary.summary_text, "I prefer tabs over spaces");
    assert_eq!(summary.summary_type, "abstractive_medium");

    let results = ctx.engine.retrieve(
        "indentation",
        5,
        Some("user_preferences"),
        engram::engine::ReturnType::Summary,
    );
    assert_eq!(results[0]["summary_text"], "I prefer tabs over spaces");
}

#[tokio::test]
async fn store_then_retrieve_roundtrips_full_record() {
    let ctx = test_engine();
    let content = "User prefers Rust over Go for systems programming work";

    let stored = ctx
        .engine
        .store(content, "languages", &["rust".to_string(), "go".to_string()])
        .await;
    assert!(stored.is_ok());

    let results = ctx.engine.retrieve(
        &content[..20],
        5,
        Some("languages"),
        engram::engine::ReturnType::FullText,
    );

    assert_eq!(results.len(), 1);
    let item = &results[0];
    assert_eq!(item["content"], content);
    assert_eq!(item["topic"], "languages");
    assert_eq!(item["tags"], serde_json::json!(["rust", "go"]));
    assert_eq!(item["version"], 1);
    assert!(item["created_at"].is_string());
}

#[tokio::test]
async fn return_type_controls_result_shape() {
    let ctx = test_engine();
    ctx.engine
        .store("The mitochondria is the powerhouse of the cell", "biology", &[])
        .await;

    let summary_only = ctx.engine.retrieve(
        "mitochondria",
        5,
        None,
        engram::engine::ReturnType::Summary,
    );
    assert!(summary_only[0].get("content").is_none());
    assert!(summary_only[0]["summary_text"].is_string());
    assert_eq!(summary_only[0]["summary_type"], "abstractive_medium");

    let both = ctx
        .engine
        .retrieve("mitochondria", 5, None, engram::engine::ReturnType::Both);
    assert!(both[0]["content"].is_string());
    assert!(both[0]["summary_text"].is_string());
    assert_eq!(both[0]["version"], 1);
}

#[tokio::test]
async fn empty_retrieval_returns_single_envelope_element() {
    let ctx = test_engine();

    let results = ctx
        .engine
        .retrieve("anything", 5, None, engram::engine::ReturnType::FullText);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["status"], "ok");
    assert!(results[0].get("content").is_none());
}

#[tokio::test]
async fn zero_max_results_returns_envelope_not_empty_list() {
    let ctx = test_engine();
    ctx.engine.store("some stored fact", "facts", &[]).await;

    let results = ctx
        .engine
        .retrieve("stored fact", 0, None, engram::engine::ReturnType::FullText);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["status"], "ok");
}

#[tokio::test]
async fn topic_filter_restricts_retrieval() {
    let ctx = test_engine();
    ctx.engine.store("standup notes from Monday", "work", &[]).await;
    ctx.engine.store("standup notes from Tuesday", "archive", &[]).await;

    let results = ctx.engine.retrieve(
        "standup notes",
        5,
        Some("work"),
        engram::engine::ReturnType::FullText,
    );

    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["topic"], "work");
}

#[tokio::test]
async fn empty_content_is_invalid() {
    let ctx = test_engine();
    let result = ctx.engine.store("", "topic", &[]).await;
    assert!(!result.is_ok());
    let v = result.to_value();
    assert_eq!(v["error_details"]["kind"], "invalid_argument");
}

#[tokio::test]
async fn empty_tag_is_invalid() {
    let ctx = test_engine();
    let result = ctx
        .engine
        .store("content", "topic", &["ok".to_string(), "".to_string()])
        .await;
    assert!(!result.is_ok());
    assert_eq!(result.to_value()["error_details"]["kind"], "invalid_argument");
}

#[tokio::test]
async fn separator_tag_is_invalid() {
    let ctx = test_engine();
    let result = ctx
        .engine
        .store("content", "topic", &["a,b".to_string()])
        .await;
    assert!(!result.is_ok());
    assert_eq!(result.to_value()["error_details"]["kind"], "invalid_argument");
}

#[tokio::test]
async fn duplicate_tags_deduplicate_preserving_first() {
    let ctx = test_engine();
    let result = ctx
        .engine
        .store(
            "content with duplicate tags",
            "topic",
            &["b".to_string(), "a".to_string(), "b".to_string()],
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(
        result.get("tags").unwrap(),
        &serde_json::json!(["b", "a"])
    );

    let id = env_str(&result, "memory_id");
    let item = ctx.engine.relational().get_memory(&id).unwrap().unwrap();
    assert_eq!(item.tags, vec!["b".to_string(), "a".to_string()]);
}

#[tokio::test]
async fn store_reports_content_size_and_topic() {
    let ctx = test_engine();
    let result = ctx.engine.store("12345", "sizes", &[]).await;

    assert_eq!(result.get("content_size").unwrap(), 5);
    assert_eq!(env_str(&result, "topic"), "sizes");
    assert!(result.get("timestamp").unwrap().is_string());
}
