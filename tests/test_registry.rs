use strix_dashboard::{ScanConfig, ScanError, ScanStatus, SessionRegistry};

#[tokio::test]
async fn test_create_generates_prefixed_id() {
    let registry = SessionRegistry::new();
    let session = registry.create(ScanConfig::default(), None).await.unwrap();
    assert!(session.id.starts_with("scan-"));
    assert_eq!(session.id.len(), "scan-".len() + 8);
    assert_eq!(session.status, ScanStatus::Pending);
    assert!(session.completed_at.is_none());
    assert!(!session.is_historical);
}

#[tokio::test]
async fn test_create_uses_caller_name_as_id() {
    let registry = SessionRegistry::new();
    let session = registry
        .create(ScanConfig::default(), Some("nightly-audit".to_string()))
        .await
        .unwrap();
    assert_eq!(session.id, "nightly-audit");
    assert_eq!(session.name.as_deref(), Some("nightly-audit"));
}

#[tokio::test]
async fn test_duplicate_id_rejected() {
    let registry = SessionRegistry::new();
    registry
        .create(ScanConfig::default(), Some("dup".to_string()))
        .await
        .unwrap();
    let err = registry
        .create(ScanConfig::default(), Some("dup".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::DuplicateSession(_)));
    // The original session is untouched
    assert!(registry.get("dup").await.is_some());
    assert_eq!(registry.list().await.len(), 1);
}

#[tokio::test]
async fn test_execution_ids_strictly_increasing_from_one() {
    let registry = SessionRegistry::new();
    let session = registry.create(ScanConfig::default(), None).await.unwrap();

    let ids: Vec<u64> = [
        registry.next_execution_id(&session.id).await,
        registry.next_execution_id(&session.id).await,
        registry.next_execution_id(&session.id).await,
        registry.next_execution_id(&session.id).await,
    ]
    .to_vec();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_counters_are_per_session_and_independent() {
    let registry = SessionRegistry::new();
    let a = registry.create(ScanConfig::default(), None).await.unwrap();
    let b = registry.create(ScanConfig::default(), None).await.unwrap();

    assert_eq!(registry.next_execution_id(&a.id).await, 1);
    assert_eq!(registry.next_execution_id(&a.id).await, 2);
    assert_eq!(registry.next_execution_id(&b.id).await, 1);

    // Message ids do not share the execution sequence
    assert_eq!(registry.next_message_id(&a.id).await, 1);
    assert_eq!(registry.next_execution_id(&a.id).await, 3);
}

#[tokio::test]
async fn test_update_returns_none_for_unknown_session() {
    let registry = SessionRegistry::new();
    let result = registry.update("missing", |s| s.status = ScanStatus::Running).await;
    assert!(result.is_none());
    assert!(registry.get("missing").await.is_none());
    assert!(!registry.contains("missing").await);
}

#[tokio::test]
async fn test_snapshots_are_isolated_from_later_mutation() {
    let registry = SessionRegistry::new();
    let session = registry.create(ScanConfig::default(), None).await.unwrap();

    let before = registry.get(&session.id).await.unwrap();
    registry
        .update(&session.id, |s| s.status = ScanStatus::Running)
        .await;

    assert_eq!(before.status, ScanStatus::Pending);
    let after = registry.get(&session.id).await.unwrap();
    assert_eq!(after.status, ScanStatus::Running);
}
