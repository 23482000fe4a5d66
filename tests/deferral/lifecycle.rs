use futures_util::FutureExt;
use serde_json::json;

use deferrals::{DeferralConfigPatch, DeferralErrorKind, DeferralRegistry};

#[tokio::test]
async fn created_deferral_is_listed_until_resolved() {
    let registry = DeferralRegistry::<serde_json::Value>::new();

    let job = registry.create("job-1", false);
    assert_eq!(registry.list(), vec!["job-1"]);

    assert!(registry.resolve("job-1", json!(42)));
    assert_eq!(job.await, Ok(Some(json!(42))));
    assert!(registry.list().is_empty());
}

#[tokio::test]
async fn implicit_wait_is_rejected_with_reason() {
    let registry = DeferralRegistry::<serde_json::Value>::new();
    registry.set_config(DeferralConfigPatch {
        wait_for_undefined: Some(true),
        ..Default::default()
    });

    let job = registry.wait_for("job-2");
    assert!(job.try_outcome().is_none(), "implicit deferral should be pending");
    assert_eq!(registry.list(), vec!["job-2"]);

    assert!(registry.reject("job-2", "timeout"));
    let err = job.await.expect_err("rejected deferral should fail");
    assert_eq!(err.kind, DeferralErrorKind::Rejected);
    assert_eq!(err.message, "timeout");
    assert!(registry.list().is_empty());
}

#[test]
fn missing_key_resolves_immediately_by_default() {
    let registry = DeferralRegistry::<serde_json::Value>::new();

    let job = registry.wait_for("job-3");
    assert_eq!(job.now_or_never(), Some(Ok(None)));
    assert!(registry.list().is_empty(), "no entry should be created");
}

#[test]
fn settling_a_missing_key_is_a_noop() {
    let registry = DeferralRegistry::<u32>::new();
    let _pending = registry.make("other");

    assert!(!registry.resolve("absent", 1u32));
    assert!(!registry.reject("absent", "nope"));
    assert_eq!(registry.list(), vec!["other"]);
}

#[tokio::test]
async fn second_settlement_is_ignored() {
    let registry = DeferralRegistry::<u32>::new();
    let job = registry.make("job-4");

    assert!(registry.resolve("job-4", 1u32));
    assert!(!registry.resolve("job-4", 2u32));
    assert!(!registry.reject("job-4", "late"));

    assert_eq!(job.await, Ok(Some(1)));
}

#[tokio::test]
async fn key_can_be_recreated_after_settlement() {
    let registry = DeferralRegistry::<u32>::new();
    let first = registry.make("job-5");
    registry.resolve("job-5", 1u32);

    let second = registry.make("job-5");
    assert_eq!(registry.list(), vec!["job-5"]);
    assert!(second.try_outcome().is_none());

    registry.resolve("job-5", 2u32);
    assert_eq!(first.await, Ok(Some(1)));
    assert_eq!(second.await, Ok(Some(2)));
}

#[tokio::test]
async fn resolve_without_value_settles_empty() {
    let registry = DeferralRegistry::<u32>::new();
    let job = registry.make("job-6");

    assert!(registry.resolve("job-6", None::<u32>));
    assert_eq!(job.await, Ok(None));
}

#[tokio::test]
async fn clear_abandons_pending_holders() {
    let registry = DeferralRegistry::<u32>::new();
    let a = registry.make("a");
    let b = registry.make("b");

    assert_eq!(registry.clear(), 2);
    assert!(registry.is_empty());

    let err = a.await.expect_err("cleared deferral should fail");
    assert_eq!(err.kind, DeferralErrorKind::Abandoned);
    assert!(b.await.is_err());
}

#[test]
fn list_is_a_snapshot() {
    let registry = DeferralRegistry::<u32>::new();
    let _a = registry.make("a");

    let listed = registry.list();
    let _b = registry.make("b");
    registry.resolve("a", 1u32);

    assert_eq!(listed, vec!["a"]);
    assert_eq!(registry.list(), vec!["b"]);
}
