//! Drain scenarios: replay, snapshot refresh and convergence

use crate::assert_ok;
use crate::common::{
    business_ids, catalog, ids, mount_favorite_created, mount_snapshot, mount_unavailable, TestEnv,
};
use journey_sync::offline::SkipReason;
use journey_sync::operations::NewTransaction;
use journey_sync::shared::entity::EntityKind;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_offline_favorite_converges_after_drain() {
    let env = TestEnv::start().await;
    mount_unavailable(&env.server).await;

    let record = assert_ok!(env.manager.favorites_ops().add("42", Some("Spice Route")).await);
    let local_id = record.id().unwrap();
    assert!(local_id.starts_with("local_"));
    assert_eq!(record.get_str("businessName"), Some("Spice Route"));
    assert_eq!(env.manager.pending_mutations_count().await.unwrap(), 1);
    assert_eq!(business_ids(&env.manager.favorites().await.unwrap()), vec!["42"]);

    env.server.reset().await;
    mount_favorite_created(&env.server, "f1", "42").await;
    mount_snapshot(
        &env.server,
        2,
        catalog(),
        json!([{"id": "f1", "businessId": "42"}]),
    )
    .await;

    let report = assert_ok!(env.manager.drain().await);
    assert_eq!(report.skipped, None);
    assert_eq!(report.succeeded().count(), 1);
    assert!(report.snapshot_refreshed);

    assert!(env.manager.pending_mutations().await.unwrap().is_empty());
    assert_eq!(env.manager.resolve_id(&local_id).await.as_deref(), Some("f1"));

    let favorites = env.manager.favorites().await.unwrap();
    assert_eq!(ids(&favorites), vec!["f1"]);
    assert_eq!(business_ids(&favorites), vec!["42"]);

    let snapshot = env.manager.snapshot().await.unwrap();
    assert_eq!(snapshot.version, 2);
    assert!(snapshot
        .entities(EntityKind::Favorites)
        .iter()
        .any(|f| f.get_str("businessId") == Some("42")));
    assert_eq!(env.manager.businesses().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_replays_stay_queued_in_order() {
    let env = TestEnv::start().await;
    mount_unavailable(&env.server).await;

    let favorites = env.manager.favorites_ops();
    favorites.add("1", None).await.unwrap();
    env.manager
        .transactions_ops()
        .add(NewTransaction::expense(18.5, "food"))
        .await
        .unwrap();
    favorites.add("2", None).await.unwrap();
    favorites.add("3", None).await.unwrap();

    let queued: Vec<String> = env
        .manager
        .pending_mutations()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(queued.len(), 4);

    env.server.reset().await;
    mount_favorite_created(&env.server, "f1", "1").await;
    mount_favorite_created(&env.server, "f3", "3").await;
    Mock::given(method("POST"))
        .and(path("/api/favorites"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/budget/transaction"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid amount"})))
        .mount(&env.server)
        .await;
    mount_snapshot(&env.server, 1, catalog(), json!([])).await;

    let report = env.manager.drain().await.unwrap();
    let outcomes: Vec<(String, bool, Option<u16>)> = report
        .outcomes
        .iter()
        .map(|o| (o.mutation_id.clone(), o.succeeded, o.status))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (queued[0].clone(), true, None),
            (queued[1].clone(), false, Some(400)),
            (queued[2].clone(), false, Some(500)),
            (queued[3].clone(), true, None),
        ]
    );

    let remaining: Vec<String> = env
        .manager
        .pending_mutations()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(remaining, vec![queued[1].clone(), queued[2].clone()]);

    // the still-pending transaction keeps its local record
    assert_eq!(env.manager.transactions().await.unwrap().len(), 1);

    let metrics = env.manager.metrics().await;
    assert_eq!(metrics.mutations_replayed, 2);
    assert_eq!(metrics.mutations_failed, 2);
}

#[tokio::test]
async fn test_empty_queue_drain_only_fetches_snapshot() {
    let env = TestEnv::start().await;
    mount_snapshot(&env.server, 3, catalog(), json!([])).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.server)
        .await;

    let first = env.manager.drain().await.unwrap();
    let businesses = env.manager.businesses().await.unwrap();
    let second = env.manager.drain().await.unwrap();

    assert!(first.outcomes.is_empty() && second.outcomes.is_empty());
    assert!(first.snapshot_refreshed && second.snapshot_refreshed);
    assert_eq!(env.manager.businesses().await.unwrap(), businesses);
    assert_eq!(env.manager.status().await.unwrap().snapshot_version, Some(3));

    let requests = env.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 6);
    assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
}

#[tokio::test]
async fn test_duplicate_favorite_creates_both_reach_server() {
    let env = TestEnv::start().await;
    mount_unavailable(&env.server).await;

    let ops = env.manager.favorites_ops();
    ops.add("42", None).await.unwrap();
    ops.add("42", None).await.unwrap();
    assert_eq!(env.manager.pending_mutations_count().await.unwrap(), 2);
    assert_eq!(business_ids(&env.manager.favorites().await.unwrap()), vec!["42", "42"]);

    env.server.reset().await;
    Mock::given(method("POST"))
        .and(path("/api/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "favorite": {"id": "f1", "businessId": "42"}
        })))
        .expect(2)
        .mount(&env.server)
        .await;
    mount_snapshot(&env.server, 1, catalog(), json!([{"id": "f1", "businessId": "42"}])).await;

    let report = env.manager.drain().await.unwrap();
    assert_eq!(report.succeeded().count(), 2);
    assert!(env.manager.pending_mutations().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_snapshot_fetch_failure_keeps_previous_snapshot() {
    let env = TestEnv::start().await;
    mount_snapshot(&env.server, 3, catalog(), json!([])).await;
    assert!(env.manager.drain().await.unwrap().snapshot_refreshed);

    env.server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/cache/snapshot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": 4,
            "businesses": [],
            "timestamp": "2026-10-02T12:00:00Z"
        })))
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/itineraries/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"itineraries": []})))
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/favorites/[^/]+$"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&env.server)
        .await;

    let report = env.manager.drain().await.unwrap();
    assert!(!report.snapshot_refreshed);

    let snapshot = env.manager.snapshot().await.unwrap();
    assert_eq!(snapshot.version, 3);
    assert_eq!(snapshot.entities(EntityKind::BusinessCatalog).len(), 2);
    assert_eq!(env.manager.metrics().await.snapshot_failures, 1);
}

#[tokio::test]
async fn test_older_snapshot_version_is_not_applied() {
    let env = TestEnv::start().await;
    mount_snapshot(&env.server, 5, catalog(), json!([])).await;
    env.manager.drain().await.unwrap();

    // a server falling back to version 0 with an empty catalog
    env.server.reset().await;
    mount_snapshot(&env.server, 0, json!([]), json!([])).await;

    let report = env.manager.drain().await.unwrap();
    assert!(!report.snapshot_refreshed);
    assert!(report.snapshot_stale);
    assert_eq!(env.manager.status().await.unwrap().snapshot_version, Some(5));
    assert_eq!(env.manager.businesses().await.unwrap().len(), 2);

    let metrics = env.manager.metrics().await;
    assert_eq!(metrics.stale_snapshots, 1);
    assert_eq!(metrics.snapshot_failures, 0);
}

#[tokio::test]
async fn test_offline_drain_makes_no_requests() {
    let env = TestEnv::start().await;
    mount_unavailable(&env.server).await;
    env.manager.favorites_ops().add("42", None).await.unwrap();
    env.server.reset().await;

    env.manager.monitor().set_online(false);
    let report = env.manager.drain().await.unwrap();

    assert_eq!(report.skipped, Some(SkipReason::Offline));
    assert!(env.server.received_requests().await.unwrap().is_empty());
    assert_eq!(env.manager.pending_mutations_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_drains_are_coalesced() {
    let env = TestEnv::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cache/snapshot"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"version": 1, "businesses": []}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/itineraries/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"itineraries": []})))
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/favorites/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"favorites": []})))
        .mount(&env.server)
        .await;

    let (first, second) = tokio::join!(env.manager.drain(), env.manager.drain());
    let skipped = [first.unwrap().skipped, second.unwrap().skipped];

    assert_eq!(
        skipped.iter().filter(|s| **s == Some(SkipReason::AlreadyRunning)).count(),
        1
    );
    assert_eq!(skipped.iter().filter(|s| s.is_none()).count(), 1);

    let metrics = env.manager.metrics().await;
    assert_eq!(metrics.total_drains, 1);
    assert_eq!(metrics.coalesced_drains, 1);
    assert!(!env.manager.engine().is_draining());
}

#[tokio::test]
async fn test_view_has_no_duplicates_while_drain_is_running() {
    let env = TestEnv::start().await;
    mount_unavailable(&env.server).await;

    let ops = env.manager.favorites_ops();
    ops.add("42", None).await.unwrap();
    ops.add("7", None).await.unwrap();

    env.server.reset().await;
    mount_favorite_created(&env.server, "f42", "42").await;
    Mock::given(method("POST"))
        .and(path("/api/favorites"))
        .and(body_partial_json(json!({"businessId": "7"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "success": true,
                    "favorite": {"id": "f7", "businessId": "7"}
                }))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&env.server)
        .await;
    mount_snapshot(
        &env.server,
        1,
        catalog(),
        json!([{"id": "f42", "businessId": "42"}, {"id": "f7", "businessId": "7"}]),
    )
    .await;

    let drain = {
        let manager = env.manager.clone();
        tokio::spawn(async move { manager.drain().await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mid_drain = env.manager.favorites().await.unwrap();
    assert_eq!(business_ids(&mid_drain), vec!["42", "7"]);
    assert_eq!(mid_drain[0].id().as_deref(), Some("f42"));

    let report = drain.await.unwrap().unwrap();
    assert_eq!(report.succeeded().count(), 2);
    assert_eq!(ids(&env.manager.favorites().await.unwrap()), vec!["f42", "f7"]);
}
