//! Connectivity monitoring and the background sync service

use crate::common::{mount_favorite_created, mount_snapshot, mount_unavailable, TestEnv};
use journey_sync::sync::{SyncService, Transition};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_health(env: &TestEnv, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(response)
        .mount(&env.server)
        .await;
}

#[tokio::test]
async fn test_slow_health_probe_counts_as_offline() {
    let env = TestEnv::start().await;
    mount_health(
        &env,
        ResponseTemplate::new(200)
            .set_body_json(json!({"status": "ok"}))
            .set_delay(Duration::from_secs(1)),
    )
    .await;

    let monitor = env.manager.monitor();
    assert_eq!(monitor.probe().await, Transition::WentOffline);
    assert!(!env.manager.is_online());
    assert!(monitor.state().last_checked_at.is_some());

    env.server.reset().await;
    mount_health(&env, ResponseTemplate::new(200).set_body_json(json!({"status": "ok"}))).await;
    assert_eq!(monitor.probe().await, Transition::CameOnline);
    assert_eq!(monitor.probe().await, Transition::None);
}

#[tokio::test]
async fn test_service_drains_when_connectivity_returns() {
    let env = TestEnv::start().await;
    mount_unavailable(&env.server).await;
    env.manager.favorites_ops().add("42", None).await.unwrap();
    env.manager.monitor().set_online(false);

    env.server.reset().await;
    mount_health(&env, ResponseTemplate::new(200).set_body_json(json!({"status": "ok"}))).await;
    mount_favorite_created(&env.server, "f1", "42").await;
    mount_snapshot(&env.server, 1, json!([]), json!([{"id": "f1", "businessId": "42"}])).await;

    let mut service = SyncService::new(env.manager.clone());
    service.start();

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let status = service.status().await.unwrap();
            if status.pending_mutations == 0 && status.snapshot_version.is_some() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("no drain after connectivity returned");

    assert!(drained.is_online);
    assert_eq!(service.metrics().await.mutations_replayed, 1);
    service.stop();
}

#[tokio::test]
async fn test_force_sync_reports_outcomes() {
    let env = TestEnv::start().await;
    mount_unavailable(&env.server).await;
    env.manager.favorites_ops().add("42", None).await.unwrap();

    env.server.reset().await;
    mount_favorite_created(&env.server, "f1", "42").await;
    mount_snapshot(&env.server, 1, json!([]), json!([])).await;

    let service = SyncService::new(env.manager.clone());
    let report = service.force_sync().await.unwrap();

    assert_eq!(report.succeeded().count(), 1);
    assert!(service.status().await.unwrap().last_sync_time.is_some());
}
