//! Mutation-issuing operations against a mocked API

use crate::common::{ids, mount_snapshot, mount_unavailable, TestEnv};
use assert_matches::assert_matches;
use journey_sync::operations::{ItineraryDraft, NewReservation, NewTransaction, ShareOutcome};
use journey_sync::shared::SyncError;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn weekend_draft() -> ItineraryDraft {
    ItineraryDraft {
        title: "Austin weekend".to_string(),
        duration: 2,
        city: Some("Austin".to_string()),
        ..ItineraryDraft::default()
    }
}

#[tokio::test]
async fn test_share_deferred_until_itinerary_reaches_server() {
    let env = TestEnv::start().await;
    mount_unavailable(&env.server).await;

    let ops = env.manager.itineraries_ops();
    let saved = ops.save(weekend_draft()).await.unwrap();
    let local_id = saved.id().unwrap();
    assert_eq!(saved.get("isPublic"), Some(&json!(false)));

    let draft = ItineraryDraft {
        id: Some(local_id.clone()),
        ..weekend_draft()
    };
    assert_eq!(ops.share(draft.clone()).await.unwrap(), ShareOutcome::Deferred);

    env.server.reset().await;
    Mock::given(method("POST"))
        .and(path("/api/itineraries"))
        .and(body_partial_json(json!({"title": "Austin weekend", "duration": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "itinerary": {"id": "it-9", "title": "Austin weekend", "isPublic": false}
        })))
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/itinerary/it-9/publish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "shareCode": "K7Q2ZX"
        })))
        .expect(1)
        .mount(&env.server)
        .await;
    mount_snapshot(&env.server, 1, json!([]), json!([])).await;

    env.manager.drain().await.unwrap();
    assert_eq!(ids(&env.manager.itineraries().await.unwrap()), vec!["it-9"]);

    assert_eq!(
        ops.share(draft).await.unwrap(),
        ShareOutcome::Published {
            share_code: "K7Q2ZX".to_string()
        }
    );
}

#[tokio::test]
async fn test_cancel_of_pending_reservation_hides_it() {
    let env = TestEnv::start().await;
    mount_unavailable(&env.server).await;

    let ops = env.manager.reservations_ops();
    let reservation = ops
        .create(NewReservation {
            business_id: "42".to_string(),
            date: "2026-10-24T19:30:00Z".to_string(),
            party_size: 4,
            special_requests: Some("window table".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(env.manager.reservations().await.unwrap().len(), 1);

    let cancelled = ops.cancel(&reservation.id().unwrap()).await.unwrap();
    assert!(cancelled.is_queued());
    assert!(env.manager.reservations().await.unwrap().is_empty());
    assert_eq!(env.manager.pending_mutations_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_server_validation_rejection_is_not_queued() {
    let env = TestEnv::start().await;
    Mock::given(method("POST"))
        .and(path("/api/favorites"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Missing required fields"})),
        )
        .mount(&env.server)
        .await;

    let err = env.manager.favorites_ops().add("42", None).await.unwrap_err();

    assert_matches!(err, SyncError::Rejected { status, .. } if status.as_u16() == 400);
    assert_eq!(env.manager.pending_mutations_count().await.unwrap(), 0);
    assert!(env.manager.favorites().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_input_fails_before_any_request() {
    let env = TestEnv::start().await;

    let err = env
        .manager
        .transactions_ops()
        .add(NewTransaction::expense(f64::NAN, "food"))
        .await
        .unwrap_err();
    assert_matches!(err, SyncError::InvalidInput { .. });

    let err = env
        .manager
        .itineraries_ops()
        .save(ItineraryDraft {
            duration: 0,
            ..weekend_draft()
        })
        .await
        .unwrap_err();
    assert_matches!(err, SyncError::InvalidInput { .. });

    assert!(env.server.received_requests().await.unwrap().is_empty());
    assert_eq!(env.manager.pending_mutations_count().await.unwrap(), 0);
}
