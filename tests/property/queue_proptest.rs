//! Property-based tests for the pending mutation queue

use journey_sync::local_db::LocalDatabase;
use journey_sync::offline::PendingMutationQueue;
use journey_sync::shared::mutation::FavoritePayload;
use journey_sync::shared::{MutationAction, MutationPayload, PendingMutation};
use proptest::prelude::*;

fn favorite(queue: &PendingMutationQueue, business_id: &str, action: MutationAction) -> PendingMutation {
    PendingMutation::new(
        queue.next_mutation_id(),
        action,
        MutationPayload::Favorite(FavoritePayload {
            user_id: "user_1".to_string(),
            business_id: business_id.to_string(),
            business_name: None,
        }),
    )
}

fn action() -> impl Strategy<Value = MutationAction> {
    prop_oneof![Just(MutationAction::Create), Just(MutationAction::Delete)]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_list_returns_insertion_order(
        entries in prop::collection::vec(("[0-9]{1,4}", action()), 0..24)
    ) {
        runtime().block_on(async {
            let queue = PendingMutationQueue::new(LocalDatabase::in_memory().await.unwrap());
            let mut enqueued = Vec::new();
            for (business_id, action) in &entries {
                let mutation = favorite(&queue, business_id, *action);
                enqueued.push(queue.enqueue(mutation).await.unwrap());
            }

            prop_assert_eq!(queue.list().await.unwrap(), enqueued);
            Ok(())
        })?;
    }

    #[test]
    fn test_remove_confirmed_keeps_the_rest_in_order(
        confirm in prop::collection::vec(any::<bool>(), 0..24)
    ) {
        runtime().block_on(async {
            let queue = PendingMutationQueue::new(LocalDatabase::in_memory().await.unwrap());
            let mut ids = Vec::new();
            for i in 0..confirm.len() {
                let mutation = favorite(&queue, &i.to_string(), MutationAction::Create);
                ids.push(queue.enqueue(mutation).await.unwrap().id);
            }

            let confirmed: Vec<String> = ids
                .iter()
                .zip(&confirm)
                .filter(|(_, c)| **c)
                .map(|(id, _)| id.clone())
                .collect();
            let expected: Vec<String> = ids
                .iter()
                .zip(&confirm)
                .filter(|(_, c)| !**c)
                .map(|(id, _)| id.clone())
                .collect();

            let removed = queue.remove_confirmed(&confirmed).await.unwrap();
            let remaining: Vec<String> = queue.list().await.unwrap().into_iter().map(|m| m.id).collect();

            prop_assert_eq!(removed, confirmed.len());
            prop_assert_eq!(remaining, expected);
            Ok(())
        })?;
    }

    #[test]
    fn test_mutation_ids_strictly_increase(count in 1usize..64) {
        let rt = runtime();
        let queue = rt.block_on(async {
            PendingMutationQueue::new(LocalDatabase::in_memory().await.unwrap())
        });
        let suffixes: Vec<u64> = (0..count)
            .map(|_| queue.next_mutation_id())
            .map(|id| id.trim_start_matches("mutation_").parse().unwrap())
            .collect();

        prop_assert!(suffixes.windows(2).all(|w| w[0] < w[1]));
    }
}
