use messenger::Messenger;

use proptest::prelude::*;

fn registry_size_after(subscribed: usize, unsubscribed: usize, capacity: usize, drop_on_full: bool) -> usize {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let messenger: Messenger<u32> = Messenger::new(capacity, drop_on_full);
        let mut endpoints = Vec::new();
        for _ in 0..subscribed {
            endpoints.push(messenger.subscribe().await.unwrap());
        }
        for endpoint in endpoints.drain(..unsubscribed) {
            messenger.unsubscribe(endpoint).await;
        }
        let size = messenger.size().await;
        messenger.shutdown().await;
        size
    })
}

// =========================================================================
// Property-Based Tests - Registry Size
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn given_subscriptions_when_some_unsubscribe_then_size_is_remainder(
        (subscribed, unsubscribed) in (0usize..16).prop_flat_map(|n| (Just(n), 0..=n)),
        capacity in 0usize..4,
        drop_on_full in any::<bool>(),
    ) {
        let size = registry_size_after(subscribed, unsubscribed, capacity, drop_on_full);
        prop_assert_eq!(size, subscribed - unsubscribed);
    }

    #[test]
    fn given_drop_policy_when_overflowing_then_queue_never_exceeds_capacity(
        capacity in 1usize..8,
        sent in 0usize..32,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let lengths = rt.block_on(async {
            let messenger: Messenger<usize> = Messenger::new(capacity, true);
            let _endpoint = messenger.subscribe().await.unwrap();
            for i in 0..sent {
                messenger.broadcast(i).await;
            }
            messenger.queue_lengths().await
        });
        prop_assert_eq!(lengths, vec![sent.min(capacity)]);
    }
}
