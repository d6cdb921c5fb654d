//! End-to-end engine flows against the in-memory store and mock broker.

use quemirror_broker::{MockBroker, MockRequeueTransport, ScriptedRequeue};
use quemirror_engine::{
    EngineConfig, EngineError, IngestionEngine, PublishRequest, RepublishEngine, RequeueEngine,
    RequeueRequest, RetryConfig, SyncRequest,
};
use quemirror_model::{
    DeliveryId, ExchangeId, MessageBody, MessageOrder, QueueId, QueueType, UserId,
};
use quemirror_store::{MirrorStore, StoreError};
use quemirror_testkit::{binary_delivery, json_delivery, MirrorFixture};
use std::sync::Arc;

fn fast_config() -> EngineConfig {
    EngineConfig::new().with_store_retry(
        RetryConfig::new(3).with_initial_delay(std::time::Duration::ZERO),
    )
}

fn sync_request(fixture: &MirrorFixture) -> SyncRequest {
    SyncRequest {
        user_id: fixture.owner,
        queue_id: fixture.queue_id,
    }
}

#[test]
fn drain_assigns_consecutive_orders_and_decrements_depth() {
    let fixture = MirrorFixture::with_queue_state(2, 5);
    let broker = MockBroker::new();
    broker.seed_queue(
        MirrorFixture::QUEUE_NAME,
        vec![
            json_delivery(1, serde_json::json!({"n": 1})),
            binary_delivery(2, b"raw"),
        ],
    );

    let engine = IngestionEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());
    let report = engine.sync(&sync_request(&fixture)).unwrap();
    assert_eq!(report.mirrored, 2);

    let messages = fixture.store.messages_for_queue(fixture.queue_id).unwrap();
    let orders: Vec<u64> = messages.iter().map(|m| m.message_order.as_u64()).collect();
    assert_eq!(orders, vec![6, 7]);

    let queue = fixture.queue();
    assert_eq!(queue.next_message_order, MessageOrder::new(7));
    assert_eq!(queue.ready, 0);
    assert_eq!(broker.open_connections(), 0);
    assert_eq!(broker.open_channels(), 0);
}

#[test]
fn drain_is_non_destructive_and_duplicates_on_rerun() {
    let fixture = MirrorFixture::new();
    let broker = MockBroker::new();
    broker.seed_queue(
        MirrorFixture::QUEUE_NAME,
        vec![binary_delivery(1, b"a"), binary_delivery(2, b"b")],
    );

    let engine = IngestionEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());

    engine.sync(&sync_request(&fixture)).unwrap();
    // No ack was sent, so once the channel closed the broker owns the
    // messages again.
    assert_eq!(broker.queue_len(MirrorFixture::QUEUE_NAME), 2);

    engine.sync(&sync_request(&fixture)).unwrap();

    // Re-running against an unchanged broker queue duplicates mirror
    // entries; that is the documented behavior, not a defect.
    let messages = fixture.store.messages_for_queue(fixture.queue_id).unwrap();
    assert_eq!(messages.len(), 4);
    let orders: Vec<u64> = messages.iter().map(|m| m.message_order.as_u64()).collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
}

#[test]
fn concurrent_drains_of_one_queue_never_collide_on_order() {
    let fixture = MirrorFixture::new();
    let broker = MockBroker::new();
    broker.seed_queue(
        MirrorFixture::QUEUE_NAME,
        (0..100).map(|n| binary_delivery(n, &[n as u8])).collect(),
    );

    let engine = Arc::new(IngestionEngine::new(
        Arc::clone(&fixture.store),
        broker.clone(),
        fast_config(),
    ));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let request = sync_request(&fixture);
            std::thread::spawn(move || engine.sync(&request).unwrap().mirrored)
        })
        .collect();

    // A thread that drains to empty first closes its channel, handing
    // its unacked messages back; the other thread may mirror them again.
    // The total therefore is at least the seeded count, and the orders
    // must still be unique and gapless.
    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(total >= 100);

    let messages = fixture.store.messages_for_queue(fixture.queue_id).unwrap();
    let mut orders: Vec<u64> = messages.iter().map(|m| m.message_order.as_u64()).collect();
    assert_eq!(orders.len() as u64, total);
    orders.sort_unstable();
    assert_eq!(orders, (1..=total).collect::<Vec<u64>>());
}

#[test]
fn unlisted_caller_never_reaches_the_broker() {
    let fixture = MirrorFixture::new();
    let broker = MockBroker::new();
    let engine = IngestionEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());

    let err = engine
        .sync(&SyncRequest {
            user_id: UserId::new(),
            queue_id: fixture.queue_id,
        })
        .unwrap_err();

    assert!(matches!(err, EngineError::AccessDenied { .. }));
    assert_eq!(broker.connect_attempts(), 0);
}

#[test]
fn unknown_queue_is_rejected_before_broker_io() {
    let fixture = MirrorFixture::new();
    let broker = MockBroker::new();
    let engine = IngestionEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());

    let err = engine
        .sync(&SyncRequest {
            user_id: fixture.owner,
            queue_id: QueueId::new(),
        })
        .unwrap_err();

    assert!(matches!(err, EngineError::QueueNotFound(_)));
    assert_eq!(broker.connect_attempts(), 0);
}

#[test]
fn fetch_fault_aborts_drain_but_keeps_prior_commits() {
    let fixture = MirrorFixture::with_queue_state(3, 0);
    let broker = MockBroker::new();
    broker.seed_queue(
        MirrorFixture::QUEUE_NAME,
        vec![
            binary_delivery(1, b"a"),
            binary_delivery(2, b"b"),
            binary_delivery(3, b"c"),
        ],
    );
    broker.fail_fetch_after(2);

    let engine = IngestionEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());
    let err = engine.sync(&sync_request(&fixture)).unwrap_err();
    assert!(matches!(err, EngineError::Broker(_)));

    let messages = fixture.store.messages_for_queue(fixture.queue_id).unwrap();
    assert_eq!(messages.len(), 2);
    // The error path released the connection and channel too.
    assert_eq!(broker.open_connections(), 0);
    assert_eq!(broker.open_channels(), 0);
}

#[test]
fn transient_commit_fault_retries_the_transaction_not_the_fetch() {
    let fixture = MirrorFixture::with_queue_state(1, 0);
    let broker = MockBroker::new();
    broker.seed_queue(MirrorFixture::QUEUE_NAME, vec![binary_delivery(1, b"a")]);
    fixture
        .store
        .inject_commit_failure(StoreError::backend_retryable("lease expired"));

    let engine = IngestionEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());
    let report = engine.sync(&sync_request(&fixture)).unwrap();
    assert_eq!(report.mirrored, 1);

    // One fetch for the message, one returning None; a naive retry of
    // the whole per-message step would have fetched a third time.
    assert_eq!(broker.fetch_calls(), 2);
}

#[test]
fn exhausted_commit_retries_fail_the_run() {
    let fixture = MirrorFixture::with_queue_state(1, 0);
    let broker = MockBroker::new();
    broker.seed_queue(MirrorFixture::QUEUE_NAME, vec![binary_delivery(1, b"a")]);
    fixture
        .store
        .inject_commit_failure(StoreError::backend_fatal("page corrupt"));

    let engine = IngestionEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());
    let err = engine.sync(&sync_request(&fixture)).unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert!(fixture
        .store
        .messages_for_queue(fixture.queue_id)
        .unwrap()
        .is_empty());
    assert_eq!(broker.open_connections(), 0);
}

#[test]
fn requeue_passes_batch_parameters_through() {
    let transport = Arc::new(MockRequeueTransport::new());
    let engine = RequeueEngine::new(Arc::clone(&transport));

    let outcome = engine
        .requeue(&RequeueRequest {
            delivery_ids: vec![DeliveryId::new(10), DeliveryId::new(11)],
            queue_type: QueueType::DeadLetter,
            delay_seconds: 30,
            redelivery_count: 2,
            transactional: false,
        })
        .unwrap();

    assert_eq!(outcome.succeeded, 2);
    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].queue_type, QueueType::DeadLetter);
    assert_eq!(calls[0].delay_seconds, 30);
    assert_eq!(calls[0].redelivery_count, 2);
}

#[test]
fn transactional_requeue_is_all_or_nothing() {
    let transport = Arc::new(MockRequeueTransport::new());
    transport.script(DeliveryId::new(2), ScriptedRequeue::Fail("socket closed".into()));
    let engine = RequeueEngine::new(Arc::clone(&transport));

    let err = engine
        .requeue(&RequeueRequest {
            delivery_ids: vec![DeliveryId::new(1), DeliveryId::new(2), DeliveryId::new(3)],
            queue_type: QueueType::Error,
            delay_seconds: 0,
            redelivery_count: 0,
            transactional: true,
        })
        .unwrap_err();

    assert!(matches!(err, EngineError::Broker(_)));
    assert!(transport.committed().is_empty());
}

#[test]
fn republish_preserves_original_relative_order() {
    let fixture = MirrorFixture::new();
    let broker = MockBroker::new();

    // Request ids out of order; the engine must publish by order.
    let id3 = fixture.insert_mirrored(3, MessageBody::Document(serde_json::json!({"n": 3})));
    let id1 = fixture.insert_mirrored(1, MessageBody::Document(serde_json::json!({"n": 1})));
    let id2 = fixture.insert_mirrored(2, MessageBody::Document(serde_json::json!({"n": 2})));

    let engine = RepublishEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());
    let report = engine
        .publish(&PublishRequest {
            user_id: fixture.owner,
            exchange_id: fixture.exchange_id,
            message_ids: vec![id3, id1, id2],
        })
        .unwrap();

    assert_eq!(report.published, 3);
    let bodies: Vec<Vec<u8>> = broker.published().into_iter().map(|p| p.body).collect();
    assert_eq!(
        bodies,
        vec![
            br#"{"n":1}"#.to_vec(),
            br#"{"n":2}"#.to_vec(),
            br#"{"n":3}"#.to_vec(),
        ]
    );
    assert!(broker
        .published()
        .iter()
        .all(|p| p.exchange == MirrorFixture::EXCHANGE_NAME));

    // Every published message was stamped deleted but stays readable.
    for id in [id1, id2, id3] {
        let message = fixture.store.message(id).unwrap().unwrap();
        assert!(!message.is_active());
    }
}

#[test]
fn republished_messages_leave_the_candidate_set() {
    let fixture = MirrorFixture::new();
    let broker = MockBroker::new();
    let id = fixture.insert_mirrored(1, MessageBody::Binary(b"once".to_vec()));

    let engine = RepublishEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());
    let request = PublishRequest {
        user_id: fixture.owner,
        exchange_id: fixture.exchange_id,
        message_ids: vec![id],
    };

    assert_eq!(engine.publish(&request).unwrap().published, 1);
    // Soft-deleted now: the second run finds no active candidate.
    assert_eq!(engine.publish(&request).unwrap().published, 0);
    assert_eq!(broker.published().len(), 1);
}

#[test]
fn crash_window_leaves_published_message_active() {
    let fixture = MirrorFixture::new();
    let broker = MockBroker::new();
    let id = fixture.insert_mirrored(1, MessageBody::Binary(b"dup".to_vec()));
    fixture
        .store
        .inject_soft_delete_failure(StoreError::backend_fatal("process died"));

    let engine = RepublishEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());
    let err = engine
        .publish(&PublishRequest {
            user_id: fixture.owner,
            exchange_id: fixture.exchange_id,
            message_ids: vec![id],
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));

    // The publish went out, the soft-delete did not: the message is
    // delivered on the broker and still active in the mirror. This is
    // the documented at-least-once window.
    assert_eq!(broker.published().len(), 1);
    assert!(fixture.store.message(id).unwrap().unwrap().is_active());
    assert_eq!(broker.open_connections(), 0);
}

#[test]
fn unsupported_body_aborts_the_remaining_batch() {
    let fixture = MirrorFixture::new();
    let broker = MockBroker::new();
    let id1 = fixture.insert_mirrored(1, MessageBody::Document(serde_json::json!({"ok": true})));
    let id2 = fixture.insert_mirrored(2, MessageBody::Other(serde_json::json!(42)));
    let id3 = fixture.insert_mirrored(3, MessageBody::Binary(b"never sent".to_vec()));

    let engine = RepublishEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());
    let err = engine
        .publish(&PublishRequest {
            user_id: fixture.owner,
            exchange_id: fixture.exchange_id,
            message_ids: vec![id1, id2, id3],
        })
        .unwrap_err();

    assert!(matches!(err, EngineError::UnsupportedBody { .. }));
    assert_eq!(broker.published().len(), 1);
    assert!(!fixture.store.message(id1).unwrap().unwrap().is_active());
    assert!(fixture.store.message(id2).unwrap().unwrap().is_active());
    assert!(fixture.store.message(id3).unwrap().unwrap().is_active());
}

#[test]
fn unknown_exchange_is_rejected_before_broker_io() {
    let fixture = MirrorFixture::new();
    let broker = MockBroker::new();
    let engine = RepublishEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());

    let err = engine
        .publish(&PublishRequest {
            user_id: fixture.owner,
            exchange_id: ExchangeId::new(),
            message_ids: vec![],
        })
        .unwrap_err();

    assert!(matches!(err, EngineError::ExchangeNotFound(_)));
    assert_eq!(broker.connect_attempts(), 0);
}

#[test]
fn non_owner_cannot_republish_and_cannot_probe() {
    let fixture = MirrorFixture::new();
    let broker = MockBroker::new();
    let engine = RepublishEngine::new(Arc::clone(&fixture.store), broker.clone(), fast_config());

    let err = engine
        .publish(&PublishRequest {
            user_id: UserId::new(),
            exchange_id: fixture.exchange_id,
            message_ids: vec![],
        })
        .unwrap_err();

    // Reported as missing, not forbidden, so existence cannot be probed.
    assert!(matches!(err, EngineError::BrokerNotFound(_)));
    assert_eq!(broker.connect_attempts(), 0);
}
