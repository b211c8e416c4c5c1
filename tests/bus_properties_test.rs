//! End-to-end behaviour of a `ChannelBus` through its public API.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use channel_bus::ChannelBus;
use channel_bus::ChannelRegistration;
use channel_bus::Producer;
use channel_bus::ProducerError;
use channel_bus::Record;
use channel_bus::Transform;
use parking_lot::Mutex;
use serde_json::json;
use serde_json::Value;

fn record(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Subscribes a listener that collects every notification
fn collect(
    bus: &ChannelBus,
    channel: &str,
) -> (Arc<Mutex<Vec<Record>>>, channel_bus::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = bus.subscribe(channel, move |value| sink.lock().push(value.clone()));
    (seen, subscription)
}

#[test]
fn test_repeated_write_notifies_once() {
    let bus = ChannelBus::default();
    let (seen, _subscription) = collect(&bus, "X");

    for value in [json!({"count": 1}), json!({"name": "ada", "tags": ["a", "b"]})] {
        seen.lock().clear();
        bus.write("X", value.clone()).unwrap();
        bus.write("X", value).unwrap();
        assert_eq!(seen.lock().len(), 1);
    }
}

#[test]
fn test_subscribe_replays_before_returning() {
    let bus = ChannelBus::default();
    bus.write("X", json!({"count": 1})).unwrap();

    let (seen, _subscription) = collect(&bus, "X");

    assert_eq!(*seen.lock(), vec![record(json!({"count": 1}))]);
}

#[tokio::test]
async fn test_orchestration_success() {
    let bus = ChannelBus::default();
    bus.register_channel(
        "Y",
        ChannelRegistration::new()
            .on_fetch(Producer::new(|_| async {
                tokio::task::yield_now().await;
                Ok::<_, ProducerError>(json!({"id": 42}))
            }))
            .on_response_transform(Transform::new(|raw| json!({ "count": raw["id"] }))),
    )
    .unwrap();
    let (seen, _subscription) = collect(&bus, "Y");

    let terminal = bus.invoke("Y", vec![]).await;

    let expected = record(json!({"loading": false, "error": false, "hasLoaded": true, "count": 42}));
    assert_eq!(terminal, expected);
    assert_eq!(
        *seen.lock(),
        vec![
            record(json!({"loading": true, "error": false, "hasLoaded": false})),
            expected
        ]
    );
}

#[tokio::test]
async fn test_orchestration_error_resolves() {
    let bus = ChannelBus::default();
    bus.register_producer(
        "Z",
        Producer::new(|_| async { Err::<Value, ProducerError>("boom".into()) }),
    );

    let terminal = bus.invoke("Z", vec![]).await;

    assert_eq!(
        terminal,
        record(json!({"loading": false, "error": "boom", "hasLoaded": true}))
    );
}

#[tokio::test]
async fn test_test_mode_bypass() {
    let bus = ChannelBus::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    bus.register_producer(
        "W",
        Producer::from_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"count": 99}))
        }),
    );
    bus.write("W", json!({"count": 5})).unwrap();
    bus.set_test_mode(true);
    let (seen, _subscription) = collect(&bus, "W");

    let terminal = bus.invoke("W", vec![]).await;

    assert_eq!(terminal, record(json!({"count": 5})));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    // Only the replay, no Loading notification
    assert_eq!(*seen.lock(), vec![record(json!({"count": 5}))]);
}

#[test]
fn test_unsubscribe_stops_only_that_listener() {
    let bus = ChannelBus::default();
    let (removed, subscription) = collect(&bus, "X");
    let (kept, _kept_subscription) = collect(&bus, "X");

    bus.write("X", json!({"v": 1})).unwrap();
    assert!(subscription.unsubscribe());
    bus.write("X", json!({"v": 2})).unwrap();
    bus.write("X", json!({"v": 3})).unwrap();

    assert_eq!(removed.lock().len(), 1);
    assert_eq!(kept.lock().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bus_is_shared_across_tasks() {
    let bus = ChannelBus::default();
    let (seen, _subscription) = collect(&bus, "X");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let bus = bus.clone();
            tokio::spawn(async move {
                let mut partial = Record::new();
                partial.insert(format!("k{i}"), json!(i));
                bus.write("X", Value::Object(partial)).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(bus.read("X").len(), 8);
    assert_eq!(seen.lock().len(), 8);
}
