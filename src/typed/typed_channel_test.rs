use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use super::*;
use crate::ChannelBus;
use crate::ChannelRegistration;
use crate::CodecError;
use crate::Error;
use crate::Producer;
use crate::Transform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Counter {
    count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    #[serde(default)]
    age: Option<u32>,
}

const COUNTER: ChannelKey<Counter> = ChannelKey::new("counter");
const PROFILE: ChannelKey<Profile> = ChannelKey::new("profile");

#[test]
fn test_read_empty_channel_is_none() {
    let bus = ChannelBus::default();

    assert_eq!(bus.typed(COUNTER).read().unwrap(), None);
}

#[test]
fn test_write_then_read_typed_value() {
    let bus = ChannelBus::default();
    let channel = bus.typed(PROFILE);

    assert!(channel
        .write(&Profile {
            name: "ada".into(),
            age: Some(36),
        })
        .unwrap());
    channel.write_partial(json!({"age": 37})).unwrap();

    assert_eq!(
        channel.read().unwrap(),
        Some(Profile {
            name: "ada".into(),
            age: Some(37),
        })
    );
    assert_eq!(channel.name(), "profile");
}

#[test]
fn test_read_mismatched_value_is_decode_error() {
    let bus = ChannelBus::default();
    bus.write("counter", json!({"count": "many"})).unwrap();

    match bus.typed(COUNTER).read() {
        Err(Error::Codec(CodecError::Decode { channel, .. })) => assert_eq!(channel, "counter"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_subscribe_decodes_and_skips_undecodable_values() {
    let bus = ChannelBus::default();
    bus.write("counter", json!({"count": 1})).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    let _subscription = bus.typed(COUNTER).subscribe(move |value| sink.lock().push(value));
    bus.write("counter", json!({"count": "bad"})).unwrap();
    bus.write("counter", json!({"count": 2})).unwrap();

    assert_eq!(*seen.lock(), vec![Counter { count: 1 }, Counter { count: 2 }]);
}

#[tokio::test]
async fn test_invoke_decodes_terminal_payload() {
    let bus = ChannelBus::default();
    bus.register_channel(
        "counter",
        ChannelRegistration::new()
            .on_fetch(Producer::from_fn(|_| Ok(json!({"id": 42}))))
            .on_response_transform(Transform::new(|raw| json!({ "count": raw["id"] }))),
    )
    .unwrap();

    let fetched = bus.typed(COUNTER).invoke(vec![]).await;

    assert!(!fetched.is_error());
    assert!(fetched.envelope.has_loaded);
    assert_eq!(fetched.data, Some(Counter { count: 42 }));
}

#[tokio::test]
async fn test_invoke_error_has_no_data() {
    let bus = ChannelBus::default();
    bus.register_producer("counter", Producer::from_fn(|_| Err("boom".into())));

    let fetched = bus.typed(COUNTER).invoke(vec![]).await;

    assert!(fetched.is_error());
    assert_eq!(fetched.envelope.error.message(), Some("boom"));
    assert_eq!(fetched.data, None);
}

#[test]
fn test_channel_key_is_copy() {
    let key = COUNTER;
    let copy = key;

    assert_eq!(key.name(), copy.name());
    assert_eq!(format!("{key:?}"), r#"ChannelKey("counter")"#);
}
