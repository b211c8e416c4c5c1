use serde_json::json;

use super::*;
use crate::test_utils::record;

#[test]
fn test_envelope_records_use_control_field_names() {
    assert_eq!(
        FetchEnvelope::loading().into_record(),
        record(json!({"loading": true, "error": false, "hasLoaded": false}))
    );
    assert_eq!(
        FetchEnvelope::success().into_record(),
        record(json!({"loading": false, "error": false, "hasLoaded": true}))
    );
    assert_eq!(
        FetchEnvelope::failure(ErrorFlag::Message("boom".into())).into_record(),
        record(json!({"loading": false, "error": "boom", "hasLoaded": true}))
    );
}

#[test]
fn test_from_record_reads_control_fields_and_ignores_payload() {
    let envelope = FetchEnvelope::from_record(&record(json!({
        "loading": false,
        "error": "boom",
        "hasLoaded": true,
        "count": 3
    })));

    assert_eq!(envelope, FetchEnvelope::failure(ErrorFlag::Message("boom".into())));
}

#[test]
fn test_from_record_defaults_missing_or_mistyped_fields() {
    let envelope = FetchEnvelope::from_record(&record(json!({"loading": "yes", "error": 3})));

    assert_eq!(envelope, FetchEnvelope::default());
    assert_eq!(envelope.phase(), FetchPhase::Idle);
}

#[test]
fn test_phase_of_records() {
    assert_eq!(FetchPhase::of(&record(json!({"count": 1}))), FetchPhase::Idle);
    assert_eq!(FetchPhase::of(&FetchEnvelope::loading().into_record()), FetchPhase::Loading);
    assert_eq!(FetchPhase::of(&FetchEnvelope::success().into_record()), FetchPhase::Success);
    assert_eq!(
        FetchPhase::of(&FetchEnvelope::failure(ErrorFlag::Flag(true)).into_record()),
        FetchPhase::Error
    );

    assert!(FetchPhase::Success.is_terminal());
    assert!(FetchPhase::Error.is_terminal());
    assert!(!FetchPhase::Loading.is_terminal());
    assert!(!FetchPhase::Idle.is_terminal());
}

#[test]
fn test_error_flag_accessors() {
    assert!(!ErrorFlag::default().is_error());
    assert!(ErrorFlag::Flag(true).is_error());
    assert!(ErrorFlag::Message("boom".into()).is_error());

    assert_eq!(ErrorFlag::Message("boom".into()).message(), Some("boom"));
    assert_eq!(ErrorFlag::Flag(true).message(), None);
}

#[test]
fn test_envelope_deserializes_from_camel_case() {
    let envelope: FetchEnvelope =
        serde_json::from_value(json!({"loading": false, "error": "late", "hasLoaded": true}))
            .unwrap();

    assert!(envelope.has_loaded);
    assert_eq!(envelope.error.message(), Some("late"));
}
