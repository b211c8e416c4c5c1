use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::Listener;
use crate::Record;

/// Builds a record from a `json!` object literal
pub(crate) fn record(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Listener that keeps every value it was called with
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    seen: Arc<Mutex<Vec<Record>>>,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn listener(&self) -> Listener {
        let seen = self.seen.clone();
        Arc::new(move |value: &Record| seen.lock().push(value.clone()))
    }

    pub(crate) fn calls(&self) -> Vec<Record> {
        self.seen.lock().clone()
    }

    pub(crate) fn count(&self) -> usize {
        self.seen.lock().len()
    }

    pub(crate) fn last(&self) -> Option<Record> {
        self.seen.lock().last().cloned()
    }
}
