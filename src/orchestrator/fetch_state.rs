use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::constants::ERROR_FIELD;
use crate::constants::HAS_LOADED_FIELD;
use crate::constants::LOADING_FIELD;
use crate::Record;

/// Content of the `error` control field
///
/// `false` when the last invocation succeeded (or none ran), otherwise the
/// failure message, or `true` when no message is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorFlag {
    Flag(bool),
    Message(String),
}

impl Default for ErrorFlag {
    fn default() -> Self {
        ErrorFlag::Flag(false)
    }
}

impl ErrorFlag {
    pub fn is_error(&self) -> bool {
        match self {
            ErrorFlag::Flag(flag) => *flag,
            ErrorFlag::Message(_) => true,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ErrorFlag::Message(message) => Some(message),
            ErrorFlag::Flag(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            ErrorFlag::Flag(flag) => Value::Bool(*flag),
            ErrorFlag::Message(message) => Value::String(message.clone()),
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Bool(flag)) => ErrorFlag::Flag(*flag),
            Some(Value::String(message)) => ErrorFlag::Message(message.clone()),
            _ => ErrorFlag::default(),
        }
    }
}

/// Control fields written into a channel during an invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FetchEnvelope {
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub error: ErrorFlag,
    #[serde(default)]
    pub has_loaded: bool,
}

impl FetchEnvelope {
    /// `{loading: true, error: false, hasLoaded: false}`
    pub fn loading() -> Self {
        Self {
            loading: true,
            error: ErrorFlag::Flag(false),
            has_loaded: false,
        }
    }

    /// `{loading: false, error: false, hasLoaded: true}`
    pub fn success() -> Self {
        Self {
            loading: false,
            error: ErrorFlag::Flag(false),
            has_loaded: true,
        }
    }

    /// `{loading: false, error: <flag>, hasLoaded: true}`
    pub fn failure(error: ErrorFlag) -> Self {
        Self {
            loading: false,
            error,
            has_loaded: true,
        }
    }

    /// Reads the control fields of `record`; missing or mistyped fields take
    /// their default.
    pub fn from_record(record: &Record) -> Self {
        Self {
            loading: record.get(LOADING_FIELD).and_then(Value::as_bool).unwrap_or(false),
            error: ErrorFlag::from_value(record.get(ERROR_FIELD)),
            has_loaded: record.get(HAS_LOADED_FIELD).and_then(Value::as_bool).unwrap_or(false),
        }
    }

    pub fn into_record(self) -> Record {
        let mut record = Record::new();
        record.insert(LOADING_FIELD.to_string(), Value::Bool(self.loading));
        record.insert(ERROR_FIELD.to_string(), self.error.to_value());
        record.insert(HAS_LOADED_FIELD.to_string(), Value::Bool(self.has_loaded));
        record
    }

    pub fn phase(&self) -> FetchPhase {
        if self.loading {
            FetchPhase::Loading
        } else if self.has_loaded && self.error.is_error() {
            FetchPhase::Error
        } else if self.has_loaded {
            FetchPhase::Success
        } else {
            FetchPhase::Idle
        }
    }
}

/// Lifecycle phase of a channel, as observable from its record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Loading,
    Success,
    Error,
}

impl FetchPhase {
    pub fn of(record: &Record) -> Self {
        FetchEnvelope::from_record(record).phase()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchPhase::Success | FetchPhase::Error)
    }
}
