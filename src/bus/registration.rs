use serde_json::Value;

use crate::Producer;
use crate::Transform;

/// Wiring for one channel: producer, transform and initial cached value.
///
/// ```ignore
/// bus.register_channel(
///     "user",
///     ChannelRegistration::new()
///         .on_fetch(Producer::new(|args| async move { fetch_user(args).await }))
///         .on_response_transform(Transform::new(|raw| json!({ "name": raw["full_name"] })))
///         .default_value(json!({ "name": "" })),
/// )?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistration {
    pub on_fetch: Option<Producer>,
    pub on_response_transform: Option<Transform>,
    pub default_value: Option<Value>,
}

impl ChannelRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_fetch(
        mut self,
        producer: Producer,
    ) -> Self {
        self.on_fetch = Some(producer);
        self
    }

    pub fn on_response_transform(
        mut self,
        transform: Transform,
    ) -> Self {
        self.on_response_transform = Some(transform);
        self
    }

    pub fn default_value(
        mut self,
        value: Value,
    ) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_fetch.is_none()
            && self.on_response_transform.is_none()
            && self.default_value.is_none()
    }
}
