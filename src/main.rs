use std::time::Duration;

use channel_bus::BusConfig;
use channel_bus::ChannelBus;
use channel_bus::ChannelRegistration;
use channel_bus::Error;
use channel_bus::FetchPhase;
use channel_bus::Producer;
use channel_bus::ProducerError;
use channel_bus::Result;
use channel_bus::Transform;
use serde_json::json;
use serde_json::Value;
use tracing::info;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

const PROFILE_CHANNEL: &str = "profile";

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    init_observability()?;

    let settings = BusConfig::new()?.validate()?;
    let bus = ChannelBus::new(settings);

    bus.register_channel(
        PROFILE_CHANNEL,
        ChannelRegistration::new()
            .on_fetch(Producer::new(|args: Vec<Value>| async move {
                // Simulated remote lookup
                tokio::time::sleep(Duration::from_millis(150)).await;
                let id = args.first().cloned().unwrap_or(json!(1));
                Ok::<_, ProducerError>(json!({ "id": id, "full_name": "Ada Lovelace" }))
            }))
            .on_response_transform(Transform::new(|raw| {
                json!({ "userId": raw["id"], "name": raw["full_name"] })
            }))
            .default_value(json!({ "name": "" })),
    )?;

    let _subscription = bus.subscribe(PROFILE_CHANNEL, |value| match FetchPhase::of(value) {
        FetchPhase::Loading => info!("profile loading"),
        FetchPhase::Error => warn!(error = ?value.get("error"), "profile failed"),
        phase => info!(?phase, ?value, "profile updated"),
    });

    let terminal = bus.invoke(PROFILE_CHANNEL, vec![json!(7)]).await;
    info!(?terminal, "Invocation settled");

    bus.set_test_mode(true);
    let cached = bus.invoke(PROFILE_CHANNEL, vec![json!(8)]).await;
    info!(?cached, "Test mode invocation served from cache");

    println!("Exiting program.");
    Ok(())
}

fn init_observability() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let base_subscriber = tracing_subscriber::fmt::layer().with_filter(filter);
    tracing_subscriber::registry()
        .with(base_subscriber)
        .try_init()
        .map_err(|e| Error::Fatal(format!("Failed to initialize tracing: {}", e)))
}
