//! A channel-addressed data bus.
//!
//! One [`ChannelBus`] combines three roles behind exact-match string channels:
//! - a cache of the last known value per channel ([`ChannelStore`]),
//! - publish/subscribe notification with replay-on-subscribe
//!   ([`SubscriptionRegistry`]),
//! - orchestration of asynchronous producers that refresh a channel and expose
//!   Loading / Success / Error phases to subscribers ([`Orchestrator`]).

mod bus;
mod config;
pub mod constants;
mod errors;
mod orchestrator;
mod registry;
mod store;
mod subscription;
mod typed;

pub use bus::*;
pub use config::*;
pub use errors::*;
pub use orchestrator::*;
pub use registry::*;
pub use store::*;
pub use subscription::*;
pub use typed::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
