mod fetch_state;
#[allow(clippy::module_inception)]
mod orchestrator;
pub use fetch_state::*;
pub use orchestrator::*;

#[cfg(test)]
mod fetch_state_test;
