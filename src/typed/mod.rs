mod typed_channel;
pub use typed_channel::*;

#[cfg(test)]
mod typed_channel_test;
