mod channel_bus;
mod registration;
pub use channel_bus::*;
pub use registration::*;
