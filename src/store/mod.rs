pub mod canonical;
mod channel_store;
mod record;
pub use channel_store::*;
pub use record::*;
