//! the test_utils folder here shares listeners and producers between the
//! unit test modules
mod common;
mod producers;

pub use common::*;
pub use producers::*;
