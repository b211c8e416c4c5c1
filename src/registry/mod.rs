mod handlers;
pub use handlers::*;
