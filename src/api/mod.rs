//! API Module
//!
//! HTTP REST endpoints over the record store, plus the oracle callback.

pub mod handlers;
pub mod middleware;
pub mod server;
pub mod types;

// Re-export main types
pub use handlers::{create_router, AppState};
pub use server::{ApiServer, ApiServerBuilder};
pub use types::*;
