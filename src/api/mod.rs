//! API layer
//!
//! HTTP handlers for:
//! - Application root (authentication status)
//! - Metrics (Prometheus)
//!
//! Sign-in and logout routes live in `auth`.

mod index;
pub mod metrics;

pub use index::index_router;
pub use metrics::metrics_router;
