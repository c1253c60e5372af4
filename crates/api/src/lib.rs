//! HTTP API layer for survey-audit.
//!
//! - **Endpoints**: surveys, audits, reports, evidence files
//! - **Extractors**: the authenticated caller
//! - **Middleware**: caller identity from gateway headers
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, caller_middleware};
