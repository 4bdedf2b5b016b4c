//! HTTP API over the recorded archive.
//!
//! Read-only enumeration of day folders and segment files, a storage quota
//! report, recursive day deletion, and raw segment downloads. Deliberately
//! unauthenticated; deployments front this with their own access control.

pub mod routes;
pub mod types;
pub mod web_server;

pub use types::{ApiError, ResourceResponse};
pub use web_server::WebServer;
