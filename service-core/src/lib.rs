//! service-core: Shared infrastructure for the pricing services.
pub mod config;
pub mod error;
pub mod grpc;
pub mod observability;

pub use serde;
pub use tonic;
pub use tracing;
