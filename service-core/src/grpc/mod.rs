//! gRPC status mapping shared by the pricing services.

pub mod error;

pub use error::IntoStatus;

// Re-export commonly used tonic types
pub use tonic::{Code, Status};
