//! Kronos Common Library
//!
//! Capability knowledge base and pure decision logic shared by the Kronos
//! verification harness: the model -> capability registry, device-aware
//! timeout scaling, and capability-driven test-matrix generation. Nothing in
//! this crate touches a browser or the network.

pub mod capability;
pub mod error;
pub mod matrix;
pub mod timeout;

// Re-export commonly used types
pub use capability::{CapabilityRecord, CapabilityRegistry, PerformanceBaseline, Series};
pub use error::{Error, Result};
pub use matrix::{generate_output_matrix, generate_ptp_matrix, TestUnit};
pub use timeout::TimeoutScaler;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
