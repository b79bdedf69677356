//! # Humanoid Library
//!
//! Shared types and utilities for the humanoid pose teleoperation pipeline.
//! Avatar pose datagrams come in over UDP, arm joints are turned into servo
//! targets, leg joints into a coarse gait intent, and both are forwarded to
//! the motor-controller board through an [`ActuationGateway`].

pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use error::*;
pub use pipeline::*;
pub use types::*;
pub use utils::*;
