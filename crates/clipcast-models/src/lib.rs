//! Shared data models for the clipcast pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Clips returned by the clip-listing API
//! - Upload metadata for the video-publish API
//! - Encoding configuration
//! - Cycle identifiers, states and outcomes

pub mod clip;
pub mod cycle;
pub mod encoding;
pub mod upload;

// Re-export common types
pub use clip::{Clip, ClipId};
pub use cycle::{CycleId, CycleOutcome, CycleState, TriggerKind};
pub use encoding::EncodingConfig;
pub use upload::{PrivacyStatus, UploadMetadata};
