//! Face-anchored vertical reframing.
//!
//! A clip is reframed with a single [`CropPlan`] computed from its first
//! frame:
//! - `planner` locates the subject and derives the two crop windows
//! - `compositor` streams every frame through the plan into the 1080x1920
//!   canvas and re-attaches the source audio
//! - `frames` moves raw frames through FFmpeg pipes
//!
//! Face detection is pluggable through [`FaceDetector`]; the YuNet backend is
//! only compiled with the `opencv` feature.

pub mod compositor;
pub mod detector;
pub mod frames;
pub mod geometry;
pub mod planner;

#[cfg(feature = "opencv")]
pub mod yunet;

pub use compositor::{compose_canvas, compose_frames, RenderStats, VerticalConverter, VideoCompositor};
pub use detector::{FaceDetector, SubjectLocator};
pub use frames::{FrameSink, FrameSource};
pub use geometry::{CanvasLayout, CropPlan, CropRect, SubjectBox, SubjectSource};
pub use planner::FrameReframer;
