//! Subject detection strategy.

use image::RgbImage;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::geometry::SubjectBox;
use crate::error::MediaResult;

/// A face detector operating on a single decoded frame.
pub trait FaceDetector: Send + Sync {
    /// Candidate boxes in frame pixel coordinates, in detector order.
    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<SubjectBox>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// How subjects are located. Resolved once at startup.
#[derive(Clone, Default)]
pub enum SubjectLocator {
    /// A detector is available; its failures fall back per frame.
    Detector(Arc<dyn FaceDetector>),
    /// No detector; always use the centered box.
    #[default]
    Fallback,
}

impl SubjectLocator {
    pub fn with_detector(detector: impl FaceDetector + 'static) -> Self {
        SubjectLocator::Detector(Arc::new(detector))
    }

    /// Resolve the strategy from an optional model file.
    ///
    /// Without the `opencv` feature, or when the model cannot be loaded, the
    /// fallback strategy is selected.
    pub fn from_model_path(model_path: Option<&Path>) -> Self {
        let Some(path) = model_path else {
            info!("No face model configured, using centered fallback box");
            return SubjectLocator::Fallback;
        };

        if !path.exists() {
            warn!(path = %path.display(), "Face model not found, using centered fallback box");
            return SubjectLocator::Fallback;
        }

        Self::load_model(path)
    }

    #[cfg(feature = "opencv")]
    fn load_model(path: &Path) -> Self {
        match super::yunet::YuNetDetector::new(path) {
            Ok(detector) => {
                info!(path = %path.display(), "YuNet face detector loaded");
                SubjectLocator::with_detector(detector)
            }
            Err(e) => {
                warn!(path = %path.display(), "Failed to load YuNet ({}), using centered fallback box", e);
                SubjectLocator::Fallback
            }
        }
    }

    #[cfg(not(feature = "opencv"))]
    fn load_model(path: &Path) -> Self {
        warn!(
            path = %path.display(),
            "Built without the opencv feature, ignoring face model and using centered fallback box"
        );
        SubjectLocator::Fallback
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SubjectLocator::Fallback)
    }

    pub fn name(&self) -> &str {
        match self {
            SubjectLocator::Detector(d) => d.name(),
            SubjectLocator::Fallback => "fallback",
        }
    }
}

impl fmt::Debug for SubjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubjectLocator").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_model_is_fallback() {
        assert!(SubjectLocator::from_model_path(None).is_fallback());
        assert!(SubjectLocator::from_model_path(Some(Path::new("/nope/yunet.onnx"))).is_fallback());
    }

    #[test]
    fn test_debug_names_strategy() {
        assert_eq!(format!("{:?}", SubjectLocator::Fallback), "SubjectLocator(\"fallback\")");
    }
}
