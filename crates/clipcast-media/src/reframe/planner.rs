//! Crop planning for a single frame.

use image::RgbImage;
use tracing::{debug, warn};

use super::detector::SubjectLocator;
use super::geometry::{
    CropPlan, CropRect, SubjectBox, SubjectSource, CENTER_WIDTH_RATIO, FALLBACK_WIDTH_RATIO, SUBJECT_ASPECT,
};

/// Computes the [`CropPlan`] for a clip from one of its frames.
#[derive(Debug, Clone, Default)]
pub struct FrameReframer {
    locator: SubjectLocator,
}

impl FrameReframer {
    pub fn new(locator: SubjectLocator) -> Self {
        Self { locator }
    }

    /// Derive both crop windows for `frame`. Never fails.
    ///
    /// Detector errors and empty detections fall back to the centered box.
    pub fn compute_crop_plan(&self, frame: &RgbImage) -> CropPlan {
        let (width, height) = frame.dimensions();

        let (subject_band, source) = match self.detect_largest(frame) {
            Some(subject) => (normalize_subject(&subject, width, height), SubjectSource::Detected),
            None => (fallback_box(width, height), SubjectSource::Fallback),
        };

        let plan = CropPlan {
            frame_width: width,
            frame_height: height,
            subject_band,
            center_band: center_band(width, height),
            source,
        };
        debug!(
            source = plan.source.as_str(),
            subject = ?plan.subject_band,
            center = ?plan.center_band,
            "Computed crop plan"
        );
        plan
    }

    fn detect_largest(&self, frame: &RgbImage) -> Option<SubjectBox> {
        let SubjectLocator::Detector(detector) = &self.locator else {
            return None;
        };

        let candidates = match detector.detect(frame) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(detector = detector.name(), "Face detection failed, using fallback: {}", e);
                return None;
            }
        };

        let (width, height) = frame.dimensions();
        let mut best: Option<SubjectBox> = None;
        for candidate in candidates.iter().filter_map(|c| c.clamp_to_frame(width, height)) {
            // Strict comparison keeps the first of equal-area candidates
            if best.map_or(true, |b| candidate.area() > b.area()) {
                best = Some(candidate);
            }
        }

        if best.is_none() {
            debug!(detector = detector.name(), "No faces detected, using fallback");
        }
        best
    }
}

/// Deterministic subject box: 30% of the width, 16:9, horizontally
/// centered, top at one third of the remaining vertical space.
pub fn fallback_box(width: u32, height: u32) -> CropRect {
    let fw = ((width as f64 * FALLBACK_WIDTH_RATIO) as u32).clamp(1, width.max(1));
    let fh = ((fw as f64 / SUBJECT_ASPECT) as u32).clamp(1, height.max(1));
    let x = width.saturating_sub(fw) / 2;
    let y = height.saturating_sub(fh) / 3;
    CropRect::new(x, y, fw, fh)
}

/// Horizontally centered slice covering 55% of the width at full height.
pub fn center_band(width: u32, height: u32) -> CropRect {
    let bw = ((width as f64 * CENTER_WIDTH_RATIO) as u32).clamp(1, width.max(1));
    let x = width.saturating_sub(bw) / 2;
    CropRect::new(x, 0, bw, height)
}

/// Grow the subject box to 16:9 around its center, shrink if larger than the
/// frame, then shift it inside the frame.
pub fn normalize_subject(subject: &SubjectBox, width: u32, height: u32) -> CropRect {
    let (fw, fh) = (width as f64, height as f64);

    let (mut w, mut h) = (subject.width.max(1.0), subject.height.max(1.0));
    if w / h < SUBJECT_ASPECT {
        w = h * SUBJECT_ASPECT;
    } else {
        h = w / SUBJECT_ASPECT;
    }
    if w > fw {
        w = fw;
        h = w / SUBJECT_ASPECT;
    }
    if h > fh {
        h = fh;
        w = h * SUBJECT_ASPECT;
    }

    let bw = (w.round() as u32).clamp(1, width);
    let bh = (h.round() as u32).clamp(1, height);

    let x = (subject.cx() - bw as f64 / 2.0).round().clamp(0.0, (width - bw) as f64) as u32;
    let y = (subject.cy() - bh as f64 / 2.0).round().clamp(0.0, (height - bh) as f64) as u32;

    CropRect::new(x, y, bw, bh)
}
