//! YuNet face detector via OpenCV's `FaceDetectorYN`.

use image::RgbImage;
use opencv::core::{Mat, Ptr, Size};
use opencv::imgproc;
use opencv::objdetect::FaceDetectorYN;
use opencv::prelude::{FaceDetectorYNTrait, MatTraitConst};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use super::detector::FaceDetector;
use super::geometry::SubjectBox;
use crate::error::{MediaError, MediaResult};

/// Minimum confidence for a face to be reported.
const SCORE_THRESHOLD: f32 = 0.6;
/// Non-maximum suppression IoU threshold.
const NMS_THRESHOLD: f32 = 0.3;
/// Maximum candidates kept before NMS.
const TOP_K: i32 = 5000;
/// Longest side of the detector input; frames are downscaled to fit.
const MAX_INPUT_SIDE: f64 = 640.0;

pub struct YuNetDetector {
    // FaceDetectorYN::detect needs &mut; frames are planned one at a time
    detector: Mutex<Ptr<FaceDetectorYN>>,
}

// SAFETY: access to the OpenCV handle is serialized by the mutex.
unsafe impl Send for YuNetDetector {}
unsafe impl Sync for YuNetDetector {}

impl YuNetDetector {
    pub fn new(model_path: &Path) -> MediaResult<Self> {
        use opencv::dnn::{DNN_BACKEND_DEFAULT, DNN_TARGET_CPU};

        let path = model_path
            .to_str()
            .ok_or_else(|| MediaError::model_not_found(model_path.display().to_string()))?;

        let detector = FaceDetectorYN::create(
            path,
            "",
            Size::new(320, 320),
            SCORE_THRESHOLD,
            NMS_THRESHOLD,
            TOP_K,
            DNN_BACKEND_DEFAULT,
            DNN_TARGET_CPU,
        )
        .map_err(|e| MediaError::detection_failed(format!("failed to create YuNet: {}", e)))?;

        Ok(Self {
            detector: Mutex::new(detector),
        })
    }

    fn input_size(width: u32, height: u32) -> (i32, i32) {
        let scale = (width.max(height) as f64 / MAX_INPUT_SIDE).max(1.0);
        let w = ((width as f64 / scale).round() as i32).max(1);
        let h = ((height as f64 / scale).round() as i32).max(1);
        (w, h)
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<SubjectBox>> {
        let (width, height) = frame.dimensions();
        let cv = |e: opencv::Error| MediaError::detection_failed(e.to_string());

        let flat = Mat::from_slice(frame.as_raw()).map_err(cv)?;
        let rgb = flat.reshape(3, height as i32).map_err(cv)?;

        let mut bgr = Mat::default();
        imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0).map_err(cv)?;

        let (in_w, in_h) = Self::input_size(width, height);
        let mut resized = Mat::default();
        imgproc::resize(&bgr, &mut resized, Size::new(in_w, in_h), 0.0, 0.0, imgproc::INTER_LINEAR).map_err(cv)?;

        let mut faces = Mat::default();
        {
            let mut detector = self
                .detector
                .lock()
                .map_err(|_| MediaError::detection_failed("detector lock poisoned"))?;
            detector.set_input_size(Size::new(in_w, in_h)).map_err(cv)?;
            detector.detect(&resized, &mut faces).map_err(cv)?;
        }

        // Rows: x, y, w, h, five landmark pairs, score
        if faces.rows() <= 0 || faces.cols() < 15 {
            return Ok(Vec::new());
        }

        let scale_x = width as f64 / in_w as f64;
        let scale_y = height as f64 / in_h as f64;
        let mut boxes = Vec::with_capacity(faces.rows() as usize);
        for row in 0..faces.rows() {
            let value = |col: i32| faces.at_2d::<f32>(row, col).map(|v| *v as f64).map_err(cv);
            let score = value(14)?;
            if score < SCORE_THRESHOLD as f64 {
                continue;
            }
            boxes.push(SubjectBox::new(
                value(0)? * scale_x,
                value(1)? * scale_y,
                value(2)? * scale_x,
                value(3)? * scale_y,
            ));
        }

        debug!(faces = boxes.len(), "YuNet detection finished");
        Ok(boxes)
    }

    fn name(&self) -> &str {
        "yunet"
    }
}
