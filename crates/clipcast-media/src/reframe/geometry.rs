//! Geometry primitives for vertical reframing.

use serde::{Deserialize, Serialize};

use clipcast_models::encoding::{VERTICAL_HEIGHT, VERTICAL_WIDTH};

/// Aspect ratio of the subject band (width / height).
pub const SUBJECT_ASPECT: f64 = 16.0 / 9.0;
/// Fraction of the source width covered by the fallback subject box.
pub const FALLBACK_WIDTH_RATIO: f64 = 0.3;
/// Fraction of the source width covered by the center band.
pub const CENTER_WIDTH_RATIO: f64 = 0.55;
/// Fraction of the canvas height given to the subject band.
pub const SUBJECT_HEIGHT_RATIO: f64 = 0.3;

/// Subject candidate in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectBox {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl SubjectBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Right edge x-coordinate.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Intersect with the frame rectangle.
    ///
    /// Returns `None` when nothing of the box lies inside the frame or the
    /// box is degenerate.
    pub fn clamp_to_frame(&self, frame_width: u32, frame_height: u32) -> Option<SubjectBox> {
        if !(self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()) {
            return None;
        }

        let x1 = self.x.max(0.0);
        let y1 = self.y.max(0.0);
        let x2 = self.x2().min(frame_width as f64);
        let y2 = self.y2().min(frame_height as f64);

        if x2 - x1 < 1.0 || y2 - y1 < 1.0 {
            return None;
        }

        Some(SubjectBox::new(x1, y1, x2 - x1, y2 - y1))
    }
}

/// Integer crop window in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// True when the rectangle is non-empty and lies inside a `width x height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }
}

/// How the subject band was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectSource {
    /// Largest face reported by the detector.
    Detected,
    /// Deterministic centered box.
    Fallback,
}

impl SubjectSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectSource::Detected => "detected",
            SubjectSource::Fallback => "fallback",
        }
    }
}

/// The two crop windows used for every frame of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropPlan {
    /// Source frame width the plan was computed for
    pub frame_width: u32,
    /// Source frame height the plan was computed for
    pub frame_height: u32,
    /// Window tracking the subject, rendered to the top of the canvas
    pub subject_band: CropRect,
    /// Fixed center slice, rendered below the subject band
    pub center_band: CropRect,
    pub source: SubjectSource,
}

/// Output canvas split into the subject band and the center band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasLayout {
    pub width: u32,
    pub height: u32,
    /// Height of the top (subject) band; the center band takes the rest.
    pub subject_height: u32,
}

impl CanvasLayout {
    /// Layout for a `width x height` canvas with the subject band covering
    /// `subject_ratio` of the height.
    pub fn new(width: u32, height: u32, subject_ratio: f64) -> Self {
        let subject_height = ((height as f64 * subject_ratio) as u32).clamp(1, height.saturating_sub(1).max(1));
        Self {
            width,
            height,
            subject_height,
        }
    }

    /// The 1080x1920 layout: 576px subject band over a 1344px center band.
    pub fn vertical() -> Self {
        Self::new(VERTICAL_WIDTH, VERTICAL_HEIGHT, SUBJECT_HEIGHT_RATIO)
    }

    /// Height of the bottom (center) band.
    #[inline]
    pub fn center_height(&self) -> u32 {
        self.height - self.subject_height
    }
}

impl Default for CanvasLayout {
    fn default() -> Self {
        Self::vertical()
    }
}
