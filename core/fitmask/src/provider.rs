use image::{DynamicImage, GrayImage};

use crate::error::ProviderError;
use crate::keypoints::RawKeypoints;

/// Axis-aligned rectangle `(x1, y1, x2, y2)` in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Area of the box; degenerate boxes have zero area.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }
}

/// A person found by the detection provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    pub area: f32,
}

impl Detection {
    pub fn new(bounding_box: BoundingBox, confidence: f32) -> Self {
        Self {
            area: bounding_box.area(),
            bounding_box,
            confidence,
        }
    }
}

/// One person instance reported by the segmentation provider.
///
/// The raster may be at the model's own resolution; it is resized to the
/// input image before use.
#[derive(Debug, Clone)]
pub struct SegmentationInstance {
    pub raster: GrayImage,
    pub bounding_box: BoundingBox,
}

/// Pluggable person detector (object detection restricted to the person class).
///
/// Implement this for an ONNX, TensorRT or remote detector and hand it to
/// [`crate::FittingEngineBuilder::detector`].
pub trait PersonDetector: Send + Sync {
    /// Detect persons, in the provider's own order. May return an empty list.
    fn detect_persons(&self, image: &DynamicImage) -> Result<Vec<Detection>, ProviderError>;
}

/// Pluggable pose estimator.
pub trait PoseEstimator: Send + Sync {
    /// Keypoints of the most prominent person, or `None` when no pose is found.
    fn estimate_pose(&self, image: &DynamicImage) -> Result<Option<RawKeypoints>, ProviderError>;
}

/// Pluggable person instance segmenter.
pub trait PersonSegmenter: Send + Sync {
    /// Person instances, most confident first, or `None` when unavailable.
    fn segment_persons(
        &self,
        image: &DynamicImage,
    ) -> Result<Option<Vec<SegmentationInstance>>, ProviderError>;
}
