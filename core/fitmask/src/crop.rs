use crate::config::FittingConfig;
use crate::keypoints::{Joint, KeypointSet};
use crate::provider::BoundingBox;
use crate::target::RegionTarget;

/// Crop region within the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    fn from_edges(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether the region lies inside a `width` × `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

/// What the pose says about the hip line, as used for crops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HipSignal {
    /// No pose data, or only the right hip: use the ratio split.
    Unknown,
    /// Left hip y coordinate.
    LeftHip(f32),
    /// Pose found but neither hip is in frame (close-up without lower body).
    NotVisible,
}

impl HipSignal {
    pub fn from_pose(pose: Option<&KeypointSet>) -> Self {
        let Some(kps) = pose else {
            return HipSignal::Unknown;
        };
        if let Some(hip) = kps.get(Joint::LeftHip) {
            HipSignal::LeftHip(hip.y)
        } else if kps.get(Joint::RightHip).is_none() {
            HipSignal::NotVisible
        } else {
            HipSignal::Unknown
        }
    }
}

/// Expand the subject box by the configured padding and clamp it to the image.
///
/// Padding is rounded outward. Returns `None` when nothing of the box is
/// left inside the image.
pub fn padded_box(
    bbox: &BoundingBox,
    image_width: u32,
    image_height: u32,
    config: &FittingConfig,
) -> Option<CropRegion> {
    let pad_x = outward(bbox.width().max(0.0) * config.horizontal_pad);
    let pad_y = outward(bbox.height().max(0.0) * config.vertical_pad);

    let (w, h) = (image_width as f32, image_height as f32);
    let left = (bbox.x1 - pad_x).floor().clamp(0.0, w) as u32;
    let top = (bbox.y1 - pad_y).floor().clamp(0.0, h) as u32;
    let right = (bbox.x2 + pad_x).ceil().clamp(0.0, w) as u32;
    let bottom = (bbox.y2 + pad_y).ceil().clamp(0.0, h) as u32;

    if right <= left || bottom <= top {
        return None;
    }
    Some(CropRegion::from_edges(left, top, right, bottom))
}

/// Round a padding amount up to whole pixels, ignoring float noise such as
/// `500.0 * 0.1 = 50.000004`.
fn outward(pad: f32) -> f32 {
    (pad - 1e-3).ceil().max(0.0)
}

/// Calculate the crop for `target` from the principal subject's box.
///
/// `upper` ends a margin below the left hip (never past the padded box) and
/// `lower` starts a margin above it (never before the padded box). Without a
/// usable hip, the padded box is split by `upper_ratio` / `lower_ratio`. When
/// the pose shows no hips at all, `upper` keeps the whole padded box.
pub fn compose_region(
    bbox: &BoundingBox,
    target: RegionTarget,
    image_width: u32,
    image_height: u32,
    hip: HipSignal,
    config: &FittingConfig,
) -> Option<CropRegion> {
    let padded = padded_box(bbox, image_width, image_height, config)?;
    let (left, right) = (padded.x, padded.right());
    let (top, bottom) = (padded.y, padded.bottom());
    let span = (bottom - top) as f32;
    let margin = config.hip_crop_margin as f32;

    let region = match target {
        RegionTarget::Full => padded,
        RegionTarget::Upper => {
            let cut = match hip {
                HipSignal::LeftHip(y) => ((y + margin).max(0.0) as u32).min(bottom),
                HipSignal::NotVisible => bottom,
                HipSignal::Unknown => top + (span * config.upper_ratio) as u32,
            };
            CropRegion::from_edges(left, top, right, cut.clamp(top + 1, bottom))
        }
        RegionTarget::Lower => {
            let cut = match hip {
                HipSignal::LeftHip(y) => ((y - margin).max(0.0) as u32).max(top),
                HipSignal::NotVisible | HipSignal::Unknown => {
                    top + (span * (1.0 - config.lower_ratio)) as u32
                }
            };
            CropRegion::from_edges(left, cut.clamp(top, bottom - 1), right, bottom)
        }
    };
    Some(region)
}
