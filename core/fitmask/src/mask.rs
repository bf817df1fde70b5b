//! Fitting-mask synthesis.
//!
//! A fitting mask starts as the person's segmentation raster (resized to the
//! input, soft edges kept) and then has protected rows painted to zero: the
//! head always, plus the part of the body the requested target must not touch.
//! Zeroed rows are never reopened.

use image::imageops::FilterType;
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use crate::config::FittingConfig;
use crate::keypoints::{Joint, KeypointSet};
use crate::provider::{BoundingBox, SegmentationInstance};
use crate::target::RegionTarget;

/// Pixel value for rows the generator must leave unchanged.
pub const PROTECT: u8 = 0;

/// Which signal decided the head protection line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadSource {
    /// No pose data: nothing above the body is protected.
    Default,
    /// Midpoint between nose and shoulder line.
    NoseShoulder,
    /// Shoulder line raised by half the shoulder width (subject facing away).
    ShoulderWidth,
    /// Fixed fraction of the person box.
    BoundingBox,
}

/// Which signal decided the hip line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HipSource {
    /// No pose data: fixed fraction of the image height.
    Default,
    /// Average of the visible hips.
    Keypoints,
    /// Pose found without hips; the line sits at the image bottom.
    NotVisible,
}

/// Rows used to cut the mask, in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskGeometry {
    /// First row below the protected head band, in `[0, height]`.
    pub head_limit: u32,
    /// Hip line, in `[0, height]`.
    pub hip_y: u32,
    pub head_source: HeadSource,
    pub hip_source: HipSource,
}

impl MaskGeometry {
    /// Row ranges `[start, end)` painted to [`PROTECT`] for `target`, in drawing order.
    pub fn protected_rows(&self, target: RegionTarget, height: u32) -> Vec<(u32, u32)> {
        let mut rows = vec![(0, self.head_limit)];
        match target {
            RegionTarget::Full => {}
            RegionTarget::Upper => {
                if self.hip_y < height {
                    rows.push((self.hip_y, height));
                }
            }
            RegionTarget::Lower => rows.push((self.head_limit, self.hip_y)),
        }
        rows.retain(|&(start, end)| end > start);
        rows
    }
}

/// Single-channel mask: `0` = protected, anything else = editable.
#[derive(Debug, Clone, PartialEq)]
pub struct FittingMask {
    raster: GrayImage,
    geometry: MaskGeometry,
}

impl FittingMask {
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn geometry(&self) -> &MaskGeometry {
        &self.geometry
    }

    pub fn image(&self) -> &GrayImage {
        &self.raster
    }

    pub fn into_image(self) -> GrayImage {
        self.raster
    }

    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.raster.get_pixel(x, y).0[0]
    }
}

/// Compute the hip line.
///
/// With no pose the line sits at `default_hip_ratio` of the image. With a
/// pose, the visible hips are averaged and pushed down by `hip_mask_offset`;
/// a pose without hips puts the line at the image bottom so nothing below the
/// waist gets masked.
pub fn hip_line(pose: Option<&KeypointSet>, height: u32, config: &FittingConfig) -> (u32, HipSource) {
    let h = height as f32;
    let Some(kps) = pose else {
        return ((h * config.default_hip_ratio) as u32, HipSource::Default);
    };
    match kps.mean_hip_y() {
        Some(mean) => {
            let y = (mean.round() + config.hip_mask_offset as f32).clamp(0.0, h);
            (y as u32, HipSource::Keypoints)
        }
        None => (height, HipSource::NotVisible),
    }
}

/// Compute the head protection line (approximately the neck).
pub fn head_line(
    pose: Option<&KeypointSet>,
    person_box: &BoundingBox,
    height: u32,
    config: &FittingConfig,
) -> (u32, HeadSource) {
    let Some(kps) = pose else {
        return (0, HeadSource::Default);
    };

    let shoulder_y = kps.mean_shoulder_y().unwrap_or(0.0);
    let left = kps.get(Joint::LeftShoulder);
    let right = kps.get(Joint::RightShoulder);

    let (limit, source) = match (kps.get(Joint::Nose), left, right) {
        (Some(nose), _, _) if shoulder_y > 0.0 => ((nose.y + shoulder_y) / 2.0, HeadSource::NoseShoulder),
        (None, Some(l), Some(r)) if shoulder_y > 0.0 => {
            (shoulder_y - 0.5 * (l.x - r.x).abs(), HeadSource::ShoulderWidth)
        }
        _ => (
            person_box.y1 + config.head_box_ratio * person_box.height(),
            HeadSource::BoundingBox,
        ),
    };

    (limit.clamp(0.0, height as f32) as u32, source)
}

pub fn mask_geometry(
    pose: Option<&KeypointSet>,
    person_box: &BoundingBox,
    height: u32,
    config: &FittingConfig,
) -> MaskGeometry {
    let (hip_y, hip_source) = hip_line(pose, height, config);
    let (head_limit, head_source) = head_line(pose, person_box, height, config);
    MaskGeometry {
        head_limit,
        hip_y,
        head_source,
        hip_source,
    }
}

/// Resize a segmentation raster to the input size, keeping its soft gradient.
pub fn fit_raster(raster: &GrayImage, width: u32, height: u32) -> GrayImage {
    if raster.dimensions() == (width, height) {
        return raster.clone();
    }
    image::imageops::resize(raster, width, height, FilterType::Triangle)
}

/// Build the fitting mask for `target` from one person instance.
pub fn synthesize_mask(
    instance: &SegmentationInstance,
    pose: Option<&KeypointSet>,
    target: RegionTarget,
    width: u32,
    height: u32,
    config: &FittingConfig,
) -> FittingMask {
    let mut raster = fit_raster(&instance.raster, width, height);
    let geometry = mask_geometry(pose, &instance.bounding_box, height, config);
    debug!(
        region = %target,
        head_limit = geometry.head_limit,
        hip_y = geometry.hip_y,
        head_source = ?geometry.head_source,
        hip_source = ?geometry.hip_source,
        "mask geometry"
    );

    for (start, end) in geometry.protected_rows(target, height) {
        if width == 0 {
            break;
        }
        let rect = Rect::at(0, start as i32).of_size(width, end - start);
        draw_filled_rect_mut(&mut raster, rect, Luma([PROTECT]));
    }

    FittingMask { raster, geometry }
}
