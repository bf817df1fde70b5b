//! Fashion-region detection and fitting-mask synthesis.
//!
//! Given a photo of a person, [`FittingEngine`] finds the principal subject,
//! crops the `full`, `upper` or `lower` garment region, and synthesizes the
//! binary fitting mask a garment-swap generator uses to decide which pixels it
//! may change. Detection, pose and segmentation models are external
//! collaborators plugged in through the [`PersonDetector`], [`PoseEstimator`]
//! and [`PersonSegmenter`] traits.
//!
//! # Example
//!
//! ```no_run
//! use fitmask::{FittingEngine, RegionTarget};
//! # use fitmask::{Detection, PersonDetector, ProviderError};
//! # struct Yolo;
//! # impl PersonDetector for Yolo {
//! #     fn detect_persons(&self, _: &image::DynamicImage) -> Result<Vec<Detection>, ProviderError> {
//! #         Ok(vec![])
//! #     }
//! # }
//!
//! let engine = FittingEngine::builder().detector(Yolo).build().unwrap();
//! let photo = std::fs::read("model.jpg").unwrap();
//! let upper = engine.get_region(&photo, RegionTarget::Upper).unwrap();
//! std::fs::write("upper.png", upper).unwrap();
//! ```

mod codec;
/// Tunable constants and output settings.
pub mod config;
/// Region cropping geometry.
pub mod crop;
mod error;
/// Pose keypoint vocabulary and the provider sentinel adapter.
pub mod keypoints;
/// Fitting-mask synthesis.
pub mod mask;
/// Provider traits and the data they exchange.
pub mod provider;
/// Principal subject selection.
pub mod selector;
mod shared;
mod target;

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info, warn};

pub use config::{FittingConfig, OutputFormat};
pub use crop::{CropRegion, HipSignal};
pub use error::{FitError, MaskUnavailable, ProviderError};
pub use keypoints::{Joint, KeypointSet, Point, RawKeypoints};
pub use mask::{FittingMask, HeadSource, HipSource, MaskGeometry};
pub use provider::{
    BoundingBox, Detection, PersonDetector, PersonSegmenter, PoseEstimator, SegmentationInstance,
};
/// Lazily loaded, load-once provider wrapper.
pub use shared::SharedModel;
pub use target::RegionTarget;

/// Outcome of a region crop.
#[derive(Debug, Clone)]
pub enum RegionCrop {
    /// The subject was found and the image was cropped to `region`.
    Cropped {
        region: CropRegion,
        image: DynamicImage,
    },

    /// No usable subject; the input image, uncropped.
    Original(DynamicImage),
}

impl RegionCrop {
    pub fn image(&self) -> &DynamicImage {
        match self {
            RegionCrop::Cropped { image, .. } => image,
            RegionCrop::Original(image) => image,
        }
    }

    pub fn into_image(self) -> DynamicImage {
        match self {
            RegionCrop::Cropped { image, .. } => image,
            RegionCrop::Original(image) => image,
        }
    }

    pub fn region(&self) -> Option<CropRegion> {
        match self {
            RegionCrop::Cropped { region, .. } => Some(*region),
            RegionCrop::Original(_) => None,
        }
    }

    pub fn is_original(&self) -> bool {
        matches!(self, RegionCrop::Original(_))
    }
}

/// All three garment regions of one photo.
#[derive(Debug, Clone)]
pub struct FashionRegions {
    pub full: RegionCrop,
    pub upper: RegionCrop,
    pub lower: RegionCrop,
}

impl FashionRegions {
    pub fn get(&self, target: RegionTarget) -> &RegionCrop {
        match target {
            RegionTarget::Full => &self.full,
            RegionTarget::Upper => &self.upper,
            RegionTarget::Lower => &self.lower,
        }
    }
}

/// Builder for [`FittingEngine`].
#[derive(Default)]
pub struct FittingEngineBuilder {
    detector: Option<Arc<dyn PersonDetector>>,
    pose: Option<Arc<dyn PoseEstimator>>,
    segmenter: Option<Arc<dyn PersonSegmenter>>,
    config: FittingConfig,
}

impl FittingEngineBuilder {
    /// Set the person detector. Without one, every crop returns the original image.
    pub fn detector(mut self, detector: impl PersonDetector + 'static) -> Self {
        self.detector = Some(Arc::new(detector));
        self
    }

    /// Set the pose estimator. Without one, crops use the ratio split and
    /// masks are unavailable.
    pub fn pose_estimator(mut self, pose: impl PoseEstimator + 'static) -> Self {
        self.pose = Some(Arc::new(pose));
        self
    }

    /// Set the person segmenter. Without one, masks are unavailable.
    pub fn segmenter(mut self, segmenter: impl PersonSegmenter + 'static) -> Self {
        self.segmenter = Some(Arc::new(segmenter));
        self
    }

    pub fn config(mut self, config: FittingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<FittingEngine, FitError> {
        self.config.validate()?;
        Ok(FittingEngine {
            detector: self.detector,
            pose: self.pose,
            segmenter: self.segmenter,
            config: self.config,
        })
    }
}

/// Region cropping and mask synthesis service.
///
/// Cheap to clone; clones share the same providers. Every operation is a pure
/// function of its input and the providers, so one engine can serve
/// concurrent requests.
#[derive(Clone)]
pub struct FittingEngine {
    detector: Option<Arc<dyn PersonDetector>>,
    pose: Option<Arc<dyn PoseEstimator>>,
    segmenter: Option<Arc<dyn PersonSegmenter>>,
    config: FittingConfig,
}

impl FittingEngine {
    pub fn builder() -> FittingEngineBuilder {
        FittingEngineBuilder::default()
    }

    pub fn config(&self) -> &FittingConfig {
        &self.config
    }

    /// Detect persons and pick the principal subject.
    ///
    /// A missing or failing detector is logged and treated as "no subject".
    pub fn subject(&self, image: &DynamicImage) -> Option<Detection> {
        let Some(detector) = &self.detector else {
            debug!("no person detector configured");
            return None;
        };
        let detections = match detector.detect_persons(image) {
            Ok(detections) => detections,
            Err(e) => {
                warn!(provider = e.provider(), error = %e, "person detection failed");
                return None;
            }
        };
        debug!(count = detections.len(), "persons detected");
        selector::select_subject(&detections).cloned()
    }

    /// Estimate the pose of the most prominent person.
    ///
    /// `Ok(None)` means the provider found no pose; a raw result whose joints
    /// are all sentinels counts as no pose.
    pub fn pose(&self, image: &DynamicImage) -> Result<Option<KeypointSet>, ProviderError> {
        let Some(pose) = &self.pose else {
            return Err(ProviderError::unavailable("pose", "no pose estimator configured"));
        };
        let keypoints = pose
            .estimate_pose(image)?
            .map(|raw| KeypointSet::from_coco(&raw))
            .filter(|kps| !kps.is_empty());
        Ok(keypoints)
    }

    /// Hip signal for crops; pose failures degrade to the ratio split.
    fn hip_signal(&self, image: &DynamicImage) -> HipSignal {
        if self.pose.is_none() {
            return HipSignal::Unknown;
        }
        match self.pose(image) {
            Ok(pose) => HipSignal::from_pose(pose.as_ref()),
            Err(e) => {
                warn!(provider = e.provider(), error = %e, "pose unavailable, using ratio split");
                HipSignal::Unknown
            }
        }
    }

    fn crop(&self, image: &DynamicImage, subject: &Detection, target: RegionTarget, hip: HipSignal) -> RegionCrop {
        let region = crop::compose_region(
            &subject.bounding_box,
            target,
            image.width(),
            image.height(),
            hip,
            &self.config,
        );
        match region {
            Some(region) => {
                debug!(region = %target, ?region, ?hip, "region composed");
                let CropRegion { x, y, width, height } = region;
                RegionCrop::Cropped {
                    region,
                    image: image.crop_imm(x, y, width, height),
                }
            }
            None => {
                debug!(region = %target, "subject box outside image, keeping original");
                RegionCrop::Original(image.clone())
            }
        }
    }

    /// Crop the garment region for `target`, or return the original image
    /// when no subject is found.
    pub fn region(&self, image: &DynamicImage, target: RegionTarget) -> RegionCrop {
        let Some(subject) = self.subject(image) else {
            info!(region = %target, "no subject found, returning original image");
            return RegionCrop::Original(image.clone());
        };
        let hip = match target {
            RegionTarget::Full => HipSignal::Unknown,
            RegionTarget::Upper | RegionTarget::Lower => self.hip_signal(image),
        };
        self.crop(image, &subject, target, hip)
    }

    /// Crop all three regions with one detection pass and one pose pass.
    pub fn regions(&self, image: &DynamicImage) -> FashionRegions {
        let Some(subject) = self.subject(image) else {
            info!("no subject found, returning original image for all regions");
            return FashionRegions {
                full: RegionCrop::Original(image.clone()),
                upper: RegionCrop::Original(image.clone()),
                lower: RegionCrop::Original(image.clone()),
            };
        };
        let hip = self.hip_signal(image);
        FashionRegions {
            full: self.crop(image, &subject, RegionTarget::Full, HipSignal::Unknown),
            upper: self.crop(image, &subject, RegionTarget::Upper, hip),
            lower: self.crop(image, &subject, RegionTarget::Lower, hip),
        }
    }

    /// Synthesize the fitting mask for `target`.
    ///
    /// Needs both a person segmentation and a working pose estimator; a pose
    /// estimator that simply finds no pose is fine and the defaults apply.
    pub fn fitting_mask(&self, image: &DynamicImage, target: RegionTarget) -> Result<FittingMask, MaskUnavailable> {
        let Some(segmenter) = &self.segmenter else {
            return Err(MaskUnavailable::Segmenter(ProviderError::unavailable(
                "segmentation",
                "no segmenter configured",
            )));
        };

        let instances = segmenter.segment_persons(image).map_err(|e| {
            warn!(provider = e.provider(), error = %e, "person segmentation failed");
            MaskUnavailable::Segmenter(e)
        })?;
        let Some(instance) = instances.and_then(|list| list.into_iter().next()) else {
            info!(region = %target, "no person segmentation, mask unavailable");
            return Err(MaskUnavailable::NoSegmentation);
        };

        let pose = self.pose(image).map_err(|e| {
            warn!(provider = e.provider(), error = %e, "pose estimation failed");
            MaskUnavailable::Pose(e)
        })?;

        Ok(mask::synthesize_mask(
            &instance,
            pose.as_ref(),
            target,
            image.width(),
            image.height(),
            &self.config,
        ))
    }

    /// Byte-level crop: decode, crop, encode in the configured format.
    ///
    /// When no subject is found the input bytes are returned unchanged.
    pub fn get_region(&self, input: &[u8], target: RegionTarget) -> Result<Vec<u8>, FitError> {
        let image = codec::decode_image(input)?;
        match self.region(&image, target) {
            RegionCrop::Original(_) => Ok(input.to_vec()),
            RegionCrop::Cropped { image, .. } => {
                codec::encode_image(&image, self.config.output_format, self.config.quality)
            }
        }
    }

    /// Byte-level mask: decode, synthesize, encode as single-channel PNG.
    ///
    /// Returns `Ok(None)` when the mask is unavailable.
    pub fn get_fitting_mask(&self, input: &[u8], target: RegionTarget) -> Result<Option<Vec<u8>>, FitError> {
        let image = codec::decode_image(input)?;
        match self.fitting_mask(&image, target) {
            Ok(mask) => codec::encode_mask(mask.image()).map(Some),
            Err(reason) => {
                debug!(region = %target, %reason, "fitting mask unavailable");
                Ok(None)
            }
        }
    }
}
