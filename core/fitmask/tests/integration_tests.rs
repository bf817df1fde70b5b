use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fitmask::keypoints::COCO_JOINT_COUNT;
use fitmask::{
    BoundingBox, Detection, FitError, FittingConfig, FittingEngine, HeadSource, HipSource, Joint,
    MaskUnavailable, OutputFormat, PersonDetector, PersonSegmenter, PoseEstimator, ProviderError,
    RawKeypoints, RegionTarget, SegmentationInstance, SharedModel,
};
use image::{DynamicImage, GrayImage, ImageEncoder, Luma, RgbImage};

const W: u32 = 768;
const H: u32 = 1024;

fn make_test_png(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ]);
    }
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buffer
}

fn scenario_box() -> BoundingBox {
    BoundingBox::new(100.0, 50.0, 668.0, 974.0)
}

/// Mock detector returning fixed detections and counting calls.
#[derive(Clone, Default)]
struct MockDetector {
    detections: Vec<Detection>,
    calls: Arc<AtomicUsize>,
}

impl MockDetector {
    fn with_person(bbox: BoundingBox) -> Self {
        Self {
            detections: vec![Detection::new(bbox, 0.9)],
            calls: Arc::default(),
        }
    }
}

impl PersonDetector for MockDetector {
    fn detect_persons(&self, _image: &DynamicImage) -> Result<Vec<Detection>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }
}

struct FailingDetector;

impl PersonDetector for FailingDetector {
    fn detect_persons(&self, _image: &DynamicImage) -> Result<Vec<Detection>, ProviderError> {
        Err(ProviderError::inference("detector", "cuda out of memory"))
    }
}

/// Mock pose provider speaking the raw COCO contract, with `(0, 0)` for missing joints.
#[derive(Clone)]
enum MockPose {
    NotFound,
    Joints(Vec<(Joint, (f32, f32))>),
    Broken,
}

impl PoseEstimator for MockPose {
    fn estimate_pose(&self, _image: &DynamicImage) -> Result<Option<RawKeypoints>, ProviderError> {
        match self {
            MockPose::NotFound => Ok(None),
            MockPose::Joints(joints) => {
                let mut raw = [(0.0, 0.0); COCO_JOINT_COUNT];
                for (joint, xy) in joints {
                    raw[joint.index()] = *xy;
                }
                Ok(Some(raw))
            }
            MockPose::Broken => Err(ProviderError::unavailable("pose", "weights missing")),
        }
    }
}

fn back_facing_shoulders() -> Vec<(Joint, (f32, f32))> {
    vec![
        (Joint::LeftShoulder, (300.0, 150.0)),
        (Joint::RightShoulder, (420.0, 148.0)),
    ]
}

/// Mock segmenter returning a solid person mask at a chosen resolution.
enum MockSegmenter {
    Person { width: u32, height: u32, value: u8 },
    Nothing,
    Broken,
}

impl PersonSegmenter for MockSegmenter {
    fn segment_persons(
        &self,
        _image: &DynamicImage,
    ) -> Result<Option<Vec<SegmentationInstance>>, ProviderError> {
        match self {
            MockSegmenter::Person { width, height, value } => Ok(Some(vec![SegmentationInstance {
                raster: GrayImage::from_pixel(*width, *height, Luma([*value])),
                bounding_box: scenario_box(),
            }])),
            MockSegmenter::Nothing => Ok(None),
            MockSegmenter::Broken => Err(ProviderError::inference("segmentation", "bad tensor")),
        }
    }
}

fn decode(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory(bytes).unwrap()
}

#[test]
fn no_subject_returns_original_bytes() {
    let input = make_test_png(W, H);
    let engine = FittingEngine::builder()
        .detector(MockDetector::default())
        .pose_estimator(MockPose::NotFound)
        .build()
        .unwrap();

    for target in RegionTarget::ALL {
        let output = engine.get_region(&input, target).unwrap();
        assert_eq!(output, input, "{target} should return the input untouched");
    }
}

#[test]
fn failing_detector_returns_original_bytes() {
    let input = make_test_png(64, 64);
    let engine = FittingEngine::builder().detector(FailingDetector).build().unwrap();
    assert_eq!(engine.get_region(&input, RegionTarget::Lower).unwrap(), input);
}

#[test]
fn upper_crop_without_pose_uses_ratio_split() {
    let input = make_test_png(W, H);
    let engine = FittingEngine::builder()
        .detector(MockDetector::with_person(scenario_box()))
        .pose_estimator(MockPose::NotFound)
        .build()
        .unwrap();

    let crop = engine.region(&decode(&input), RegionTarget::Upper);
    let region = crop.region().unwrap();
    assert_eq!((region.x, region.y, region.right()), (43, 3, 725));
    assert_eq!(region.bottom(), 562);

    let bytes = engine.get_region(&input, RegionTarget::Upper).unwrap();
    let decoded = decode(&bytes);
    assert_eq!((decoded.width(), decoded.height()), (682, 559));
}

#[test]
fn upper_crop_keeps_body_when_hips_hidden() {
    let engine = FittingEngine::builder()
        .detector(MockDetector::with_person(scenario_box()))
        .pose_estimator(MockPose::Joints(back_facing_shoulders()))
        .build()
        .unwrap();

    let crop = engine.region(&decode(&make_test_png(W, H)), RegionTarget::Upper);
    assert_eq!(crop.region().unwrap().bottom(), 1021);
}

#[test]
fn crops_follow_left_hip() {
    let mut joints = back_facing_shoulders();
    joints.push((Joint::LeftHip, (330.0, 600.0)));
    let engine = FittingEngine::builder()
        .detector(MockDetector::with_person(scenario_box()))
        .pose_estimator(MockPose::Joints(joints))
        .build()
        .unwrap();
    let image = decode(&make_test_png(W, H));

    assert_eq!(engine.region(&image, RegionTarget::Upper).region().unwrap().bottom(), 620);
    assert_eq!(engine.region(&image, RegionTarget::Lower).region().unwrap().y, 580);
}

#[test]
fn broken_pose_falls_back_to_ratio_split() {
    let engine = FittingEngine::builder()
        .detector(MockDetector::with_person(scenario_box()))
        .pose_estimator(MockPose::Broken)
        .build()
        .unwrap();

    let crop = engine.region(&decode(&make_test_png(W, H)), RegionTarget::Lower);
    assert_eq!(crop.region().unwrap().y, 562);
}

#[test]
fn regions_share_one_detection_pass() {
    let detector = MockDetector::with_person(scenario_box());
    let calls = Arc::clone(&detector.calls);
    let engine = FittingEngine::builder()
        .detector(detector)
        .pose_estimator(MockPose::NotFound)
        .build()
        .unwrap();

    let regions = engine.regions(&decode(&make_test_png(W, H)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(regions.full.region().unwrap().height, 1018);
    assert_eq!(regions.get(RegionTarget::Upper).region().unwrap().bottom(), 562);
    assert_eq!(regions.lower.region().unwrap().y, 562);
}

#[test]
fn regions_without_subject_are_all_original() {
    let engine = FittingEngine::builder()
        .detector(MockDetector::default())
        .build()
        .unwrap();
    let regions = engine.regions(&decode(&make_test_png(32, 32)));
    assert!(RegionTarget::ALL.iter().all(|t| regions.get(*t).is_original()));
}

#[test]
fn jpeg_output_format_is_honored() {
    let config = FittingConfig {
        output_format: OutputFormat::Jpeg,
        quality: 0.8,
        ..FittingConfig::default()
    };
    let engine = FittingEngine::builder()
        .detector(MockDetector::with_person(BoundingBox::new(10.0, 10.0, 90.0, 150.0)))
        .config(config)
        .build()
        .unwrap();

    let bytes = engine.get_region(&make_test_png(100, 160), RegionTarget::Full).unwrap();
    assert_eq!(bytes[0], 0xFF);
    assert_eq!(bytes[1], 0xD8);
}

#[test]
fn fitting_mask_bytes_are_single_channel_png() {
    let engine = FittingEngine::builder()
        .pose_estimator(MockPose::Joints(back_facing_shoulders()))
        .segmenter(MockSegmenter::Person { width: W, height: H, value: 255 })
        .build()
        .unwrap();

    let bytes = engine
        .get_fitting_mask(&make_test_png(W, H), RegionTarget::Full)
        .unwrap()
        .expect("mask should be available");
    let mask = decode(&bytes).to_luma8();
    assert_eq!(mask.dimensions(), (W, H));
    assert_eq!(mask.get_pixel(400, 88).0[0], 0);
    assert_eq!(mask.get_pixel(400, 89).0[0], 255);
}

#[test]
fn low_resolution_segmentation_is_resized() {
    let engine = FittingEngine::builder()
        .pose_estimator(MockPose::NotFound)
        .segmenter(MockSegmenter::Person { width: 96, height: 128, value: 200 })
        .build()
        .unwrap();

    let mask = engine
        .fitting_mask(&decode(&make_test_png(W, H)), RegionTarget::Upper)
        .unwrap();
    assert_eq!((mask.width(), mask.height()), (W, H));
    let g = *mask.geometry();
    assert_eq!(g.head_source, HeadSource::Default);
    assert_eq!(g.hip_source, HipSource::Default);
    assert_eq!(g.head_limit, 0);
    assert_eq!(g.hip_y, 614);
    assert_eq!(mask.value(10, 100), 200);
    assert_eq!(mask.value(10, 614), 0);
}

#[test]
fn lower_mask_protects_down_to_hip() {
    let mut joints = back_facing_shoulders();
    joints.push((Joint::Nose, (360.0, 70.0)));
    joints.push((Joint::LeftHip, (320.0, 600.0)));
    joints.push((Joint::RightHip, (440.0, 604.0)));
    let engine = FittingEngine::builder()
        .pose_estimator(MockPose::Joints(joints))
        .segmenter(MockSegmenter::Person { width: W, height: H, value: 255 })
        .build()
        .unwrap();

    let mask = engine
        .fitting_mask(&decode(&make_test_png(W, H)), RegionTarget::Lower)
        .unwrap();
    let g = *mask.geometry();
    assert_eq!(g.head_source, HeadSource::NoseShoulder);
    assert_eq!(g.hip_y, 612);
    assert!((0..g.hip_y).all(|y| mask.value(0, y) == 0 && mask.value(W - 1, y) == 0));
    assert!((g.hip_y..H).all(|y| mask.value(W / 2, y) == 255));
}

#[test]
fn mask_synthesis_is_idempotent() {
    let engine = FittingEngine::builder()
        .pose_estimator(MockPose::Joints(back_facing_shoulders()))
        .segmenter(MockSegmenter::Person { width: 200, height: 300, value: 230 })
        .build()
        .unwrap();
    let input = make_test_png(W, H);

    for target in RegionTarget::ALL {
        let a = engine.get_fitting_mask(&input, target).unwrap();
        let b = engine.get_fitting_mask(&input, target).unwrap();
        assert!(a.is_some());
        assert_eq!(a, b);
    }
}

#[test]
fn mask_unavailable_without_segmentation() {
    let engine = FittingEngine::builder()
        .pose_estimator(MockPose::NotFound)
        .segmenter(MockSegmenter::Nothing)
        .build()
        .unwrap();
    let image = decode(&make_test_png(40, 40));

    assert!(matches!(
        engine.fitting_mask(&image, RegionTarget::Full),
        Err(MaskUnavailable::NoSegmentation)
    ));
    assert_eq!(engine.get_fitting_mask(&make_test_png(40, 40), RegionTarget::Full).unwrap(), None);
}

#[test]
fn mask_unavailable_when_providers_fail() {
    let image = decode(&make_test_png(40, 40));

    let broken_segmenter = FittingEngine::builder()
        .pose_estimator(MockPose::NotFound)
        .segmenter(MockSegmenter::Broken)
        .build()
        .unwrap();
    assert!(matches!(
        broken_segmenter.fitting_mask(&image, RegionTarget::Upper),
        Err(MaskUnavailable::Segmenter(_))
    ));

    let broken_pose = FittingEngine::builder()
        .pose_estimator(MockPose::Broken)
        .segmenter(MockSegmenter::Person { width: 40, height: 40, value: 255 })
        .build()
        .unwrap();
    assert!(matches!(
        broken_pose.fitting_mask(&image, RegionTarget::Upper),
        Err(MaskUnavailable::Pose(_))
    ));
}

#[test]
fn invalid_input_is_a_decode_error() {
    let engine = FittingEngine::builder().build().unwrap();
    assert!(matches!(
        engine.get_region(b"not an image", RegionTarget::Full),
        Err(FitError::DecodeError(_))
    ));
    assert!(matches!(
        engine.get_fitting_mask(b"not an image", RegionTarget::Full),
        Err(FitError::DecodeError(_))
    ));
}

#[test]
fn shared_model_loads_once_across_concurrent_requests() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let detector = SharedModel::new("detector", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(10));
        Ok(MockDetector::with_person(scenario_box()))
    });
    let engine = FittingEngine::builder().detector(detector).build().unwrap();
    let image = decode(&make_test_png(W, H));

    std::thread::scope(|s| {
        for _ in 0..6 {
            let engine = engine.clone();
            let image = &image;
            s.spawn(move || {
                let crop = engine.region(image, RegionTarget::Full);
                assert_eq!(crop.region().unwrap().x, 43);
            });
        }
    });

    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn unloadable_shared_model_degrades_to_original() {
    let detector: SharedModel<MockDetector> =
        SharedModel::new("detector", || Err(ProviderError::unavailable("detector", "no weights")));
    let engine = FittingEngine::builder().detector(detector).build().unwrap();
    let input = make_test_png(50, 50);
    assert_eq!(engine.get_region(&input, RegionTarget::Upper).unwrap(), input);
}

#[test]
fn target_names_parse() {
    let target: RegionTarget = "upper".parse().unwrap();
    assert_eq!(target, RegionTarget::Upper);
    assert!(matches!("hat".parse::<RegionTarget>(), Err(FitError::UnknownTarget(_))));
}
