/// Number of joints in the COCO keypoint vocabulary reported by pose providers.
pub const COCO_JOINT_COUNT: usize = 17;

/// Raw pose output as reported by a provider: one `(x, y)` pair per COCO joint,
/// in COCO order. A joint the provider did not find is reported as `(0.0, 0.0)`.
pub type RawKeypoints = [(f32, f32); COCO_JOINT_COUNT];

/// COCO body joints, in provider index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    /// Index of this joint in a [`RawKeypoints`] array.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Snake-case joint name (`"left_shoulder"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftEye => "left_eye",
            Joint::RightEye => "right_eye",
            Joint::LeftEar => "left_ear",
            Joint::RightEar => "right_ear",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::RightWrist => "right_wrist",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
        }
    }
}

/// A 2D pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Keypoints of the most prominent person, with absent joints made explicit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeypointSet {
    points: [Option<Point>; COCO_JOINT_COUNT],
}

impl KeypointSet {
    /// Adapt a provider's raw output.
    ///
    /// A joint reported at exactly `(0, 0)` is treated as not found. A joint
    /// genuinely detected at the top-left pixel is indistinguishable from a
    /// missing one; that is the provider contract.
    pub fn from_coco(raw: &RawKeypoints) -> Self {
        let mut points = [None; COCO_JOINT_COUNT];
        for (slot, &(x, y)) in points.iter_mut().zip(raw.iter()) {
            if x != 0.0 || y != 0.0 {
                *slot = Some(Point::new(x, y));
            }
        }
        Self { points }
    }

    /// Builder used mostly by tests and custom adapters.
    pub fn with(mut self, joint: Joint, point: Point) -> Self {
        self.points[joint.index()] = Some(point);
        self
    }

    pub fn get(&self, joint: Joint) -> Option<Point> {
        self.points[joint.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(Option::is_none)
    }

    /// Mean y of the hips that are present, or `None` when neither is.
    pub fn mean_hip_y(&self) -> Option<f32> {
        mean_y(self.get(Joint::LeftHip), self.get(Joint::RightHip))
    }

    /// Mean y of the shoulders that are present, or `None` when neither is.
    pub fn mean_shoulder_y(&self) -> Option<f32> {
        mean_y(self.get(Joint::LeftShoulder), self.get(Joint::RightShoulder))
    }
}

fn mean_y(a: Option<Point>, b: Option<Point>) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a.y + b.y) / 2.0),
        (Some(p), None) | (None, Some(p)) => Some(p.y),
        (None, None) => None,
    }
}
