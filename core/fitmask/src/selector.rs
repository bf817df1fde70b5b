use crate::provider::Detection;

/// Order detections by area, largest first.
///
/// The sort is stable, so equal areas keep the provider's order.
pub fn rank_by_area(mut detections: Vec<Detection>) -> Vec<Detection> {
    detections.sort_by(|a, b| b.area.total_cmp(&a.area));
    detections
}

/// Pick the principal subject: the detection with the largest area.
///
/// Area stands in for "closest to the camera", which keeps the choice
/// independent of the detector's confidence calibration. Returns `None` for
/// an empty list.
pub fn select_subject(detections: &[Detection]) -> Option<&Detection> {
    detections
        .iter()
        .fold(None, |best: Option<&Detection>, det| match best {
            Some(b) if b.area >= det.area => Some(b),
            _ => Some(det),
        })
}
