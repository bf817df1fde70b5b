//! Lazily loaded provider models shared by every request.
//!
//! Model weights are expensive to load, so a [`SharedModel`] defers loading to
//! the first request that needs the model and then hands the same instance to
//! every later caller. Concurrent first use is serialized behind a mutex; once
//! the model is published, lookups are lock-free.

use std::sync::{Mutex, OnceLock};

use image::DynamicImage;
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::keypoints::RawKeypoints;
use crate::provider::{Detection, PersonDetector, PersonSegmenter, PoseEstimator, SegmentationInstance};

type Loader<P> = Box<dyn Fn() -> Result<P, ProviderError> + Send + Sync>;

/// A provider model loaded at most once per process.
///
/// A failed load is not cached: the next caller retries.
pub struct SharedModel<P> {
    name: &'static str,
    loader: Option<Loader<P>>,
    slot: OnceLock<P>,
    init_lock: Mutex<()>,
}

impl<P> SharedModel<P> {
    /// Wrap a loader. Nothing is loaded until the first call to [`SharedModel::get`].
    pub fn new<F>(name: &'static str, loader: F) -> Self
    where
        F: Fn() -> Result<P, ProviderError> + Send + Sync + 'static,
    {
        Self {
            name,
            loader: Some(Box::new(loader)),
            slot: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Wrap an already loaded model.
    pub fn ready(name: &'static str, model: P) -> Self {
        let slot = OnceLock::new();
        let _ = slot.set(model);
        Self {
            name,
            loader: None,
            slot,
            init_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Return the model, loading it first if no caller has done so yet.
    pub fn get(&self) -> Result<&P, ProviderError> {
        if let Some(model) = self.slot.get() {
            return Ok(model);
        }

        // Poisoned by a panicking loader; the slot is still empty.
        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(model) = self.slot.get() {
            return Ok(model);
        }

        let Some(loader) = &self.loader else {
            return Err(ProviderError::unavailable(self.name, "no loader"));
        };

        info!(provider = self.name, "loading model");
        match loader() {
            Ok(model) => {
                info!(provider = self.name, "model loaded");
                Ok(self.slot.get_or_init(|| model))
            }
            Err(e) => {
                warn!(provider = self.name, error = %e, "model load failed");
                Err(e)
            }
        }
    }
}

impl<P: PersonDetector> PersonDetector for SharedModel<P> {
    fn detect_persons(&self, image: &DynamicImage) -> Result<Vec<Detection>, ProviderError> {
        self.get()?.detect_persons(image)
    }
}

impl<P: PoseEstimator> PoseEstimator for SharedModel<P> {
    fn estimate_pose(&self, image: &DynamicImage) -> Result<Option<RawKeypoints>, ProviderError> {
        self.get()?.estimate_pose(image)
    }
}

impl<P: PersonSegmenter> PersonSegmenter for SharedModel<P> {
    fn segment_persons(
        &self,
        image: &DynamicImage,
    ) -> Result<Option<Vec<SegmentationInstance>>, ProviderError> {
        self.get()?.segment_persons(image)
    }
}
