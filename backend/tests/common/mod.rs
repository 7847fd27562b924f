#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

use damage_assessor::acquisition::{AcquiredImage, AcquisitionError, ImageSource};
use damage_assessor::assessment::mask::{BACKGROUND, Bgr, SegmentationMask};
use damage_assessor::assessment::registry::ClassRegistry;
use damage_assessor::db::{AssessmentLog, AssessmentRecord, RepositoryError};
use damage_assessor::inference::{InferenceError, ModelSet, SegmentationModel};
use damage_assessor::orchestrator::{BatchLimits, BatchOrchestrator};
use damage_assessor::storage::{ArtifactStore, S3ServiceError};

pub const DESTROYED: Bgr = [0, 0, 255];
pub const WHITE: Bgr = [255, 255, 255];

/// Serves blank PNGs of a given width, optionally after a delay.
/// Unknown locations fail like an unreachable URL.
#[derive(Default)]
pub struct FakeSource {
    images: HashMap<String, (u32, Duration)>,
    staged: Mutex<Vec<PathBuf>>,
}

impl FakeSource {
    pub fn with(mut self, location: &str, width: u32) -> Self {
        self.images
            .insert(location.to_string(), (width, Duration::ZERO));
        self
    }

    pub fn with_delay(mut self, location: &str, width: u32, delay: Duration) -> Self {
        self.images.insert(location.to_string(), (width, delay));
        self
    }

    pub fn staged_paths(&self) -> Vec<PathBuf> {
        self.staged.lock().unwrap().clone()
    }
}

impl ImageSource for FakeSource {
    fn fetch<'a>(
        &'a self,
        location: &'a str,
        suffix: &'a str,
    ) -> BoxFuture<'a, Result<AcquiredImage, AcquisitionError>> {
        Box::pin(async move {
            let (width, delay) = *self
                .images
                .get(location)
                .ok_or_else(|| AcquisitionError::InvalidLocation(location.to_string()))?;
            tokio::time::sleep(delay).await;
            let png = SegmentationMask::filled(width, 2, BACKGROUND)
                .encode_png()
                .unwrap();
            let image = AcquiredImage::stage(&png, suffix)?;
            self.staged.lock().unwrap().push(image.path().to_path_buf());
            Ok(image)
        })
    }
}

/// Paints the whole input (input width x 2) in one color.
pub struct SolidModel {
    pub color: Bgr,
    pub delay: Duration,
    /// Answer every request with a model error.
    pub fail: bool,
    /// Answer with a zero-sized mask.
    pub empty_output: bool,
}

impl SolidModel {
    pub fn new(color: Bgr) -> Self {
        Self {
            color,
            delay: Duration::ZERO,
            fail: false,
            empty_output: false,
        }
    }
}

impl SegmentationModel for SolidModel {
    fn backend(&self) -> &'static str {
        "fake"
    }

    fn location(&self) -> String {
        format!("solid:{:?}", self.color)
    }

    fn predict<'a>(
        &'a self,
        image: &'a AcquiredImage,
    ) -> BoxFuture<'a, Result<SegmentationMask, InferenceError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(InferenceError::Model("out of memory".to_string()));
            }
            if self.empty_output {
                return Ok(SegmentationMask::filled(0, 0, self.color));
            }
            Ok(SegmentationMask::filled(
                image.pixels().width(),
                image.pixels().height(),
                self.color,
            ))
        })
    }
}

/// Keeps published masks in memory. Names containing `fail_on` are rejected.
/// Lookups use the mask file name without its content hash prefix.
#[derive(Default)]
pub struct MemoryStore {
    pub fail_on: Option<String>,
    pub delay: Duration,
    pub published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryStore {
    pub fn published_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .published
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| file_name(name).to_string())
            .collect();
        names.sort();
        names
    }

    pub fn published(&self, name: &str) -> Option<Vec<u8>> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| file_name(n) == name)
            .map(|(_, png)| png.clone())
    }
}

impl ArtifactStore for MemoryStore {
    fn publish<'a>(
        &'a self,
        file_name: &'a str,
        png: Vec<u8>,
    ) -> BoxFuture<'a, Result<String, S3ServiceError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            if let Some(marker) = &self.fail_on {
                if file_name.contains(marker.as_str()) {
                    return Err(S3ServiceError::S3("bucket unavailable".to_string()));
                }
            }
            self.published
                .lock()
                .unwrap()
                .push((file_name.to_string(), png));
            Ok(format!("mem://masks/{}", file_name))
        })
    }
}

fn file_name(published: &str) -> &str {
    published.split_once('/').map_or(published, |(_, name)| name)
}

#[derive(Default)]
pub struct MemoryLog {
    pub records: Mutex<Vec<AssessmentRecord>>,
}

impl AssessmentLog for MemoryLog {
    fn record<'a>(
        &'a self,
        record: &'a AssessmentRecord,
    ) -> BoxFuture<'a, Result<(), RepositoryError>> {
        Box::pin(async move {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        })
    }
}

pub fn models() -> ModelSet {
    ModelSet {
        localization: Arc::new(SolidModel::new(WHITE)),
        severity: Arc::new(SolidModel::new(DESTROYED)),
    }
}

pub fn orchestrator(
    source: Arc<FakeSource>,
    store: Arc<MemoryStore>,
    limits: BatchLimits,
) -> BatchOrchestrator {
    orchestrator_with_models(source, models(), store, limits)
}

pub fn orchestrator_with_models(
    source: Arc<FakeSource>,
    models: ModelSet,
    store: Arc<MemoryStore>,
    limits: BatchLimits,
) -> BatchOrchestrator {
    BatchOrchestrator::new(
        source,
        models,
        store,
        Arc::new(ClassRegistry::default()),
        limits,
    )
}

/// Asserts `url` is a published mask location ending in `file_name`.
pub fn assert_mask_url(url: Option<&str>, file_name: &str) {
    let url = url.unwrap_or_else(|| panic!("no location for {file_name}"));
    assert!(url.starts_with("mem://masks/"), "{url}");
    assert!(url.ends_with(&format!("/{file_name}")), "{url}");
}
