//! Drives a batch of before/after image groups through acquisition,
//! inference, post-processing and publishing.
//!
//! Each (group, role) pair is an independent unit of work. Units run on a
//! bounded pool; results are stamped with their position and reassembled in
//! input order, so the response never depends on which unit finished first.

pub mod error;
pub mod roles;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use shared::{DamageSeverity, FailureStage, PredictResponse, RoleFailure, RoleMap};

use crate::acquisition::ImageSource;
use crate::assessment::cost::DamageReport;
use crate::assessment::mask::SegmentationMask;
use crate::assessment::registry::ClassRegistry;
use crate::assessment::{assess_severity, clean_localisation};
use crate::db::{AssessmentLog, AssessmentRecord};
use crate::inference::ModelSet;
use crate::storage::ArtifactStore;

pub use error::RoleError;
pub use roles::{RoleRoute, classify};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub concurrency: usize,
    pub acquire_timeout: Duration,
    pub inference_timeout: Duration,
    pub publish_timeout: Duration,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            concurrency: 4,
            acquire_timeout: Duration::from_secs(30),
            inference_timeout: Duration::from_secs(120),
            publish_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct RoleUnit<'a> {
    group: usize,
    position: usize,
    role: &'a str,
    location: &'a str,
    route: RoleRoute,
}

struct RoleOutput {
    location: String,
    report: Option<DamageReport>,
}

pub struct BatchOrchestrator {
    source: Arc<dyn ImageSource>,
    models: ModelSet,
    store: Arc<dyn ArtifactStore>,
    registry: Arc<ClassRegistry>,
    audit: Option<Arc<dyn AssessmentLog>>,
    limits: BatchLimits,
}

impl BatchOrchestrator {
    pub fn new(
        source: Arc<dyn ImageSource>,
        models: ModelSet,
        store: Arc<dyn ArtifactStore>,
        registry: Arc<ClassRegistry>,
        limits: BatchLimits,
    ) -> Self {
        Self {
            source,
            models,
            store,
            registry,
            audit: None,
            limits,
        }
    }

    pub fn with_audit_log(mut self, audit: Arc<dyn AssessmentLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    /// Processes every recognised role of every group. Per-role failures are
    /// reported in `failures` and never abort the batch.
    pub async fn process_batch(&self, groups: &[RoleMap]) -> PredictResponse {
        let units = plan(groups);
        info!(
            "Processing {} image roles across {} groups",
            units.len(),
            groups.len()
        );

        let mut outcomes: Vec<_> = stream::iter(units)
            .map(|unit| async move {
                let outcome = self.process_role(&unit).await;
                (unit, outcome)
            })
            .buffer_unordered(self.limits.concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|(unit, _)| (unit.group, unit.position));

        let mut response = PredictResponse {
            mask_image_urls: vec![RoleMap::new(); groups.len()],
            ..Default::default()
        };
        for (unit, outcome) in outcomes {
            match outcome {
                Ok(output) => {
                    response.mask_image_urls[unit.group].insert(unit.role, output.location);
                    if let Some(report) = output.report {
                        response.damage_severities.push(DamageSeverity::from(&report));
                    }
                }
                Err(err) => {
                    if let RoleError::ContractViolation(_) = err {
                        error!("{} in group {}: {}", unit.role, unit.group, err);
                    } else {
                        warn!("Skipping {} in group {}: {}", unit.role, unit.group, err);
                    }
                    response.failures.push(RoleFailure {
                        group: unit.group,
                        role: unit.role.to_string(),
                        stage: err.stage(),
                        message: err.to_string(),
                    });
                }
            }
        }
        response
    }

    async fn process_role(&self, unit: &RoleUnit<'_>) -> Result<RoleOutput, RoleError> {
        info!(
            "Processing {} as {}",
            unit.role,
            unit.route.mask_type().unwrap_or("unrecognized")
        );
        let model = self.models.for_route(unit.route).ok_or_else(|| {
            RoleError::ContractViolation(format!("no model routes {:?}", unit.route))
        })?;

        // Dropping `image` deletes its staged file, whichever way this function returns.
        let image = timed(
            FailureStage::Acquisition,
            self.limits.acquire_timeout,
            self.source.fetch(unit.location, roles::staging_suffix(unit.role)),
        )
        .await?;

        let raw_mask = timed(
            FailureStage::Inference,
            self.limits.inference_timeout,
            model.predict(&image),
        )
        .await?;

        let (png, report) = self.post_process(unit.route, raw_mask).await?;

        let file_name = roles::published_name(unit.role, &png);
        let location = timed(
            FailureStage::Publish,
            self.limits.publish_timeout,
            self.store.publish(&file_name, png.clone()),
        )
        .await?;

        if let (Some(audit), Some(report)) = (&self.audit, &report) {
            self.record(audit.as_ref(), unit, &location, &png, report)
                .await;
        }

        drop(image);
        Ok(RoleOutput { location, report })
    }

    /// CPU-bound mask work runs on the blocking pool.
    async fn post_process(
        &self,
        route: RoleRoute,
        raw_mask: SegmentationMask,
    ) -> Result<(Vec<u8>, Option<DamageReport>), RoleError> {
        if raw_mask.width() == 0 || raw_mask.height() == 0 {
            return Err(RoleError::ContractViolation(format!(
                "model returned an empty {}x{} mask",
                raw_mask.width(),
                raw_mask.height()
            )));
        }
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || {
            let (processed, report) = match route {
                RoleRoute::Severity => {
                    let assessment = assess_severity(&raw_mask, &registry);
                    (assessment.processed_mask, Some(assessment.report))
                }
                _ => (clean_localisation(&raw_mask), None),
            };
            let png = processed
                .encode_png()
                .map_err(|e| RoleError::ContractViolation(e.to_string()))?;
            Ok((png, report))
        })
        .await
        .map_err(|e| RoleError::ContractViolation(format!("post-processing failed: {}", e)))?
    }

    async fn record(
        &self,
        audit: &dyn AssessmentLog,
        unit: &RoleUnit<'_>,
        location: &str,
        png: &[u8],
        report: &DamageReport,
    ) {
        let result = match AssessmentRecord::new(unit.group, unit.role, location, png, report) {
            Ok(record) => audit.record(&record).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Failed to record assessment for {}: {}", unit.role, e);
        }
    }
}

/// Flattens groups into routable units, dropping unrecognised roles.
fn plan(groups: &[RoleMap]) -> Vec<RoleUnit<'_>> {
    let mut units = Vec::new();
    for (group, roles) in groups.iter().enumerate() {
        for (position, (role, location)) in roles.iter().enumerate() {
            let route = classify(role);
            if route == RoleRoute::Unrecognized {
                debug!("Ignoring unrecognized role {} in group {}", role, group);
                continue;
            }
            units.push(RoleUnit {
                group,
                position,
                role,
                location,
                route,
            });
        }
    }
    units
}

async fn timed<T, E>(
    stage: FailureStage,
    after: Duration,
    work: impl Future<Output = Result<T, E>>,
) -> Result<T, RoleError>
where
    RoleError: From<E>,
{
    match tokio::time::timeout(after, work).await {
        Ok(result) => result.map_err(RoleError::from),
        Err(_) => Err(RoleError::Timeout { stage, after }),
    }
}
