pub mod remote;
#[cfg(feature = "torch")]
pub mod torch;

use std::sync::Arc;

use futures::future::BoxFuture;
use shared::ModelInfo;

use crate::acquisition::AcquiredImage;
use crate::assessment::mask::SegmentationMask;
use crate::assessment::registry::ClassRegistry;
use crate::config::ModelBackendConfig;
use crate::orchestrator::roles::RoleRoute;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model service answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("model output could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to read staged image: {0}")]
    Io(#[from] std::io::Error),
    #[error("model error: {0}")]
    Model(String),
    #[error("model backend {0:?} is not available in this build")]
    Unavailable(String),
}

/// An external segmentation model: image in, color-coded mask out.
pub trait SegmentationModel: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Where the model lives: a service URL or a weights path.
    fn location(&self) -> String;

    fn predict<'a>(
        &'a self,
        image: &'a AcquiredImage,
    ) -> BoxFuture<'a, Result<SegmentationMask, InferenceError>>;
}

/// One model per routed role.
#[derive(Clone)]
pub struct ModelSet {
    pub localization: Arc<dyn SegmentationModel>,
    pub severity: Arc<dyn SegmentationModel>,
}

impl ModelSet {
    /// `None` for roles that are never sent to a model.
    pub fn for_route(&self, route: RoleRoute) -> Option<&Arc<dyn SegmentationModel>> {
        match route {
            RoleRoute::Localization => Some(&self.localization),
            RoleRoute::Severity => Some(&self.severity),
            RoleRoute::Unrecognized => None,
        }
    }

    pub fn describe(&self) -> Vec<ModelInfo> {
        [
            ("pre_disaster", &self.localization),
            ("post_disaster", &self.severity),
        ]
        .into_iter()
        .map(|(role, model)| ModelInfo {
            role: role.to_string(),
            backend: model.backend().to_string(),
            model: model.location(),
            is_loaded: true,
        })
        .collect()
    }
}

pub fn build_models(
    config: &ModelBackendConfig,
    registry: &ClassRegistry,
    client: reqwest::Client,
) -> Result<ModelSet, InferenceError> {
    match config {
        ModelBackendConfig::Remote {
            localization_url,
            severity_url,
        } => Ok(ModelSet {
            localization: Arc::new(remote::RemoteSegmentationModel::new(
                client.clone(),
                localization_url.clone(),
            )),
            severity: Arc::new(remote::RemoteSegmentationModel::new(
                client,
                severity_url.clone(),
            )),
        }),
        #[cfg(feature = "torch")]
        ModelBackendConfig::Torch {
            localization_path,
            severity_path,
        } => Ok(ModelSet {
            localization: Arc::new(torch::TorchSegmentationModel::load(
                localization_path,
                torch::localization_palette(),
            )?),
            severity: Arc::new(torch::TorchSegmentationModel::load(
                severity_path,
                torch::severity_palette(registry),
            )?),
        }),
        #[cfg(not(feature = "torch"))]
        ModelBackendConfig::Torch { .. } => {
            let _ = registry;
            Err(InferenceError::Unavailable("torch".to_string()))
        }
    }
}
