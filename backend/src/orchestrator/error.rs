use std::time::Duration;

use shared::FailureStage;

use crate::acquisition::AcquisitionError;
use crate::inference::InferenceError;
use crate::storage::S3ServiceError;

/// Everything that can stop a single role. Caught at the role boundary;
/// never aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("publish failed: {0}")]
    Publish(#[from] S3ServiceError),
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: FailureStage, after: Duration },
    /// A bug rather than bad input: malformed mask, panicking post-processing.
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl RoleError {
    pub fn stage(&self) -> FailureStage {
        match self {
            RoleError::Acquisition(_) => FailureStage::Acquisition,
            RoleError::Inference(_) => FailureStage::Inference,
            RoleError::Publish(_) => FailureStage::Publish,
            RoleError::Timeout { .. } => FailureStage::Timeout,
            RoleError::ContractViolation(_) => FailureStage::ContractViolation,
        }
    }
}
