pub mod dynamodb_repository;
pub mod models;

use futures::future::BoxFuture;

pub use dynamodb_repository::{DynamoDbRepository, RepositoryError};
pub use models::{AssessmentRecord, WeightFlag};

/// Sink for assessment audit rows.
pub trait AssessmentLog: Send + Sync {
    fn record<'a>(
        &'a self,
        record: &'a AssessmentRecord,
    ) -> BoxFuture<'a, Result<(), RepositoryError>>;
}

/// The flag row announcing new model weights.
pub trait WeightFlagStore: Send + Sync {
    fn weight_flag(&self) -> BoxFuture<'_, Result<Option<WeightFlag>, RepositoryError>>;

    fn clear<'a>(&'a self, flag: &'a WeightFlag) -> BoxFuture<'a, Result<(), RepositoryError>>;
}
