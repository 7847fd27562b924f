pub mod s3_service;

use futures::future::BoxFuture;

pub use s3_service::{S3Service, S3ServiceError};

/// Destination for processed masks.
pub trait ArtifactStore: Send + Sync {
    /// Uploads a PNG under `file_name` and returns the location it can be fetched from.
    fn publish<'a>(
        &'a self,
        file_name: &'a str,
        png: Vec<u8>,
    ) -> BoxFuture<'a, Result<String, S3ServiceError>>;
}

/// Read access to stored objects, such as model weights.
pub trait ObjectSource: Send + Sync {
    fn fetch_object<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, S3ServiceError>>;
}
