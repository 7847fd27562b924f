use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use futures::future::BoxFuture;
use sha2::{Digest, Sha256};

use super::{ArtifactStore, ObjectSource};

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    bucket_name: String,
    folder: String,
    public_base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum S3ServiceError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("File too large")]
    FileTooLarge,
}

impl S3Service {
    pub fn new(
        client: Client,
        bucket_name: String,
        folder: String,
        public_base_url: Option<String>,
    ) -> Self {
        let public_base_url = public_base_url
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", bucket_name))
            .trim_end_matches('/')
            .to_string();
        Self {
            client,
            bucket_name,
            folder,
            public_base_url,
        }
    }

    pub fn calculate_image_hash(image_data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(image_data);
        hex::encode(hasher.finalize())
    }

    pub fn generate_mask_key(folder: &str, file_name: &str) -> String {
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            format!("masks/{}", file_name)
        } else {
            format!("{}/masks/{}", folder, file_name)
        }
    }

    pub fn public_url(&self, s3_key: &str) -> String {
        format!("{}/{}", self.public_base_url, s3_key)
    }

    pub fn validate_image_size(image_data: &[u8]) -> Result<(), S3ServiceError> {
        const MAX_SIZE: usize = 50 * 1024 * 1024;
        if image_data.len() > MAX_SIZE {
            return Err(S3ServiceError::FileTooLarge);
        }
        Ok(())
    }

    pub async fn upload_image(
        &self,
        image_data: Vec<u8>,
        s3_key: &str,
        mime_type: &str,
    ) -> Result<(), S3ServiceError> {
        S3Service::validate_image_size(&image_data)?;

        let body = ByteStream::from(image_data);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(s3_key)
            .body(body)
            .content_type(mime_type)
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;

        Ok(())
    }

    pub async fn get_object(&self, s3_key: &str) -> Result<Vec<u8>, S3ServiceError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(s3_key)
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;

        let body = result
            .body
            .collect()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }
}

impl ArtifactStore for S3Service {
    fn publish<'a>(
        &'a self,
        file_name: &'a str,
        png: Vec<u8>,
    ) -> BoxFuture<'a, Result<String, S3ServiceError>> {
        Box::pin(async move {
            let s3_key = S3Service::generate_mask_key(&self.folder, file_name);
            self.upload_image(png, &s3_key, "image/png").await?;
            log::info!("Uploaded mask to s3://{}/{}", self.bucket_name, s3_key);
            Ok(self.public_url(&s3_key))
        })
    }
}

impl ObjectSource for S3Service {
    fn fetch_object<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, S3ServiceError>> {
        Box::pin(self.get_object(key))
    }
}
