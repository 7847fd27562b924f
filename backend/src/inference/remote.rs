use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::{InferenceError, SegmentationModel};
use crate::acquisition::AcquiredImage;
use crate::assessment::mask::SegmentationMask;

/// A model served over HTTP. The staged image is POSTed as the request body
/// and the service answers with the mask encoded as an image.
#[derive(Clone)]
pub struct RemoteSegmentationModel {
    client: reqwest::Client,
    endpoint: Url,
}

impl RemoteSegmentationModel {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

impl SegmentationModel for RemoteSegmentationModel {
    fn backend(&self) -> &'static str {
        "remote"
    }

    fn location(&self) -> String {
        self.endpoint.to_string()
    }

    fn predict<'a>(
        &'a self,
        image: &'a AcquiredImage,
    ) -> BoxFuture<'a, Result<SegmentationMask, InferenceError>> {
        Box::pin(async move {
            let body = tokio::fs::read(image.path()).await?;

            let response = self
                .client
                .post(self.endpoint.clone())
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(body)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(InferenceError::Status(response.status()));
            }

            let bytes = response.bytes().await?;
            let mask = tokio::task::spawn_blocking(move || decode_mask(&bytes))
                .await
                .map_err(|e| InferenceError::Model(format!("mask decoding panicked: {}", e)))??;
            log::debug!(
                "{} returned a {}x{} mask",
                self.endpoint,
                mask.width(),
                mask.height()
            );
            Ok(mask)
        })
    }
}

fn decode_mask(bytes: &[u8]) -> Result<SegmentationMask, InferenceError> {
    let decoded = image::load_from_memory(bytes)?.to_rgb8();
    Ok(SegmentationMask::from_rgb_image(&decoded))
}
