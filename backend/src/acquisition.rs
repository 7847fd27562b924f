use std::io::Write;
use std::path::Path;

use futures::future::BoxFuture;
use image::{ImageReader, RgbImage};
use tempfile::NamedTempFile;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("invalid image location {0:?}")]
    InvalidLocation(String),
    #[error("image request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("image source answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to stage image locally: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// A fetched image, staged in a temporary file owned by this value.
/// The file is removed when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct AcquiredImage {
    file: NamedTempFile,
    pixels: RgbImage,
}

impl AcquiredImage {
    /// Writes `bytes` to a fresh temporary file and decodes it. Blocking.
    pub fn stage(bytes: &[u8], suffix: &str) -> Result<Self, AcquisitionError> {
        let mut file = tempfile::Builder::new()
            .prefix("acquired-")
            .suffix(suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let pixels = ImageReader::open(file.path())?
            .with_guessed_format()?
            .decode()?
            .to_rgb8();

        Ok(Self { file, pixels })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

pub trait ImageSource: Send + Sync {
    /// Fetches and stages the image at `location`. `suffix` names the staged file's extension.
    fn fetch<'a>(
        &'a self,
        location: &'a str,
        suffix: &'a str,
    ) -> BoxFuture<'a, Result<AcquiredImage, AcquisitionError>>;
}

#[derive(Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ImageSource for HttpImageSource {
    fn fetch<'a>(
        &'a self,
        location: &'a str,
        suffix: &'a str,
    ) -> BoxFuture<'a, Result<AcquiredImage, AcquisitionError>> {
        Box::pin(async move {
            let url = Url::parse(location)
                .map_err(|_| AcquisitionError::InvalidLocation(location.to_string()))?;

            let response = self.client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(AcquisitionError::Status(response.status()));
            }
            let bytes = response.bytes().await?;
            log::debug!("Downloaded {} bytes from {}", bytes.len(), location);

            let suffix = suffix.to_string();
            tokio::task::spawn_blocking(move || AcquiredImage::stage(&bytes, &suffix))
                .await
                .map_err(|e| AcquisitionError::Io(std::io::Error::other(e)))?
        })
    }
}
