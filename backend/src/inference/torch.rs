use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tch::nn::ModuleT;
use tch::{CModule, Device, Kind, Tensor};

use super::{InferenceError, SegmentationModel};
use crate::acquisition::AcquiredImage;
use crate::assessment::mask::{BACKGROUND, Bgr, SegmentationMask};
use crate::assessment::registry::ClassRegistry;

impl From<tch::TchError> for InferenceError {
    fn from(err: tch::TchError) -> Self {
        InferenceError::Model(err.to_string())
    }
}

/// Channel 0 is background, channel 1 is a building footprint.
pub fn localization_palette() -> Vec<Bgr> {
    vec![BACKGROUND, [255, 255, 255]]
}

/// Channel 0 is background, then one channel per class in registry order.
pub fn severity_palette(registry: &ClassRegistry) -> Vec<Bgr> {
    std::iter::once(BACKGROUND)
        .chain(registry.classes().iter().map(|c| c.color))
        .collect()
}

/// A TorchScript segmentation network producing per-class logits of shape `[1, C, H, W]`.
#[derive(Clone)]
pub struct TorchSegmentationModel {
    module: Arc<Mutex<CModule>>,
    device: Device,
    path: PathBuf,
    palette: Vec<Bgr>,
}

impl TorchSegmentationModel {
    pub fn load(path: &Path, palette: Vec<Bgr>) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(path, device)?;
        log::info!("Loaded {} on {:?}", path.display(), device);
        Ok(Self {
            module: Arc::new(Mutex::new(module)),
            device,
            path: path.to_path_buf(),
            palette,
        })
    }

    fn run(&self, pixels: &image::RgbImage) -> Result<SegmentationMask, InferenceError> {
        let (width, height) = pixels.dimensions();
        // the networks take BGR input, like the masks they emit
        let bgr: Vec<u8> = pixels.pixels().flat_map(|p| [p[2], p[1], p[0]]).collect();
        let input = Tensor::from_slice(&bgr)
            .view([1, height as i64, width as i64, 3])
            .permute([0, 3, 1, 2])
            .to_kind(Kind::Float)
            .to_device(self.device)
            / 255.0;

        let logits = {
            let module = self
                .module
                .lock()
                .map_err(|_| InferenceError::Model("model lock poisoned".to_string()))?;
            module.forward_t(&input, false)
        };
        let (_, _, out_h, out_w) = logits.size4()?;
        let classes = logits
            .argmax(1, false)
            .to_device(Device::Cpu)
            .to_kind(Kind::Int64)
            .view([-1]);
        let classes: Vec<i64> = Vec::try_from(&classes)?;

        let mask = classes
            .into_iter()
            .map(|c| {
                usize::try_from(c)
                    .ok()
                    .and_then(|c| self.palette.get(c).copied())
                    .unwrap_or(BACKGROUND)
            })
            .collect();
        SegmentationMask::new(out_w as u32, out_h as u32, mask)
            .map_err(|e| InferenceError::Model(e.to_string()))
    }
}

impl SegmentationModel for TorchSegmentationModel {
    fn backend(&self) -> &'static str {
        "torch"
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn predict<'a>(
        &'a self,
        image: &'a AcquiredImage,
    ) -> BoxFuture<'a, Result<SegmentationMask, InferenceError>> {
        let model = self.clone();
        let pixels = image.pixels().clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || model.run(&pixels))
                .await
                .map_err(|e| InferenceError::Model(e.to_string()))?
        })
    }
}
