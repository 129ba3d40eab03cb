//! Ridge segmentation: probability-map inference and mask shaping.

use image::{GrayImage, Luma};
use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::Value;

use crate::error::{ModelError, PreprocessError};
use crate::model::{self, ModelKind, ModelSource};

/// Binary segmentation model plus the input shape it declares.
pub struct Segmenter {
    session: Session,
    input_shape: (u32, u32),
}

impl Segmenter {
    pub fn load(source: &ModelSource, name: &str) -> Result<Self, ModelError> {
        let session = source.load(ModelKind::Segmentation, name)?;
        let input_shape = model::input_spatial_shape(&session, ModelKind::Segmentation, name)?;
        Ok(Self {
            session,
            input_shape,
        })
    }

    /// (height, width) the model expects.
    pub fn input_shape(&self) -> (u32, u32) {
        self.input_shape
    }

    /// Run the model over a batch-of-one NHWC tensor and return the ridge
    /// probability map shaped (height, width).
    ///
    /// Multi-channel outputs keep channel 0, mirroring how the artifacts
    /// were consumed during training.
    pub fn probability_map(&mut self, tensor: Array4<f32>) -> Result<Array2<f32>, PreprocessError> {
        let (height, width) = self.input_shape;
        let expected = height as usize * width as usize;

        let input = Value::from_array(tensor).map_err(PreprocessError::Segmentation)?;
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(PreprocessError::Segmentation)?;
        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(PreprocessError::Segmentation)?;

        if expected == 0 || data.is_empty() || data.len() % expected != 0 {
            return Err(PreprocessError::MaskShape {
                got: data.len(),
                height,
                width,
            });
        }

        let channels = data.len() / expected;
        let plane: Vec<f32> = if channels == 1 {
            data.to_vec()
        } else {
            // NHWC layout: channel 0 of every pixel.
            data.iter().step_by(channels).copied().collect()
        };
        Ok(Array2::from_shape_vec(
            (height as usize, width as usize),
            plane,
        )?)
    }
}

/// Threshold a probability map into a {0, 1} mask image.
pub fn threshold_mask(prob: &Array2<f32>, threshold: f32) -> GrayImage {
    let (height, width) = prob.dim();
    let mut mask = GrayImage::new(width as u32, height as u32);
    for ((y, x), &p) in prob.indexed_iter() {
        if p > threshold {
            mask.put_pixel(x as u32, y as u32, Luma([1]));
        }
    }
    mask
}
