use crate::config_error;
use crate::errors::{AdvisorError, Result};
use candle_core::{Device, Module, Tensor, D};
use candle_nn::{ops::softmax, Linear};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Maps a scaled feature vector to a probability distribution over classes
pub trait Classifier: Send + Sync {
    fn input_len(&self) -> usize;

    fn output_len(&self) -> usize;

    fn predict(&self, input: &Array1<f32>) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Tanh,
    Softmax,
    Linear,
}

/// Exported dense layer: one weight row per output unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub weights: Vec<Vec<f32>>,
    pub biases: Vec<f32>,
    pub activation: Activation,
}

impl LayerSpec {
    pub fn input_len(&self) -> usize {
        self.weights.first().map(|row| row.len()).unwrap_or(0)
    }

    pub fn output_len(&self) -> usize {
        self.weights.len()
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.weights.is_empty() || self.input_len() == 0 {
            return Err(config_error!("layer {} has no weights", index));
        }
        if self.weights.iter().any(|row| row.len() != self.input_len()) {
            return Err(config_error!("layer {} has ragged weight rows", index));
        }
        if self.biases.len() != self.output_len() {
            return Err(config_error!(
                "layer {} has {} outputs but {} biases",
                index,
                self.output_len(),
                self.biases.len()
            ));
        }
        Ok(())
    }
}

/// Feed-forward network evaluated with candle on the CPU
pub struct DenseNetwork {
    layers: Vec<(Linear, Activation)>,
    specs: Vec<LayerSpec>,
    device: Device,
}

impl std::fmt::Debug for DenseNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape: Vec<(usize, usize)> = self
            .specs
            .iter()
            .map(|spec| (spec.input_len(), spec.output_len()))
            .collect();
        f.debug_struct("DenseNetwork").field("layers", &shape).finish()
    }
}

impl DenseNetwork {
    /// Build the network from exported layers, checking that their shapes chain
    pub fn from_layers(specs: Vec<LayerSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(config_error!("network has no layers"));
        }

        for (index, spec) in specs.iter().enumerate() {
            spec.validate(index)?;
        }
        for (index, pair) in specs.windows(2).enumerate() {
            if pair[0].output_len() != pair[1].input_len() {
                return Err(config_error!(
                    "layer {} outputs {} values but layer {} expects {}",
                    index,
                    pair[0].output_len(),
                    index + 1,
                    pair[1].input_len()
                ));
            }
        }

        let device = Device::Cpu;
        let mut layers = Vec::with_capacity(specs.len());
        for spec in &specs {
            let flat: Vec<f32> = spec.weights.iter().flatten().copied().collect();
            let weight = Tensor::from_vec(flat, (spec.output_len(), spec.input_len()), &device)?;
            let bias = Tensor::from_vec(spec.biases.clone(), spec.output_len(), &device)?;
            layers.push((Linear::new(weight, Some(bias)), spec.activation));
        }

        Ok(Self {
            layers,
            specs,
            device,
        })
    }

    pub fn layer_specs(&self) -> &[LayerSpec] {
        &self.specs
    }
}

impl Classifier for DenseNetwork {
    fn input_len(&self) -> usize {
        self.specs[0].input_len()
    }

    fn output_len(&self) -> usize {
        self.specs[self.specs.len() - 1].output_len()
    }

    fn predict(&self, input: &Array1<f32>) -> Result<Vec<f32>> {
        if input.len() != self.input_len() {
            return Err(config_error!(
                "classifier expects {} features, got {}",
                self.input_len(),
                input.len()
            ));
        }

        let mut x = Tensor::from_vec(input.to_vec(), (1, input.len()), &self.device)?;
        for (layer, activation) in &self.layers {
            x = layer.forward(&x)?;
            x = match activation {
                Activation::Relu => x.relu()?,
                Activation::Tanh => x.tanh()?,
                Activation::Softmax => softmax(&x, D::Minus1)?,
                Activation::Linear => x,
            };
        }

        let output = x.squeeze(0)?.to_vec1::<f32>()?;
        if output.iter().any(|p| !p.is_finite()) {
            return Err(AdvisorError::Model("classifier produced non-finite output".to_string()));
        }
        Ok(output)
    }
}
