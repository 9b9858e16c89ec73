use crate::config_error;
use crate::errors::Result;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Normalization applied to raw vectors before classification
pub trait Scaler: Send + Sync {
    /// Vector length the scaler was fitted on
    fn input_len(&self) -> usize;

    fn transform(&self, input: &Array1<f32>) -> Result<Array1<f32>>;
}

/// Fitted per-feature standardization: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Result<Self> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Scaler that leaves vectors untouched
    pub fn identity(len: usize) -> Self {
        Self {
            mean: vec![0.0; len],
            scale: vec![1.0; len],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mean.len() != self.scale.len() {
            return Err(config_error!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.iter().chain(self.scale.iter()).any(|v| !v.is_finite()) {
            return Err(config_error!("scaler parameters must be finite"));
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn input_len(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, input: &Array1<f32>) -> Result<Array1<f32>> {
        if input.len() != self.mean.len() {
            return Err(config_error!(
                "scaler expects {} features, got {}",
                self.mean.len(),
                input.len()
            ));
        }

        let mean = Array1::from(self.mean.clone());
        // Constant features were fitted with zero variance
        let scale = Array1::from(
            self.scale
                .iter()
                .map(|s| if *s == 0.0 { 1.0 } else { *s })
                .collect::<Vec<f32>>(),
        );

        Ok((input - &mean) / &scale)
    }
}
