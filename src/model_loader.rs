//! JSON model artifacts.
//!
//! A trained classifier is exported as one JSON document holding the fitted
//! scaler, the dense layers (row-major, one weight row per output unit) and,
//! depending on the model, its style labels or its opening table.

use crate::config_error;
use crate::errors::Result;
use crate::network::{DenseNetwork, LayerSpec};
use crate::openings::{OpeningRecommender, OpeningTable};
use crate::scaler::{Scaler, StandardScaler};
use crate::style::{StyleClass, StyleClassifier};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Serialized form of one trained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifacts {
    pub name: String,
    pub scaler: StandardScaler,
    pub layers: Vec<LayerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<StyleClass>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openings: Option<OpeningTable>,
}

impl ModelArtifacts {
    pub fn new(name: &str, scaler: StandardScaler, layers: Vec<LayerSpec>) -> Self {
        Self {
            name: name.to_string(),
            scaler,
            layers,
            labels: None,
            openings: None,
        }
    }

    pub fn with_labels(mut self, labels: Vec<StyleClass>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_openings(mut self, openings: OpeningTable) -> Self {
        self.openings = Some(openings);
        self
    }

    /// Read and validate an artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| config_error!("cannot read model '{}': {}", path.display(), e))?;
        let artifacts: ModelArtifacts = serde_json::from_str(&text)
            .map_err(|e| config_error!("invalid model '{}': {}", path.display(), e))?;
        artifacts.validate()?;

        info!(
            "Loaded model '{}' from {} ({} layers, {} inputs)",
            artifacts.name,
            path.display(),
            artifacts.layers.len(),
            artifacts.input_len()
        );
        Ok(artifacts)
    }

    /// Write the artifact as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Saved model '{}' to {}", self.name, path.display());
        Ok(())
    }

    /// Input length of the first layer
    pub fn input_len(&self) -> usize {
        self.layers.first().map(|layer| layer.input_len()).unwrap_or(0)
    }

    pub fn output_len(&self) -> usize {
        self.layers.last().map(|layer| layer.output_len()).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<()> {
        self.scaler.validate()?;
        if self.layers.is_empty() {
            return Err(config_error!("model '{}' has no layers", self.name));
        }
        if self.scaler.input_len() != self.input_len() {
            return Err(config_error!(
                "model '{}': scaler has {} features but the first layer expects {}",
                self.name,
                self.scaler.input_len(),
                self.input_len()
            ));
        }
        if let Some(labels) = &self.labels {
            if labels.len() != self.output_len() {
                return Err(config_error!(
                    "model '{}': {} labels for {} outputs",
                    self.name,
                    labels.len(),
                    self.output_len()
                ));
            }
        }
        Ok(())
    }

    /// Build the style classifier; labels default to the canonical style order
    pub fn into_style_classifier(self) -> Result<StyleClassifier> {
        self.validate()?;
        let labels = self.labels.unwrap_or_else(|| StyleClass::ALL.to_vec());
        let network = DenseNetwork::from_layers(self.layers)?;
        StyleClassifier::new(Box::new(self.scaler), Box::new(network), labels)
    }

    /// Build the opening recommender; the table defaults to the standard one
    pub fn into_opening_recommender(self, top_k: usize) -> Result<OpeningRecommender> {
        self.validate()?;
        let table = self.openings.unwrap_or_default();
        let network = DenseNetwork::from_layers(self.layers)?;
        OpeningRecommender::new(Box::new(self.scaler), Box::new(network), table, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AdvisorError;
    use crate::network::Activation;
    use ndarray::Array1;

    fn tiny_style_model() -> ModelArtifacts {
        ModelArtifacts::new(
            "style_detector",
            StandardScaler::identity(2),
            vec![LayerSpec {
                weights: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 0.0]],
                biases: vec![0.0, 0.0, 0.0],
                activation: Activation::Softmax,
            }],
        )
        .with_labels(StyleClass::ALL.to_vec())
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("style.json");

        let model = tiny_style_model();
        model.save(&path).unwrap();
        let loaded = ModelArtifacts::load(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_loaded_classifier_predicts() {
        let classifier = tiny_style_model().into_style_classifier().unwrap();
        let prediction = classifier
            .classify_values(&Array1::from(vec![0.0, 5.0]))
            .unwrap();
        assert_eq!(prediction.style, StyleClass::Positional);
    }

    #[test]
    fn test_opening_model_defaults_to_standard_table() {
        let model = ModelArtifacts::new(
            "opening_recommender",
            StandardScaler::identity(2),
            vec![LayerSpec {
                weights: vec![vec![0.0, 0.0]; 9],
                biases: vec![0.0; 9],
                activation: Activation::Softmax,
            }],
        );
        let recommender = model.into_opening_recommender(3).unwrap();
        assert_eq!(recommender.table().len(), 9);
        assert_eq!(recommender.top_k(), 3);
    }

    #[test]
    fn test_scaler_length_must_match_first_layer() {
        let mut model = tiny_style_model();
        model.scaler = StandardScaler::identity(3);
        assert!(matches!(model.validate(), Err(AdvisorError::Configuration(_))));
    }

    #[test]
    fn test_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ModelArtifacts::load(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(AdvisorError::Configuration(_))));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{\"name\": \"x\"}").unwrap();
        assert!(matches!(
            ModelArtifacts::load(&broken),
            Err(AdvisorError::Configuration(_))
        ));
    }
}
