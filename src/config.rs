use crate::config_error;
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime configuration for the analysis service and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Number of sampled feature blocks per game
    pub moves_to_analyze: usize,
    /// Minimum number of half-moves a game needs to be analyzed
    pub min_half_moves: usize,
    /// Number of openings returned by the recommender
    pub top_k: usize,
    /// JSON artifact of the style classifier
    pub style_model_path: PathBuf,
    /// JSON artifact of the opening classifier
    pub opening_model_path: PathBuf,
    /// Worker threads used by the dataset builder
    pub dataset_threads: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            moves_to_analyze: 30,
            min_half_moves: 60,
            top_k: 3,
            style_model_path: PathBuf::from("models/style_detector.json"),
            opening_model_path: PathBuf::from("models/opening_recommender.json"),
            dataset_threads: num_cpus::get().min(16),
        }
    }
}

impl AdvisorConfig {
    /// Load a configuration from a JSON file; missing fields keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: AdvisorConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_moves_to_analyze(mut self, moves: usize) -> Self {
        self.moves_to_analyze = moves;
        self
    }

    pub fn with_min_half_moves(mut self, half_moves: usize) -> Self {
        self.min_half_moves = half_moves;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_model_paths<P: Into<PathBuf>, Q: Into<PathBuf>>(mut self, style: P, opening: Q) -> Self {
        self.style_model_path = style.into();
        self.opening_model_path = opening.into();
        self
    }

    pub fn with_dataset_threads(mut self, threads: usize) -> Self {
        self.dataset_threads = threads;
        self
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.moves_to_analyze == 0 {
            return Err(config_error!("moves_to_analyze must be at least 1"));
        }
        if self.top_k == 0 {
            return Err(config_error!("top_k must be at least 1"));
        }
        if self.dataset_threads == 0 {
            return Err(config_error!("dataset_threads must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AdvisorConfig::default();
        assert_eq!(config.moves_to_analyze, 30);
        assert_eq!(config.min_half_moves, 60);
        assert_eq!(config.top_k, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"top_k\": 5}}").unwrap();

        let config = AdvisorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.moves_to_analyze, 30);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(AdvisorConfig::default().with_top_k(0).validate().is_err());
        assert!(AdvisorConfig::default()
            .with_moves_to_analyze(0)
            .validate()
            .is_err());
    }
}
