use crate::assembler::FeatureVector;
use crate::config_error;
use crate::errors::{AdvisorError, Result};
use crate::network::Classifier;
use crate::scaler::Scaler;
use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Play-style categories, in classifier output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StyleClass {
    Combinative,
    Positional,
    Universal,
}

impl StyleClass {
    pub const COUNT: usize = 3;

    pub const ALL: [StyleClass; Self::COUNT] = [
        StyleClass::Combinative,
        StyleClass::Positional,
        StyleClass::Universal,
    ];

    pub fn index(self) -> usize {
        match self {
            StyleClass::Combinative => 0,
            StyleClass::Positional => 1,
            StyleClass::Universal => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Canonical key used in model artifacts
    pub fn key(self) -> &'static str {
        match self {
            StyleClass::Combinative => "combinative",
            StyleClass::Positional => "positional",
            StyleClass::Universal => "universal",
        }
    }

    /// Lowercase key accepted by the opening recommender
    pub fn recommender_key(self) -> &'static str {
        match self {
            StyleClass::Combinative => "combinativo",
            StyleClass::Positional => "posicional",
            StyleClass::Universal => "universal",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            StyleClass::Combinative => "Combinativo",
            StyleClass::Positional => "Posicional",
            StyleClass::Universal => "Universal",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StyleClass::Combinative => "Dynamic openings with aggressive tactical combinations.",
            StyleClass::Positional => "Openings that prioritise positional and structural control.",
            StyleClass::Universal => "Versatile openings that combine strategy and tactics.",
        }
    }

    /// Style block appended to recommender vectors
    pub fn one_hot(self) -> [f32; Self::COUNT] {
        let mut block = [0.0; Self::COUNT];
        block[self.index()] = 1.0;
        block
    }

    fn options() -> Vec<String> {
        Self::ALL
            .iter()
            .map(|style| style.recommender_key().to_string())
            .collect()
    }
}

impl fmt::Display for StyleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for StyleClass {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|style| wanted == style.key() || wanted == style.recommender_key())
            .ok_or_else(|| AdvisorError::InvalidStyle {
                given: s.to_string(),
                options: Self::options(),
            })
    }
}

impl TryFrom<String> for StyleClass {
    type Error = AdvisorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<StyleClass> for String {
    fn from(style: StyleClass) -> Self {
        style.key().to_string()
    }
}

/// Arg-max style plus the full distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StylePrediction {
    pub style: StyleClass,
    pub distribution: Vec<f32>,
}

impl StylePrediction {
    /// Probability assigned to the predicted style
    pub fn confidence(&self) -> f32 {
        self.distribution
            .get(self.style.index())
            .copied()
            .unwrap_or(0.0)
    }
}

/// Index of the largest value; the first one wins ties
pub(crate) fn arg_max(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (index, value)| match best {
            Some((_, best_value)) if *value <= best_value => best,
            _ => Some((index, *value)),
        })
        .map(|(index, _)| index)
}

/// Scaler, classifier and label table of the style detector
pub struct StyleClassifier {
    scaler: Box<dyn Scaler>,
    classifier: Box<dyn Classifier>,
    labels: Vec<StyleClass>,
}

impl StyleClassifier {
    /// Combine the parts, checking that their shapes agree
    pub fn new(
        scaler: Box<dyn Scaler>,
        classifier: Box<dyn Classifier>,
        labels: Vec<StyleClass>,
    ) -> Result<Self> {
        if scaler.input_len() != classifier.input_len() {
            return Err(config_error!(
                "style scaler expects {} features but the classifier expects {}",
                scaler.input_len(),
                classifier.input_len()
            ));
        }
        if labels.len() != classifier.output_len() {
            return Err(config_error!(
                "style classifier has {} outputs but {} labels",
                classifier.output_len(),
                labels.len()
            ));
        }
        Ok(Self {
            scaler,
            classifier,
            labels,
        })
    }

    /// Vector length the model was trained on
    pub fn input_len(&self) -> usize {
        self.classifier.input_len()
    }

    pub fn labels(&self) -> &[StyleClass] {
        &self.labels
    }

    pub fn classify(&self, vector: &FeatureVector) -> Result<StylePrediction> {
        self.classify_values(vector.values())
    }

    /// Scale, predict and pick the most likely style
    pub fn classify_values(&self, values: &Array1<f32>) -> Result<StylePrediction> {
        if values.len() != self.input_len() {
            return Err(config_error!(
                "style classifier expects {} features, got {}",
                self.input_len(),
                values.len()
            ));
        }

        let scaled = self.scaler.transform(values)?;
        let distribution = self.classifier.predict(&scaled)?;
        let index = arg_max(&distribution)
            .ok_or_else(|| AdvisorError::Model("empty style distribution".to_string()))?;
        let style = *self
            .labels
            .get(index)
            .ok_or_else(|| config_error!("no label for style index {}", index))?;

        debug!("Style distribution {:?} -> {}", distribution, style);
        Ok(StylePrediction {
            style,
            distribution,
        })
    }
}
