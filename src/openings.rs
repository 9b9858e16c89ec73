use crate::assembler::FeatureVector;
use crate::config_error;
use crate::errors::{AdvisorError, Result};
use crate::network::Classifier;
use crate::scaler::Scaler;
use crate::style::StyleClass;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Static reference data for one recommended opening
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningEntry {
    /// Name the classifier was trained on
    pub key: String,
    /// ECO (Encyclopedia of Chess Openings) code
    pub code: String,
    pub display_name: String,
    pub style: StyleClass,
}

impl OpeningEntry {
    pub fn new(key: &str, code: &str, display_name: &str, style: StyleClass) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            display_name: display_name.to_string(),
            style,
        }
    }
}

/// Openings indexed by classifier output position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpeningTable {
    entries: Vec<OpeningEntry>,
}

impl Default for OpeningTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl OpeningTable {
    pub fn new(entries: Vec<OpeningEntry>) -> Self {
        Self { entries }
    }

    /// The nine openings the recommender was trained on
    pub fn standard() -> Self {
        use StyleClass::*;
        Self::new(vec![
            OpeningEntry::new("Catalana", "E00", "Apertura Catalana", Positional),
            OpeningEntry::new("Inglesa", "A10", "Apertura Inglesa", Positional),
            OpeningEntry::new("Londres", "D02", "Sistema Londres", Positional),
            OpeningEntry::new("Escocesa", "C44", "Apertura Escocesa", Combinative),
            OpeningEntry::new("Gambito_de_Rey", "C39", "Gambito de Rey", Combinative),
            OpeningEntry::new("Gambito_Danes", "C21", "Gambito Danés", Combinative),
            OpeningEntry::new("Italiana", "C50", "Apertura Italiana", Universal),
            OpeningEntry::new("Española", "C60", "Apertura Española", Universal),
            OpeningEntry::new("Gambito_de_Dama", "D00", "Gambito de Dama", Universal),
        ])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[OpeningEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&OpeningEntry> {
        self.entries.get(index)
    }

    pub fn by_key(&self, key: &str) -> Option<&OpeningEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Openings associated with a style, in table order
    pub fn for_style(&self, style: StyleClass) -> impl Iterator<Item = &OpeningEntry> {
        self.entries.iter().filter(move |entry| entry.style == style)
    }

    /// First table entry of the style
    pub fn primary_for_style(&self, style: StyleClass) -> Option<&OpeningEntry> {
        self.for_style(style).next()
    }
}

/// One ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOpening {
    pub opening_name: String,
    pub probability: f32,
}

fn round_to_hundredths(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Rank a predicted distribution against the opening table.
///
/// Indices without a table entry are dropped. Raw probabilities are sorted
/// descending, ties ordered by opening name; the first `top_k` entries are
/// returned with their probability rounded to two decimals.
pub fn rank_openings(distribution: &[f32], table: &OpeningTable, top_k: usize) -> Vec<RankedOpening> {
    let mut scored: Vec<(&OpeningEntry, f32)> = distribution
        .iter()
        .enumerate()
        .filter_map(|(index, probability)| table.get(index).map(|entry| (entry, *probability)))
        .collect();

    scored.sort_by(|(a, pa), (b, pb)| {
        pb.partial_cmp(pa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });

    scored
        .into_iter()
        .take(top_k)
        .map(|(entry, probability)| RankedOpening {
            opening_name: entry.key.clone(),
            probability: round_to_hundredths(probability),
        })
        .collect()
}

/// Scaler, classifier and opening table of the recommender
pub struct OpeningRecommender {
    scaler: Box<dyn Scaler>,
    classifier: Box<dyn Classifier>,
    table: OpeningTable,
    top_k: usize,
}

impl OpeningRecommender {
    pub fn new(
        scaler: Box<dyn Scaler>,
        classifier: Box<dyn Classifier>,
        table: OpeningTable,
        top_k: usize,
    ) -> Result<Self> {
        if scaler.input_len() != classifier.input_len() {
            return Err(config_error!(
                "opening scaler expects {} features but the classifier expects {}",
                scaler.input_len(),
                classifier.input_len()
            ));
        }
        if table.is_empty() {
            return Err(config_error!("opening table is empty"));
        }
        if classifier.output_len() != table.len() {
            // Extra indices are filtered at ranking time
            log::warn!(
                "Opening classifier has {} outputs for {} table entries",
                classifier.output_len(),
                table.len()
            );
        }
        Ok(Self {
            scaler,
            classifier,
            table,
            top_k,
        })
    }

    pub fn input_len(&self) -> usize {
        self.classifier.input_len()
    }

    pub fn table(&self) -> &OpeningTable {
        &self.table
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Rank openings for a vector that already carries its style block
    pub fn recommend(&self, vector: &FeatureVector) -> Result<Vec<RankedOpening>> {
        if vector.len() != self.input_len() {
            return Err(config_error!(
                "opening classifier expects {} features, got {}",
                self.input_len(),
                vector.len()
            ));
        }

        let scaled = self.scaler.transform(vector.values())?;
        let distribution = self.classifier.predict(&scaled)?;
        if distribution.is_empty() {
            return Err(AdvisorError::Model("empty opening distribution".to_string()));
        }

        let ranked = rank_openings(&distribution, &self.table, self.top_k);
        debug!("Opening ranking: {:?}", ranked);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ranked: &[RankedOpening]) -> Vec<&str> {
        ranked.iter().map(|r| r.opening_name.as_str()).collect()
    }

    #[test]
    fn test_standard_table() {
        let table = OpeningTable::standard();
        assert_eq!(table.len(), 9);
        assert_eq!(table.by_key("Londres").unwrap().code, "D02");
        assert_eq!(table.by_key("Gambito_de_Rey").unwrap().code, "C39");
        assert_eq!(table.for_style(StyleClass::Universal).count(), 3);
        assert_eq!(
            table.primary_for_style(StyleClass::Positional).unwrap().display_name,
            "Apertura Catalana"
        );
    }

    #[test]
    fn test_ranking_white_sample() {
        // Catalana, Inglesa, Londres, Escocesa, ..., Italiana, Española, Gambito_de_Dama
        let distribution = [0.781, 0.0, 0.0, 0.001, 0.0, 0.0, 0.218, 0.0, 0.0];
        let ranked = rank_openings(&distribution, &OpeningTable::standard(), 3);

        assert_eq!(names(&ranked), vec!["Catalana", "Italiana", "Escocesa"]);
        assert_eq!(ranked[0].probability, 0.78);
        assert_eq!(ranked[1].probability, 0.22);
        assert_eq!(ranked[2].probability, 0.0);
    }

    #[test]
    fn test_ranking_black_sample() {
        let distribution = [0.0001, 0.0, 0.979, 0.0199, 0.0, 0.0, 0.0, 0.0, 0.0];
        let ranked = rank_openings(&distribution, &OpeningTable::standard(), 3);

        assert_eq!(names(&ranked), vec!["Londres", "Escocesa", "Catalana"]);
        assert_eq!(ranked[0].probability, 0.98);
        assert_eq!(ranked[1].probability, 0.02);
    }

    #[test]
    fn test_alphabetical_tie_break() {
        let distribution = [0.2, 0.2, 0.2, 0.1, 0.1, 0.1, 0.05, 0.03, 0.02];
        let ranked = rank_openings(&distribution, &OpeningTable::standard(), 3);
        assert_eq!(names(&ranked), vec!["Catalana", "Inglesa", "Londres"]);

        let uniform = [1.0 / 9.0; 9];
        let ranked = rank_openings(&uniform, &OpeningTable::standard(), 9);
        let mut sorted = names(&ranked);
        sorted.sort();
        assert_eq!(names(&ranked), sorted);
    }

    #[test]
    fn test_sorts_before_rounding() {
        // Catalana and Inglesa both round to 0.0; Inglesa is still more likely
        let distribution = [0.001, 0.004, 0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.095];
        let ranked = rank_openings(&distribution, &OpeningTable::standard(), 3);

        assert_eq!(names(&ranked), vec!["Londres", "Gambito_de_Dama", "Inglesa"]);
        assert_eq!(ranked[0].probability, 0.9);
        assert_eq!(ranked[1].probability, 0.1);
        assert_eq!(ranked[2].probability, 0.0);
    }

    #[test]
    fn test_drift_indices_dropped() {
        let distribution = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1, 0.9];
        let ranked = rank_openings(&distribution, &OpeningTable::standard(), 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].opening_name, "Gambito_de_Dama");
    }

    #[test]
    fn test_output_is_non_increasing() {
        let distribution = [0.05, 0.3, 0.01, 0.14, 0.2, 0.1, 0.08, 0.07, 0.05];
        let ranked = rank_openings(&distribution, &OpeningTable::standard(), 3);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.windows(2).all(|w| w[0].probability >= w[1].probability));
    }
}
