//! Request-level orchestration: validation, extraction, classification and
//! recommendation behind one service object.

use crate::assembler::{FeatureAssembler, FeatureSet, FeatureVector};
use crate::config::AdvisorConfig;
use crate::config_error;
use crate::errors::{AdvisorError, Result};
use crate::game_record::{parse_color, GameRecord};
use crate::model_loader::ModelArtifacts;
use crate::openings::{OpeningEntry, OpeningRecommender, RankedOpening};
use crate::style::{StyleClass, StyleClassifier, StylePrediction};
use crate::validation::{GameValidator, PipelineStage, RequestState};
use chess::Color;
use log::{debug, error, info};
use rayon::prelude::*;
use serde::Serialize;

pub(crate) fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

/// ECO code and display name of one opening
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpeningSummary {
    pub code: String,
    pub name: String,
}

impl From<&OpeningEntry> for OpeningSummary {
    fn from(entry: &OpeningEntry) -> Self {
        Self {
            code: entry.code.clone(),
            name: entry.display_name.clone(),
        }
    }
}

/// Result of the style path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleReport {
    pub style: StyleClass,
    pub description: &'static str,
    pub distribution: Vec<f32>,
    /// First table entry of the detected style
    pub opening: OpeningSummary,
}

/// Result of the full detect-then-recommend flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub color: &'static str,
    pub style: StyleClass,
    pub style_name: &'static str,
    pub description: &'static str,
    pub distribution: Vec<f32>,
    pub recommendations: Vec<RankedOpening>,
    pub top_opening: OpeningSummary,
}

/// Structured output of the style path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StyleResponse {
    Success {
        style: String,
        opening: OpeningSummary,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureBody {
    pub status: &'static str,
    pub message: String,
}

/// Structured output of the recommender path: a bare list on success
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecommendationResponse {
    Ranked(Vec<RankedOpening>),
    Error(FailureBody),
}

/// One item of a batch run
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub pgn: String,
    pub color: Color,
}

fn failure_message(error: &AdvisorError) -> String {
    if error.is_request_error() {
        debug!("Request rejected: {}", error);
    } else {
        error!("Analysis failed: {}", error);
    }
    error.user_message()
}

/// Validate `pgn` and assemble one vector without any model
pub fn extract_features(
    config: &AdvisorConfig,
    pgn: &str,
    color: Color,
    style: Option<StyleClass>,
) -> Result<FeatureVector> {
    let game = GameValidator::new(config.min_half_moves).validate(pgn)?;
    let feature_set = if style.is_some() {
        FeatureSet::Recommender
    } else {
        FeatureSet::Style
    };
    FeatureAssembler::new(config.moves_to_analyze, feature_set).assemble(&game, color, style)
}

/// Holds both loaded models; shared read-only across requests
pub struct AnalysisService {
    config: AdvisorConfig,
    validator: GameValidator,
    style_assembler: FeatureAssembler,
    opening_assembler: FeatureAssembler,
    style_classifier: StyleClassifier,
    opening_recommender: OpeningRecommender,
}

impl AnalysisService {
    /// Wire the service, checking that both models match the vector lengths
    pub fn new(
        config: AdvisorConfig,
        style_classifier: StyleClassifier,
        opening_recommender: OpeningRecommender,
    ) -> Result<Self> {
        config.validate()?;

        let style_assembler = FeatureAssembler::new(config.moves_to_analyze, FeatureSet::Style);
        let opening_assembler =
            FeatureAssembler::new(config.moves_to_analyze, FeatureSet::Recommender);

        if style_classifier.input_len() != style_assembler.vector_len() {
            return Err(config_error!(
                "style model expects {} features but vectors have {}",
                style_classifier.input_len(),
                style_assembler.vector_len()
            ));
        }
        if opening_recommender.input_len() != opening_assembler.vector_len() {
            return Err(config_error!(
                "opening model expects {} features but vectors have {}",
                opening_recommender.input_len(),
                opening_assembler.vector_len()
            ));
        }

        info!(
            "Analysis service ready: {} blocks per game, minimum {} half-moves",
            config.moves_to_analyze, config.min_half_moves
        );

        Ok(Self {
            validator: GameValidator::new(config.min_half_moves),
            config,
            style_assembler,
            opening_assembler,
            style_classifier,
            opening_recommender,
        })
    }

    /// Load both model artifacts named by the configuration
    pub fn from_config(config: AdvisorConfig) -> Result<Self> {
        config.validate()?;
        let style = ModelArtifacts::load(&config.style_model_path)?.into_style_classifier()?;
        let openings = ModelArtifacts::load(&config.opening_model_path)?
            .into_opening_recommender(config.top_k)?;
        Self::new(config, style, openings)
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub fn opening_recommender(&self) -> &OpeningRecommender {
        &self.opening_recommender
    }

    fn accept(&self, state: &mut RequestState, pgn: &str) -> Result<GameRecord> {
        state.advance(PipelineStage::Validating)?;
        let game = self.validator.validate(pgn).map_err(|e| state.reject(e))?;
        state.advance(PipelineStage::Ready)?;
        Ok(game)
    }

    fn classify_game(
        &self,
        state: &mut RequestState,
        game: &GameRecord,
        color: Color,
    ) -> Result<StylePrediction> {
        let vector = self
            .style_assembler
            .assemble(game, color, None)
            .map_err(|e| state.reject(e))?;
        state.advance(PipelineStage::Extracted)?;
        let prediction = self.style_classifier.classify(&vector)?;
        state.advance(PipelineStage::Classified)?;
        Ok(prediction)
    }

    fn rank_for_style(
        &self,
        state: &mut RequestState,
        game: &GameRecord,
        color: Color,
        style: StyleClass,
    ) -> Result<Vec<RankedOpening>> {
        let vector = self
            .opening_assembler
            .assemble(game, color, Some(style))
            .map_err(|e| state.reject(e))?;
        state.advance(PipelineStage::Extracted)?;
        let ranked = self.opening_recommender.recommend(&vector)?;
        state.advance(PipelineStage::Recommended)?;
        Ok(ranked)
    }

    /// Detect the play style of `color` in the game
    pub fn detect_style(&self, pgn: &str, color: Color) -> Result<StyleReport> {
        let mut state = RequestState::new();
        let game = self.accept(&mut state, pgn)?;
        let prediction = self.classify_game(&mut state, &game, color)?;

        let opening = self
            .opening_recommender
            .table()
            .primary_for_style(prediction.style)
            .map(OpeningSummary::from)
            .ok_or_else(|| config_error!("no opening listed for style {}", prediction.style))?;

        info!(
            "Detected {} style for {} ({:.2})",
            prediction.style,
            color_name(color),
            prediction.confidence()
        );
        Ok(StyleReport {
            style: prediction.style,
            description: prediction.style.description(),
            distribution: prediction.distribution,
            opening,
        })
    }

    /// Rank openings for `color` given a style name
    pub fn recommend_openings(
        &self,
        pgn: &str,
        color: Color,
        style: &str,
    ) -> Result<Vec<RankedOpening>> {
        let style: StyleClass = style.parse()?;
        let mut state = RequestState::new();
        let game = self.accept(&mut state, pgn)?;
        self.rank_for_style(&mut state, &game, color, style)
    }

    /// Detect the style, then recommend openings for it
    pub fn analyze(&self, pgn: &str, color: Color) -> Result<AnalysisReport> {
        let mut state = RequestState::new();
        let game = self.accept(&mut state, pgn)?;
        let prediction = self.classify_game(&mut state, &game, color)?;
        let recommendations = self.rank_for_style(&mut state, &game, color, prediction.style)?;

        let top = recommendations
            .first()
            .ok_or_else(|| AdvisorError::Model("no opening could be recommended".to_string()))?;
        let top_opening = self
            .opening_recommender
            .table()
            .by_key(&top.opening_name)
            .map(OpeningSummary::from)
            .ok_or_else(|| config_error!("unknown opening '{}'", top.opening_name))?;

        Ok(AnalysisReport {
            color: color_name(color),
            style: prediction.style,
            style_name: prediction.style.display_name(),
            description: prediction.style.description(),
            distribution: prediction.distribution,
            recommendations,
            top_opening,
        })
    }

    /// Run independent analyses on the rayon pool, keeping input order
    pub fn analyze_batch(&self, requests: &[AnalysisRequest]) -> Vec<Result<AnalysisReport>> {
        debug!("Analyzing batch of {} games", requests.len());
        requests
            .par_iter()
            .map(|request| self.analyze(&request.pgn, request.color))
            .collect()
    }

    /// Style path with errors folded into the failure output
    pub fn detect_style_response(&self, pgn: &str, color: &str) -> StyleResponse {
        match parse_color(color).and_then(|color| self.detect_style(pgn, color)) {
            Ok(report) => StyleResponse::Success {
                style: report.style.display_name().to_string(),
                opening: report.opening,
            },
            Err(e) => StyleResponse::Error {
                message: failure_message(&e),
            },
        }
    }

    /// Recommender path with errors folded into the failure output
    pub fn recommend_openings_response(
        &self,
        pgn: &str,
        color: &str,
        style: &str,
    ) -> RecommendationResponse {
        match parse_color(color).and_then(|color| self.recommend_openings(pgn, color, style)) {
            Ok(ranked) => RecommendationResponse::Ranked(ranked),
            Err(e) => RecommendationResponse::Error(FailureBody {
                status: "error",
                message: failure_message(&e),
            }),
        }
    }
}
