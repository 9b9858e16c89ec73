//! # Chess Style Advisor
//!
//! Classifies the play style of one side of a chess game and recommends
//! openings that suit it.
//!
//! A game record is replayed move by move; whenever the analysed color is to
//! move, a block of positional features (material, king safety, pawn
//! structure, mobility, space, ...) is sampled. The blocks form a fixed-length
//! vector which is standardized and fed to a small dense network.
//!
//! ## Features
//!
//! - **Feature extraction**: 13 positional extractors over a tracked board
//! - **Style detection**: combinative, positional or universal, with the
//!   matching primary opening
//! - **Opening recommendation**: the top three openings for a style, ranked by
//!   probability
//! - **JSON model artifacts**: scaler plus dense layers, evaluated with candle
//! - **Dataset extraction**: labelled vectors from master-game databases
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chess::Color;
//! use chess_style_advisor::{AdvisorConfig, AnalysisService};
//!
//! let config = AdvisorConfig::default()
//!     .with_model_paths("models/style_detector.json", "models/opening_recommender.json");
//! let service = AnalysisService::from_config(config).unwrap();
//!
//! let pgn = std::fs::read_to_string("game.pgn").unwrap();
//! let report = service.analyze(&pgn, Color::White).unwrap();
//! println!("{} -> {}", report.style_name, report.top_opening.name);
//! ```

// Core modules
pub mod errors;
pub mod config;

pub use errors::{AdvisorError, Result};

pub mod assembler;
pub mod board_tracker;
pub mod dataset;
pub mod features;
pub mod game_record;
pub mod model_loader;
pub mod network;
pub mod openings;
pub mod pipeline;
pub mod scaler;
pub mod style;
pub mod validation;

pub use assembler::{FeatureAssembler, FeatureSet, FeatureVector};
pub use board_tracker::BoardTracker;
pub use config::AdvisorConfig;
pub use dataset::{DatasetBuilder, DatasetRow};
pub use features::MoveFeatures;
pub use game_record::{parse_color, GameRecord};
pub use model_loader::ModelArtifacts;
pub use network::{Activation, Classifier, DenseNetwork, LayerSpec};
pub use openings::{rank_openings, OpeningEntry, OpeningRecommender, OpeningTable, RankedOpening};
pub use pipeline::{
    extract_features, AnalysisReport, AnalysisRequest, AnalysisService, OpeningSummary,
    RecommendationResponse, StyleReport, StyleResponse,
};
pub use scaler::{Scaler, StandardScaler};
pub use style::{StyleClass, StyleClassifier, StylePrediction};
pub use validation::{GameValidator, PipelineStage, RequestState};
