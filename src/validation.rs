use crate::errors::{AdvisorError, Result};
use crate::game_record::GameRecord;
use log::debug;
use std::fmt;

/// Lifecycle of one analysis request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Validating,
    Rejected,
    Ready,
    Extracted,
    Classified,
    Recommended,
}

impl PipelineStage {
    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Rejected)
                | (Validating, Ready)
                | (Ready, Extracted)
                | (Ready, Rejected)
                | (Extracted, Classified)
                | (Extracted, Recommended)
                | (Classified, Extracted)
                | (Classified, Recommended)
        )
    }

    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Rejected | PipelineStage::Recommended)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Validating => "validating",
            PipelineStage::Rejected => "rejected",
            PipelineStage::Ready => "ready",
            PipelineStage::Extracted => "extracted",
            PipelineStage::Classified => "classified",
            PipelineStage::Recommended => "recommended",
        };
        write!(f, "{}", name)
    }
}

/// Per-request stage tracker that refuses invalid transitions
#[derive(Debug, Clone)]
pub struct RequestState {
    stage: PipelineStage,
}

impl Default for RequestState {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestState {
    pub fn new() -> Self {
        Self {
            stage: PipelineStage::Idle,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn advance(&mut self, next: PipelineStage) -> Result<()> {
        if !self.stage.can_transition_to(next) {
            return Err(AdvisorError::Configuration(format!(
                "invalid stage transition {} -> {}",
                self.stage, next
            )));
        }
        debug!("Request stage {} -> {}", self.stage, next);
        self.stage = next;
        Ok(())
    }

    /// Move to `Rejected`, passing the error through
    pub fn reject(&mut self, error: AdvisorError) -> AdvisorError {
        debug!("Request rejected at stage {}: {}", self.stage, error);
        self.stage = PipelineStage::Rejected;
        error
    }
}

/// Input guards applied before any extraction work
#[derive(Debug, Clone)]
pub struct GameValidator {
    min_half_moves: usize,
}

impl Default for GameValidator {
    fn default() -> Self {
        Self::new(60)
    }
}

impl GameValidator {
    pub fn new(min_half_moves: usize) -> Self {
        Self { min_half_moves }
    }

    pub fn min_half_moves(&self) -> usize {
        self.min_half_moves
    }

    /// Validate raw bytes, which must be UTF-8 text
    pub fn validate_bytes(&self, input: &[u8]) -> Result<GameRecord> {
        let text = std::str::from_utf8(input)
            .map_err(|_| AdvisorError::InvalidInput("input is not valid UTF-8 text".to_string()))?;
        self.validate(text)
    }

    /// Parse the text and enforce the minimum game length
    pub fn validate(&self, text: &str) -> Result<GameRecord> {
        if text.trim().is_empty() {
            return Err(AdvisorError::InvalidInput("input is empty".to_string()));
        }

        let game = GameRecord::from_pgn(text)?;

        if game.half_moves() < self.min_half_moves {
            return Err(AdvisorError::InsufficientLength {
                half_moves: game.half_moves(),
                required: self.min_half_moves,
            });
        }
        Ok(game)
    }
}
