use crate::board_tracker::BoardTracker;
use crate::errors::Result;
use crate::extraction_error;
use crate::features::{total_material, MoveFeatures};
use crate::game_record::GameRecord;
use crate::style::StyleClass;
use chess::Color;
use log::{debug, error};
use ndarray::Array1;

/// Which classifier a vector is assembled for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSet {
    /// 12 features per block, no style block
    Style,
    /// 13 features per block followed by a style one-hot block
    Recommender,
}

impl FeatureSet {
    pub fn features_per_move(self) -> usize {
        match self {
            FeatureSet::Style => MoveFeatures::STYLE_LEN,
            FeatureSet::Recommender => MoveFeatures::RECOMMENDER_LEN,
        }
    }

    pub fn style_block_len(self) -> usize {
        match self {
            FeatureSet::Style => 0,
            FeatureSet::Recommender => StyleClass::COUNT,
        }
    }
}

/// Fixed-length vector produced for one (game, color) pair
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Array1<f32>,
    sampled_blocks: usize,
    feature_set: FeatureSet,
}

impl FeatureVector {
    pub fn values(&self) -> &Array1<f32> {
        &self.values
    }

    pub fn into_values(self) -> Array1<f32> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Blocks actually sampled before padding
    pub fn sampled_blocks(&self) -> usize {
        self.sampled_blocks
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.feature_set
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.values.to_vec()
    }
}

/// Walks a game record and samples feature blocks for one color
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    moves_to_analyze: usize,
    feature_set: FeatureSet,
}

impl FeatureAssembler {
    pub fn new(moves_to_analyze: usize, feature_set: FeatureSet) -> Self {
        Self {
            moves_to_analyze,
            feature_set,
        }
    }

    /// 30-block assembler for the style detector
    pub fn style_detector() -> Self {
        Self::new(30, FeatureSet::Style)
    }

    /// 30-block assembler for the opening recommender
    pub fn opening_recommender() -> Self {
        Self::new(30, FeatureSet::Recommender)
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.feature_set
    }

    pub fn moves_to_analyze(&self) -> usize {
        self.moves_to_analyze
    }

    /// Length of the per-move section
    pub fn block_section_len(&self) -> usize {
        self.moves_to_analyze * self.feature_set.features_per_move()
    }

    /// Total vector length `L`
    pub fn vector_len(&self) -> usize {
        self.block_section_len() + self.feature_set.style_block_len()
    }

    /// Assemble the feature vector of `color` for `game`.
    ///
    /// A block is sampled after every move that leaves `color` to move, up to
    /// `moves_to_analyze` blocks. The recommender variant requires `style`.
    pub fn assemble(
        &self,
        game: &GameRecord,
        color: Color,
        style: Option<StyleClass>,
    ) -> Result<FeatureVector> {
        let style = match (self.feature_set, style) {
            (FeatureSet::Recommender, None) => {
                return Err(extraction_error!("recommender vectors need a style label"))
            }
            (_, style) => style,
        };

        let per_move = self.feature_set.features_per_move();
        let mut values = Vec::with_capacity(self.vector_len());
        let mut tracker = BoardTracker::new(game.start());
        let mut previous_material = 0.0f32;
        let mut sampled_blocks = 0;

        for (ply, chess_move) in game.moves().iter().enumerate() {
            if sampled_blocks >= self.moves_to_analyze {
                break;
            }

            tracker.apply(*chess_move).map_err(|e| {
                error!("Extraction aborted at ply {}: {}", ply + 1, e);
                extraction_error!("ply {}: {}", ply + 1, e)
            })?;

            if tracker.side_to_move() != color {
                continue;
            }

            let features = MoveFeatures::extract(&tracker, previous_material);
            match self.feature_set {
                FeatureSet::Style => values.extend_from_slice(&features.style_block()),
                FeatureSet::Recommender => values.extend_from_slice(&features.recommender_block()),
            }
            previous_material = total_material(&tracker, tracker.side_to_move());
            sampled_blocks += 1;
        }

        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            error!(
                "Non-finite feature {} in block {}",
                index % per_move,
                index / per_move
            );
            return Err(extraction_error!(
                "non-finite value at feature index {}",
                index
            ));
        }

        // Zero-pad short games, truncate long ones
        values.resize(self.block_section_len(), 0.0);

        if let Some(style) = style {
            if self.feature_set == FeatureSet::Recommender {
                values.extend_from_slice(&style.one_hot());
            }
        }

        debug!(
            "Assembled {:?} vector for {:?}: {} blocks sampled from {} half-moves",
            self.feature_set,
            color,
            sampled_blocks,
            game.half_moves()
        );

        Ok(FeatureVector {
            values: Array1::from(values),
            sampled_blocks,
            feature_set: self.feature_set,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Board;
    use std::str::FromStr;

    /// Knights hop back and forth: 4 plies per cycle, always legal
    fn shuffle_game(half_moves: usize) -> GameRecord {
        let cycle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        let moves: Vec<&str> = cycle.iter().cycle().take(half_moves).copied().collect();
        GameRecord::from_uci_moves(&moves).unwrap()
    }

    #[test]
    fn test_vector_lengths() {
        assert_eq!(FeatureAssembler::style_detector().vector_len(), 360);
        assert_eq!(FeatureAssembler::opening_recommender().vector_len(), 393);
    }

    #[test]
    fn test_short_game_is_zero_padded() {
        let assembler = FeatureAssembler::style_detector();
        let vector = assembler.assemble(&shuffle_game(10), Color::White, None).unwrap();

        // White is to move after each of Black's 5 moves
        assert_eq!(vector.sampled_blocks(), 5);
        assert_eq!(vector.len(), 360);
        assert!(vector.values().iter().skip(5 * 12).all(|v| *v == 0.0));
        assert!(vector.values().iter().take(5 * 12).any(|v| *v != 0.0));
    }

    #[test]
    fn test_exact_length_game_fills_every_block() {
        let assembler = FeatureAssembler::style_detector();
        let game = shuffle_game(60);
        for color in [Color::White, Color::Black] {
            let vector = assembler.assemble(&game, color, None).unwrap();
            assert_eq!(vector.sampled_blocks(), 30);
            // Last block holds real features, not padding
            assert!(vector.values().iter().skip(29 * 12).any(|v| *v != 0.0));
        }
    }

    #[test]
    fn test_en_passant_game_is_assembled() {
        let game = GameRecord::from_pgn("1. e4 a6 2. e5 d5 3. exd6 *").unwrap();
        let vector = FeatureAssembler::new(3, FeatureSet::Style)
            .assemble(&game, Color::Black, None)
            .unwrap();
        assert_eq!(vector.sampled_blocks(), 3);

        // Third block sees the d5 pawn removed
        let after = BoardTracker::new(
            Board::from_str("rnbqkbnr/1pp1pppp/p2P4/8/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 3")
                .unwrap(),
        );
        let previous = total_material(&BoardTracker::default(), Color::Black);
        let expected = MoveFeatures::extract(&after, previous).style_block();
        assert_eq!(vector.to_vec()[24..36].to_vec(), expected.to_vec());
    }

    #[test]
    fn test_promotion_from_custom_start() {
        let pgn = "[FEN \"4k3/P7/8/8/8/8/8/4K3 w - - 0 1\"]\n\n1. a8=Q+ Kd7 2. Qb7+ *";
        let game = GameRecord::from_pgn(pgn).unwrap();
        let vector = FeatureAssembler::new(2, FeatureSet::Style)
            .assemble(&game, Color::Black, None)
            .unwrap();
        assert_eq!(vector.sampled_blocks(), 2);

        let promoted =
            BoardTracker::new(Board::from_str("Q3k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap());
        let expected = MoveFeatures::extract(&promoted, 0.0).style_block();
        assert_eq!(vector.to_vec()[..12].to_vec(), expected.to_vec());
    }

    #[test]
    fn test_long_game_is_truncated() {
        let assembler = FeatureAssembler::style_detector();
        let vector = assembler.assemble(&shuffle_game(100), Color::Black, None).unwrap();
        assert_eq!(vector.sampled_blocks(), 30);
        assert_eq!(vector.len(), 360);
    }

    #[test]
    fn test_first_black_block_is_after_first_white_move() {
        let assembler = FeatureAssembler::new(1, FeatureSet::Style);
        let game = shuffle_game(2);
        let vector = assembler.assemble(&game, Color::Black, None).unwrap();

        let mut tracker = BoardTracker::default();
        tracker.apply(game.moves()[0]).unwrap();
        let expected = MoveFeatures::extract(&tracker, 0.0).style_block();
        assert_eq!(vector.to_vec(), expected.to_vec());
    }

    #[test]
    fn test_recommender_appends_style_one_hot() {
        let assembler = FeatureAssembler::opening_recommender();
        let vector = assembler
            .assemble(&shuffle_game(60), Color::White, Some(StyleClass::Positional))
            .unwrap();

        assert_eq!(vector.len(), 393);
        let tail: Vec<f32> = vector.values().iter().skip(390).copied().collect();
        assert_eq!(tail, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_recommender_requires_style() {
        let assembler = FeatureAssembler::opening_recommender();
        assert!(assembler.assemble(&shuffle_game(60), Color::White, None).is_err());
    }

    #[test]
    fn test_deterministic() {
        let assembler = FeatureAssembler::style_detector();
        let game = shuffle_game(64);
        let first = assembler.assemble(&game, Color::White, None).unwrap();
        let second = assembler.assemble(&game, Color::White, None).unwrap();
        assert_eq!(first, second);
    }
}
