//! Per-position heuristics sampled into feature blocks.
//!
//! Every extractor reads the position from the point of view of the side to
//! move ("own" pieces) and is total: degenerate positions produce a neutral
//! value instead of an error.

use crate::board_tracker::BoardTracker;
use chess::{BitBoard, Color, Piece, Square, ALL_SQUARES, EMPTY};

/// Piece weights shared by the material extractors
pub const PIECE_WEIGHTS: [(Piece, f32); 6] = [
    (Piece::Pawn, 1.5),
    (Piece::Knight, 3.2),
    (Piece::Bishop, 3.5),
    (Piece::Rook, 5.1),
    (Piece::Queen, 9.8),
    (Piece::King, 0.0),
];

/// Central and near-central squares watched by the control extractor
pub const KEY_SQUARES: [Square; 12] = [
    Square::D4,
    Square::D5,
    Square::E4,
    Square::E5,
    Square::C3,
    Square::C6,
    Square::F3,
    Square::F6,
    Square::D3,
    Square::E3,
    Square::D6,
    Square::E6,
];

const ACTIVE_PIECES: [Piece; 4] = [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen];

/// Weighted material of one side
pub fn total_material(tracker: &BoardTracker, color: Color) -> f32 {
    PIECE_WEIGHTS
        .iter()
        .map(|(piece, weight)| tracker.count(*piece, color) as f32 * weight)
        .sum()
}

/// Own minus opponent material, scaled down by 10
pub fn material_balance(tracker: &BoardTracker) -> f32 {
    let own = tracker.side_to_move();
    (total_material(tracker, own) - total_material(tracker, !own)) / 10.0
}

/// Pawn shield minus attackers minus distance from the center
pub fn king_safety(tracker: &BoardTracker) -> f32 {
    let own = tracker.side_to_move();
    king_safety_at(tracker, own, tracker.king_square(own))
}

/// Safety of `own`'s king on `king`; a missing king scores 0
fn king_safety_at(tracker: &BoardTracker, own: Color, king: Option<Square>) -> f32 {
    let king = match king {
        Some(square) => square,
        None => return 0.0,
    };

    let shield = (tracker.attacks_from(king) & tracker.pieces(Piece::Pawn, own)).popcnt() as f32;
    let attackers = tracker.attacker_count(!own, king) as f32;

    let file = king.get_file().to_index() as f32;
    let rank = king.get_rank().to_index() as f32;
    let center_distance = (3.5 - file).abs() + (3.5 - rank).abs();

    shield * 0.5 - attackers * 0.3 - center_distance * 0.2
}

/// Whether the pawn on `square` has no enemy pawn ahead on its own or adjacent files
fn is_passed_pawn(tracker: &BoardTracker, square: Square, color: Color) -> bool {
    let enemy_pawns = tracker.pieces(Piece::Pawn, !color);
    let file = square.get_file().to_index() as i32;
    let rank = square.get_rank().to_index() as i32;

    for enemy in enemy_pawns {
        let enemy_file = enemy.get_file().to_index() as i32;
        let enemy_rank = enemy.get_rank().to_index() as i32;
        let ahead = match color {
            Color::White => enemy_rank > rank,
            Color::Black => enemy_rank < rank,
        };
        if ahead && (enemy_file - file).abs() <= 1 {
            return false;
        }
    }
    true
}

fn passed_pawn_count(tracker: &BoardTracker, color: Color) -> u32 {
    tracker
        .pieces(Piece::Pawn, color)
        .filter(|square| is_passed_pawn(tracker, *square, color))
        .count() as u32
}

/// Passed pawns minus doubled-pawn excess minus isolated pawns
pub fn pawn_structure(tracker: &BoardTracker) -> f32 {
    let own = tracker.side_to_move();
    let pawns = tracker.pieces(Piece::Pawn, own);

    let mut per_file = [0i32; 8];
    for square in pawns {
        per_file[square.get_file().to_index()] += 1;
    }

    let doubled: i32 = per_file.iter().filter(|n| **n > 0).map(|n| n - 1).sum();
    let passed = passed_pawn_count(tracker, own) as i32;

    // Every pawn on a file without friendly neighbours counts once
    let isolated: i32 = (0..8)
        .filter(|f| {
            let left = if *f > 0 { per_file[f - 1] } else { 0 };
            let right = if *f < 7 { per_file[f + 1] } else { 0 };
            left == 0 && right == 0
        })
        .map(|f| per_file[f])
        .sum();

    (passed - doubled - isolated) as f32
}

/// Total attack-set size of own knights, bishops, rooks and queens
fn active_piece_attacks(tracker: &BoardTracker) -> u32 {
    let own = tracker.side_to_move();
    ACTIVE_PIECES
        .iter()
        .flat_map(|piece| tracker.pieces(*piece, own))
        .map(|square| tracker.attacks_from(square).popcnt())
        .sum()
}

pub fn piece_activity(tracker: &BoardTracker) -> f32 {
    active_piece_attacks(tracker) as f32 / 20.0
}

/// Number of key squares attacked by the side to move
pub fn key_square_control(tracker: &BoardTracker) -> f32 {
    let attacked = tracker.attacked_squares(tracker.side_to_move());
    KEY_SQUARES
        .iter()
        .filter(|square| attacked & BitBoard::from_square(**square) != EMPTY)
        .count() as f32
}

/// Number of files without pawns
pub fn openness(tracker: &BoardTracker) -> f32 {
    tracker.open_files().len() as f32
}

/// 1 when material dropped by more than 2 since the previous sample while the
/// center stays under control, else 0
pub fn sacrifice_flag(tracker: &BoardTracker, previous_material: f32) -> f32 {
    let current = total_material(tracker, tracker.side_to_move());
    if previous_material - current > 2.0 && key_square_control(tracker) > 4.0 {
        1.0
    } else {
        0.0
    }
}

/// Own pawns without a defender; negative when White is to move
pub fn tactical_exposure(tracker: &BoardTracker) -> f32 {
    let own = tracker.side_to_move();
    let undefended = tracker
        .pieces(Piece::Pawn, own)
        .filter(|square| tracker.attackers(own, *square) == EMPTY)
        .count() as f32;

    match own {
        Color::White => -undefended,
        Color::Black => undefended,
    }
}

/// Share of the board attacked by the side to move
pub fn space_advantage(tracker: &BoardTracker) -> f32 {
    let attacked = tracker.attacked_squares(tracker.side_to_move());
    let controlled = ALL_SQUARES
        .iter()
        .filter(|square| attacked & BitBoard::from_square(**square) != EMPTY)
        .count();
    controlled as f32 / 64.0
}

pub fn piece_mobility(tracker: &BoardTracker) -> f32 {
    active_piece_attacks(tracker) as f32 / 50.0
}

/// Own passed pawns over 8
pub fn passed_pawns(tracker: &BoardTracker) -> f32 {
    passed_pawn_count(tracker, tracker.side_to_move()) as f32 / 8.0
}

pub fn bishop_pair_edge(tracker: &BoardTracker) -> f32 {
    let own = tracker.side_to_move();
    let pair = |color: Color| if tracker.count(Piece::Bishop, color) >= 2 { 1.0 } else { 0.0 };
    pair(own) - pair(!own)
}

/// Weighted count of own pieces standing in the opponent's half
///
/// Pieces attacking at least one opponent piece weigh 1.5, the rest 1.0.
pub fn territory_presence(tracker: &BoardTracker) -> f32 {
    let own = tracker.side_to_move();
    let opponent = *tracker.board().color_combined(!own);
    let own_pieces = *tracker.board().color_combined(own);

    let mut presence = 0.0;
    for square in own_pieces {
        let rank = square.get_rank().to_index();
        let in_enemy_half = match own {
            Color::White => rank >= 4,
            Color::Black => rank <= 3,
        };
        if !in_enemy_half {
            continue;
        }
        presence += if tracker.attacks_from(square) & opponent != EMPTY {
            1.5
        } else {
            1.0
        };
    }
    presence / 10.0
}

/// One sampled feature block, in the order the classifiers were trained on
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveFeatures {
    pub material_balance: f32,
    pub king_safety: f32,
    pub pawn_structure: f32,
    pub piece_activity: f32,
    pub key_square_control: f32,
    pub openness: f32,
    pub sacrifice: f32,
    pub tactical_exposure: f32,
    pub space: f32,
    pub piece_mobility: f32,
    pub passed_pawns: f32,
    pub bishop_pair: f32,
    pub territory_presence: f32,
}

impl MoveFeatures {
    /// Block width of the style detector
    pub const STYLE_LEN: usize = 12;
    /// Block width of the opening recommender
    pub const RECOMMENDER_LEN: usize = 13;

    /// Run every extractor on the current position
    pub fn extract(tracker: &BoardTracker, previous_material: f32) -> Self {
        Self {
            material_balance: material_balance(tracker),
            king_safety: king_safety(tracker),
            pawn_structure: pawn_structure(tracker),
            piece_activity: piece_activity(tracker),
            key_square_control: key_square_control(tracker),
            openness: openness(tracker),
            sacrifice: sacrifice_flag(tracker, previous_material),
            tactical_exposure: tactical_exposure(tracker),
            space: space_advantage(tracker),
            piece_mobility: piece_mobility(tracker),
            passed_pawns: passed_pawns(tracker),
            bishop_pair: bishop_pair_edge(tracker),
            territory_presence: territory_presence(tracker),
        }
    }

    pub fn style_block(&self) -> [f32; Self::STYLE_LEN] {
        [
            self.material_balance,
            self.king_safety,
            self.pawn_structure,
            self.piece_activity,
            self.key_square_control,
            self.openness,
            self.sacrifice,
            self.tactical_exposure,
            self.space,
            self.piece_mobility,
            self.passed_pawns,
            self.bishop_pair,
        ]
    }

    pub fn recommender_block(&self) -> [f32; Self::RECOMMENDER_LEN] {
        let mut block = [0.0; Self::RECOMMENDER_LEN];
        block[..Self::STYLE_LEN].copy_from_slice(&self.style_block());
        block[Self::STYLE_LEN] = self.territory_presence;
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Board;
    use std::str::FromStr;

    fn tracker(fen: &str) -> BoardTracker {
        BoardTracker::new(Board::from_str(fen).unwrap())
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_start_position_block() {
        let features = MoveFeatures::extract(&BoardTracker::default(), 0.0);

        assert!(approx(features.material_balance, 0.0));
        // Shield of d2/e2/f2, king 4 files+ranks from the center
        assert!(approx(features.king_safety, 0.7));
        assert!(approx(features.pawn_structure, 0.0));
        assert!(approx(features.piece_activity, 0.95));
        assert!(approx(features.key_square_control, 4.0));
        assert!(approx(features.openness, 0.0));
        assert!(approx(features.sacrifice, 0.0));
        assert!(approx(features.tactical_exposure, 0.0));
        assert!(approx(features.space, 22.0 / 64.0));
        assert!(approx(features.piece_mobility, 0.38));
        assert!(approx(features.passed_pawns, 0.0));
        assert!(approx(features.bishop_pair, 0.0));
        assert!(approx(features.territory_presence, 0.0));
    }

    #[test]
    fn test_material_balance_is_relative_to_side_to_move() {
        let white = tracker("4k3/8/8/8/8/8/P7/4K3 w - - 0 1");
        let black = tracker("4k3/8/8/8/8/8/P7/4K3 b - - 0 1");
        assert!(approx(material_balance(&white), 0.15));
        assert!(approx(material_balance(&black), -0.15));
    }

    #[test]
    fn test_king_safety_castled_king() {
        let position = tracker("4k3/8/8/8/8/8/5PPP/6K1 w - - 0 1");
        // 3 shield pawns, no attackers, distance 6
        assert!(approx(king_safety(&position), 0.3));
    }

    #[test]
    fn test_king_safety_counts_attackers() {
        let position = tracker("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1");
        // Rook on e2 gives check: 0 shield, 1 attacker, distance 4
        assert!(approx(king_safety(&position), -0.3 - 0.8));
    }

    #[test]
    fn test_king_safety_without_king() {
        // Legal boards always carry both kings, so feed the missing square directly
        let position = tracker("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1");
        assert_eq!(king_safety_at(&position, Color::White, None), 0.0);
        assert_eq!(
            king_safety_at(&position, Color::White, Some(Square::E1)),
            king_safety(&position)
        );
    }

    #[test]
    fn test_pawn_structure_doubled_and_isolated() {
        let position = tracker("4k3/8/8/8/8/P7/P7/4K3 w - - 0 1");
        // Two passed pawns, one doubled excess, two isolated
        assert!(approx(pawn_structure(&position), -1.0));
    }

    #[test]
    fn test_passed_pawns_follow_advance_direction() {
        // Black pawn on d5 is passed: the white pawn on e6 stands behind it
        let position = tracker("4k3/8/4P3/3p4/8/8/8/4K3 b - - 0 1");
        assert!(approx(passed_pawns(&position), 1.0 / 8.0));

        // White pawn on e4 faces the black pawn ahead on the adjacent file
        let position = tracker("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1");
        assert!(approx(passed_pawns(&position), 0.0));
    }

    #[test]
    fn test_sacrifice_flag() {
        // Centralised queen controls 8 key squares, material 9.8
        let position = tracker("4k3/8/8/8/3Q4/8/8/4K3 w - - 0 1");
        assert!(approx(key_square_control(&position), 8.0));
        assert!(approx(sacrifice_flag(&position, 15.0), 1.0));
        assert!(approx(sacrifice_flag(&position, 11.0), 0.0));
        assert!(approx(sacrifice_flag(&position, 0.0), 0.0));
    }

    #[test]
    fn test_tactical_exposure_sign() {
        let white = tracker("4k3/8/8/8/8/8/P6P/4K3 w - - 0 1");
        let black = tracker("4k3/p6p/8/8/8/8/8/4K3 b - - 0 1");
        assert!(approx(tactical_exposure(&white), -2.0));
        assert!(approx(tactical_exposure(&black), 2.0));
    }

    #[test]
    fn test_openness_and_bishop_pair() {
        let position = tracker("2b1kb2/pp3ppp/8/8/8/8/PP4PP/2B1K3 w - - 0 1");
        assert!(approx(openness(&position), 3.0));
        assert!(approx(bishop_pair_edge(&position), -1.0));
    }

    #[test]
    fn test_territory_presence() {
        // Knight on e5 hits the rook on f7, pawn on a6 hits nothing
        let position = tracker("4k3/5r2/P7/4N3/8/8/8/4K3 w - - 0 1");
        assert!(approx(territory_presence(&position), 0.25));

        // From Black's side the rook stands in its own half
        let position = tracker("4k3/5r2/P7/4N3/8/8/8/4K3 b - - 0 1");
        assert!(approx(territory_presence(&position), 0.0));
    }

    #[test]
    fn test_block_layouts() {
        let features = MoveFeatures {
            material_balance: 1.0,
            bishop_pair: 12.0,
            territory_presence: 13.0,
            ..Default::default()
        };
        let style = features.style_block();
        let recommender = features.recommender_block();
        assert_eq!(style.len(), 12);
        assert_eq!(style[0], 1.0);
        assert_eq!(style[11], 12.0);
        assert_eq!(recommender[..12], style[..]);
        assert_eq!(recommender[12], 13.0);
    }
}
