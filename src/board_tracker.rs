use crate::errors::{AdvisorError, Result};
use chess::{
    get_bishop_moves, get_file, get_king_moves, get_knight_moves, get_pawn_attacks,
    get_rook_moves, BitBoard, Board, ChessMove, Color, File, MoveGen, Piece, Square, ALL_FILES,
    EMPTY,
};

/// Mutable position used while walking a game record.
///
/// Wraps a `chess::Board` and answers the occupancy and attack queries the
/// feature extractors need. One tracker per extraction; never shared.
#[derive(Debug, Clone)]
pub struct BoardTracker {
    board: Board,
}

impl Default for BoardTracker {
    fn default() -> Self {
        Self::new(Board::default())
    }
}

impl BoardTracker {
    pub fn new(board: Board) -> Self {
        Self { board }
    }

    /// Current position
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    /// Apply one move, refusing anything illegal in the current position
    pub fn apply(&mut self, chess_move: ChessMove) -> Result<()> {
        if !self.board.legal(chess_move) {
            return Err(AdvisorError::IllegalMove(format!(
                "{} in position {}",
                chess_move, self.board
            )));
        }
        self.board = self.board.make_move_new(chess_move);
        Ok(())
    }

    /// Squares holding pieces of the given type and color
    pub fn pieces(&self, piece: Piece, color: Color) -> BitBoard {
        *self.board.pieces(piece) & *self.board.color_combined(color)
    }

    pub fn count(&self, piece: Piece, color: Color) -> u32 {
        self.pieces(piece, color).popcnt()
    }

    pub fn piece_on(&self, square: Square) -> Option<Piece> {
        self.board.piece_on(square)
    }

    pub fn color_on(&self, square: Square) -> Option<Color> {
        self.board.color_on(square)
    }

    /// King square, `None` when the side has no king on the board
    pub fn king_square(&self, color: Color) -> Option<Square> {
        let kings = self.pieces(Piece::King, color);
        if kings == EMPTY {
            None
        } else {
            Some(kings.to_square())
        }
    }

    /// Squares attacked by the piece standing on `square`
    ///
    /// Sliding attacks stop at the first occupied square, which is included.
    pub fn attacks_from(&self, square: Square) -> BitBoard {
        let (piece, color) = match (self.piece_on(square), self.color_on(square)) {
            (Some(piece), Some(color)) => (piece, color),
            _ => return EMPTY,
        };
        let occupied = *self.board.combined();

        match piece {
            Piece::Pawn => get_pawn_attacks(square, color, !EMPTY),
            Piece::Knight => get_knight_moves(square),
            Piece::Bishop => get_bishop_moves(square, occupied),
            Piece::Rook => get_rook_moves(square, occupied),
            Piece::Queen => get_bishop_moves(square, occupied) | get_rook_moves(square, occupied),
            Piece::King => get_king_moves(square),
        }
    }

    /// Pieces of `color` attacking `square`
    pub fn attackers(&self, color: Color, square: Square) -> BitBoard {
        let target = BitBoard::from_square(square);
        let mut attackers = EMPTY;
        for from in *self.board.color_combined(color) {
            if self.attacks_from(from) & target != EMPTY {
                attackers |= BitBoard::from_square(from);
            }
        }
        attackers
    }

    pub fn attacker_count(&self, color: Color, square: Square) -> u32 {
        self.attackers(color, square).popcnt()
    }

    pub fn is_attacked_by(&self, color: Color, square: Square) -> bool {
        self.attackers(color, square) != EMPTY
    }

    /// Union of every square attacked by `color`
    pub fn attacked_squares(&self, color: Color) -> BitBoard {
        let mut attacked = EMPTY;
        for from in *self.board.color_combined(color) {
            attacked |= self.attacks_from(from);
        }
        attacked
    }

    /// Files without a pawn of either color
    pub fn open_files(&self) -> Vec<File> {
        let pawns = *self.board.pieces(Piece::Pawn);
        ALL_FILES
            .iter()
            .copied()
            .filter(|file| pawns & get_file(*file) == EMPTY)
            .collect()
    }

    /// Legal destinations of the piece on `square` (empty if it cannot move now)
    pub fn legal_destinations(&self, square: Square) -> BitBoard {
        let mut destinations = EMPTY;
        for chess_move in MoveGen::new_legal(&self.board) {
            if chess_move.get_source() == square {
                destinations |= BitBoard::from_square(chess_move.get_dest());
            }
        }
        destinations
    }
}
