use crate::errors::{AdvisorError, Result};
use crate::malformed_record;
use chess::{Board, ChessMove, Color, File, MoveGen, Piece, Rank, Square};
use log::{debug, warn};
use pgn_reader::{BufferedReader, RawHeader, Role, San, SanPlus, Skip, Visitor};
use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;

/// Parse a `white`/`black` selector (case-insensitive)
pub fn parse_color(selector: &str) -> Result<Color> {
    match selector.trim().to_ascii_lowercase().as_str() {
        "white" | "w" => Ok(Color::White),
        "black" | "b" => Ok(Color::Black),
        other => Err(AdvisorError::InvalidColor(other.to_string())),
    }
}

/// Ordered mainline of one game plus its tag pairs
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    start: Board,
    moves: Vec<ChessMove>,
    headers: BTreeMap<String, String>,
}

impl GameRecord {
    /// Build a record from already-validated moves played from `start`
    pub fn new(start: Board, moves: Vec<ChessMove>, headers: BTreeMap<String, String>) -> Self {
        Self {
            start,
            moves,
            headers,
        }
    }

    /// Parse the first game of a PGN text
    pub fn from_pgn(text: &str) -> Result<Self> {
        let cursor = std::io::Cursor::new(text.as_bytes());
        let mut reader = BufferedReader::new(cursor);
        let mut collector = MoveCollector::new();

        match reader.read_game(&mut collector) {
            Ok(Some(result)) => result,
            Ok(None) => Err(malformed_record!("no game found in PGN text")),
            Err(e) => Err(malformed_record!("PGN read error: {}", e)),
        }
    }

    /// Build a record from UCI moves played from the initial position
    pub fn from_uci_moves(moves: &[&str]) -> Result<Self> {
        let start = Board::default();
        let mut board = start;
        let mut parsed = Vec::with_capacity(moves.len());

        for (ply, uci) in moves.iter().enumerate() {
            let chess_move = ChessMove::from_str(uci)
                .map_err(|_| malformed_record!("ply {}: cannot parse '{}'", ply + 1, uci))?;
            if !board.legal(chess_move) {
                return Err(malformed_record!("ply {}: '{}' is not legal", ply + 1, uci));
            }
            board = board.make_move_new(chess_move);
            parsed.push(chess_move);
        }

        Ok(Self::new(start, parsed, BTreeMap::new()))
    }

    /// Read every game of a multi-game PGN database, skipping malformed games
    pub fn read_all<R: Read>(source: R) -> Result<Vec<GameRecord>> {
        let mut reader = BufferedReader::new(source);
        let mut collector = MoveCollector::new();
        let mut games = Vec::new();
        let mut index = 0usize;

        while let Some(result) = reader
            .read_game(&mut collector)
            .map_err(|e| malformed_record!("PGN read error: {}", e))?
        {
            index += 1;
            match result {
                Ok(game) => games.push(game),
                Err(e) => warn!("Skipping game #{}: {}", index, e),
            }
        }

        debug!("Read {} of {} games", games.len(), index);
        Ok(games)
    }

    /// Position the game starts from
    pub fn start(&self) -> Board {
        self.start
    }

    pub fn moves(&self) -> &[ChessMove] {
        &self.moves
    }

    /// Number of half-moves in the mainline
    pub fn half_moves(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Name of the player with the given color, if tagged
    pub fn player(&self, color: Color) -> Option<&str> {
        match color {
            Color::White => self.header("White"),
            Color::Black => self.header("Black"),
        }
    }
}

fn piece_for(role: Role) -> Piece {
    match role {
        Role::Pawn => Piece::Pawn,
        Role::Knight => Piece::Knight,
        Role::Bishop => Piece::Bishop,
        Role::Rook => Piece::Rook,
        Role::Queen => Piece::Queen,
        Role::King => Piece::King,
    }
}

fn square_for(square: pgn_reader::Square) -> Square {
    Square::make_square(
        Rank::from_index(usize::from(square.rank())),
        File::from_index(usize::from(square.file())),
    )
}

/// Whether `chess_move` is what `san` describes in `board`
fn san_matches(board: &Board, san: &San, chess_move: ChessMove) -> bool {
    let source = chess_move.get_source();
    let dest = chess_move.get_dest();

    match san {
        San::Normal {
            role,
            file,
            rank,
            to,
            promotion,
            ..
        } => {
            board.piece_on(source) == Some(piece_for(*role))
                && dest == square_for(*to)
                && chess_move.get_promotion() == promotion.map(piece_for)
                && file.map_or(true, |f| source.get_file().to_index() == usize::from(f))
                && rank.map_or(true, |r| source.get_rank().to_index() == usize::from(r))
        }
        // Castling is encoded as the two-square king move
        San::Castle(side) => {
            let dest_file = if side.is_king_side() { File::G } else { File::C };
            board.piece_on(source) == Some(Piece::King)
                && source.get_file() == File::E
                && dest.get_file() == dest_file
        }
        San::Put { .. } | San::Null => false,
    }
}

/// Resolve a SAN move against the legal moves of `board`.
///
/// Covers promotions, en passant and disambiguated moves; `None` when no
/// legal move or more than one matches.
fn resolve_san(board: &Board, san: &San) -> Option<ChessMove> {
    let mut candidates = MoveGen::new_legal(board).filter(|m| san_matches(board, san, *m));
    let chess_move = candidates.next()?;
    if candidates.next().is_some() {
        return None;
    }
    Some(chess_move)
}

/// PGN visitor resolving the mainline SAN moves into a `GameRecord`
struct MoveCollector {
    board: Board,
    start: Board,
    moves: Vec<ChessMove>,
    headers: BTreeMap<String, String>,
    error: Option<String>,
}

impl MoveCollector {
    fn new() -> Self {
        Self {
            board: Board::default(),
            start: Board::default(),
            moves: Vec::new(),
            headers: BTreeMap::new(),
            error: None,
        }
    }
}

impl Visitor for MoveCollector {
    type Result = Result<GameRecord>;

    fn begin_game(&mut self) {
        self.board = Board::default();
        self.start = Board::default();
        self.moves.clear();
        self.headers.clear();
        self.error = None;
    }

    fn header(&mut self, key: &[u8], value: RawHeader<'_>) {
        let key = String::from_utf8_lossy(key).into_owned();
        let value = String::from_utf8_lossy(value.0).into_owned();

        // Games set up from a custom position
        if key.eq_ignore_ascii_case("FEN") {
            match Board::from_str(&value) {
                Ok(board) => {
                    self.board = board;
                    self.start = board;
                }
                Err(_) => self.error = Some(format!("invalid FEN header '{}'", value)),
            }
        }

        self.headers.insert(key, value);
    }

    fn san(&mut self, san_plus: SanPlus) {
        if self.error.is_some() {
            return;
        }

        match resolve_san(&self.board, &san_plus.san) {
            Some(chess_move) => {
                self.board = self.board.make_move_new(chess_move);
                self.moves.push(chess_move);
            }
            None => {
                let ply = self.moves.len() + 1;
                self.error = Some(format!("ply {}: cannot resolve '{}'", ply, san_plus.san));
            }
        }
    }

    fn begin_variation(&mut self) -> Skip {
        Skip(true) // mainline only
    }

    fn end_game(&mut self) -> Self::Result {
        if let Some(error) = self.error.take() {
            return Err(AdvisorError::MalformedRecord(error));
        }
        if self.moves.is_empty() {
            return Err(malformed_record!("game has no moves"));
        }

        Ok(GameRecord::new(
            self.start,
            std::mem::take(&mut self.moves),
            std::mem::take(&mut self.headers),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT_GAME: &str = r#"[Event "Casual"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]

1. e4 { [%clk 0:03:00] } e5 2. Nf3 Nc6 (2... d6 3. d4) 3. Bc4 Nf6 4. O-O Be7 1-0
"#;

    #[test]
    fn test_parse_mainline_and_headers() {
        let game = GameRecord::from_pgn(SHORT_GAME).unwrap();
        assert_eq!(game.half_moves(), 8);
        assert_eq!(game.player(Color::White), Some("Alice"));
        assert_eq!(game.player(Color::Black), Some("Bob"));
        assert_eq!(game.moves()[0], ChessMove::from_str("e2e4").unwrap());
        // Castling resolves to the king move
        assert_eq!(game.moves()[6], ChessMove::from_str("e1g1").unwrap());
    }

    #[test]
    fn test_queenside_castling() {
        let game =
            GameRecord::from_pgn("1. d4 d5 2. Nc3 Nc6 3. Bf4 Bf5 4. Qd2 Qd7 5. O-O-O O-O-O *")
                .unwrap();
        assert_eq!(game.half_moves(), 10);
        assert_eq!(game.moves()[8], ChessMove::from_str("e1c1").unwrap());
        assert_eq!(game.moves()[9], ChessMove::from_str("e8c8").unwrap());
    }

    #[test]
    fn test_en_passant_capture() {
        let game = GameRecord::from_pgn("1. e4 a6 2. e5 d5 3. exd6 *").unwrap();
        assert_eq!(game.half_moves(), 5);
        assert_eq!(game.moves()[4], ChessMove::from_str("e5d6").unwrap());
    }

    #[test]
    fn test_promotions_from_fen_header() {
        let pgn = "[FEN \"4k3/P7/8/8/8/8/8/4K3 w - - 0 1\"]\n\n1. a8=Q+ Kd7 2. Qb7+ *";
        let game = GameRecord::from_pgn(pgn).unwrap();
        assert_eq!(game.start(), Board::from_str("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap());
        assert_eq!(game.half_moves(), 3);
        assert_eq!(game.moves()[0], ChessMove::from_str("a7a8q").unwrap());

        let under = GameRecord::from_pgn("[FEN \"4k3/P7/8/8/8/8/8/4K3 w - - 0 1\"]\n\n1. a8=N *")
            .unwrap();
        assert_eq!(under.moves()[0], ChessMove::from_str("a7a8n").unwrap());

        let capture = GameRecord::from_pgn("[FEN \"r3k3/1P6/8/8/8/8/8/4K3 w - - 0 1\"]\n\n1. bxa8=Q+ *")
            .unwrap();
        assert_eq!(capture.moves()[0], ChessMove::from_str("b7a8q").unwrap());
    }

    #[test]
    fn test_disambiguation() {
        let game = GameRecord::from_pgn("1. Nf3 Nf6 2. Nc3 Nc6 3. Nd4 Nd5 4. Ncb5 *").unwrap();
        assert_eq!(game.moves()[6], ChessMove::from_str("c3b5").unwrap());

        // Two knights reach b5
        let ambiguous = GameRecord::from_pgn("1. Nf3 Nf6 2. Nc3 Nc6 3. Nd4 Nd5 4. Nb5 *");
        assert!(matches!(ambiguous, Err(AdvisorError::MalformedRecord(_))));
    }

    #[test]
    fn test_illegal_move_is_malformed() {
        let result = GameRecord::from_pgn("1. e4 e5 2. Ke3 *");
        assert!(matches!(result, Err(AdvisorError::MalformedRecord(_))));
    }

    #[test]
    fn test_text_without_moves_is_malformed() {
        let result = GameRecord::from_pgn("[Event \"Empty\"]\n\n*");
        assert!(matches!(result, Err(AdvisorError::MalformedRecord(_))));
    }

    #[test]
    fn test_read_all_skips_bad_games() {
        let database = format!("{}\n\n1. e4 e5 2. Qxf7 *\n\n{}", SHORT_GAME, SHORT_GAME);
        let games = GameRecord::read_all(database.as_bytes()).unwrap();
        assert_eq!(games.len(), 2);
    }

    #[test]
    fn test_from_uci_moves() {
        let game = GameRecord::from_uci_moves(&["d2d4", "d7d5", "c2c4"]).unwrap();
        assert_eq!(game.half_moves(), 3);
        assert!(GameRecord::from_uci_moves(&["e2e5"]).is_err());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("White").unwrap(), Color::White);
        assert_eq!(parse_color(" black ").unwrap(), Color::Black);
        assert_eq!(
            parse_color("red"),
            Err(AdvisorError::InvalidColor("red".to_string()))
        );
    }
}
