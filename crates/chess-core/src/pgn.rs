//! PGN loading: replays the mainline of each game with shakmaty.

use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::Path;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _};
use thiserror::Error;

use crate::game_data::{GameRecord, Move, Ply, Position, Side};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read PGN: {0}")]
    Io(#[from] io::Error),

    #[error("No game found in PGN")]
    NoGame,

    #[error("Invalid FEN tag '{0}'")]
    InvalidFen(String),

    #[error("Illegal move '{san}' at ply {ply}")]
    IllegalMove { ply: usize, san: String },
}

/// Tags collected during header parsing.
#[derive(Default)]
struct GameTags {
    fen: Option<String>,
    result: Option<String>,
}

/// State during movetext parsing.
struct GameState {
    board: Chess,
    start: Position,
    plies: Vec<Ply>,
    result: String,
}

fn snapshot(board: &Chess, index: usize) -> Position {
    Position {
        index,
        fen: Fen::from_position(board, EnPassantMode::Legal).to_string(),
        side_to_move: Side::from(board.turn()),
    }
}

/// Visitor that replays the mainline of every game it is fed.
struct GameLoader;

impl Visitor for GameLoader {
    type Tags = GameTags;
    type Movetext = GameState;
    type Output = Result<GameRecord, LoadError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, GameTags> {
        ControlFlow::Continue(GameTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut GameTags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        match name {
            b"FEN" => tags.fen = Some(value.decode_utf8_lossy().into_owned()),
            b"Result" => tags.result = Some(value.decode_utf8_lossy().into_owned()),
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: GameTags) -> ControlFlow<Self::Output, GameState> {
        let board = match tags.fen {
            Some(fen) => {
                let parsed = fen
                    .parse::<Fen>()
                    .ok()
                    .and_then(|f| f.into_position::<Chess>(CastlingMode::Standard).ok());
                match parsed {
                    Some(board) => board,
                    None => return ControlFlow::Break(Err(LoadError::InvalidFen(fen))),
                }
            }
            None => Chess::default(),
        };

        ControlFlow::Continue(GameState {
            start: snapshot(&board, 0),
            board,
            plies: Vec::new(),
            result: tags.result.unwrap_or_else(|| "*".to_string()),
        })
    }

    fn san(&mut self, state: &mut GameState, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        let index = state.plies.len();
        let san = san_plus.to_string();
        let illegal = || LoadError::IllegalMove {
            ply: index + 1,
            san: san.clone(),
        };

        let mv = match san_plus.san.to_move(&state.board) {
            Ok(mv) => mv,
            Err(_) => return ControlFlow::Break(Err(illegal())),
        };
        let uci = mv.to_uci(CastlingMode::Standard).to_string();
        let before = snapshot(&state.board, index);

        state.board = match state.board.clone().play(mv) {
            Ok(board) => board,
            Err(_) => return ControlFlow::Break(Err(illegal())),
        };

        state.plies.push(Ply {
            played: Move {
                number: index + 1,
                uci,
                san,
                mover: before.side_to_move,
            },
            before,
            after: snapshot(&state.board, index + 1),
        });

        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _state: &mut GameState) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, state: GameState) -> Self::Output {
        Ok(GameRecord {
            start: state.start,
            plies: state.plies,
            result: state.result,
        })
    }
}

/// Load every game in the PGN text, in file order.
pub fn load_games(pgn: &str) -> Result<Vec<GameRecord>, LoadError> {
    let mut reader = Reader::new(pgn.as_bytes());
    let mut loader = GameLoader;
    let mut games = Vec::new();

    while let Some(game) = reader.read_game(&mut loader)? {
        games.push(game?);
    }

    Ok(games)
}

/// Load the first game in the PGN text.
pub fn load_game(pgn: &str) -> Result<GameRecord, LoadError> {
    let mut reader = Reader::new(pgn.as_bytes());
    match reader.read_game(&mut GameLoader)? {
        Some(game) => game,
        None => Err(LoadError::NoGame),
    }
}

pub fn load_games_file(path: impl AsRef<Path>) -> Result<Vec<GameRecord>, LoadError> {
    load_games(&fs::read_to_string(path)?)
}

pub fn load_game_file(path: impl AsRef<Path>) -> Result<GameRecord, LoadError> {
    load_game(&fs::read_to_string(path)?)
}
