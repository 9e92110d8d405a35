//! Game loading for the analysis portal.
//!
//! Turns PGN text into an ordered list of plies, each carrying the position
//! before the move, the move itself and the position after it.

pub mod game_data;
pub mod pgn;

pub use game_data::{GameRecord, Move, Ply, Position, Side};
pub use pgn::{load_game, load_game_file, load_games, load_games_file, LoadError};
