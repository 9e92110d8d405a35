//! Engine session abstraction.
//!
//! The pipeline only talks to engines through [`EngineSession`] and
//! [`SessionLauncher`], so a UCI process, another engine or a scripted fake
//! can stand behind it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chess_core::Position;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::evaluation::Score;

/// Lifecycle of one engine process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Busy,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready => "ready",
            SessionState::Busy => "busy",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Exactly one of these governs each evaluation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchLimit {
    Depth(u32),
    MoveTime(Duration),
}

impl SearchLimit {
    /// The UCI `go` command for this limit.
    pub fn go_command(&self) -> String {
        match self {
            SearchLimit::Depth(depth) => format!("go depth {depth}"),
            SearchLimit::MoveTime(budget) => format!("go movetime {}", budget.as_millis().max(1)),
        }
    }
}

/// Raw engine answer for one position, from the side to move's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReport {
    /// None when the engine finished without reporting a score
    pub score: Option<Score>,
    pub depth: Option<u32>,
    /// None for `bestmove (none)` (no legal moves)
    pub best_move: Option<String>,
}

/// One running engine, reused across all requests for a game.
pub trait EngineSession: Send {
    fn state(&self) -> SessionState;

    /// Engine name reported during the handshake.
    fn name(&self) -> &str;

    /// Search `position` under `limit` and wait (bounded) for the result.
    ///
    /// A protocol error or timeout leaves the session `Terminated`.
    fn evaluate(
        &mut self,
        position: &Position,
        limit: SearchLimit,
    ) -> impl Future<Output = Result<EngineReport, EngineError>> + Send;

    /// Release the process. Safe to call in any state.
    fn stop(&mut self) -> impl Future<Output = ()> + Send;
}

/// Creates ready sessions (`start` + handshake).
pub trait SessionLauncher: Send + Sync {
    type Session: EngineSession;

    fn launch(&self) -> impl Future<Output = Result<Self::Session, EngineError>> + Send;
}
