//! Stockfish engine session using UCI protocol (async I/O)

use std::process::Stdio;

use chess_core::Position;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::evaluation::Score;
use crate::session::{EngineReport, EngineSession, SearchLimit, SessionLauncher, SessionState};

/// One running UCI engine process.
pub struct UciSession {
    process: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    path: String,
    name: String,
    state: SessionState,
    config: EngineConfig,
}

impl UciSession {
    /// Spawn the engine at `path` and complete the UCI handshake within
    /// `config.handshake_timeout`.
    pub async fn start(path: &str, config: &EngineConfig) -> Result<Self, EngineError> {
        let unavailable = || EngineError::Unavailable {
            tried: vec![path.to_string()],
        };

        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                warn!(path, error = %e, "Failed to spawn engine");
                unavailable()
            })?;

        let (Some(stdin), Some(stdout)) = (process.stdin.take(), process.stdout.take()) else {
            let _ = process.start_kill();
            return Err(unavailable());
        };

        let mut session = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            path: path.to_string(),
            name: String::new(),
            state: SessionState::Uninitialized,
            config: config.clone(),
        };

        match timeout(config.handshake_timeout, session.handshake()).await {
            Ok(Ok(())) => {
                session.state = SessionState::Ready;
                info!(path, engine = %session.name, "Engine ready");
                Ok(session)
            }
            Ok(Err(e)) => {
                warn!(path, error = %e, "Engine handshake failed");
                session.terminate();
                Err(unavailable())
            }
            Err(_) => {
                warn!(path, timeout = ?config.handshake_timeout, "Engine handshake timed out");
                session.terminate();
                Err(unavailable())
            }
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    async fn handshake(&mut self) -> Result<(), EngineError> {
        self.send("uci").await?;
        loop {
            let line = self.read_line().await?;
            if let Some(name) = line.strip_prefix("id name ") {
                self.name = name.trim().to_string();
            } else if line == "uciok" {
                break;
            }
        }
        if self.name.is_empty() {
            self.name = "Unknown Engine".to_string();
        }

        // Configure for analysis
        self.send(&format!("setoption name Threads value {}", self.config.threads))
            .await?;
        self.send(&format!("setoption name Hash value {}", self.config.hash_mb))
            .await?;
        self.send("setoption name UCI_AnalyseMode value true").await?;
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    /// Send a command to the engine
    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Protocol(format!("failed to write to engine: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| EngineError::Protocol(format!("failed to flush engine stdin: {e}")))?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        match self.stdout.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim().to_string();
                debug!(line = %trimmed, "SF >");
                Ok(trimmed)
            }
            Ok(None) => Err(EngineError::Protocol("engine closed its output".to_string())),
            Err(e) => Err(EngineError::Protocol(format!(
                "failed to read from engine: {e}"
            ))),
        }
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), EngineError> {
        loop {
            if self.read_line().await? == expected {
                return Ok(());
            }
        }
    }

    async fn search(
        &mut self,
        position: &Position,
        limit: SearchLimit,
    ) -> Result<EngineReport, EngineError> {
        self.send(&format!("position fen {}", position.fen)).await?;
        self.send(&limit.go_command()).await?;

        let mut report = EngineReport {
            score: None,
            depth: None,
            best_move: None,
        };

        loop {
            let line = self.read_line().await?;
            if line.starts_with("info ") {
                if let Some((depth, score)) = parse_info_line(&line) {
                    report.depth = depth.or(report.depth);
                    report.score = Some(score);
                }
            } else if line.starts_with("bestmove") {
                report.best_move = parse_bestmove(&line)?;
                return Ok(report);
            }
        }
    }

    /// Kill the process without waiting; the session is unusable afterwards.
    fn terminate(&mut self) {
        let _ = self.process.start_kill();
        self.state = SessionState::Terminated;
    }
}

impl EngineSession for UciSession {
    fn state(&self) -> SessionState {
        self.state
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(
        &mut self,
        position: &Position,
        limit: SearchLimit,
    ) -> Result<EngineReport, EngineError> {
        if self.state != SessionState::Ready {
            let err = EngineError::Protocol(format!("session is {}, not ready", self.state));
            self.terminate();
            return Err(err);
        }

        self.state = SessionState::Busy;
        let wait = self.config.response_timeout(limit);
        let deadline = Instant::now() + wait;

        let outcome = match timeout_at(deadline, self.search(position, limit)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout(wait)),
        };

        match outcome {
            Ok(report) => {
                self.state = SessionState::Ready;
                Ok(report)
            }
            Err(e) => {
                warn!(path = %self.path, fen = %position.fen, error = %e, "Engine fault, terminating session");
                self.terminate();
                Err(e)
            }
        }
    }

    async fn stop(&mut self) {
        if self.state == SessionState::Terminated {
            let _ = self.process.kill().await;
            return;
        }

        let was_busy = self.state == SessionState::Busy;
        let grace = self.config.shutdown_grace;
        let graceful = timeout(grace, async {
            if was_busy {
                let _ = self.send("stop").await;
            }
            let _ = self.send("quit").await;
            self.process.wait().await
        })
        .await;

        if !matches!(graceful, Ok(Ok(_))) {
            warn!(path = %self.path, "Engine did not exit after quit, killing");
            let _ = self.process.kill().await;
        }
        self.state = SessionState::Terminated;
        debug!(path = %self.path, "Engine stopped");
    }
}

impl Drop for UciSession {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

/// Launches [`UciSession`]s, trying the primary path then each fallback.
#[derive(Clone, Debug)]
pub struct StockfishLauncher {
    config: EngineConfig,
}

impl StockfishLauncher {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl SessionLauncher for StockfishLauncher {
    type Session = UciSession;

    async fn launch(&self) -> Result<UciSession, EngineError> {
        let mut tried = Vec::new();
        for path in self.config.candidate_paths() {
            match UciSession::start(path, &self.config).await {
                Ok(session) => return Ok(session),
                Err(_) => tried.push(path.to_string()),
            }
        }
        Err(EngineError::Unavailable { tried })
    }
}

/// Parse an `info` line into (depth, score).
///
/// Returns None for lines that must not replace the current score:
/// `info string`, lines without a score, bound scores and secondary PVs.
fn parse_info_line(line: &str) -> Option<(Option<u32>, Score)> {
    if line.starts_with("info string") {
        return None;
    }
    if line
        .split_whitespace()
        .any(|t| t == "lowerbound" || t == "upperbound")
    {
        return None;
    }
    if parse_multipv_index(line).is_some_and(|idx| idx > 1) {
        return None;
    }

    let score = match (parse_cp(line), parse_mate(line)) {
        (_, Some(mate)) => Score::Mate(mate),
        (Some(cp), None) => Score::Centipawns(cp),
        (None, None) => return None,
    };

    Some((parse_depth(line), score))
}

/// Value following `key` on an info line
fn token_after<T: std::str::FromStr>(line: &str, key: &str) -> Option<T> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == key && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    token_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    token_after(line, "mate")
}

fn parse_depth(line: &str) -> Option<u32> {
    token_after(line, "depth")
}

/// Parse multipv index from info line
fn parse_multipv_index(line: &str) -> Option<u32> {
    token_after(line, "multipv")
}

/// Parse `bestmove <move> [ponder <move>]`; `(none)` means no legal move.
fn parse_bestmove(line: &str) -> Result<Option<String>, EngineError> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some("bestmove") {
        return Err(EngineError::Protocol(format!("unexpected line: {line}")));
    }
    match parts.next() {
        Some("(none)") | Some("0000") => Ok(None),
        Some(mv) if is_uci_move(mv) => Ok(Some(mv.to_string())),
        _ => Err(EngineError::Protocol(format!("malformed bestmove: {line}"))),
    }
}

fn is_uci_move(mv: &str) -> bool {
    let b = mv.as_bytes();
    let square = |f: u8, r: u8| (b'a'..=b'h').contains(&f) && (b'1'..=b'8').contains(&r);
    match b.len() {
        4 => square(b[0], b[1]) && square(b[2], b[3]),
        5 => square(b[0], b[1]) && square(b[2], b[3]) && b"qrbn".contains(&b[4]),
        _ => false,
    }
}
