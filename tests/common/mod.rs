//! Shared fixtures: a scripted in-memory engine and sample games.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use analysis_core::{
    EngineError, EngineReport, EngineSession, Score, SearchLimit, SessionLauncher, SessionState,
};
use chess_core::{load_game, GameRecord, Position};

/// Ruy Lopez, 10 plies.
pub const RUY_LOPEZ: &str = r#"[Event "Club game"]
[White "Alice"]
[Black "Bob"]
[Result "*"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 4. Ba4 Nf6 5. O-O Be7 *
"#;

/// Scholar's mate, 7 plies.
pub const SCHOLARS_MATE: &str = "1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# 1-0";

pub fn ruy_lopez() -> GameRecord {
    load_game(RUY_LOPEZ).unwrap()
}

/// Score every position gets unless scripted otherwise.
pub const DEFAULT_CP: i32 = 10;

/// How a scripted request misbehaves.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Error and leave the session usable
    Transient(EngineError),
    /// Error and terminate the session
    Terminating(EngineError),
    /// Never answer
    Hang,
}

#[derive(Default)]
struct Script {
    faults: HashMap<usize, VecDeque<Fault>>,
    scores: HashMap<usize, Option<Score>>,
    max_launches: Option<usize>,
    launches: usize,
    stops: usize,
    requests: Vec<usize>,
}

/// Launches [`FakeSession`]s that answer by position index.
///
/// Clones share the same script and counters.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    script: Arc<Mutex<Script>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue faults for requests on the position with this ply index.
    pub fn fail_at(self, index: usize, faults: Vec<Fault>) -> Self {
        self.script
            .lock()
            .unwrap()
            .faults
            .entry(index)
            .or_default()
            .extend(faults);
        self
    }

    pub fn score_at(self, index: usize, score: Option<Score>) -> Self {
        self.script.lock().unwrap().scores.insert(index, score);
        self
    }

    /// Launches beyond `n` fail with `Unavailable`.
    pub fn max_launches(self, n: usize) -> Self {
        self.script.lock().unwrap().max_launches = Some(n);
        self
    }

    pub fn launches(&self) -> usize {
        self.script.lock().unwrap().launches
    }

    pub fn stops(&self) -> usize {
        self.script.lock().unwrap().stops
    }

    /// Position indices in the order they were requested.
    pub fn requests(&self) -> Vec<usize> {
        self.script.lock().unwrap().requests.clone()
    }
}

impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession, EngineError> {
        let mut script = self.script.lock().unwrap();
        if script.max_launches.is_some_and(|max| script.launches >= max) {
            return Err(EngineError::Unavailable {
                tried: vec!["fakefish".to_string()],
            });
        }
        script.launches += 1;
        Ok(FakeSession {
            state: SessionState::Ready,
            script: self.script.clone(),
        })
    }
}

enum Step {
    Answer(Option<Score>),
    Fail(Fault),
}

pub struct FakeSession {
    state: SessionState,
    script: Arc<Mutex<Script>>,
}

impl EngineSession for FakeSession {
    fn state(&self) -> SessionState {
        self.state
    }

    fn name(&self) -> &str {
        "FakeFish"
    }

    async fn evaluate(
        &mut self,
        position: &Position,
        _limit: SearchLimit,
    ) -> Result<EngineReport, EngineError> {
        if self.state != SessionState::Ready {
            self.state = SessionState::Terminated;
            return Err(EngineError::Protocol("session not ready".to_string()));
        }

        let step = {
            let mut script = self.script.lock().unwrap();
            script.requests.push(position.index);
            let fault = script
                .faults
                .get_mut(&position.index)
                .and_then(VecDeque::pop_front);
            match fault {
                Some(fault) => Step::Fail(fault),
                None => Step::Answer(
                    script
                        .scores
                        .get(&position.index)
                        .cloned()
                        .unwrap_or(Some(Score::Centipawns(DEFAULT_CP))),
                ),
            }
        };

        match step {
            Step::Answer(score) => Ok(EngineReport {
                score,
                depth: Some(15),
                best_move: Some("e2e4".to_string()),
            }),
            Step::Fail(Fault::Transient(err)) => Err(err),
            Step::Fail(Fault::Terminating(err)) => {
                self.state = SessionState::Terminated;
                Err(err)
            }
            Step::Fail(Fault::Hang) => {
                self.state = SessionState::Busy;
                std::future::pending().await
            }
        }
    }

    async fn stop(&mut self) {
        self.script.lock().unwrap().stops += 1;
        self.state = SessionState::Terminated;
    }
}
