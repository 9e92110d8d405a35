//! Game analysis loop: one engine session walks a game move by move.

use chess_core::{GameRecord, Ply, Position};
use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;
use crate::config::SearchSettings;
use crate::error::{AnalysisError, EngineError};
use crate::evaluation::EvaluationScore;
use crate::evaluator::PositionEvaluator;
use crate::loss::{centipawn_loss, classify};
use crate::result::{AnalysisResult, Completion, MoveAnalysis};
use crate::session::{EngineSession, SessionLauncher, SessionState};

pub struct AnalysisPipeline<L> {
    launcher: L,
    settings: SearchSettings,
}

impl<L: SessionLauncher> AnalysisPipeline<L> {
    pub fn new(launcher: L, settings: SearchSettings) -> Self {
        Self { launcher, settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Analyze every ply of `game` in order.
    ///
    /// Returns a complete result, a partial one ending before the move that
    /// failed, or an error when the engine never started or no move succeeded.
    /// The session is stopped exactly once whenever one was launched.
    pub async fn run(
        &self,
        game: &GameRecord,
        mut cancel: CancelSignal,
    ) -> Result<AnalysisResult, AnalysisError> {
        if game.is_empty() {
            info!("Game has no moves, nothing to analyze");
            return Ok(AnalysisResult::new(String::new(), Vec::new(), Completion::Complete));
        }

        let session = self
            .launch(&mut cancel)
            .await
            .map_err(|source| AnalysisError::Engine {
                move_number: None,
                source,
            })?;
        let engine = session.name().to_string();
        let mut evaluator = PositionEvaluator::new(session, &self.settings);
        info!(engine = %engine, plies = game.len(), limit = ?evaluator.limit(), "Starting analysis");

        let mut moves = Vec::with_capacity(game.len());
        let mut failure = None;

        for ply in &game.plies {
            match self.analyze_move(&mut evaluator, ply, &mut cancel).await {
                Ok(analysis) => moves.push(analysis),
                Err(e) => {
                    failure = Some((ply.played.number, e));
                    break;
                }
            }
        }

        evaluator.session_mut().stop().await;

        let Some((stopped_at, source)) = failure else {
            let result = AnalysisResult::new(engine, moves, Completion::Complete);
            info!(
                moves = result.moves.len(),
                white_accuracy = result.summary.white.accuracy,
                black_accuracy = result.summary.black.accuracy,
                "Analysis complete"
            );
            return Ok(result);
        };

        if moves.is_empty() {
            return Err(AnalysisError::Engine {
                move_number: Some(stopped_at),
                source,
            });
        }

        warn!(stopped_at, analyzed = moves.len(), error = %source, "Analysis stopped early");
        let completion = Completion::Partial {
            stopped_at,
            error: source.kind(),
            message: source.to_string(),
        };
        Ok(AnalysisResult::new(engine, moves, completion))
    }

    async fn analyze_move(
        &self,
        evaluator: &mut PositionEvaluator<L::Session>,
        ply: &Ply,
        cancel: &mut CancelSignal,
    ) -> Result<MoveAnalysis, EngineError> {
        let number = ply.played.number;
        let mover = ply.played.mover;

        let before = self.request(evaluator, &ply.before, number, cancel).await?;
        let after = self.request(evaluator, &ply.after, number, cancel).await?;

        let loss = centipawn_loss(
            before.centipawns_for(mover),
            after.centipawns_for(mover.opponent()),
        );
        if loss.evaluation_missing {
            warn!(move_number = number, "Engine returned no score, counting zero loss");
        }
        debug!(move_number = number, uci = %ply.played.uci, loss = loss.centipawn_loss, "Move analyzed");

        Ok(MoveAnalysis {
            move_number: number,
            move_uci: ply.played.uci.clone(),
            san: ply.played.san.clone(),
            mover,
            eval_before: loss.eval_before,
            eval_after: loss.eval_after,
            centipawn_loss: loss.centipawn_loss,
            classification: classify(loss.centipawn_loss),
            best_move: before.best_move,
            depth: before.depth,
            // Mover's point of view; 0 means the move gave mate
            mate_in: after.mate_in.map(i32::saturating_neg),
            evaluation_missing: loss.evaluation_missing,
        })
    }

    /// Evaluate one position.
    ///
    /// Consecutive faults on the request get one in-session retry while the
    /// session is alive and one session-restart retry once it has terminated.
    /// Any further fault is returned.
    async fn request(
        &self,
        evaluator: &mut PositionEvaluator<L::Session>,
        position: &Position,
        move_number: usize,
        cancel: &mut CancelSignal,
    ) -> Result<EvaluationScore, EngineError> {
        let mut retried_in_session = false;
        let mut restarted = false;

        loop {
            let err = match evaluate_or_cancel(evaluator, position, cancel).await {
                Ok(score) => return Ok(score),
                Err(e) => e,
            };
            if !err.is_retryable() {
                return Err(err);
            }

            match evaluator.session_state() {
                SessionState::Terminated if !restarted => {
                    restarted = true;
                    warn!(move_number, error = %err, "Engine session terminated, restarting");
                    let fresh = self.launch(cancel).await?;
                    drop(evaluator.replace_session(fresh));
                }
                SessionState::Terminated => return Err(err),
                _ if !retried_in_session => {
                    retried_in_session = true;
                    warn!(move_number, error = %err, "Retrying evaluation on the same session");
                }
                _ => return Err(err),
            }
        }
    }

    async fn launch(&self, cancel: &mut CancelSignal) -> Result<L::Session, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            session = self.launcher.launch() => session,
        }
    }
}

async fn evaluate_or_cancel<S: EngineSession>(
    evaluator: &mut PositionEvaluator<S>,
    position: &Position,
    cancel: &mut CancelSignal,
) -> Result<EvaluationScore, EngineError> {
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        result = evaluator.evaluate(position) => result,
    }
}
