//! Fixed-budget position evaluation on top of an engine session.

use chess_core::Position;

use crate::config::SearchSettings;
use crate::error::EngineError;
use crate::evaluation::EvaluationScore;
use crate::session::{EngineSession, SearchLimit, SessionState};

pub struct PositionEvaluator<S> {
    session: S,
    limit: SearchLimit,
    mate_score: i32,
}

impl<S: EngineSession> PositionEvaluator<S> {
    pub fn new(session: S, settings: &SearchSettings) -> Self {
        Self {
            session,
            limit: settings.limit(),
            mate_score: settings.mate_score,
        }
    }

    /// Evaluate `position` from its side to move's perspective.
    ///
    /// A score-less engine answer is not an error: `centipawns` is None.
    pub async fn evaluate(&mut self, position: &Position) -> Result<EvaluationScore, EngineError> {
        let report = self.session.evaluate(position, self.limit).await?;
        Ok(
            EvaluationScore::from_score(position.side_to_move, report.score, self.mate_score)
                .with_best_move(report.best_move)
                .with_depth(report.depth),
        )
    }

    pub fn limit(&self) -> SearchLimit {
        self.limit
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Swap in a fresh session, handing back the old one.
    pub fn replace_session(&mut self, session: S) -> S {
        std::mem::replace(&mut self.session, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Score;
    use crate::session::EngineReport;
    use chess_core::Side;
    use std::time::Duration;

    /// Answers every request with the same report, recording the limits it saw.
    struct CannedSession {
        report: EngineReport,
        limits: Vec<SearchLimit>,
    }

    impl EngineSession for CannedSession {
        fn state(&self) -> SessionState {
            SessionState::Ready
        }

        fn name(&self) -> &str {
            "canned"
        }

        async fn evaluate(
            &mut self,
            _position: &Position,
            limit: SearchLimit,
        ) -> Result<EngineReport, EngineError> {
            self.limits.push(limit);
            Ok(self.report.clone())
        }

        async fn stop(&mut self) {}
    }

    fn canned(score: Option<Score>) -> CannedSession {
        CannedSession {
            report: EngineReport {
                score,
                depth: Some(15),
                best_move: Some("g8f6".to_string()),
            },
            limits: Vec::new(),
        }
    }

    fn black_to_move() -> Position {
        Position {
            index: 1,
            fen: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".to_string(),
            side_to_move: Side::Black,
        }
    }

    #[tokio::test]
    async fn test_evaluate_side_to_move_perspective() {
        let mut evaluator = PositionEvaluator::new(
            canned(Some(Score::Centipawns(-25))),
            &SearchSettings::default(),
        );
        let eval = evaluator.evaluate(&black_to_move()).await.unwrap();
        assert_eq!(eval.perspective, Side::Black);
        assert_eq!(eval.centipawns, Some(-25));
        assert_eq!(eval.best_move.as_deref(), Some("g8f6"));
        assert_eq!(eval.depth, Some(15));
        assert_eq!(evaluator.session_mut().limits, vec![SearchLimit::Depth(15)]);
    }

    #[tokio::test]
    async fn test_evaluate_normalizes_mate() {
        let settings = SearchSettings {
            mate_score: 5_000,
            ..SearchSettings::default()
        };
        let mut evaluator = PositionEvaluator::new(canned(Some(Score::Mate(2))), &settings);
        let eval = evaluator.evaluate(&black_to_move()).await.unwrap();
        assert_eq!(eval.centipawns, Some(4_998));
        assert_eq!(eval.mate_in, Some(2));
    }

    #[tokio::test]
    async fn test_movetime_governs_when_set() {
        let settings =
            SearchSettings::default().with_movetime(Some(Duration::from_millis(300)));
        let mut evaluator = PositionEvaluator::new(canned(None), &settings);
        let eval = evaluator.evaluate(&black_to_move()).await.unwrap();
        assert_eq!(eval.centipawns, None);
        assert_eq!(
            evaluator.limit(),
            SearchLimit::MoveTime(Duration::from_millis(300))
        );
        assert_eq!(
            evaluator.session_mut().limits,
            vec![SearchLimit::MoveTime(Duration::from_millis(300))]
        );
    }

    #[test]
    fn test_replace_session() {
        let mut evaluator = PositionEvaluator::new(canned(None), &SearchSettings::default());
        let old = evaluator.replace_session(canned(Some(Score::Centipawns(1))));
        assert_eq!(old.report.score, None);
        assert_eq!(evaluator.session_state(), SessionState::Ready);
    }
}
