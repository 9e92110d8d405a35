//! Integration tests against a real Stockfish binary.
//!
//! Run with `cargo test --test stockfish_test -- --ignored`; the engine is found
//! through STOCKFISH_PATH / STOCKFISH_FALLBACK_PATHS like the CLI does.

mod common;

use analysis_core::{
    AnalysisConfig, AnalysisPipeline, CancelSignal, Classification, Completion, EngineSession,
    SearchLimit, SessionLauncher, StockfishLauncher,
};
use chess_core::load_game;

fn launcher() -> (StockfishLauncher, AnalysisConfig) {
    let config = AnalysisConfig::load().expect("invalid analysis config");
    (StockfishLauncher::new(config.engine.clone()), config)
}

#[tokio::test]
#[ignore]
async fn test_real_engine_handshake_and_search() {
    let (launcher, _) = launcher();
    let game = load_game(common::SCHOLARS_MATE).unwrap();

    let mut session = launcher.launch().await.expect("no Stockfish found");
    assert!(session.name().contains("Stockfish"));

    // Mated position: no best move, mate 0
    let report = session
        .evaluate(game.final_position(), SearchLimit::Depth(5))
        .await
        .unwrap();
    assert_eq!(report.best_move, None);

    let report = session
        .evaluate(&game.start, SearchLimit::Depth(8))
        .await
        .unwrap();
    assert!(report.score.is_some());
    assert!(report.best_move.is_some());

    session.stop().await;
}

#[tokio::test]
#[ignore]
async fn test_real_engine_scholars_mate() {
    let (launcher, config) = launcher();
    let settings = config.search.with_depth(10);
    let game = load_game(common::SCHOLARS_MATE).unwrap();

    let result = AnalysisPipeline::new(launcher, settings)
        .run(&game, CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(result.completion, Completion::Complete);
    assert_eq!(result.moves.len(), 7);
    assert!(result.moves.iter().all(|m| m.centipawn_loss >= 0));

    // 3...Nf6?? allows Qxf7#
    let blunder = &result.moves[5];
    assert_eq!(blunder.san, "Nf6");
    assert_eq!(blunder.classification, Classification::Blunder);
    assert!(blunder.eval_after < -9_000);

    // Delivering mate loses nothing
    let mate = &result.moves[6];
    assert_eq!(mate.san, "Qxf7#");
    assert_eq!(mate.centipawn_loss, 0);
    assert_eq!(mate.eval_after, 10_000);
}
