//! Move-by-move game analysis with an external UCI engine.

pub mod cancel;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod loss;
pub mod pipeline;
pub mod result;
pub mod session;
pub mod sink;
pub mod stockfish;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::{AnalysisConfig, EngineConfig, SearchSettings};
pub use error::{AnalysisError, ConfigError, EngineError, ErrorKind, SinkError};
pub use evaluation::{EvaluationScore, Score};
pub use evaluator::PositionEvaluator;
pub use loss::{centipawn_loss, classify, Classification, MoveLoss};
pub use pipeline::AnalysisPipeline;
pub use result::{AnalysisResult, Completion, GameSummary, MoveAnalysis, SideSummary};
pub use session::{EngineReport, EngineSession, SearchLimit, SessionLauncher, SessionState};
pub use sink::{AnalysisReport, JsonFileSink};
pub use stockfish::{StockfishLauncher, UciSession};
