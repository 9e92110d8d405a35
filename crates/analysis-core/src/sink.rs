//! JSON result sink: writes one report per analyzed game.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SinkError;
use crate::result::{AnalysisResult, Completion, GameSummary, MoveAnalysis};
use crate::session::SearchLimit;

/// Serialized form of one game's analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub source: String,
    /// 1-based position of the game in its PGN file
    pub game_index: usize,
    pub engine: String,
    pub limit: SearchLimit,
    pub analyzed_at: DateTime<Utc>,
    pub moves: Vec<MoveAnalysis>,
    pub completion: Completion,
    pub summary: GameSummary,
}

impl AnalysisReport {
    pub fn new(source: &Path, game_index: usize, limit: SearchLimit, result: AnalysisResult) -> Self {
        Self {
            source: source.display().to_string(),
            game_index,
            engine: result.engine,
            limit,
            analyzed_at: Utc::now(),
            moves: result.moves,
            completion: result.completion,
            summary: result.summary,
        }
    }
}

/// Writes `<stem>_analysis.json` (or `<stem>_<n>_analysis.json` for
/// multi-game files) into `output_dir`, or next to the PGN when unset.
#[derive(Debug, Clone, Default)]
pub struct JsonFileSink {
    output_dir: Option<PathBuf>,
}

impl JsonFileSink {
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self { output_dir }
    }

    pub fn output_path(&self, pgn_path: &Path, game_index: usize, game_count: usize) -> PathBuf {
        let stem = pgn_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "game".to_string());
        let file_name = if game_count > 1 {
            format!("{stem}_{game_index}_analysis.json")
        } else {
            format!("{stem}_analysis.json")
        };
        let dir = match &self.output_dir {
            Some(dir) => dir.as_path(),
            None => pgn_path.parent().unwrap_or_else(|| Path::new("")),
        };
        dir.join(file_name)
    }

    pub fn write(&self, report: &AnalysisReport, game_count: usize) -> Result<PathBuf, SinkError> {
        let path = self.output_path(Path::new(&report.source), report.game_index, game_count);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&path, json)?;
        info!(path = %path.display(), moves = report.moves.len(), "Analysis written");
        Ok(path)
    }
}
