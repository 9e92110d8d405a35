//! Analysis configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::warn;

use crate::error::ConfigError;
use crate::session::SearchLimit;

/// Primary engine location used when `STOCKFISH_PATH` is unset (Homebrew on macOS).
pub const DEFAULT_ENGINE_PATH: &str = "/opt/homebrew/bin/stockfish";

pub const DEFAULT_FALLBACK_PATHS: &[&str] = &["/usr/local/bin/stockfish", "/usr/bin/stockfish", "stockfish"];

pub const DEFAULT_DEPTH: u32 = 15;
pub const MAX_DEPTH: u32 = 25;
pub const DEFAULT_MATE_SCORE: i32 = 10_000;

/// How to find and drive the engine process.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Tried first
    pub path: String,

    /// Tried in order when the primary path fails to launch or handshake
    pub fallback_paths: Vec<String>,

    /// Upper bound for `uci`/`uciok` + `isready`/`readyok`
    pub handshake_timeout: Duration,

    /// Added to a move-time budget to bound the wait for `bestmove`
    pub response_overhead: Duration,

    /// Wait bound for depth-limited searches
    pub depth_timeout: Duration,

    /// How long `quit` may take before the process is killed
    pub shutdown_grace: Duration,

    pub threads: u32,
    pub hash_mb: u32,
}

impl EngineConfig {
    /// Primary path followed by the fallbacks, without duplicates.
    pub fn candidate_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::with_capacity(self.fallback_paths.len() + 1);
        for path in std::iter::once(&self.path).chain(&self.fallback_paths) {
            let path = path.trim();
            if !path.is_empty() && !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Bounded wait for an evaluation under `limit`; always longer than the search budget.
    pub fn response_timeout(&self, limit: SearchLimit) -> Duration {
        match limit {
            SearchLimit::MoveTime(budget) => budget + self.response_overhead,
            SearchLimit::Depth(_) => self.depth_timeout,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_ENGINE_PATH.to_string(),
            fallback_paths: DEFAULT_FALLBACK_PATHS.iter().map(|p| p.to_string()).collect(),
            handshake_timeout: Duration::from_secs(10),
            response_overhead: Duration::from_secs(5),
            depth_timeout: Duration::from_secs(120),
            shutdown_grace: Duration::from_secs(2),
            threads: 1,
            hash_mb: 256,
        }
    }
}

/// Search budget applied to every evaluation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchSettings {
    pub default_depth: u32,
    pub max_depth: u32,

    /// When set, a fixed time budget replaces the depth limit
    pub movetime: Option<Duration>,

    /// Magnitude that mate scores are normalized to
    pub mate_score: i32,
}

impl SearchSettings {
    /// Override the depth, clamped to `max_depth`.
    pub fn with_depth(mut self, depth: u32) -> Self {
        if depth > self.max_depth {
            warn!(requested = depth, max = self.max_depth, "Depth above maximum, clamping");
        }
        self.default_depth = depth.clamp(1, self.max_depth);
        self
    }

    pub fn with_movetime(mut self, movetime: Option<Duration>) -> Self {
        self.movetime = movetime;
        self
    }

    /// The single limit that governs each request.
    pub fn limit(&self) -> SearchLimit {
        match self.movetime {
            Some(budget) => SearchLimit::MoveTime(budget),
            None => SearchLimit::Depth(self.default_depth.min(self.max_depth)),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_depth: DEFAULT_DEPTH,
            max_depth: MAX_DEPTH,
            movetime: None,
            mate_score: DEFAULT_MATE_SCORE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub engine: EngineConfig,
    pub search: SearchSettings,

    /// Where analysis JSON is written (next to the PGN when unset)
    pub output_dir: Option<PathBuf>,

    /// Games analyzed at once, one engine process each
    pub max_concurrent_games: usize,
}

impl AnalysisConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let millis = |key: &str, default: Duration| {
            number(key).map(Duration::from_millis).unwrap_or(default)
        };

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            path: lookup("STOCKFISH_PATH").unwrap_or(defaults.path),
            fallback_paths: lookup("STOCKFISH_FALLBACK_PATHS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.fallback_paths),
            handshake_timeout: millis("ENGINE_HANDSHAKE_TIMEOUT_MS", defaults.handshake_timeout),
            response_overhead: millis("ENGINE_RESPONSE_OVERHEAD_MS", defaults.response_overhead),
            depth_timeout: millis("ENGINE_DEPTH_TIMEOUT_MS", defaults.depth_timeout),
            shutdown_grace: millis("ENGINE_SHUTDOWN_GRACE_MS", defaults.shutdown_grace),
            threads: bounded("ENGINE_THREADS", number("ENGINE_THREADS"))?
                .unwrap_or(defaults.threads),
            hash_mb: bounded("ENGINE_HASH_MB", number("ENGINE_HASH_MB"))?
                .unwrap_or(defaults.hash_mb),
        };

        let search = SearchSettings {
            default_depth: bounded("ANALYSIS_DEPTH", number("ANALYSIS_DEPTH"))?
                .unwrap_or(DEFAULT_DEPTH),
            max_depth: bounded("ANALYSIS_MAX_DEPTH", number("ANALYSIS_MAX_DEPTH"))?
                .unwrap_or(MAX_DEPTH),
            movetime: number("ANALYSIS_MOVETIME_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            mate_score: lookup("MATE_SCORE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_MATE_SCORE),
        };

        let config = Self {
            engine,
            search,
            output_dir: lookup("ANALYSIS_OUTPUT_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            max_concurrent_games: bounded("MAX_CONCURRENT_GAMES", number("MAX_CONCURRENT_GAMES"))?
                .unwrap_or_else(num_cpus::get),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.default_depth == 0 {
            return Err(ConfigError::Invalid("ANALYSIS_DEPTH must be at least 1"));
        }
        if self.search.default_depth > self.search.max_depth {
            return Err(ConfigError::Invalid("ANALYSIS_DEPTH exceeds ANALYSIS_MAX_DEPTH"));
        }
        if self.search.mate_score <= 0 {
            return Err(ConfigError::Invalid("MATE_SCORE must be positive"));
        }
        if self.max_concurrent_games == 0 {
            return Err(ConfigError::Invalid("MAX_CONCURRENT_GAMES must be at least 1"));
        }
        if self.max_concurrent_games > Semaphore::MAX_PERMITS {
            return Err(ConfigError::OutOfRange("MAX_CONCURRENT_GAMES"));
        }
        if self.engine.candidate_paths().is_empty() {
            return Err(ConfigError::Invalid("no engine path configured"));
        }
        Ok(())
    }
}

/// Narrow a parsed value, rejecting it rather than wrapping when it does not fit.
fn bounded<T: TryFrom<u64>>(
    key: &'static str,
    value: Option<u64>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| T::try_from(v).map_err(|_| ConfigError::OutOfRange(key)))
        .transpose()
}
