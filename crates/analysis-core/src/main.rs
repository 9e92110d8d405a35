//! PGN analysis CLI
//!
//! Analyzes every game in the given PGN files (or directories of them) with a
//! local UCI engine and writes one JSON report per game.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use analysis_core::{
    cancel_pair, AnalysisConfig, AnalysisPipeline, AnalysisReport, CancelSignal, JsonFileSink,
    StockfishLauncher,
};
use chess_core::{load_games_file, GameRecord};
use clap::Parser;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "analyze-pgn")]
#[command(about = "Centipawn-loss analysis of PGN games with a UCI engine")]
struct Cli {
    /// PGN files, or directories containing *.pgn files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Search depth (clamped to ANALYSIS_MAX_DEPTH)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Fixed time per position in milliseconds; replaces the depth limit
    #[arg(long)]
    movetime_ms: Option<u64>,

    /// Engine executable, tried before the fallback paths
    #[arg(short, long)]
    engine: Option<String>,

    /// Directory for JSON reports (default: next to each PGN)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Games analyzed at once
    #[arg(short, long)]
    jobs: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Complete,
    Partial,
    Failed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AnalysisConfig::load()?;
    if let Some(engine) = cli.engine {
        config.engine.path = engine;
    }
    if let Some(depth) = cli.depth {
        config.search = config.search.with_depth(depth);
    }
    if let Some(ms) = cli.movetime_ms {
        config.search = config
            .search
            .with_movetime((ms > 0).then(|| Duration::from_millis(ms)));
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = Some(dir);
    }
    if let Some(jobs) = cli.jobs {
        config.max_concurrent_games = jobs;
    }
    config.validate()?;

    info!(
        engine_paths = ?config.engine.candidate_paths(),
        limit = ?config.search.limit(),
        jobs = config.max_concurrent_games,
        "Analysis config loaded"
    );

    let pgn_files = collect_pgn_files(&cli.inputs)?;
    if pgn_files.is_empty() {
        anyhow::bail!("No PGN files found");
    }

    let (cancel_handle, cancel) = cancel_pair();

    // Ctrl-C / SIGTERM cancel in-flight games; engines are torn down by the pipeline
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let shutdown = cancel_handle.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("Shutdown requested, cancelling analysis");
        shutdown.cancel();
    });

    let pipeline = Arc::new(AnalysisPipeline::new(
        StockfishLauncher::new(config.engine.clone()),
        config.search.clone(),
    ));
    let sink = JsonFileSink::new(config.output_dir.clone());
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_games));
    let mut tasks = JoinSet::new();
    let mut unreadable = 0usize;

    'files: for path in pgn_files {
        let games = match load_games_file(&path) {
            Ok(games) => games,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load PGN");
                unreadable += 1;
                continue;
            }
        };
        if games.is_empty() {
            warn!(path = %path.display(), "No games in PGN file");
            continue;
        }

        let game_count = games.len();
        info!(path = %path.display(), games = game_count, "Loaded PGN");

        for (i, game) in games.into_iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await?;
            if cancel.is_cancelled() {
                break 'files;
            }

            let pipeline = pipeline.clone();
            let sink = sink.clone();
            let path = path.clone();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = permit; // Hold until done
                analyze_game(&pipeline, &sink, &path, i + 1, game_count, game, cancel).await
            });
        }
    }

    let (mut complete, mut partial, mut failed) = (0usize, 0usize, unreadable);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Outcome::Complete) => complete += 1,
            Ok(Outcome::Partial) => partial += 1,
            Ok(Outcome::Failed) => failed += 1,
            Err(e) => {
                error!(error = %e, "Analysis task panicked");
                failed += 1;
            }
        }
    }

    info!(complete, partial, failed, "Done");
    if cancel.is_cancelled() {
        anyhow::bail!("Analysis cancelled");
    }
    if failed > 0 {
        anyhow::bail!("{failed} game(s) could not be analyzed");
    }
    Ok(())
}

async fn analyze_game(
    pipeline: &AnalysisPipeline<StockfishLauncher>,
    sink: &JsonFileSink,
    path: &Path,
    game_index: usize,
    game_count: usize,
    game: GameRecord,
    cancel: CancelSignal,
) -> Outcome {
    info!(path = %path.display(), game = game_index, plies = game.len(), "Analyzing game");

    let result = match pipeline.run(&game, cancel).await {
        Ok(result) => result,
        Err(e) => {
            error!(path = %path.display(), game = game_index, error = %e, "Analysis failed");
            return Outcome::Failed;
        }
    };

    let outcome = if result.is_complete() {
        Outcome::Complete
    } else {
        Outcome::Partial
    };
    let report = AnalysisReport::new(path, game_index, pipeline.settings().limit(), result);
    match sink.write(&report, game_count) {
        Ok(_) => outcome,
        Err(e) => {
            error!(path = %path.display(), game = game_index, error = %e, "Failed to write analysis");
            Outcome::Failed
        }
    }
}

/// Expand directories to their `*.pgn` files; plain paths are kept as given.
fn collect_pgn_files(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let pattern = input.join("*.pgn");
            let mut found: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
                .filter_map(|p| p.ok())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}
