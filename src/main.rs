// src/main.rs

use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;
use woxel::{classify, Config, GlobalState, Librarian, SharedState};

const USAGE: &str = "Usage: woxel <command> [args]

Commands:
  index <dir>...           index directory trees
  search <text> [limit]    print matching files, newest first
  classify <path> [mime]   print the category of a file
  resync                   drop records whose file no longer exists
  watch <dir>...           index, then follow changes until Ctrl-C";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_filter.clone()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let state = GlobalState::shared(config);
    tracing::debug!("Index store: {}", state.index.db_path().display());

    match command.as_str() {
        "index" => index(state, roots(rest)?).await,
        "search" => search(&state, rest),
        "classify" => {
            let path = rest.first().context("classify needs a path")?;
            let mime = rest.get(1).map(String::as_str).unwrap_or("");
            println!("{}", classify(Path::new(path), mime));
            Ok(())
        }
        "resync" => resync(state).await,
        "watch" => watch(state, roots(rest)?).await,
        other => {
            eprintln!("{}", USAGE);
            bail!("unknown command: {}", other)
        }
    }
}

fn roots(args: &[String]) -> Result<Vec<PathBuf>> {
    if args.is_empty() {
        bail!("at least one directory is required");
    }
    Ok(args
        .iter()
        .map(|a| std::fs::canonicalize(a).unwrap_or_else(|_| PathBuf::from(a)))
        .collect())
}

fn ensure_index(state: &SharedState) -> Result<()> {
    state
        .index
        .try_init()
        .with_context(|| format!("cannot open index at {}", state.index.db_path().display()))
}

async fn index(state: SharedState, roots: Vec<PathBuf>) -> Result<()> {
    ensure_index(&state)?;
    let report = tokio::task::spawn_blocking(move || {
        let mut librarian = Librarian::new(state.index.clone());
        librarian.index_trees(&roots)
    })
    .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn search(state: &SharedState, args: &[String]) -> Result<()> {
    let text = args.first().map(String::as_str).unwrap_or("");
    let limit = match args.get(1) {
        Some(v) => v.parse::<i64>().context("limit must be integer")?,
        None => state.config.query_limit,
    };

    ensure_index(state)?;
    for result in state.index.try_query(text, limit)? {
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(())
}

async fn resync(state: SharedState) -> Result<()> {
    ensure_index(&state)?;
    let purged = tokio::task::spawn_blocking(move || Librarian::new(state.index.clone()).purge_stale()).await??;
    println!("purged {} stale records", purged);
    Ok(())
}

async fn watch(state: SharedState, roots: Vec<PathBuf>) -> Result<()> {
    ensure_index(&state)?;

    let stop = Arc::new(AtomicBool::new(false));
    let mut worker = {
        let stop = Arc::clone(&stop);
        let state = Arc::clone(&state);
        tokio::task::spawn_blocking(move || {
            let mut librarian = Librarian::new(state.index.clone());
            let report = librarian.index_trees(&roots);
            tracing::info!("Initial scan: {} indexed, {} failed", report.indexed, report.failed);
            librarian.watch(&roots, &stop, state.config.resync_interval)
        })
    };

    tracing::info!("Watching; press Ctrl-C to stop");
    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal?,
        // The watcher gave up on its own (e.g. a root vanished).
        finished = &mut worker => return Ok(finished??),
    }

    tracing::info!("Shutting down...");
    stop.store(true, Ordering::Relaxed);
    worker.await??;
    Ok(())
}
