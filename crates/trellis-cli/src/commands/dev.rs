//! Development server command implementation.
//!
//! Orchestrates the dev server lifecycle:
//! - Initial build
//! - File watching with debouncing
//! - HTTP server with SSE live reload
//! - Incremental rebuilds on file changes, diffed against the previous
//!   cycle so clients only reload when served content changed
//! - Graceful shutdown on Ctrl+C

use crate::cli::{BuildArgs, DevArgs};
use crate::config::TrellisConfig;
use crate::dev::{
    server::content_type_for, BundleCache, DevEvent, DevServer, DevServerState, FileWatcher,
    OutputDiffer, SharedState,
};
use crate::error::{CliError, Result};
use crate::ui;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use trellis_bundler::{BuildOptions, Bundle, ExecutionResult, FlatBundler, RebuildState};

/// Execute the dev command.
///
/// # Process Flow
///
/// 1. Load and validate configuration
/// 2. Perform the initial build and fill the in-memory cache
/// 3. Start the file watcher
/// 4. Start the HTTP server with SSE
/// 5. Main event loop: rebuild on change, diff, broadcast; Ctrl+C
///    shuts the server down before returning
pub async fn execute(args: DevArgs) -> Result<()> {
    ui::info("Starting development server...");

    let build_args = BuildArgs {
        entry: args.entry.clone(),
        config: args.config.clone(),
        cwd: args.cwd.clone(),
        ..Default::default()
    };
    let config = TrellisConfig::load(&build_args)?;
    let project_root = config.project_root()?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|e| {
            CliError::InvalidArgument(format!("Invalid host/port {}:{}: {}", args.host, args.port, e))
        })?;

    let options = config.to_build_options(&project_root, true);
    let bundler: Arc<dyn Bundle> = Arc::new(FlatBundler::new());
    let state: SharedState = Arc::new(DevServerState::new());
    let mut differ = OutputDiffer::new();

    // Initial build
    ui::info(&format!("Working directory: {}", project_root.display()));
    state.start_build();
    let mut rebuild_state = match run_cycle(&options, &bundler, None, &state, &mut differ).await {
        Ok((next_state, _updated)) => next_state,
        Err(e) => {
            ui::error(&format!("Initial build failed: {}", e));
            return Err(e);
        }
    };

    // File watcher
    let (watcher, mut change_rx) = FileWatcher::new(
        project_root.clone(),
        config.dev.watch_ignore.clone(),
        args.debounce,
    )?;
    ui::info(&format!(
        "Watching for changes in: {}",
        watcher.root().display()
    ));

    // HTTP server
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let server = DevServer::new(addr, state.clone());
    let mut server_handle = tokio::spawn(server.start(shutdown_rx));

    ui::info("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(change) = change_rx.recv() => {
                ui::info(&format!("File changed: {}", change.path().display()));

                // Drop the cached source so the rebuild reads fresh bytes.
                if let Some(ref rs) = rebuild_state {
                    rs.source_cache.invalidate(change.path());
                }

                state.start_build();
                state.broadcast(&DevEvent::BuildStarted).await;

                match run_cycle(&options, &bundler, rebuild_state.take(), &state, &mut differ).await {
                    Ok((next_state, updated)) => {
                        rebuild_state = next_state;
                        if !updated.is_empty() {
                            state.broadcast(&DevEvent::full_reload()).await;
                        }
                    }
                    Err(e) => {
                        let msg = e.to_string();
                        state.fail_build(msg.clone());
                        ui::error(&format!("Rebuild failed: {}", msg));
                        state.broadcast(&DevEvent::BuildFailed { error: msg }).await;
                    }
                }
            }

            _ = signal::ctrl_c() => {
                ui::info("Shutting down development server...");
                let _ = shutdown_tx.send(());
                // The server future resolves only once the listener is
                // closed, so no request is served past this await.
                let _ = (&mut server_handle).await;
                break;
            }

            _ = &mut server_handle => {
                ui::warning("Server task completed unexpectedly");
                break;
            }
        }
    }

    ui::success("Development server stopped");
    Ok(())
}

/// Run one build cycle and fold the result into the server state.
///
/// The caller marks the build as started (and broadcasts it); this
/// records only the terminal status. Returns the rebuild state for the
/// next cycle and the list of output paths whose content changed.
async fn run_cycle(
    options: &BuildOptions,
    bundler: &Arc<dyn Bundle>,
    rebuild_state: Option<RebuildState>,
    state: &SharedState,
    differ: &mut OutputDiffer,
) -> Result<(Option<RebuildState>, Vec<String>)> {
    let started = Instant::now();

    let mut result =
        trellis_bundler::execute_build(options, Arc::clone(bundler), rebuild_state).await?;

    crate::commands::build::report_diagnostics(&result);

    if !result.errors.is_empty() {
        let msg = format!("Build completed with {} error(s)", result.errors.len());
        state.fail_build(msg);
        // Keep the rebuild state: the next change still rebuilds
        // incrementally from the failed cycle's caches.
        return Ok((result.rebuild_state.take(), Vec::new()));
    }

    let index_path = result
        .index_path
        .clone()
        .unwrap_or_else(|| "index.html".to_string());
    let (cache, updated) = fill_cache(&result, &index_path, differ);

    state.update_cache(cache);
    state.set_index_path(format!("/{}", index_path));

    let duration_ms = started.elapsed().as_millis() as u64;
    state.complete_build(duration_ms);
    ui::success(&format!(
        "Build completed in {}",
        ui::format_duration(started.elapsed())
    ));

    Ok((result.rebuild_state.take(), updated))
}

/// Convert a build result into the served cache, diffing against the
/// previous cycle.
fn fill_cache(
    result: &ExecutionResult,
    index_path: &str,
    differ: &mut OutputDiffer,
) -> (BundleCache, Vec<String>) {
    use trellis_bundler::OutputFileType;

    let finals = result.final_output_files();
    let served: Vec<_> = finals
        .iter()
        .copied()
        .filter(|f| f.file_type != OutputFileType::Server)
        .collect();

    let updated = differ.update(&served, index_path);

    let mut cache = BundleCache::new();
    for file in &served {
        cache.insert(
            format!("/{}", file.path),
            file.contents.clone(),
            content_type_for(&file.path).to_string(),
        );
    }

    (cache, updated)
}
