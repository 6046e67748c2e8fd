//! Route pre-rendering.
//!
//! Renders configured routes into static HTML documents derived from the
//! generated index document. Rendering itself is delegated to a
//! [`ShellRenderer`] collaborator; this module owns the bounded fan-out
//! and per-route failure isolation: a route that fails to render becomes
//! a diagnostic, never a lost build.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::output::{OutputFile, OutputFileType};

/// Renders one route of the application into an HTML document.
#[async_trait]
pub trait ShellRenderer: Send + Sync {
    /// Render `route` using `document` as the page template.
    async fn render(&self, route: &str, document: &str) -> Result<String, String>;
}

/// Pre-rendering configuration.
#[derive(Debug, Clone)]
pub struct PrerenderOptions {
    /// Routes to render, e.g. `/`, `/about`.
    pub routes: Vec<String>,
    /// Upper bound on concurrent render jobs. Zero means the number of
    /// available CPUs.
    pub concurrency: usize,
}

impl Default for PrerenderOptions {
    fn default() -> Self {
        Self {
            routes: vec!["/".to_string()],
            concurrency: 0,
        }
    }
}

/// Output path for one rendered route.
fn route_output_path(route: &str) -> String {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        "index.html".to_string()
    } else {
        format!("{}/index.html", trimmed)
    }
}

/// Render every configured route concurrently.
///
/// `document` is the generated index content without inline style
/// optimizations. Output order follows the configured route order
/// regardless of completion order.
pub async fn prerender_routes(
    options: &PrerenderOptions,
    renderer: Arc<dyn ShellRenderer>,
    document: &str,
) -> (Vec<OutputFile>, Vec<Diagnostic>) {
    let concurrency = if options.concurrency == 0 {
        num_cpus::get()
    } else {
        options.concurrency
    };
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let document: Arc<str> = Arc::from(document);

    let mut tasks = JoinSet::new();
    for (index, route) in options.routes.iter().enumerate() {
        let route = route.clone();
        let renderer = Arc::clone(&renderer);
        let semaphore = Arc::clone(&semaphore);
        let document = Arc::clone(&document);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            debug!(route, "rendering route");
            (index, route.clone(), renderer.render(&route, &document).await)
        });
    }

    let mut rendered: Vec<Option<(String, Result<String, String>)>> =
        (0..options.routes.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, route, outcome)) => rendered[index] = Some((route, outcome)),
            Err(e) => {
                // A panicking renderer loses its slot but not the build.
                return (
                    Vec::new(),
                    vec![Diagnostic::error(format!("Render worker panicked: {}", e))],
                );
            }
        }
    }

    let mut files = Vec::new();
    let mut diagnostics = Vec::new();
    for entry in rendered.into_iter().flatten() {
        match entry {
            (route, Ok(html)) => files.push(OutputFile::text(
                route_output_path(&route),
                html,
                OutputFileType::Browser,
            )),
            (route, Err(message)) => diagnostics.push(Diagnostic::error(format!(
                "Pre-rendering route '{}' failed: {}",
                route, message
            ))),
        }
    }

    (files, diagnostics)
}
