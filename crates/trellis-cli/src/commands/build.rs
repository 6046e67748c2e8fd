//! Build command implementation.
//!
//! Implements `trellis build`: loads configuration, runs one build cycle
//! through `trellis_bundler::execute_build`, writes the resulting output
//! tree to disk, and prints the bundle summary.

use crate::cli::BuildArgs;
use crate::config::TrellisConfig;
use crate::error::{BuildError, CliError, Result, ResultExt};
use crate::ui;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use trellis_bundler::{
    estimate_transfer_size, ExecutionResult, FlatBundler, OutputFile, OutputFileType,
};

/// Execute the build command.
///
/// # Build Process
///
/// 1. Load and validate configuration (CLI > Env > File > Defaults)
/// 2. Clean or create the output directory
/// 3. Run the build pipeline
/// 4. Write output files and copy assets
/// 5. Display the bundle summary
///
/// # Errors
///
/// Returns errors for invalid configuration, build failures (non-zero
/// error diagnostics), and file system errors.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let start_time = Instant::now();

    let config = TrellisConfig::load(&args)?;
    let project_root = config.project_root()?;
    let out_dir = resolve_path(&config.out_dir, &project_root);

    if config.clean {
        clean_output_dir(&out_dir)?;
    }
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| CliError::Build(BuildError::WriteFailed {
            path: out_dir.clone(),
            source: e,
        }))?;

    for entry in &config.entry_points {
        let entry_path = resolve_path(Path::new(entry), &project_root);
        if !entry_path.is_file() {
            return Err(CliError::Build(BuildError::EntryNotFound(entry_path)));
        }
    }

    let options = config.to_build_options(&project_root, false);
    let optimize = options.optimization.any();
    let result =
        trellis_bundler::execute_build(&options, Arc::new(FlatBundler::new()), None).await?;

    report_diagnostics(&result);

    if !result.errors.is_empty() {
        return Err(CliError::Build(BuildError::Failed(result.errors.len())));
    }

    write_result(&result, &out_dir)?;

    print_summary(&result, optimize, start_time.elapsed());
    ui::success(&format!(
        "Build completed in {}",
        ui::format_duration(start_time.elapsed())
    ));

    Ok(())
}

/// Print build diagnostics to the terminal.
pub(crate) fn report_diagnostics(result: &ExecutionResult) {
    for warning in &result.warnings {
        ui::warning(&warning.to_string());
    }
    for error in &result.errors {
        ui::error(&error.to_string());
    }
}

/// Write the final output files and copy asset files into `out_dir`.
///
/// Server-targeted files land under a `server/` subdirectory so the
/// browser tree stays directly deployable.
pub(crate) fn write_result(result: &ExecutionResult, out_dir: &Path) -> Result<()> {
    for file in result.final_output_files() {
        let dest = output_destination(file, out_dir);
        write_file(&dest, &file.contents)?;
    }

    for (source, destination) in &result.assets {
        let dest = out_dir.join(destination);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CliError::Build(BuildError::WriteFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })
            })?;
        }
        std::fs::copy(source, &dest)
            .map(|_| ())
            .with_path(source)?;
    }

    Ok(())
}

/// Map an output file to its on-disk destination.
fn output_destination(file: &OutputFile, out_dir: &Path) -> PathBuf {
    match file.file_type {
        OutputFileType::Server => out_dir.join("server").join(&file.path),
        OutputFileType::Browser | OutputFileType::Root => out_dir.join(&file.path),
    }
}

fn write_file(dest: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CliError::Build(BuildError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })
        })?;
    }
    std::fs::write(dest, contents).map_err(|e| {
        CliError::Build(BuildError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })
    })
}

/// Print the per-bundle size table.
///
/// Transfer-size estimates are only computed when optimization is on;
/// unoptimized sizes are not representative of deploy cost.
fn print_summary(result: &ExecutionResult, optimize: bool, elapsed: std::time::Duration) {
    let mut rows: Vec<ui::BundleRow> = Vec::new();
    for file in result.final_output_files() {
        if file.file_type != OutputFileType::Browser || file.path.ends_with(".map") {
            continue;
        }
        let transfer_size = if optimize && is_script_or_style(&file.path) {
            estimate_transfer_size(file).ok()
        } else {
            None
        };
        rows.push(ui::BundleRow {
            path: file.path.clone(),
            size: file.contents.len() as u64,
            transfer_size,
            initial: result.initial_files.values().any(|f| f.file == file.path),
        });
    }
    rows.sort_by(|a, b| (b.initial, a.path.as_str()).cmp(&(a.initial, b.path.as_str())));
    ui::print_build_summary(&rows, elapsed);
}

fn is_script_or_style(path: &str) -> bool {
    path.ends_with(".js") || path.ends_with(".mjs") || path.ends_with(".css")
}

/// Remove the output directory when `--clean` is set.
fn clean_output_dir(out_dir: &Path) -> Result<()> {
    if out_dir.is_dir() {
        tracing::debug!(path = %out_dir.display(), "removing output directory");
        std::fs::remove_dir_all(out_dir).with_path(out_dir)?;
    }
    Ok(())
}

fn resolve_path(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_bundler::OutputFileType;

    #[test]
    fn server_files_are_segregated() {
        let out = Path::new("/tmp/dist");
        let server = OutputFile::new("main.server.mjs", vec![], OutputFileType::Server);
        let browser = OutputFile::new("main.js", vec![], OutputFileType::Browser);
        let root = OutputFile::new("stats.json", vec![], OutputFileType::Root);

        assert_eq!(
            output_destination(&server, out),
            Path::new("/tmp/dist/server/main.server.mjs")
        );
        assert_eq!(output_destination(&browser, out), Path::new("/tmp/dist/main.js"));
        assert_eq!(output_destination(&root, out), Path::new("/tmp/dist/stats.json"));
    }

    #[test]
    fn write_result_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut result = ExecutionResult::new();
        result.add_output_file("media/logo/icon.svg", b"<svg/>".to_vec(), OutputFileType::Browser);

        write_result(&result, dir.path()).unwrap();
        assert!(dir.path().join("media/logo/icon.svg").is_file());
    }
}
