mod catalog;
mod config;
mod error;
mod exclusion;
mod progress;
mod prompt;
mod reconcile;
mod state;
mod updater;

use anyhow::Result;
use catalog::GithubCatalog;
use config::{AppPaths, RepoConfig};
use progress::ConsoleProgress;
use prompt::ConsolePrompter;
use state::VersionStore;
use std::{fs::OpenOptions, io, path::Path, process::ExitCode, sync::Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use updater::{RunOutcome, Updater};

fn main() -> ExitCode {
    let code = match AppPaths::from_current_exe() {
        Ok(paths) => {
            init_logging(&paths.log_file());
            info!(version = env!("CARGO_PKG_VERSION"), dir = %paths.exe_dir.display(), "starting");
            match run(&paths) {
                Ok(outcome) => {
                    log_outcome(&outcome);
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    error!("{err:#}");
                    eprintln!("Error: {err:#}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    };

    prompt::wait_for_exit(&mut ConsolePrompter);
    code
}

fn run(paths: &AppPaths) -> Result<RunOutcome> {
    let repo = RepoConfig::builtin()?;
    let catalog = GithubCatalog::new(repo);
    let store = VersionStore::new(paths.state_file());
    Updater::new(&catalog, store, ConsolePrompter, ConsoleProgress::new()).run()
}

fn log_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::UpToDate { version } => info!(%version, "nothing to do"),
        RunOutcome::Updated {
            previous,
            current,
            instance_dir,
            report,
        } => {
            info!(
                from = %previous,
                to = %current,
                instance = %instance_dir.display(),
                downloaded = report.downloaded_count(),
                deleted = report.deleted_count(),
                "update applied"
            );
            for failure in &report.failures {
                warn!(file = %failure.name, error = %failure.error, "left for the next run");
            }
        }
    }
}

fn init_logging(log_path: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        Err(_) => builder.with_writer(io::stderr).init(),
    }
}
