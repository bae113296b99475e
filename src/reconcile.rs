use crate::{
    catalog::ModCatalog,
    error::SyncError,
    progress::{Phase, ProgressReporter},
};
use anyhow::{Context, Result};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write as _,
    fs::{self, File},
    io::Write,
    path::{Component, Path, PathBuf},
};
use tracing::{info, warn};
use walkdir::WalkDir;

const PART_SUFFIX: &str = ".part";

/// Minimal add/remove operations, each list sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub to_download: Vec<String>,
    pub to_delete: Vec<String>,
}

impl ReconcilePlan {
    pub fn compute(desired: &BTreeSet<String>, local: &BTreeSet<String>) -> Self {
        Self {
            to_download: desired.difference(local).cloned().collect(),
            to_delete: local.difference(desired).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_download.is_empty() && self.to_delete.is_empty()
    }
}

#[derive(Debug)]
pub struct FileFailure {
    pub name: String,
    pub error: SyncError,
}

#[derive(Debug, Default)]
pub struct ReconciliationReport {
    pub downloaded: Vec<String>,
    pub deleted: Vec<String>,
    pub failures: Vec<FileFailure>,
}

impl ReconciliationReport {
    pub fn downloaded_count(&self) -> usize {
        self.downloaded.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut output = String::new();
        writeln!(output, "Downloaded: {}", self.downloaded_count()).ok();
        writeln!(output, "Deleted:    {}", self.deleted_count()).ok();
        if !self.failures.is_empty() {
            writeln!(output, "Failed:     {}", self.failures.len()).ok();
            for failure in &self.failures {
                writeln!(output, "  - {}", failure.error).ok();
            }
        }
        output
    }
}

/// Files directly inside a mods folder, keyed by display name.
///
/// Names that are not valid UTF-8 are keyed lossily but keep their real
/// paths, so they can still be removed. Several such names may share a key.
#[derive(Debug, Default)]
pub struct LocalFiles {
    paths: BTreeMap<String, Vec<PathBuf>>,
}

impl LocalFiles {
    pub fn names(&self) -> BTreeSet<String> {
        self.paths.keys().cloned().collect()
    }

    fn paths_for(&self, name: &str) -> &[PathBuf] {
        self.paths.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Lists the files directly inside `dir`, creating the directory when it is missing.
pub fn scan_local_files(dir: &Path) -> Result<LocalFiles> {
    fs::create_dir_all(dir).with_context(|| format!("create mods dir {}", dir.display()))?;

    let mut files = LocalFiles::default();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("list mods dir {}", dir.display()))?;
        let file_type = entry.file_type();
        if file_type.is_file() || file_type.is_symlink() {
            files
                .paths
                .entry(entry.file_name().to_string_lossy().into_owned())
                .or_default()
                .push(entry.into_path());
        }
    }
    Ok(files)
}

/// Names of the files directly inside `dir`.
pub fn scan_local(dir: &Path) -> Result<BTreeSet<String>> {
    Ok(scan_local_files(dir)?.names())
}

pub struct Reconciler<'a, C: ModCatalog + ?Sized, R: ProgressReporter + ?Sized> {
    catalog: &'a C,
    progress: &'a mut R,
}

impl<'a, C: ModCatalog + ?Sized, R: ProgressReporter + ?Sized> Reconciler<'a, C, R> {
    pub fn new(catalog: &'a C, progress: &'a mut R) -> Self {
        Self { catalog, progress }
    }

    /// Makes `target_dir` hold exactly `desired`. Only a failure to read the
    /// directory is an error; per-file problems land in the report.
    pub fn reconcile(
        &mut self,
        desired: &BTreeSet<String>,
        target_dir: &Path,
    ) -> Result<ReconciliationReport> {
        let local = scan_local_files(target_dir)?;
        let plan = ReconcilePlan::compute(desired, &local.names());
        info!(
            dir = %target_dir.display(),
            download = plan.to_download.len(),
            delete = plan.to_delete.len(),
            "reconciliation plan ready"
        );
        if plan.is_empty() {
            info!("mods folder already matches the remote set");
        }

        let mut report = ReconciliationReport::default();

        self.progress.on_phase(Phase::Downloading {
            count: plan.to_download.len(),
        });
        for name in &plan.to_download {
            match self.download(name, target_dir) {
                Ok(bytes) => {
                    self.progress.on_download_complete(name, bytes);
                    report.downloaded.push(name.clone());
                }
                Err(error) => {
                    warn!(file = %name, %error, "download failed");
                    self.progress.on_download_failed(name, &error.to_string());
                    report.failures.push(FileFailure {
                        name: name.clone(),
                        error,
                    });
                }
            }
        }

        self.progress.on_phase(Phase::Deleting {
            count: plan.to_delete.len(),
        });
        for name in &plan.to_delete {
            for path in local.paths_for(name) {
                match fs::remove_file(path) {
                    Ok(()) => {
                        self.progress.on_deleted(name);
                        report.deleted.push(name.clone());
                    }
                    Err(source) => {
                        warn!(file = %path.display(), error = %source, "delete failed");
                        self.progress.on_delete_failed(name, &source.to_string());
                        report.failures.push(FileFailure {
                            name: name.clone(),
                            error: SyncError::Deletion {
                                name: name.clone(),
                                source,
                            },
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    fn download(&mut self, name: &str, target_dir: &Path) -> Result<u64, SyncError> {
        if !is_plain_file_name(name) {
            return Err(partial(name, "refusing to write outside the mods folder"));
        }

        let final_path = target_dir.join(name);
        let part_path = target_dir.join(format!("{name}{PART_SUFFIX}"));
        let result = self.stream_to(name, &part_path).and_then(|bytes| {
            fs::rename(&part_path, &final_path)
                .map(|()| bytes)
                .map_err(|err| partial(name, err))
        });
        if result.is_err() {
            fs::remove_file(&part_path).ok();
        }
        result
    }

    fn stream_to(&mut self, name: &str, path: &Path) -> Result<u64, SyncError> {
        let download = self.catalog.download_file(name)?;
        let total = download.total();
        self.progress.on_download_started(name, total);

        let mut file = File::create(path).map_err(|err| partial(name, err))?;
        let mut written = 0u64;
        for chunk in download {
            let chunk = chunk.map_err(|err| partial(name, err))?;
            file.write_all(&chunk).map_err(|err| partial(name, err))?;
            written += chunk.len() as u64;
            self.progress.on_download_progress(name, written, total);
        }
        file.flush().map_err(|err| partial(name, err))?;

        if let Some(expected) = total {
            if written < expected {
                return Err(partial(
                    name,
                    format!("stream ended after {written} of {expected} bytes"),
                ));
            }
        }
        Ok(written)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn partial(name: &str, reason: impl ToString) -> SyncError {
    SyncError::PartialDownload {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
