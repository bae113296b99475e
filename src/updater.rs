use crate::{
    catalog::ModCatalog,
    config::{self, VERSION_FILE_NAME},
    exclusion,
    progress::ProgressReporter,
    prompt::{self, Prompter},
    reconcile::{ReconciliationReport, Reconciler},
    state::VersionStore,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug)]
pub enum RunOutcome {
    UpToDate {
        version: String,
    },
    Updated {
        previous: String,
        current: String,
        instance_dir: PathBuf,
        report: ReconciliationReport,
    },
}

pub struct Updater<'a, C: ModCatalog + ?Sized, P: Prompter, R: ProgressReporter> {
    catalog: &'a C,
    store: VersionStore,
    prompter: P,
    progress: R,
}

impl<'a, C: ModCatalog + ?Sized, P: Prompter, R: ProgressReporter> Updater<'a, C, P, R> {
    pub fn new(catalog: &'a C, store: VersionStore, prompter: P, progress: R) -> Self {
        Self {
            catalog,
            store,
            prompter,
            progress,
        }
    }

    pub fn run(&mut self) -> Result<RunOutcome> {
        println!("==== Enhanced Vanilla Client Updater ====");
        let record = self.store.load()?;
        println!("Current version: {}", record.version);
        let remote_version = self.catalog.fetch_version()?;
        println!("Latest version: {remote_version}");

        if record.version == remote_version {
            info!(version = %remote_version, "already up to date");
            println!("Versions match. No action taken.");
            return Ok(RunOutcome::UpToDate {
                version: remote_version,
            });
        }

        let instance_dir = self.resolve_instance_dir(record.local_path.as_deref())?;
        println!("Newer version found. Attempting to update mods...");

        let mode =
            prompt::prompt_selection(&mut self.prompter).context("read optional mod choice")?;
        let exclusion = exclusion::resolve(mode);
        if exclusion.unrecognized {
            warn!("unrecognized optional mod choice, installing all");
            println!("Input not understood. Installing all optional mods.");
        }

        println!("\n[1/4] Preparing to sync mods folder...");
        println!("[2/4] Fetching mod list from GitHub...");
        let remote_files = self.catalog.list_mod_files()?;
        let desired = exclusion.apply(&remote_files);
        info!(
            from = %record.version,
            to = %remote_version,
            remote = remote_files.len(),
            excluded = exclusion.excluded.len(),
            "syncing mods"
        );

        let mods_dir = config::mods_dir(&instance_dir);
        let report = Reconciler::new(self.catalog, &mut self.progress)
            .reconcile(&desired, &mods_dir)?;

        println!("\nMods folder sync complete!\n");
        print!("{}", report.summary());
        if !report.is_clean() {
            println!("Missing mods will be fetched again on the next update.");
        }

        self.store.save(&remote_version, Some(instance_dir.as_path()))?;
        let state_dir = self
            .store
            .path()
            .parent()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();
        println!(
            "Updated {VERSION_FILE_NAME} to {remote_version} and saved folder path in {state_dir}"
        );

        Ok(RunOutcome::Updated {
            previous: record.version,
            current: remote_version,
            instance_dir,
            report,
        })
    }

    fn resolve_instance_dir(&mut self, saved: Option<&Path>) -> Result<PathBuf> {
        if let Some(saved) = saved.filter(|path| path.is_dir()) {
            println!("Using saved mods folder: {}", saved.display());
            return Ok(saved.to_path_buf());
        }
        if let Some(stale) = saved {
            warn!(path = %stale.display(), "saved instance folder no longer exists");
        }
        prompt::prompt_instance_dir(&mut self.prompter).context("read instance path")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::memory::MemoryCatalog,
        error::SyncError,
        exclusion::OPTIONAL_MODS,
        progress::SilentProgress,
        prompt::scripted::ScriptedPrompter,
        reconcile::scan_local,
    };
    use std::{collections::BTreeSet, fs};

    struct Fixture {
        _root: tempfile::TempDir,
        exe_dir: PathBuf,
        instance: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let exe_dir = root.path().join("bin");
            let instance = root.path().join("instance");
            fs::create_dir_all(&exe_dir).unwrap();
            fs::create_dir_all(instance.join("mods")).unwrap();
            Self {
                _root: root,
                exe_dir,
                instance,
            }
        }

        fn store(&self) -> VersionStore {
            VersionStore::new(config::AppPaths::with_exe_dir(&self.exe_dir).state_file())
        }

        fn seed_mods(&self, names: &[&str]) {
            for name in names {
                fs::write(self.instance.join("mods").join(name), b"local").unwrap();
            }
        }

        fn mods(&self) -> BTreeSet<String> {
            scan_local(&self.instance.join("mods")).unwrap()
        }

        fn state(&self) -> String {
            fs::read_to_string(self.store().path()).unwrap()
        }
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn matching_versions_touch_nothing() {
        let fx = Fixture::new();
        fx.store().save("1.0.0", Some(fx.instance.as_path())).unwrap();
        fx.seed_mods(&["a.jar"]);
        let catalog = MemoryCatalog::new("1.0.0", &["a.jar", "b.jar"]);
        let before = fx.state();

        let outcome = Updater::new(
            &catalog,
            fx.store(),
            ScriptedPrompter::default(),
            SilentProgress,
        )
        .run()
        .unwrap();

        assert!(matches!(outcome, RunOutcome::UpToDate { ref version } if version == "1.0.0"));
        assert_eq!(catalog.network_calls(), 1);
        assert_eq!(fx.mods(), set(&["a.jar"]));
        assert_eq!(fx.state(), before);
    }

    #[test]
    fn newer_version_syncs_mods_and_records_state() {
        let fx = Fixture::new();
        fx.store().save("0.9.0", Some(fx.instance.as_path())).unwrap();
        fx.seed_mods(&["a.jar", "d.jar"]);
        let catalog = MemoryCatalog::new("1.0.0", &["a.jar", "b.jar", "c.jar"]);
        let prompter = ScriptedPrompter::new(&["all"]);

        let outcome = Updater::new(&catalog, fx.store(), prompter, SilentProgress)
            .run()
            .unwrap();

        let RunOutcome::Updated {
            previous,
            current,
            instance_dir,
            report,
        } = outcome
        else {
            panic!("expected an update");
        };
        assert_eq!(previous, "0.9.0");
        assert_eq!(current, "1.0.0");
        assert_eq!(instance_dir, fx.instance);
        assert_eq!(report.downloaded, vec!["b.jar", "c.jar"]);
        assert_eq!(report.deleted, vec!["d.jar"]);
        assert_eq!(fx.mods(), set(&["a.jar", "b.jar", "c.jar"]));
        assert_eq!(
            fx.state(),
            format!("1.0.0\n{}\n", fx.instance.display())
        );
    }

    #[test]
    fn missing_remote_version_leaves_everything_untouched() {
        let fx = Fixture::new();
        fx.store().save("0.9.0", Some(fx.instance.as_path())).unwrap();
        fx.seed_mods(&["a.jar", "d.jar"]);
        let mut catalog = MemoryCatalog::new("1.0.0", &["a.jar", "b.jar"]);
        catalog.version_fails = true;
        let before = fx.state();

        let err = Updater::new(
            &catalog,
            fx.store(),
            ScriptedPrompter::new(&["all"]),
            SilentProgress,
        )
        .run()
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::NotFound { .. })
        ));
        assert_eq!(catalog.listing_calls.get(), 0);
        assert!(catalog.downloads.borrow().is_empty());
        assert_eq!(fx.mods(), set(&["a.jar", "d.jar"]));
        assert_eq!(fx.state(), before);
    }

    #[test]
    fn failed_listing_leaves_everything_untouched() {
        let fx = Fixture::new();
        fx.store().save("0.9.0", Some(fx.instance.as_path())).unwrap();
        fx.seed_mods(&["a.jar", "d.jar"]);
        let mut catalog = MemoryCatalog::new("1.0.0", &["a.jar", "b.jar"]);
        catalog.listing_fails = true;
        let before = fx.state();

        let err = Updater::new(
            &catalog,
            fx.store(),
            ScriptedPrompter::new(&["all"]),
            SilentProgress,
        )
        .run()
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::Fetch { .. })
        ));
        assert!(catalog.downloads.borrow().is_empty());
        assert_eq!(fx.mods(), set(&["a.jar", "d.jar"]));
        assert_eq!(fx.state(), before);
    }

    #[test]
    fn keeping_only_second_optional_mod_drops_the_first() {
        let fx = Fixture::new();
        let [first, second] = OPTIONAL_MODS;
        fx.store().save("0.9.0", Some(fx.instance.as_path())).unwrap();
        fx.seed_mods(&[first.file_name]);
        let catalog =
            MemoryCatalog::new("1.0.0", &[first.file_name, second.file_name, "core.jar"]);

        Updater::new(
            &catalog,
            fx.store(),
            ScriptedPrompter::new(&["2"]),
            SilentProgress,
        )
        .run()
        .unwrap();

        let mods = fx.mods();
        assert!(!mods.contains(first.file_name));
        assert_eq!(mods, set(&[second.file_name, "core.jar"]));
        assert!(!catalog
            .downloads
            .borrow()
            .iter()
            .any(|name| name == first.file_name));
    }

    #[test]
    fn first_run_asks_for_instance_and_saves_it() {
        let fx = Fixture::new();
        let catalog = MemoryCatalog::new("1.0.0", &["a.jar"]);
        let instance = fx.instance.to_string_lossy().into_owned();
        let prompter = ScriptedPrompter::new(&["/no/such/instance", instance.as_str(), "ALL"]);

        Updater::new(&catalog, fx.store(), prompter, SilentProgress)
            .run()
            .unwrap();

        assert_eq!(fx.mods(), set(&["a.jar"]));
        let record = fx.store().load().unwrap();
        assert_eq!(record.version, "1.0.0");
        assert_eq!(record.local_path, Some(fx.instance.clone()));
    }

    #[test]
    fn stale_saved_path_falls_back_to_prompt() {
        let fx = Fixture::new();
        fx.store()
            .save("0.1.0", Some(fx.instance.join("moved-away").as_path()))
            .unwrap();
        let catalog = MemoryCatalog::new("1.0.0", &[]);
        let instance = fx.instance.to_string_lossy().into_owned();
        let prompter = ScriptedPrompter::new(&[instance.as_str(), "none"]);

        let outcome = Updater::new(&catalog, fx.store(), prompter, SilentProgress)
            .run()
            .unwrap();

        let RunOutcome::Updated { instance_dir, .. } = outcome else {
            panic!("expected an update");
        };
        assert_eq!(instance_dir, fx.instance);
    }

    #[test]
    fn unrecognized_choice_installs_everything() {
        let fx = Fixture::new();
        let [first, second] = OPTIONAL_MODS;
        fx.store().save("0.9.0", Some(fx.instance.as_path())).unwrap();
        let catalog = MemoryCatalog::new("1.0.0", &[first.file_name, second.file_name]);

        Updater::new(
            &catalog,
            fx.store(),
            ScriptedPrompter::new(&["maybe"]),
            SilentProgress,
        )
        .run()
        .unwrap();

        assert_eq!(fx.mods(), set(&[first.file_name, second.file_name]));
    }

    #[test]
    fn per_file_failure_still_records_new_version() {
        let fx = Fixture::new();
        fx.store().save("0.9.0", Some(fx.instance.as_path())).unwrap();
        let mut catalog = MemoryCatalog::new("1.0.0", &["a.jar", "b.jar"]);
        catalog.broken_downloads.insert("a.jar".to_string());

        let outcome = Updater::new(
            &catalog,
            fx.store(),
            ScriptedPrompter::new(&["all"]),
            SilentProgress,
        )
        .run()
        .unwrap();

        let RunOutcome::Updated { report, .. } = outcome else {
            panic!("expected an update");
        };
        assert_eq!(report.failures.len(), 1);
        assert_eq!(fx.store().load().unwrap().version, "1.0.0");
        assert_eq!(fx.mods(), set(&["b.jar"]));
    }
}
