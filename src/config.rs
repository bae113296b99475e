use crate::error::SyncError;
use anyhow::{Context, Result};
use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

pub const REPOSITORY_URL: &str = "https://github.com/XDSenDX/enhanced-vanilla-client";
pub const VERSION_FILE_NAME: &str = "sensmp_version.txt";
pub const LOG_FILE_NAME: &str = "modsync.log";
pub const MODS_DIR_NAME: &str = "mods";
pub const USER_AGENT: &str = concat!("modsync/", env!("CARGO_PKG_VERSION"));
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

const WEB_HOST: &str = "github.com";
const RAW_HOST: &str = "https://raw.githubusercontent.com";
const API_HOST: &str = "https://api.github.com";
const BRANCH: &str = "main";

/// Repository coordinates derived from its canonical `https://github.com/<owner>/<repo>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub owner: String,
    pub repo: String,
}

impl RepoConfig {
    pub fn parse(url: &str) -> Result<Self, SyncError> {
        let invalid = |reason: &str| SyncError::Config {
            value: url.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(invalid("repository URL is not set"));
        }
        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .ok_or_else(|| invalid("expected an http(s) URL"))?;
        let mut segments = rest.split('/');
        if segments.next() != Some(WEB_HOST) {
            return Err(invalid("expected a github.com URL"));
        }
        let (Some(owner), Some(repo), None) = (segments.next(), segments.next(), segments.next())
        else {
            return Err(invalid("expected exactly <owner>/<repo> after the host"));
        };
        if owner.is_empty() || repo.is_empty() {
            return Err(invalid("owner and repository must not be empty"));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    pub fn builtin() -> Result<Self, SyncError> {
        Self::parse(REPOSITORY_URL)
    }

    pub fn version_url(&self) -> String {
        format!(
            "{RAW_HOST}/{}/{}/{BRANCH}/{VERSION_FILE_NAME}",
            self.owner, self.repo
        )
    }

    pub fn listing_url(&self) -> String {
        format!(
            "{API_HOST}/repos/{}/{}/contents/{MODS_DIR_NAME}?ref={BRANCH}",
            self.owner, self.repo
        )
    }

    pub fn raw_mod_url(&self, file_name: &str) -> String {
        format!(
            "{RAW_HOST}/{}/{}/{BRANCH}/{MODS_DIR_NAME}/{file_name}",
            self.owner, self.repo
        )
    }
}

/// Locations resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub exe_dir: PathBuf,
}

impl AppPaths {
    pub fn from_current_exe() -> Result<Self> {
        let exe = env::current_exe().context("resolve current executable")?;
        let exe_dir = exe.parent().context("resolve executable directory")?;
        Ok(Self::with_exe_dir(exe_dir))
    }

    pub fn with_exe_dir(exe_dir: impl Into<PathBuf>) -> Self {
        Self {
            exe_dir: exe_dir.into(),
        }
    }

    pub fn state_file(&self) -> PathBuf {
        self.exe_dir.join(VERSION_FILE_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.exe_dir.join(LOG_FILE_NAME)
    }
}

pub fn mods_dir(instance_dir: &Path) -> PathBuf {
    instance_dir.join(MODS_DIR_NAME)
}
