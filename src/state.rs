use crate::error::SyncError;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const DEFAULT_VERSION: &str = "0.0.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub version: String,
    pub local_path: Option<PathBuf>,
}

impl Default for VersionRecord {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            local_path: None,
        }
    }
}

impl VersionRecord {
    fn parse(raw: &str) -> Self {
        let mut lines = raw.lines().map(str::trim);
        let version = match lines.next() {
            Some(line) if !line.is_empty() => line.to_string(),
            _ => DEFAULT_VERSION.to_string(),
        };
        let local_path = lines
            .next()
            .filter(|line| !line.is_empty())
            .map(PathBuf::from);
        Self {
            version,
            local_path,
        }
    }

    fn render(&self) -> String {
        let mut out = format!("{}\n", self.version);
        if let Some(path) = &self.local_path {
            out.push_str(&path.to_string_lossy());
            out.push('\n');
        }
        out
    }
}

/// Two-line text record: version on line 1, optional instance directory on line 2.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the record, writing the default one first if the file does not exist yet.
    pub fn load(&self) -> Result<VersionRecord, SyncError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(VersionRecord::parse(&raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let record = VersionRecord::default();
                self.write(&record)?;
                Ok(record)
            }
            Err(err) => Err(self.state_error(err)),
        }
    }

    pub fn save(&self, version: &str, local_path: Option<&Path>) -> Result<(), SyncError> {
        let local_path = match local_path {
            Some(path) => Some(path.to_path_buf()),
            None => self.previous_path()?,
        };
        let record = VersionRecord {
            version: version.to_string(),
            local_path,
        };
        self.write(&record)
    }

    fn previous_path(&self) -> Result<Option<PathBuf>, SyncError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(VersionRecord::parse(&raw).local_path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.state_error(err)),
        }
    }

    fn write(&self, record: &VersionRecord) -> Result<(), SyncError> {
        fs::write(&self.path, record.render()).map_err(|err| self.state_error(err))
    }

    fn state_error(&self, source: io::Error) -> SyncError {
        SyncError::StateFile {
            path: self.path.clone(),
            source,
        }
    }
}
