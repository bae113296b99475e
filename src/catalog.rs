use crate::{
    config::{RepoConfig, CONNECT_TIMEOUT, READ_TIMEOUT, USER_AGENT},
    error::SyncError,
};
use serde::Deserialize;
use std::{
    collections::BTreeSet,
    fmt,
    io::{self, Read},
};
use tracing::{debug, info};

pub const CHUNK_SIZE: usize = 8192;

/// Source of the published version marker and the mod files it describes.
pub trait ModCatalog {
    fn fetch_version(&self) -> Result<String, SyncError>;
    fn list_mod_files(&self) -> Result<BTreeSet<String>, SyncError>;
    fn download_file(&self, file_name: &str) -> Result<ModDownload, SyncError>;
}

/// A single-pass stream over one remote file, read in `CHUNK_SIZE` pieces.
pub struct ModDownload {
    total: Option<u64>,
    reader: Box<dyn Read + Send>,
    buffer: Vec<u8>,
    done: bool,
}

impl ModDownload {
    pub fn new(total: Option<u64>, reader: Box<dyn Read + Send>) -> Self {
        Self {
            total,
            reader,
            buffer: vec![0; CHUNK_SIZE],
            done: false,
        }
    }

    /// Advertised length, if the remote sent one.
    pub fn total(&self) -> Option<u64> {
        self.total
    }
}

impl fmt::Debug for ModDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModDownload")
            .field("total", &self.total)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Iterator for ModDownload {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.read(&mut self.buffer) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(read) => return Some(Ok(self.buffer[..read].to_vec())),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: EntryKind,
}

fn mod_file_names(entries: Vec<ContentEntry>) -> BTreeSet<String> {
    entries
        .into_iter()
        .filter(|entry| entry.kind == EntryKind::File)
        .map(|entry| entry.name)
        .collect()
}

fn parse_listing(raw: &str) -> Result<BTreeSet<String>, serde_json::Error> {
    let entries: Vec<ContentEntry> = serde_json::from_str(raw)?;
    Ok(mod_file_names(entries))
}

/// Any non-success status means the marker is missing; transport problems stay `Fetch`.
fn version_error(url: &str, err: ureq::Error) -> SyncError {
    match err {
        ureq::Error::Status(code, _) => {
            debug!(%url, code, "version resource missing");
            SyncError::NotFound {
                url: url.to_string(),
            }
        }
        err => SyncError::fetch(url, err),
    }
}

pub struct GithubCatalog {
    repo: RepoConfig,
    agent: ureq::Agent,
}

impl GithubCatalog {
    pub fn new(repo: RepoConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        Self { repo, agent }
    }
}

impl ModCatalog for GithubCatalog {
    fn fetch_version(&self) -> Result<String, SyncError> {
        let url = self.repo.version_url();
        debug!(%url, "fetching remote version");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| version_error(&url, err))?;
        let body = response.into_string().map_err(|err| SyncError::Fetch {
            url: url.clone(),
            reason: err.to_string(),
        })?;
        Ok(body.trim().to_string())
    }

    fn list_mod_files(&self) -> Result<BTreeSet<String>, SyncError> {
        let url = self.repo.listing_url();
        let response = self
            .agent
            .get(&url)
            .set("Accept", "application/vnd.github+json")
            .call()
            .map_err(|err| SyncError::fetch(&url, err))?;
        let body = response.into_string().map_err(|err| SyncError::Fetch {
            url: url.clone(),
            reason: err.to_string(),
        })?;
        let names = parse_listing(&body).map_err(|err| SyncError::Fetch {
            url: url.clone(),
            reason: format!("unexpected listing format: {err}"),
        })?;
        info!(%url, count = names.len(), "fetched remote mod listing");
        Ok(names)
    }

    fn download_file(&self, file_name: &str) -> Result<ModDownload, SyncError> {
        let url = self.repo.raw_mod_url(file_name);
        debug!(%url, "starting download");
        let response = self.agent.get(&url).call().map_err(|err| {
            let reason = SyncError::fetch(&url, err).to_string();
            SyncError::PartialDownload {
                name: file_name.to_string(),
                reason,
            }
        })?;
        let total = response
            .header("Content-Length")
            .and_then(|value| value.trim().parse::<u64>().ok());
        Ok(ModDownload::new(total, Box::new(response.into_reader())))
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::{
        cell::{Cell, RefCell},
        collections::{BTreeMap, BTreeSet},
    };

    /// Reader that hands out some bytes and then fails like a dropped connection.
    struct BrokenReader {
        remaining: io::Cursor<Vec<u8>>,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let read = self.remaining.read(buf)?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ));
            }
            Ok(read)
        }
    }

    /// In-memory catalog for exercising the updater without a network.
    #[derive(Default)]
    pub struct MemoryCatalog {
        pub version: String,
        pub files: BTreeMap<String, Vec<u8>>,
        pub version_fails: bool,
        pub listing_fails: bool,
        pub broken_downloads: BTreeSet<String>,
        pub advertise_length: bool,
        pub claimed_lengths: BTreeMap<String, u64>,
        pub version_calls: Cell<usize>,
        pub listing_calls: Cell<usize>,
        pub downloads: RefCell<Vec<String>>,
    }

    impl MemoryCatalog {
        pub fn new(version: &str, files: &[&str]) -> Self {
            Self {
                version: version.to_string(),
                files: files
                    .iter()
                    .map(|name| (name.to_string(), format!("contents of {name}").into_bytes()))
                    .collect(),
                advertise_length: true,
                ..Self::default()
            }
        }

        pub fn network_calls(&self) -> usize {
            self.version_calls.get() + self.listing_calls.get() + self.downloads.borrow().len()
        }
    }

    impl ModCatalog for MemoryCatalog {
        fn fetch_version(&self) -> Result<String, SyncError> {
            self.version_calls.set(self.version_calls.get() + 1);
            if self.version_fails {
                return Err(SyncError::NotFound {
                    url: "memory://version".to_string(),
                });
            }
            Ok(self.version.clone())
        }

        fn list_mod_files(&self) -> Result<BTreeSet<String>, SyncError> {
            self.listing_calls.set(self.listing_calls.get() + 1);
            if self.listing_fails {
                return Err(SyncError::Fetch {
                    url: "memory://listing".to_string(),
                    reason: "HTTP 500 Internal Server Error".to_string(),
                });
            }
            Ok(self.files.keys().cloned().collect())
        }

        fn download_file(&self, file_name: &str) -> Result<ModDownload, SyncError> {
            self.downloads.borrow_mut().push(file_name.to_string());
            let bytes = self
                .files
                .get(file_name)
                .cloned()
                .ok_or_else(|| SyncError::PartialDownload {
                    name: file_name.to_string(),
                    reason: "HTTP 404 Not Found".to_string(),
                })?;
            let total = match self.claimed_lengths.get(file_name) {
                Some(claimed) => Some(*claimed),
                None => self.advertise_length.then(|| bytes.len() as u64),
            };
            if self.broken_downloads.contains(file_name) {
                let half = bytes[..bytes.len() / 2].to_vec();
                let reader = BrokenReader {
                    remaining: io::Cursor::new(half),
                };
                return Ok(ModDownload::new(total, Box::new(reader)));
            }
            Ok(ModDownload::new(total, Box::new(io::Cursor::new(bytes))))
        }
    }
}
