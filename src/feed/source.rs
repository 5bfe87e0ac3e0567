//! Where the feed tables come from: a directory, a zip archive on disk, or a
//! zip archive downloaded over HTTP.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{AtlasError, Result};
use crate::fetch::{BasicClient, fetch_bytes};

/// Gives access to the raw bytes of the feed's tables by file name.
pub trait TableSource {
    /// File names of every table available in the source.
    fn table_names(&self) -> Vec<String>;

    /// Reads the table named `file_name` (e.g. `"stops.txt"`), or `None` if the
    /// source has no such table.
    fn read_table(&mut self, file_name: &str) -> Result<Option<Vec<u8>>>;
}

/// Opens `source`: an `http(s)` URL, a directory or a zip archive.
///
/// # Errors
///
/// Returns [`AtlasError::SourceUnavailable`] if the path does not exist, and
/// download or archive errors otherwise.
pub fn open_source(source: &str) -> Result<Box<dyn TableSource>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!(url = source, "Downloading feed archive");
        let client = BasicClient::new()?;
        let bytes = fetch_bytes(&client, source)?;
        return Ok(Box::new(ZipSource::from_bytes(bytes)?));
    }

    let path = Path::new(source);
    if path.is_dir() {
        Ok(Box::new(DirectorySource::new(path)))
    } else if path.is_file() {
        let bytes = std::fs::read(path)?;
        Ok(Box::new(ZipSource::from_bytes(bytes)?))
    } else {
        Err(AtlasError::SourceUnavailable(source.to_owned()))
    }
}

/// A directory holding the `*.txt` tables side by side.
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

impl TableSource for DirectorySource {
    fn table_names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_owned))
            .collect();
        names.sort();
        names
    }

    fn read_table(&mut self, file_name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.dir.join(file_name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }
}

/// An in-memory zip archive. Tables are matched by file name, so an archive
/// that nests everything under a folder works too.
pub struct ZipSource {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    entries: HashMap<String, usize>,
}

impl ZipSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = HashMap::new();

        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            if let Some(name) = Path::new(file.name()).file_name().and_then(OsStr::to_str) {
                entries.entry(name.to_owned()).or_insert(i);
            }
        }
        debug!(entries = entries.len(), "Feed archive indexed");

        Ok(Self { archive, entries })
    }
}

impl TableSource for ZipSource {
    fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    fn read_table(&mut self, file_name: &str) -> Result<Option<Vec<u8>>> {
        let Some(&index) = self.entries.get(file_name) else {
            return Ok(None);
        };
        let mut buf = Vec::new();
        self.archive.by_index(index)?.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }
}
