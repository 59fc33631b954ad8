// Manages the on-disk Todo.txt source file.
//
// Reads are line-oriented; writes always replace the whole file through a
// temporary file and a rename, under an exclusive sidecar lock.
use crate::error::{ProviderError, Result};
use fs2::FileExt;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{self, Read};
use std::string::FromUtf8Error;
use std::path::{Path, PathBuf};

/// Identity of one exact file content, used to tell our own writes apart
/// from external edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    len: u64,
    digest: u64,
}

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self {
            len: bytes.len() as u64,
            digest: hasher.finish(),
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Lines read from the source file, plus the fingerprint of what was read.
/// Each line is decoded on its own, so one bad line does not hide the rest.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    pub lines: Vec<std::result::Result<String, FromUtf8Error>>,
    pub fingerprint: Fingerprint,
}

/// Splits on `\n`, drops a trailing `\r`, and decodes every line separately.
fn split_lines(bytes: &[u8]) -> Vec<std::result::Result<String, FromUtf8Error>> {
    let mut segments: Vec<&[u8]> = bytes.split(|b| *b == b'\n').collect();
    if segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    segments
        .into_iter()
        .map(|s| String::from_utf8(s.strip_suffix(b"\r").unwrap_or(s).to_vec()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar lock path: `todo.txt` -> `todo.txt.lock`.
    fn get_lock_path(&self) -> PathBuf {
        let mut lock_path = self.path.clone();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    fn get_tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Runs `f` while holding an exclusive lock on the sidecar file.
    pub fn with_lock<F, T>(&self, f: F) -> io::Result<T>
    where
        F: FnOnce() -> io::Result<T>,
    {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.get_lock_path())?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Creates an empty file (and parent directories) if none exists.
    /// Returns true when a file was created.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        let open_err = |source: io::Error| ProviderError::IoOpenFailure {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(open_err)?;
        }
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(open_err)?;
        log::info!("Created empty Todo.txt file at {}", self.path.display());
        Ok(true)
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        let mut file = fs::File::open(&self.path).map_err(|source| ProviderError::IoOpenFailure {
            path: self.path.clone(),
            source,
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|source| ProviderError::IoReadFailure {
                path: self.path.clone(),
                source,
            })?;
        Ok(bytes)
    }

    /// Reads the file line by line.
    pub fn read(&self) -> Result<SourceSnapshot> {
        let bytes = self.read_bytes()?;
        Ok(SourceSnapshot {
            lines: split_lines(&bytes),
            fingerprint: Fingerprint::of(&bytes),
        })
    }

    /// Fingerprint of the current content, `None` if the file is gone.
    pub fn fingerprint(&self) -> Result<Option<Fingerprint>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(Fingerprint::of(&bytes))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProviderError::IoReadFailure {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Atomic write: write to a temp file, then rename over the source.
    fn atomic_write(&self, contents: &[u8]) -> io::Result<()> {
        let tmp_path = self.get_tmp_path();
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }

    /// Replaces the whole file and returns the fingerprint of what was written.
    pub fn replace(&self, contents: &str) -> Result<Fingerprint> {
        self.with_lock(|| self.atomic_write(contents.as_bytes()))
            .map_err(|source| ProviderError::IoWriteFailure {
                path: self.path.clone(),
                source,
            })?;
        Ok(Fingerprint::of(contents.as_bytes()))
    }
}
