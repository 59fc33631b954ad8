// File: ./src/context.rs
/*! Filesystem locations used by the provider.

An `AppContext` decides where the configuration file lives and which
Todo.txt file is used when the configuration does not name one. Two
implementations are provided:

- `StandardContext`: `directories::ProjectDirs` for config/data and the
  user's Documents folder for the default Todo.txt file, with an optional
  override root.
- `TestContext`: a unique temporary directory, removed on drop.
*/

use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use std::path::PathBuf;

pub const DEFAULT_SOURCE_FILENAME: &str = "todo.txt";

/// The trait is object-safe so callers can hold `Arc<dyn AppContext>`.
pub trait AppContext: Send + Sync + std::fmt::Debug {
    fn get_data_dir(&self) -> Result<PathBuf>;
    fn get_config_dir(&self) -> Result<PathBuf>;

    /// Directory holding the default Todo.txt file.
    fn get_documents_dir(&self) -> Result<PathBuf> {
        self.get_data_dir()
    }

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.get_config_dir()?.join("config.toml"))
    }

    fn get_default_source_path(&self) -> Result<PathBuf> {
        Ok(self.get_documents_dir()?.join(DEFAULT_SOURCE_FILENAME))
    }
}

// --- Production Implementation ---

#[derive(Clone, Debug)]
pub struct StandardContext {
    override_root: Option<PathBuf>,
}

impl StandardContext {
    /// When `override_root` is `Some(path)`, every directory lives under it
    /// (`data`, `config`, `documents`).
    pub fn new(override_root: Option<PathBuf>) -> Self {
        Self { override_root }
    }

    fn ensure_exists(path: PathBuf) -> Result<PathBuf> {
        if !path.exists() {
            std::fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(path)
    }

    fn get_proj_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("org", "todotxt", "todotxt-store")
    }
}

impl Default for StandardContext {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AppContext for StandardContext {
    fn get_data_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return Self::ensure_exists(root.join("data"));
        }
        let proj = Self::get_proj_dirs().ok_or_else(|| anyhow::anyhow!("No home directory"))?;
        Self::ensure_exists(proj.data_dir().to_path_buf())
    }

    fn get_config_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return Self::ensure_exists(root.join("config"));
        }
        let proj = Self::get_proj_dirs().ok_or_else(|| anyhow::anyhow!("No home directory"))?;
        Self::ensure_exists(proj.config_dir().to_path_buf())
    }

    fn get_documents_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return Self::ensure_exists(root.join("documents"));
        }
        match UserDirs::new().and_then(|u| u.document_dir().map(|d| d.to_path_buf())) {
            Some(dir) => Ok(dir),
            None => self.get_data_dir(),
        }
    }
}

// --- Test Implementation ---

#[derive(Clone, Debug)]
pub struct TestContext {
    pub root: PathBuf,
}

impl TestContext {
    /// Creates a context backed by a unique temporary directory, removed
    /// when the `TestContext` is dropped.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let root = std::env::temp_dir().join(format!("todotxt_test_{}", uuid));
        // Best-effort create; tests will panic if this fails.
        std::fs::create_dir_all(&root).expect("failed to create TestContext temp dir");
        Self { root }
    }

    /// Path of a file directly under the test root.
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn get_data_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("data");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }

    fn get_config_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("config");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }

    fn get_documents_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("documents");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        // Best-effort cleanup; ignore errors.
        let _ = std::fs::remove_dir_all(&self.root);
    }
}
