// Crate root library declaration and module exports.
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod notifier;
pub mod provider;
pub mod storage;
pub mod store;
pub mod watcher;

pub use error::{ErrorKind, ParseError, ProviderError};
pub use provider::{ProviderEvent, SyncState, TodoTxtProvider};
pub use watcher::{WatchHandle, spawn_watch_actor};
