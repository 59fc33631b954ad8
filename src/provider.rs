// File: ./src/provider.rs
//! The Todo.txt provider: owns the source file, the in-memory index and the
//! list of subscribers.
//!
//! Every mutation rewrites the whole file. Each rewrite bumps a generation
//! counter and records the [`Fingerprint`] of what was written, so a later
//! change notification can tell our own write apart from an external edit.
//! Until the file has been read successfully once, the provider refuses to
//! write it.
use crate::error::{ParseError, ProviderError, Result};
use crate::model::adapter::to_todo_txt;
use crate::model::parser::{is_valid_list_name, is_valid_title, normalize_words, parse_line};
use crate::model::{NewTask, ParsedLine, Task, TaskId, TaskList};
use crate::notifier::ErrorSink;
use crate::storage::{Fingerprint, SourceFile};
use crate::store::TaskStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strum::Display;
use tokio::sync::mpsc;

pub const PROVIDER_ID: &str = "todo-txt";
pub const PROVIDER_NAME: &str = "Todo.txt";
pub const PROVIDER_DESCRIPTION: &str = "On the Todo.txt file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SyncState {
    Uninitialized,
    Loading,
    Ready,
    Reloading,
}

/// Signals sent to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    ListAdded(TaskList),
    ListRemoved(TaskList),
    /// A list was renamed or its tasks changed.
    ListUpdated { old_name: String, list: TaskList },
    /// A reload finished; every list of the new index has been announced.
    Reloaded,
}

pub struct TodoTxtProvider {
    source: SourceFile,
    sink: Arc<dyn ErrorSink>,
    store: TaskStore,
    state: SyncState,
    generation: u64,
    /// Content last written or read. `None` until a read succeeds.
    last_synced: Option<Fingerprint>,
    diagnostics: Vec<ProviderError>,
    subscribers: Vec<mpsc::UnboundedSender<ProviderEvent>>,
}

impl std::fmt::Debug for TodoTxtProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoTxtProvider")
            .field("source", &self.source)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("lists", &self.store.list_names())
            .finish()
    }
}

impl TodoTxtProvider {
    pub fn new(source: impl Into<PathBuf>, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            source: SourceFile::new(source),
            sink,
            store: TaskStore::new(),
            state: SyncState::Uninitialized,
            generation: 0,
            last_synced: None,
            diagnostics: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Creates the provider and loads the file right away. A failed load has
    /// already been reported; the provider is left `Ready` with an empty index
    /// and rejects changes until a later reload succeeds.
    pub fn open(source: impl Into<PathBuf>, sink: Arc<dyn ErrorSink>) -> Self {
        let mut provider = Self::new(source, sink);
        if let Err(e) = provider.load() {
            log::warn!("Todo.txt provider starting empty: {}", e);
        }
        provider
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ProviderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    // --- Accessors ---

    pub fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    pub fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    pub fn description(&self) -> &'static str {
        PROVIDER_DESCRIPTION
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn source(&self) -> &Path {
        self.source.path()
    }

    pub(crate) fn source_file(&self) -> &SourceFile {
        &self.source
    }

    pub(crate) fn sink(&self) -> Arc<dyn ErrorSink> {
        self.sink.clone()
    }

    /// Number of rewrites performed by this provider.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Lines rejected by the last successful load or reload.
    pub fn diagnostics(&self) -> &[ProviderError] {
        &self.diagnostics
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn lists(&self) -> impl Iterator<Item = &TaskList> {
        self.store.lists()
    }

    pub fn list(&self, name: &str) -> Option<&TaskList> {
        self.store.list(name)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.store.task(id)
    }

    pub fn tasks_in(&self, list: &str) -> Vec<&Task> {
        self.store.tasks_in(list)
    }

    pub fn subtasks_of(&self, parent: TaskId) -> Vec<&Task> {
        self.store.subtasks_of(parent)
    }

    // --- Loading ---

    /// Initial load. On a provider that is already loaded this is a reload.
    pub fn load(&mut self) -> Result<()> {
        if self.state != SyncState::Uninitialized {
            return self.reload();
        }

        self.state = SyncState::Loading;
        let outcome = match self.read_source() {
            Ok((store, fingerprint, diagnostics)) => {
                self.store = store;
                self.last_synced = Some(fingerprint);
                self.set_diagnostics(diagnostics);
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        };
        self.state = SyncState::Ready;

        log::info!(
            "Loaded {} lists and {} tasks from {}",
            self.store.list_names().len(),
            self.store.task_count(),
            self.source.path().display()
        );
        self.announce_lists();
        outcome
    }

    /// Drops the whole index and rebuilds it from the file. Old lists are
    /// announced as removed before any new list is announced as added.
    /// If the file cannot be read, the current index is kept.
    pub fn reload(&mut self) -> Result<()> {
        self.state = SyncState::Reloading;

        let (store, fingerprint, diagnostics) = match self.read_source() {
            Ok(fresh) => fresh,
            Err(e) => {
                self.report(&e);
                self.state = SyncState::Ready;
                return Err(e);
            }
        };

        let old = std::mem::replace(&mut self.store, store);
        for list in old.lists() {
            self.emit(ProviderEvent::ListRemoved(list.clone()));
        }
        self.last_synced = Some(fingerprint);
        self.set_diagnostics(diagnostics);
        self.state = SyncState::Ready;

        log::info!(
            "Reloaded {}: {} lists, {} tasks",
            self.source.path().display(),
            self.store.list_names().len(),
            self.store.task_count()
        );
        self.announce_lists();
        self.emit(ProviderEvent::Reloaded);
        Ok(())
    }

    /// Entry point for file change notifications. Reloads only when the
    /// file differs from what we last wrote or read. Returns whether a
    /// reload happened.
    pub fn handle_source_changed(&mut self) -> Result<bool> {
        if self.state == SyncState::Uninitialized {
            return Ok(false);
        }

        let observed = match self.source.fingerprint() {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                self.report(&e);
                return Err(e);
            }
        };

        if observed.is_some() && observed == self.last_synced {
            log::debug!(
                "Ignoring change notification for our own write (generation {})",
                self.generation
            );
            return Ok(false);
        }

        log::info!("{} changed on disk, reloading", self.source.path().display());
        self.reload()?;
        Ok(true)
    }

    /// Reads and parses the whole file. Rejected lines are returned as
    /// diagnostics; only failing to open or read the file is an error.
    fn read_source(&self) -> Result<(TaskStore, Fingerprint, Vec<ProviderError>)> {
        self.source.ensure_exists()?;
        let snapshot = self.source.read()?;

        let mut parsed: Vec<ParsedLine> = Vec::new();
        let mut diagnostics = Vec::new();
        for (idx, line) in snapshot.lines.into_iter().enumerate() {
            let result = line
                .map_err(|_| ParseError::InvalidEncoding)
                .and_then(|text| parse_line(&text));
            match result {
                Ok(Some(line)) => parsed.push(line),
                Ok(None) => {}
                Err(source) => diagnostics.push(ProviderError::Parse {
                    line: idx + 1,
                    source,
                }),
            }
        }
        Ok((TaskStore::from_lines(parsed), snapshot.fingerprint, diagnostics))
    }

    fn set_diagnostics(&mut self, diagnostics: Vec<ProviderError>) {
        for diagnostic in &diagnostics {
            self.report(diagnostic);
        }
        self.diagnostics = diagnostics;
    }

    fn announce_lists(&mut self) {
        let lists: Vec<TaskList> = self.store.lists().cloned().collect();
        for list in lists {
            self.emit(ProviderEvent::ListAdded(list));
        }
    }

    // --- Task mutations ---

    pub fn create_task(&mut self, new: NewTask) -> Result<TaskId> {
        self.ensure_ready()?;
        let title = checked_title(&new.title)?;
        let list = normalize_words(&new.list);
        let parent_title = new.parent_title.as_deref().map(checked_title).transpose()?;
        if !self.store.has_list(&list) {
            return Err(ProviderError::invalid(format!("no list named '{}'", list)));
        }
        if let Some(parent) = new.parent {
            self.check_parent(None, parent, &list)?;
        }

        let mut task = Task::new(&title, &list);
        task.completed = new.completed;
        task.priority = new.priority;
        task.created = new.created;
        task.due = new.due;
        task.parent = new.parent;
        if task.parent.is_none() {
            task.pending_parent = parent_title;
        }

        let id = self.store.insert_task(task);
        log::debug!("Created task {} in list '{}'", id, list);
        self.emit_list_updated(&list, &list);
        self.persist()?;
        Ok(id)
    }

    pub fn update_task(&mut self, mut task: Task) -> Result<()> {
        self.ensure_ready()?;
        let Some(old_list) = self.store.task(task.id).map(|t| t.list.clone()) else {
            return Err(ProviderError::invalid(format!("no task with id {}", task.id)));
        };
        task.title = checked_title(&task.title)?;
        task.list = normalize_words(&task.list);
        task.pending_parent = task.pending_parent.as_deref().map(checked_title).transpose()?;
        if !self.store.has_list(&task.list) {
            return Err(ProviderError::invalid(format!("no list named '{}'", task.list)));
        }
        if let Some(parent) = task.parent {
            self.check_parent(Some(task.id), parent, &task.list)?;
        }
        if task.is_subtask() && self.store.has_subtasks(task.id) {
            return Err(ProviderError::invalid(
                "a task with subtasks cannot become a subtask",
            ));
        }

        let new_list = task.list.clone();
        self.store.update_task(task);
        self.emit_list_updated(&old_list, &old_list);
        if new_list != old_list {
            self.emit_list_updated(&new_list, &new_list);
        }
        self.persist()
    }

    pub fn remove_task(&mut self, id: TaskId) -> Result<Task> {
        self.ensure_ready()?;
        let Some(task) = self.store.remove_task(id) else {
            return Err(ProviderError::invalid(format!("no task with id {}", id)));
        };
        self.emit_list_updated(&task.list, &task.list);
        self.persist()?;
        Ok(task)
    }

    // --- List mutations ---

    pub fn create_task_list(&mut self, name: &str) -> Result<()> {
        self.ensure_ready()?;
        let name = normalize_words(name);
        let name = name.as_str();
        if !is_valid_list_name(name) {
            return Err(ProviderError::invalid(format!(
                "'{}' cannot be stored as a Todo.txt list name",
                name
            )));
        }
        if !self.store.ensure_list(name) {
            return Err(ProviderError::invalid(format!("list '{}' already exists", name)));
        }
        if let Some(list) = self.store.list(name).cloned() {
            self.emit(ProviderEvent::ListAdded(list));
        }
        self.persist()
    }

    pub fn update_task_list(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        self.ensure_ready()?;
        let new_name = normalize_words(new_name);
        let new_name = new_name.as_str();
        if !self.store.has_list(old_name) {
            return Err(ProviderError::invalid(format!("no list named '{}'", old_name)));
        }
        if !is_valid_list_name(new_name) {
            return Err(ProviderError::invalid(format!(
                "'{}' cannot be stored as a Todo.txt list name",
                new_name
            )));
        }
        let Some(list) = self.store.rename_list(old_name, new_name).cloned() else {
            return Err(ProviderError::invalid(format!("list '{}' already exists", new_name)));
        };
        self.emit(ProviderEvent::ListUpdated {
            old_name: old_name.to_string(),
            list,
        });
        self.persist()
    }

    pub fn remove_task_list(&mut self, name: &str) -> Result<()> {
        self.ensure_ready()?;
        let Some((list, tasks)) = self.store.remove_list(name) else {
            return Err(ProviderError::invalid(format!("no list named '{}'", name)));
        };
        log::debug!("Removed list '{}' with {} tasks", name, tasks.len());
        self.emit(ProviderEvent::ListRemoved(list));
        self.persist()
    }

    // --- Internals ---

    /// `child` is `None` for a task that does not exist yet.
    fn check_parent(&self, child: Option<TaskId>, parent: TaskId, list: &str) -> Result<()> {
        let Some(p) = self.store.task(parent) else {
            return Err(ProviderError::invalid(format!("no task with id {}", parent)));
        };
        if p.list != list {
            return Err(ProviderError::invalid(
                "a parent task must belong to the same list",
            ));
        }
        if Some(parent) == child || !self.store.can_be_parent(parent) {
            return Err(ProviderError::invalid(
                "subtasks cannot have subtasks of their own",
            ));
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state != SyncState::Ready {
            return Err(ProviderError::invalid(format!(
                "provider is {}, not ready for changes",
                self.state
            )));
        }
        // A rewrite from an index that never saw the file would wipe it.
        if self.last_synced.is_none() {
            return Err(ProviderError::invalid(format!(
                "{} has not been read successfully, refusing to overwrite it",
                self.source.path().display()
            )));
        }
        Ok(())
    }

    /// Full rewrite of the source file from the index.
    fn persist(&mut self) -> Result<()> {
        let contents = to_todo_txt(&self.store);
        match self.source.replace(&contents) {
            Ok(fingerprint) => {
                self.generation += 1;
                self.last_synced = Some(fingerprint);
                log::debug!(
                    "Wrote {} bytes to {} (generation {})",
                    fingerprint.len(),
                    self.source.path().display(),
                    self.generation
                );
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    fn report(&self, err: &ProviderError) {
        match err {
            ProviderError::Parse { .. } => log::warn!("Skipping Todo.txt line: {}", err),
            _ => log::error!("{}", err),
        }
        self.sink.report(err.summary(), &err.to_string());
    }

    fn emit_list_updated(&mut self, old_name: &str, name: &str) {
        if let Some(list) = self.store.list(name).cloned() {
            self.emit(ProviderEvent::ListUpdated {
                old_name: old_name.to_string(),
                list,
            });
        }
    }

    fn emit(&mut self, event: ProviderEvent) {
        // Closed receivers are dropped.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Normalized title, or `InvalidRequest` when it would not read back as-is.
fn checked_title(title: &str) -> Result<String> {
    let title = normalize_words(title);
    if is_valid_title(&title) {
        Ok(title)
    } else {
        Err(ProviderError::invalid(format!(
            "'{}' cannot be stored as a Todo.txt title",
            title
        )))
    }
}
