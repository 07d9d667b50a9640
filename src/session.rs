//! Session
//!
//! Entry point of a store: owns the stream provider and the journal, runs
//! crash recovery once at open, and hands out collection files.
//!
//! ## Responsibilities
//! - Validate configuration and open the data directory
//! - Replay or roll back whatever the journal holds from a previous run
//! - Keep exactly one live `CollectionFile` per name
//! - Group work on several collection files into one transaction

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::collection::CollectionFile;
use crate::config::Config;
use crate::error::{Result, VellumError};
use crate::journal::{Journal, RecoveryResult};
use crate::storage::{FileStreamProvider, InMemoryStreamProvider, StorageEngine, StreamProvider};

/// An open store
pub struct Session {
    /// Session configuration
    config: Config,

    /// Source of every stream (collection files and the journal)
    provider: Arc<dyn StreamProvider>,

    /// Journal shared by all collection files
    journal: Arc<Journal>,

    /// What recovery found at open
    recovery: RecoveryResult,

    /// Collection files opened so far, by name
    files: Mutex<HashMap<String, Arc<CollectionFile>>>,
}

impl Session {
    /// Open the store in `config.data_dir`
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let provider = FileStreamProvider::new(&config.data_dir)?;
        Self::with_provider(config, Arc::new(provider))
    }

    /// Open the store in `path` with default settings
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Open a store that lives only in memory
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_provider(config, Arc::new(InMemoryStreamProvider::new()))
    }

    /// Open the store on an arbitrary stream provider
    ///
    /// On open:
    /// 1. Validate the configuration
    /// 2. Recover from the journal (redo committed, undo uncommitted)
    /// 3. Ready to hand out collection files
    pub fn with_provider(config: Config, provider: Arc<dyn StreamProvider>) -> Result<Self> {
        config.validate()?;

        let (journal, recovery) =
            Journal::open(Arc::clone(&provider), config.journal_sync_strategy)?;

        if recovery.was_truncated {
            warn!("journal ended in a torn entry; it was discarded");
        }
        info!(
            data_dir = %config.data_dir.display(),
            replayed = recovery.entries_replayed,
            rolled_back = recovery.entries_rolled_back,
            "session opened"
        );

        Ok(Self {
            config,
            provider,
            journal: Arc::new(journal),
            recovery,
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Collection file `name`, opened on first use
    ///
    /// Every call with the same name returns the same handle.
    pub fn collection_file(&self, name: &str) -> Result<Arc<CollectionFile>> {
        if name.is_empty() || name == Journal::STREAM_NAME {
            return Err(VellumError::Config(format!(
                "'{}' is not a valid collection file name",
                name
            )));
        }

        let mut files = self.files.lock();
        if let Some(file) = files.get(name) {
            return Ok(Arc::clone(file));
        }

        let engine = StorageEngine::new(name, self.provider.as_ref(), Arc::clone(&self.journal))?;
        let file = Arc::new(CollectionFile::open(
            name,
            engine,
            self.config.btree_degree,
            self.config.default_allocation,
        )?);
        files.insert(name.to_string(), Arc::clone(&file));
        Ok(file)
    }

    /// Run `f` as one transaction spanning every collection file
    ///
    /// Transactions opened inside `f` join this one. If `f` fails, all of
    /// its writes are undone and every open collection file reloads its
    /// state from disk.
    pub fn transaction<R>(&self, f: impl FnOnce() -> Result<R>) -> Result<R> {
        self.journal.begin();

        match f() {
            Ok(value) => {
                self.journal.commit()?;
                Ok(value)
            }
            Err(e) => {
                self.journal.rollback()?;
                for file in self.files.lock().values() {
                    file.reload()?;
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Summary of the recovery run at open
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    /// Names of the collection files opened so far
    pub fn open_files(&self) -> Vec<String> {
        let mut names: Vec<_> = self.files.lock().keys().cloned().collect();
        names.sort();
        names
    }
}
