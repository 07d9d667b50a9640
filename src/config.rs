//! Configuration for VellumDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, VellumError};

/// Main configuration for a VellumDB session
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── journal.vdb      (write-ahead journal)
    ///     └── {name}.vdb       (one file per collection file)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Journal Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: when to fsync the journal
    pub journal_sync_strategy: JournalSyncStrategy,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Degree `t` of every index B-tree (nodes hold t-1 ..= 2t-1 entries)
    pub btree_degree: usize,

    // -------------------------------------------------------------------------
    // Record Configuration
    // -------------------------------------------------------------------------
    /// Allocation policy for object records
    pub default_allocation: AllocationPolicy,
}

/// Journal sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalSyncStrategy {
    /// fsync the journal before every primary write (survives power loss)
    EveryWrite,

    /// fsync only at commit (survives process crashes, faster)
    OnCommit,
}

/// How object records reserve space for future growth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// Reserve twice the data size so most updates stay in place
    DoubleSize,

    /// Reserve exactly the data size
    ExactSize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./vellum_data"),
            journal_sync_strategy: JournalSyncStrategy::EveryWrite,
            btree_degree: 12,
            default_allocation: AllocationPolicy::DoubleSize,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values a session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.btree_degree < 2 {
            return Err(VellumError::Config(format!(
                "btree_degree must be at least 2, got {}",
                self.btree_degree
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the journal sync strategy
    pub fn journal_sync_strategy(mut self, strategy: JournalSyncStrategy) -> Self {
        self.config.journal_sync_strategy = strategy;
        self
    }

    /// Set the B-tree degree used by indexes
    pub fn btree_degree(mut self, degree: usize) -> Self {
        self.config.btree_degree = degree;
        self
    }

    /// Set the allocation policy for object records
    pub fn default_allocation(mut self, policy: AllocationPolicy) -> Self {
        self.config.default_allocation = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
