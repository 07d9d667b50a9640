//! Journalled writes and transactions
//!
//! Every primary write is journalled with its undo image before it touches
//! the primary stream. A transaction ends with a commit marker, a sync of the
//! touched streams, and a truncated journal.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::JournalSyncStrategy;
use crate::error::Result;
use crate::storage::{SharedStream, StreamProvider};

use super::{JournalReader, JournalRecovery, JournalWriter, Operation, RecoveryResult};

/// Owns the journal stream and the transaction state of a session
pub struct Journal {
    provider: Arc<dyn StreamProvider>,
    state: Mutex<JournalState>,
}

struct JournalState {
    writer: JournalWriter,
    /// Nesting depth of open transactions; 0 means auto-commit
    depth: usize,
    /// Primary streams written since the last commit
    touched: BTreeMap<String, SharedStream>,
    /// Write entries since the last commit
    pending: u64,
}

impl Journal {
    /// Name of the journal stream
    pub const STREAM_NAME: &'static str = "journal";

    /// Recover from any leftover journal, then open it for writing
    pub fn open(
        provider: Arc<dyn StreamProvider>,
        sync_strategy: JournalSyncStrategy,
    ) -> Result<(Self, RecoveryResult)> {
        let stream = provider.stream(Self::STREAM_NAME)?;
        let recovery = JournalRecovery::recover(&stream, provider.as_ref())?;
        let writer = JournalWriter::open(stream, sync_strategy)?;

        let journal = Self {
            provider,
            state: Mutex::new(JournalState {
                writer,
                depth: 0,
                touched: BTreeMap::new(),
                pending: 0,
            }),
        };

        Ok((journal, recovery))
    }

    /// Journal and apply a write to a primary stream
    ///
    /// Outside a transaction the write commits immediately.
    pub fn write(
        &self,
        stream_name: &str,
        stream: &SharedStream,
        address: u64,
        bytes: &[u8],
    ) -> Result<()> {
        let mut state = self.state.lock();

        let previous_len = stream.len()?;
        let before = if address < previous_len {
            let overlap = (previous_len - address).min(bytes.len() as u64) as usize;
            stream.read_at(address, overlap)?
        } else {
            Vec::new()
        };

        state.writer.append(Operation::Write {
            stream: stream_name.to_string(),
            address,
            previous_len,
            before,
            after: bytes.to_vec(),
        })?;
        state.pending += 1;
        state
            .touched
            .entry(stream_name.to_string())
            .or_insert_with(|| Arc::clone(stream));

        stream.write_at(address, bytes)?;

        if state.depth == 0 {
            Self::finish(&mut state)?;
        }

        Ok(())
    }

    /// Open a (possibly nested) transaction
    pub fn begin(&self) {
        self.state.lock().depth += 1;
    }

    /// Close the innermost transaction; the outermost one commits
    pub fn commit(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            Self::finish(&mut state)?;
        }
        Ok(())
    }

    /// Undo every write since the last commit and close all transactions
    pub fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.depth = 0;

        if state.pending == 0 {
            return Ok(());
        }

        let entries = JournalReader::open(state.writer.stream())?.read_all()?;
        let touched = JournalRecovery::undo(&entries, self.provider.as_ref())?;
        for stream in touched.values() {
            stream.sync()?;
        }

        debug!(entries = state.pending, "journal rolled back");

        state.writer.truncate()?;
        state.touched.clear();
        state.pending = 0;
        Ok(())
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.state.lock().depth > 0
    }

    /// LSN the next journal entry will receive
    pub fn current_lsn(&self) -> u64 {
        self.state.lock().writer.current_lsn()
    }

    fn finish(state: &mut JournalState) -> Result<()> {
        if state.pending == 0 {
            return Ok(());
        }

        let lsn = state.writer.append(Operation::Commit)?;
        state.writer.sync()?;

        for stream in state.touched.values() {
            stream.sync()?;
        }

        state.writer.truncate()?;

        debug!(lsn, entries = state.pending, "journal committed");
        state.touched.clear();
        state.pending = 0;
        Ok(())
    }
}
