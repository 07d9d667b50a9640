//! Journal Recovery
//!
//! Brings primary streams back to their last committed state after a crash.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::Result;
use crate::storage::{SharedStream, StreamProvider};

use super::{JournalEntry, JournalReader, Operation};

/// Handles journal replay at open time
pub struct JournalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Committed write entries reapplied to primary streams
    pub entries_replayed: u64,

    /// Uncommitted write entries undone
    pub entries_rolled_back: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether a partially written frame was dropped from the tail
    pub was_truncated: bool,
}

impl RecoveryResult {
    /// True when the journal was empty
    pub fn is_clean(&self) -> bool {
        self.entries_replayed == 0 && self.entries_rolled_back == 0 && !self.was_truncated
    }
}

impl JournalRecovery {
    /// Replay the journal against the primary streams
    ///
    /// This will:
    /// 1. Read all complete entries (a corrupt frame aborts with an error)
    /// 2. Redo writes up to the last commit marker, in order
    /// 3. Undo writes after the last commit marker, newest first
    /// 4. Sync touched streams and truncate the journal
    pub fn recover(
        journal: &SharedStream,
        provider: &dyn StreamProvider,
    ) -> Result<RecoveryResult> {
        let (entries, mut result) = Self::scan(journal)?;
        if entries.is_empty() && !result.was_truncated {
            return Ok(result);
        }

        let committed_len = entries
            .iter()
            .rposition(JournalEntry::is_commit)
            .map(|i| i + 1)
            .unwrap_or(0);
        let (committed, pending) = entries.split_at(committed_len);

        let mut touched = Self::redo(committed, provider)?;
        touched.extend(Self::undo(pending, provider)?);

        for stream in touched.values() {
            stream.sync()?;
        }

        result.entries_replayed = count_writes(committed);
        result.entries_rolled_back = count_writes(pending);

        journal.set_len(0)?;
        journal.sync()?;

        info!(
            replayed = result.entries_replayed,
            rolled_back = result.entries_rolled_back,
            last_lsn = result.last_lsn,
            torn_tail = result.was_truncated,
            "journal recovery complete"
        );

        Ok(result)
    }

    /// Verify integrity of the journal without modifying anything
    pub fn verify(journal: &SharedStream) -> Result<RecoveryResult> {
        let (entries, mut result) = Self::scan(journal)?;

        let committed_len = entries
            .iter()
            .rposition(JournalEntry::is_commit)
            .map(|i| i + 1)
            .unwrap_or(0);
        result.entries_replayed = count_writes(&entries[..committed_len]);
        result.entries_rolled_back = count_writes(&entries[committed_len..]);

        Ok(result)
    }

    /// Reapply the after-image of every write, oldest first
    pub(crate) fn redo(
        entries: &[JournalEntry],
        provider: &dyn StreamProvider,
    ) -> Result<BTreeMap<String, SharedStream>> {
        let mut touched = BTreeMap::new();

        for entry in entries {
            if let Operation::Write {
                stream,
                address,
                after,
                ..
            } = &entry.operation
            {
                let handle = open_touched(&mut touched, provider, stream)?;
                handle.write_at(*address, after)?;
            }
        }

        Ok(touched)
    }

    /// Restore the before-image of every write, newest first
    pub(crate) fn undo(
        entries: &[JournalEntry],
        provider: &dyn StreamProvider,
    ) -> Result<BTreeMap<String, SharedStream>> {
        let mut touched = BTreeMap::new();

        for entry in entries.iter().rev() {
            if let Operation::Write {
                stream,
                address,
                previous_len,
                before,
                ..
            } = &entry.operation
            {
                let handle = open_touched(&mut touched, provider, stream)?;
                if !before.is_empty() {
                    handle.write_at(*address, before)?;
                }
                if handle.len()? > *previous_len {
                    handle.set_len(*previous_len)?;
                }
            }
        }

        Ok(touched)
    }

    fn scan(journal: &SharedStream) -> Result<(Vec<JournalEntry>, RecoveryResult)> {
        let mut reader = JournalReader::open(journal)?;
        let entries = reader.read_all()?;

        let result = RecoveryResult {
            last_lsn: entries.last().map(|e| e.lsn).unwrap_or(0),
            was_truncated: reader.is_torn(),
            ..RecoveryResult::default()
        };

        Ok((entries, result))
    }
}

fn count_writes(entries: &[JournalEntry]) -> u64 {
    entries.iter().filter(|e| !e.is_commit()).count() as u64
}

fn open_touched<'a>(
    touched: &'a mut BTreeMap<String, SharedStream>,
    provider: &dyn StreamProvider,
    name: &str,
) -> Result<&'a SharedStream> {
    if !touched.contains_key(name) {
        touched.insert(name.to_string(), provider.stream(name)?);
    }
    Ok(&touched[name])
}
