//! Tests for the Journal
//!
//! These tests verify:
//! - Writer / reader agreement on frames and LSNs
//! - Auto-commit outside transactions and truncation after commit
//! - Rollback restoring bytes and stream length
//! - Recovery redoing committed and undoing uncommitted writes
//! - Torn tails being dropped and corrupt frames refusing to open

use std::sync::Arc;

use tempfile::TempDir;
use vellumdb::config::JournalSyncStrategy;
use vellumdb::journal::{
    Journal, JournalReader, JournalRecovery, JournalWriter, Operation, HEADER_SIZE,
};
use vellumdb::storage::{
    FileStreamProvider, InMemoryStreamProvider, SharedStream, StorageEngine, StorageStream,
    StreamProvider,
};
use vellumdb::VellumError;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_provider() -> Arc<InMemoryStreamProvider> {
    Arc::new(InMemoryStreamProvider::new())
}

fn open_journal(provider: &Arc<InMemoryStreamProvider>) -> Arc<Journal> {
    let (journal, _) = Journal::open(
        Arc::clone(provider) as Arc<dyn StreamProvider>,
        JournalSyncStrategy::EveryWrite,
    )
    .unwrap();
    Arc::new(journal)
}

fn open_writer(stream: &SharedStream) -> JournalWriter {
    JournalWriter::open(Arc::clone(stream), JournalSyncStrategy::EveryWrite).unwrap()
}

fn write_op(
    stream: &str,
    address: u64,
    previous_len: u64,
    before: &[u8],
    after: &[u8],
) -> Operation {
    Operation::Write {
        stream: stream.to_string(),
        address,
        previous_len,
        before: before.to_vec(),
        after: after.to_vec(),
    }
}

fn contents(provider: &InMemoryStreamProvider, name: &str) -> Vec<u8> {
    let stream = provider.stream(name).unwrap();
    let len = stream.len().unwrap() as usize;
    stream.read_at(0, len).unwrap()
}

// =============================================================================
// Writer / Reader Tests
// =============================================================================

#[test]
fn test_writer_assigns_increasing_lsns() {
    let provider = setup_provider();
    let stream = provider.stream("journal").unwrap();
    let mut writer = open_writer(&stream);

    let first = writer.append(write_op("data", 0, 0, &[], b"a")).unwrap();
    let second = writer.append(Operation::Commit).unwrap();
    assert_eq!(first, 1);
    assert_eq!(second, 2);

    let entries = JournalReader::open(&stream).unwrap().read_all().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].operation, write_op("data", 0, 0, &[], b"a"));
    assert!(entries[1].is_commit());
}

#[test]
fn test_writer_resumes_after_existing_entries() {
    let provider = setup_provider();
    let stream = provider.stream("journal").unwrap();
    {
        let mut writer = open_writer(&stream);
        writer.append(write_op("data", 0, 0, &[], b"a")).unwrap();
    }

    let writer = open_writer(&stream);
    assert_eq!(writer.current_lsn(), 2);
    assert_eq!(writer.position(), stream.len().unwrap());
}

#[test]
fn test_reader_stops_at_torn_tail() {
    let provider = setup_provider();
    let stream = provider.stream("journal").unwrap();
    let mut writer = open_writer(&stream);
    writer.append(write_op("data", 0, 0, &[], b"abc")).unwrap();
    let valid = stream.len().unwrap();

    // Half a frame header
    stream.write_at(valid, &[1; HEADER_SIZE / 2]).unwrap();

    let mut reader = JournalReader::open(&stream).unwrap();
    assert_eq!(reader.read_all().unwrap().len(), 1);
    assert!(reader.is_torn());
    assert_eq!(reader.valid_len(), valid);
}

// =============================================================================
// Transaction Tests
// =============================================================================

#[test]
fn test_write_outside_transaction_commits_immediately() {
    let provider = setup_provider();
    let journal = open_journal(&provider);
    let engine = StorageEngine::new("data", provider.as_ref(), Arc::clone(&journal)).unwrap();

    engine.write(0, b"hello").unwrap();

    assert_eq!(engine.read(0, 5).unwrap(), b"hello".to_vec());
    assert_eq!(provider.stream_len("journal"), 0);
    assert!(!journal.in_transaction());
}

#[test]
fn test_commit_truncates_journal() {
    let provider = setup_provider();
    let journal = open_journal(&provider);
    let engine = StorageEngine::new("data", provider.as_ref(), Arc::clone(&journal)).unwrap();

    journal.begin();
    engine.write(0, b"one").unwrap();
    engine.write(3, b"two").unwrap();
    assert!(provider.stream_len("journal") > 0);

    journal.commit().unwrap();

    assert_eq!(provider.stream_len("journal"), 0);
    assert_eq!(contents(&provider, "data"), b"onetwo".to_vec());
}

#[test]
fn test_nested_transactions_commit_at_outermost() {
    let provider = setup_provider();
    let journal = open_journal(&provider);
    let engine = StorageEngine::new("data", provider.as_ref(), Arc::clone(&journal)).unwrap();

    journal.begin();
    journal.begin();
    engine.write(0, b"x").unwrap();
    journal.commit().unwrap();

    assert!(journal.in_transaction());
    assert!(provider.stream_len("journal") > 0);

    journal.commit().unwrap();
    assert_eq!(provider.stream_len("journal"), 0);
}

#[test]
fn test_rollback_restores_bytes_and_length() {
    let provider = setup_provider();
    let journal = open_journal(&provider);
    let engine = StorageEngine::new("data", provider.as_ref(), Arc::clone(&journal)).unwrap();
    engine.write(0, b"original").unwrap();

    journal.begin();
    engine.write(2, b"XXXX").unwrap();
    engine.write(8, b"appended").unwrap();
    assert_eq!(contents(&provider, "data"), b"orXXXXalappended".to_vec());

    journal.rollback().unwrap();

    assert_eq!(contents(&provider, "data"), b"original".to_vec());
    assert_eq!(provider.stream_len("journal"), 0);
    assert!(!journal.in_transaction());
}

#[test]
fn test_rollback_without_writes_is_noop() {
    let provider = setup_provider();
    let journal = open_journal(&provider);

    journal.begin();
    journal.rollback().unwrap();

    assert!(!journal.in_transaction());
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_empty_journal() {
    let provider = setup_provider();
    let stream = provider.stream("journal").unwrap();

    let result = JournalRecovery::recover(&stream, provider.as_ref()).unwrap();

    assert!(result.is_clean());
    assert_eq!(result.last_lsn, 0);
}

#[test]
fn test_recovery_redoes_committed_writes() {
    let provider = setup_provider();
    {
        // Crash after the commit marker, before the primary write reached storage
        let stream = provider.stream("journal").unwrap();
        let mut writer = open_writer(&stream);
        writer.append(write_op("data", 0, 0, &[], b"committed")).unwrap();
        writer.append(Operation::Commit).unwrap();
    }

    let (_journal, result) = Journal::open(
        Arc::clone(&provider) as Arc<dyn StreamProvider>,
        JournalSyncStrategy::EveryWrite,
    )
    .unwrap();

    assert_eq!(result.entries_replayed, 1);
    assert_eq!(result.entries_rolled_back, 0);
    assert_eq!(result.last_lsn, 2);
    assert_eq!(contents(&provider, "data"), b"committed".to_vec());
    assert_eq!(provider.stream_len("journal"), 0);
}

#[test]
fn test_recovery_undoes_uncommitted_tail() {
    let provider = setup_provider();
    let data = provider.stream("data").unwrap();
    data.write_at(0, b"stable").unwrap();
    {
        // Crash in the middle of a transaction: journalled and applied, never committed
        let stream = provider.stream("journal").unwrap();
        let mut writer = open_writer(&stream);
        writer.append(write_op("data", 0, 6, b"st", b"ST")).unwrap();
        writer.append(write_op("data", 6, 6, &[], b"-grown")).unwrap();
        data.write_at(0, b"ST").unwrap();
        data.write_at(6, b"-grown").unwrap();
    }

    let (_journal, result) = Journal::open(
        Arc::clone(&provider) as Arc<dyn StreamProvider>,
        JournalSyncStrategy::EveryWrite,
    )
    .unwrap();

    assert_eq!(result.entries_replayed, 0);
    assert_eq!(result.entries_rolled_back, 2);
    assert_eq!(contents(&provider, "data"), b"stable".to_vec());
}

#[test]
fn test_recovery_mixed_committed_and_pending() {
    let provider = setup_provider();
    {
        let stream = provider.stream("journal").unwrap();
        let mut writer = open_writer(&stream);
        writer.append(write_op("data", 0, 0, &[], b"aaaa")).unwrap();
        writer.append(Operation::Commit).unwrap();
        writer.append(write_op("data", 0, 4, b"aaaa", b"bbbb")).unwrap();
    }
    provider.stream("data").unwrap().write_at(0, b"bbbb").unwrap();

    let (_journal, result) = Journal::open(
        Arc::clone(&provider) as Arc<dyn StreamProvider>,
        JournalSyncStrategy::EveryWrite,
    )
    .unwrap();

    assert_eq!(result.entries_replayed, 1);
    assert_eq!(result.entries_rolled_back, 1);
    assert_eq!(contents(&provider, "data"), b"aaaa".to_vec());
}

#[test]
fn test_recovery_drops_torn_tail() {
    let provider = setup_provider();
    {
        let stream = provider.stream("journal").unwrap();
        let mut writer = open_writer(&stream);
        writer.append(write_op("data", 0, 0, &[], b"ok")).unwrap();
        writer.append(Operation::Commit).unwrap();

        let frame_start = stream.len().unwrap();
        stream.write_at(frame_start, &[7; HEADER_SIZE + 3]).unwrap();
    }

    let (_journal, result) = Journal::open(
        Arc::clone(&provider) as Arc<dyn StreamProvider>,
        JournalSyncStrategy::EveryWrite,
    )
    .unwrap();

    assert!(result.was_truncated);
    assert_eq!(result.entries_replayed, 1);
    assert_eq!(contents(&provider, "data"), b"ok".to_vec());
}

#[test]
fn test_corrupt_frame_refuses_to_open() {
    let provider = setup_provider();
    {
        let stream = provider.stream("journal").unwrap();
        let mut writer = open_writer(&stream);
        writer.append(write_op("data", 0, 0, &[], b"payload")).unwrap();
        writer.append(Operation::Commit).unwrap();

        // Flip a payload byte of the first frame
        let mut byte = stream.read_at(HEADER_SIZE as u64 + 2, 1).unwrap();
        byte[0] ^= 0xFF;
        stream.write_at(HEADER_SIZE as u64 + 2, &byte).unwrap();
    }

    let result = Journal::open(
        Arc::clone(&provider) as Arc<dyn StreamProvider>,
        JournalSyncStrategy::EveryWrite,
    );

    assert!(matches!(result, Err(VellumError::JournalCorruption(_))));
    assert_eq!(provider.stream_len("data"), 0);
}

#[test]
fn test_verify_does_not_modify_journal() {
    let provider = setup_provider();
    let stream = provider.stream("journal").unwrap();
    let mut writer = open_writer(&stream);
    writer.append(write_op("data", 0, 0, &[], b"x")).unwrap();
    let len = stream.len().unwrap();

    let result = JournalRecovery::verify(&stream).unwrap();

    assert_eq!(result.entries_rolled_back, 1);
    assert_eq!(stream.len().unwrap(), len);
}

#[test]
fn test_file_backed_recovery_after_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let provider = FileStreamProvider::new(temp_dir.path()).unwrap();
        let stream = provider.stream("journal").unwrap();
        let mut writer = open_writer(&stream);
        writer.append(write_op("data", 0, 0, &[], b"durable")).unwrap();
        writer.append(Operation::Commit).unwrap();
    }

    let provider: Arc<dyn StreamProvider> =
        Arc::new(FileStreamProvider::new(temp_dir.path()).unwrap());
    let (_journal, result) =
        Journal::open(Arc::clone(&provider), JournalSyncStrategy::EveryWrite).unwrap();

    assert_eq!(result.entries_replayed, 1);
    let data = provider.stream("data").unwrap();
    assert_eq!(data.read_at(0, 7).unwrap(), b"durable".to_vec());
    assert!(temp_dir.path().join("journal.vdb").exists());
}
