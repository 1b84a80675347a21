//! Journal Tests
//!
//! These tests verify:
//! - Append and read back in order
//! - Torn-tail truncation on recovery
//! - CRC corruption stops replay
//! - Non-increasing sequence numbers stop replay
//! - Verification leaves the file untouched

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sensorledger::config::JournalSyncStrategy;
use sensorledger::journal::{
    JournalEntry, JournalReader, JournalRecovery, JournalWriter, HEADER_SIZE,
};
use sensorledger::state::WriteOp;
use sensorledger::LedgerError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn journal_path(dir: &TempDir) -> PathBuf {
    dir.path().join("journal.log")
}

fn put(key: &str, value: &str) -> WriteOp {
    WriteOp::Put {
        key: Bytes::from(key.to_string()),
        value: Bytes::from(value.to_string()),
    }
}

fn entry(seq: u64) -> JournalEntry {
    JournalEntry::new(seq, vec![put(&format!("k{}", seq), "v")])
}

/// Write entries for the given seqs; returns the file length after each one
fn write_entries(path: &Path, seqs: &[u64]) -> Vec<u64> {
    let mut writer = JournalWriter::open(path, JournalSyncStrategy::EveryCommit).unwrap();
    seqs.iter()
        .map(|&seq| {
            writer.append(&entry(seq)).unwrap();
            fs::metadata(path).unwrap().len()
        })
        .collect()
}

fn append_raw(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

fn seqs(entries: &[JournalEntry]) -> Vec<u64> {
    entries.iter().map(|e| e.seq).collect()
}

// =============================================================================
// Frame Tests
// =============================================================================

#[test]
fn test_frame_layout() {
    let entry = entry(7);
    let frame = entry.encode().unwrap();

    let body = &frame[HEADER_SIZE..];
    assert_eq!(&frame[0..8], &7u64.to_le_bytes());
    assert_eq!(&frame[8..12], &JournalEntry::compute_crc(body).to_le_bytes());
    assert_eq!(&frame[12..16], &(body.len() as u32).to_le_bytes());

    let decoded = JournalEntry::decode(7, JournalEntry::compute_crc(body), body).unwrap();
    assert_eq!(decoded, entry);
}

#[test]
fn test_decode_rejects_crc_mismatch() {
    let frame = entry(1).encode().unwrap();
    let body = &frame[HEADER_SIZE..];
    let wrong_crc = JournalEntry::compute_crc(body) ^ 0xFFFF_FFFF;

    assert!(matches!(
        JournalEntry::decode(1, wrong_crc, body),
        Err(LedgerError::JournalCorruption(_))
    ));
}

#[test]
fn test_decode_rejects_seq_mismatch() {
    let frame = entry(1).encode().unwrap();
    let body = &frame[HEADER_SIZE..];

    assert!(matches!(
        JournalEntry::decode(2, JournalEntry::compute_crc(body), body),
        Err(LedgerError::JournalCorruption(_))
    ));
}

// =============================================================================
// Writer / Reader Tests
// =============================================================================

#[test]
fn test_append_and_read_back() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    write_entries(&path, &[1, 2, 3]);

    let entries: Vec<JournalEntry> = JournalReader::open(&path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(seqs(&entries), vec![1, 2, 3]);
    assert_eq!(entries[1].writes, vec![put("k2", "v")]);
}

#[test]
fn test_writer_appends_to_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    write_entries(&path, &[1, 2]);
    write_entries(&path, &[3]);

    let (entries, result) = JournalRecovery::recover(&path).unwrap();
    assert_eq!(seqs(&entries), vec![1, 2, 3]);
    assert!(!result.was_truncated);
}

#[test]
fn test_writer_tracks_last_seq() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    let mut writer =
        JournalWriter::open(&path, JournalSyncStrategy::EveryNCommits { count: 2 }).unwrap();

    assert_eq!(writer.last_seq(), 0);
    writer.append(&entry(1)).unwrap();
    writer.append(&entry(2)).unwrap();
    writer.append(&entry(3)).unwrap();
    writer.sync().unwrap();

    assert_eq!(writer.last_seq(), 3);
    assert_eq!(writer.path(), path.as_path());
    assert_eq!(JournalRecovery::verify(&path).unwrap().entries_recovered, 3);
}

#[test]
fn test_reader_position_tracks_valid_bytes() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    let lengths = write_entries(&path, &[1, 2]);

    let mut reader = JournalReader::open(&path).unwrap();
    assert_eq!(reader.position(), 0);
    reader.next_entry().unwrap().unwrap();
    assert_eq!(reader.position(), lengths[0]);
    reader.next_entry().unwrap().unwrap();
    assert_eq!(reader.position(), lengths[1]);
    assert!(reader.next_entry().unwrap().is_none());
}

#[test]
fn test_empty_journal() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    fs::File::create(&path).unwrap();

    let (entries, result) = JournalRecovery::recover(&path).unwrap();
    assert!(entries.is_empty());
    assert_eq!(result, Default::default());
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_truncates_torn_header() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    let lengths = write_entries(&path, &[1, 2, 3]);

    // Half a header, as if the process died mid-append
    append_raw(&path, &[0xAB; HEADER_SIZE / 2]);

    let (entries, result) = JournalRecovery::recover(&path).unwrap();
    assert_eq!(seqs(&entries), vec![1, 2, 3]);
    assert!(result.was_truncated);
    assert_eq!(result.bytes_discarded, (HEADER_SIZE / 2) as u64);
    assert_eq!(result.last_seq, 3);
    assert_eq!(fs::metadata(&path).unwrap().len(), lengths[2]);
}

#[test]
fn test_recover_truncates_torn_body() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    let lengths = write_entries(&path, &[1]);

    let frame = entry(2).encode().unwrap();
    append_raw(&path, &frame[..frame.len() - 3]);

    let (entries, result) = JournalRecovery::recover(&path).unwrap();
    assert_eq!(seqs(&entries), vec![1]);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), lengths[0]);

    // Recovery is idempotent once the tail is gone
    let (again, second) = JournalRecovery::recover(&path).unwrap();
    assert_eq!(seqs(&again), vec![1]);
    assert!(!second.was_truncated);
}

#[test]
fn test_crc_corruption_stops_replay() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    let lengths = write_entries(&path, &[1, 2, 3]);

    // Flip the last body byte of entry 2
    let mut bytes = fs::read(&path).unwrap();
    let target = (lengths[1] - 1) as usize;
    bytes[target] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let (entries, result) = JournalRecovery::recover(&path).unwrap();
    assert_eq!(seqs(&entries), vec![1]);
    assert_eq!(result.bytes_discarded, lengths[2] - lengths[0]);
    assert_eq!(fs::metadata(&path).unwrap().len(), lengths[0]);
}

#[test]
fn test_oversized_length_is_corruption() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    write_entries(&path, &[1]);

    let mut header = Vec::new();
    header.extend_from_slice(&2u64.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&u32::MAX.to_le_bytes());
    append_raw(&path, &header);

    let (entries, result) = JournalRecovery::recover(&path).unwrap();
    assert_eq!(seqs(&entries), vec![1]);
    assert!(result.was_truncated);
}

#[test]
fn test_seq_going_backwards_stops_replay() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    write_entries(&path, &[1, 2]);
    write_entries(&path, &[2, 5]);

    let (entries, result) = JournalRecovery::recover(&path).unwrap();
    assert_eq!(seqs(&entries), vec![1, 2]);
    assert_eq!(result.last_seq, 2);
    assert!(result.was_truncated);
}

#[test]
fn test_reader_iterator_stops_after_error() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    write_entries(&path, &[1]);
    append_raw(&path, &[0u8; 3]);

    let results: Vec<_> = JournalReader::open(&path).unwrap().entries().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(LedgerError::JournalCorruption(_))));
}

#[test]
fn test_verify_does_not_modify_file() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    write_entries(&path, &[1, 2]);
    append_raw(&path, b"torn");
    let before = fs::read(&path).unwrap();

    let result = JournalRecovery::verify(&path).unwrap();
    assert_eq!(result.entries_recovered, 2);
    assert_eq!(result.bytes_discarded, 4);
    assert!(!result.was_truncated);
    assert_eq!(fs::read(&path).unwrap(), before);
}
