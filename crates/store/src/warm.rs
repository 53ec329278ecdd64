//! Warm tier: per-day, per-category JSON-lines files
//!
//! Writes are append-only and batch-granular. With compression enabled,
//! every batch is emitted as one complete gzip member and fsynced before
//! the call returns, so once `append_batch` succeeds the batch survives a
//! crash and can always be decoded, so the caller may safely delete the
//! hot copies. A member truncated by a crash can only be the final one, and
//! its batch was by construction never deleted from the hot store; the
//! reader treats that tail as end-of-file rather than corruption.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::layout::{WARM_SUFFIX, WARM_SUFFIX_GZ};

/// Path of the warm file for (category, date) under the warm root.
pub fn warm_file_path(
    warm_root: &Path,
    category: &str,
    date: NaiveDate,
    compress: bool,
) -> PathBuf {
    let suffix = if compress { WARM_SUFFIX_GZ } else { WARM_SUFFIX };
    warm_root
        .join(date.format("%Y-%m-%d").to_string())
        .join(format!("{category}{suffix}"))
}

/// Append one batch of records to the warm file for (category, date).
///
/// Creates the dated directory on first write; later batches and later
/// runs on the same day append to the same file. Returns the file path.
/// The file is flushed and fsynced before returning.
pub fn append_batch(
    warm_root: &Path,
    category: &str,
    date: NaiveDate,
    records: &[Map<String, Value>],
    compress: bool,
) -> StoreResult<PathBuf> {
    let path = warm_file_path(warm_root, category, date, compress);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    if compress {
        // One gzip member per batch; members concatenate into a valid stream.
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write_lines(&mut encoder, records)?;
        let writer = encoder.finish()?;
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?;
        file.sync_all()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_lines(&mut writer, records)?;
        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?;
        file.sync_all()?;
    }

    debug!(category, %date, records = records.len(), "appended warm batch");
    Ok(path)
}

fn write_lines<W: Write>(writer: &mut W, records: &[Map<String, Value>]) -> StoreResult<()> {
    for record in records {
        let line = serde_json::to_string(record).map_err(StoreError::Serialize)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Open a warm file for reading, handling both compressed and plain files.
///
/// Re-opening the same path yields the same sequence of records.
pub fn read_warm(path: &Path) -> StoreResult<WarmReader> {
    let file = File::open(path)?;
    let compressed = path.to_string_lossy().ends_with(WARM_SUFFIX_GZ);
    let reader: Box<dyn BufRead> = if compressed {
        Box::new(BufReader::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(WarmReader {
        path: path.to_path_buf(),
        reader,
        done: false,
    })
}

/// Lazy record iterator over one warm file.
pub struct WarmReader {
    path: PathBuf,
    reader: Box<dyn BufRead>,
    done: bool,
}

impl Iterator for WarmReader {
    type Item = StoreResult<Map<String, Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                // A trailing gzip member truncated by a crash: end of data.
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(StoreError::Io(e)));
                }
                Ok(_) => {}
            }
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(trimmed).map_err(|source| StoreError::MalformedRecord {
                    path: self.path.clone(),
                    source,
                }),
            );
        }
    }
}

/// Count the records inside a warm file (or warm bytes already extracted
/// from a bundle entry).
pub fn count_records_in_bytes(name: &str, bytes: &[u8]) -> StoreResult<u64> {
    let mut count = 0u64;
    let reader: Box<dyn Read + '_> = if name.ends_with(WARM_SUFFIX_GZ) {
        Box::new(MultiGzDecoder::new(bytes))
    } else {
        Box::new(bytes)
    };
    let mut buf = BufReader::new(reader);
    let mut line = String::new();
    loop {
        line.clear();
        match buf.read_line(&mut line) {
            Ok(0) => break,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(StoreError::Io(e)),
            Ok(_) => {
                if !line.trim().is_empty() {
                    count += 1;
                }
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(id: i64, message: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), json!(id));
        map.insert("message".to_string(), json!(message));
        map.insert("archived_at".to_string(), json!("2026-08-23T00:00:00Z"));
        map
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 23).unwrap()
    }

    #[test]
    fn round_trip_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(1, "a"), record(2, "b")];
        let path = append_batch(dir.path(), "events", date(), &records, true).unwrap();
        assert!(path.to_string_lossy().ends_with("events.jsonl.gz"));

        let read: Vec<_> = read_warm(&path)
            .unwrap()
            .collect::<StoreResult<Vec<_>>>()
            .unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn round_trip_uncompressed() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(1, "a")];
        let path = append_batch(dir.path(), "events", date(), &records, false).unwrap();
        assert!(path.to_string_lossy().ends_with("events.jsonl"));

        let read: Vec<_> = read_warm(&path)
            .unwrap()
            .collect::<StoreResult<Vec<_>>>()
            .unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn same_day_batches_append_to_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = append_batch(dir.path(), "events", date(), &[record(1, "a")], true).unwrap();
        let second = append_batch(dir.path(), "events", date(), &[record(2, "b")], true).unwrap();
        assert_eq!(first, second);

        let read: Vec<_> = read_warm(&first)
            .unwrap()
            .collect::<StoreResult<Vec<_>>>()
            .unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].get("id"), Some(&json!(1)));
        assert_eq!(read[1].get("id"), Some(&json!(2)));
    }

    #[test]
    fn reader_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(1, "a"), record(2, "b"), record(3, "c")];
        let path = append_batch(dir.path(), "events", date(), &records, true).unwrap();

        let first: Vec<_> = read_warm(&path).unwrap().map(Result::unwrap).collect();
        let second: Vec<_> = read_warm(&path).unwrap().map(Result::unwrap).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn truncated_trailing_member_ends_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = append_batch(dir.path(), "events", date(), &[record(1, "a")], true).unwrap();

        // Simulate a crash mid-batch: append half a gzip member.
        let full = {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(b"{\"id\":2}\n").unwrap();
            enc.finish().unwrap()
        };
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&full[..full.len() / 2]).unwrap();

        let read: Vec<_> = read_warm(&path)
            .unwrap()
            .collect::<StoreResult<Vec<_>>>()
            .unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].get("id"), Some(&json!(1)));
    }

    #[test]
    fn malformed_line_is_reported_not_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let day = dir.path().join("2026-08-23");
        fs::create_dir_all(&day).unwrap();
        let path = day.join("events.jsonl");
        fs::write(&path, b"not json\n").unwrap();

        let mut reader = read_warm(&path).unwrap();
        assert!(matches!(
            reader.next(),
            Some(Err(StoreError::MalformedRecord { .. }))
        ));
    }

    #[test]
    fn count_records_handles_both_encodings() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(1, "a"), record(2, "b")];
        let gz = append_batch(dir.path(), "events", date(), &records, true).unwrap();
        let plain = append_batch(dir.path(), "logs", date(), &records, false).unwrap();

        let gz_bytes = fs::read(&gz).unwrap();
        let plain_bytes = fs::read(&plain).unwrap();
        assert_eq!(count_records_in_bytes("events.jsonl.gz", &gz_bytes).unwrap(), 2);
        assert_eq!(count_records_in_bytes("logs.jsonl", &plain_bytes).unwrap(), 2);
    }

    proptest! {
        #[test]
        fn arbitrary_payloads_round_trip(messages in proptest::collection::vec(".*", 1..8)) {
            let dir = tempfile::tempdir().unwrap();
            let records: Vec<_> = messages
                .iter()
                .enumerate()
                .map(|(i, m)| record(i as i64, m))
                .collect();
            let path = append_batch(dir.path(), "events", date(), &records, true).unwrap();
            let read: Vec<_> = read_warm(&path)
                .unwrap()
                .collect::<StoreResult<Vec<_>>>()
                .unwrap();
            prop_assert_eq!(read, records);
        }
    }
}
