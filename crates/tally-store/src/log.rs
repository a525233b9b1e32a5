//! Append-only record log backing [`FileLedgerStore`](crate::FileLedgerStore).

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tally_types::{Transaction, TransactionId};
use tracing::{debug, error, warn};

use crate::error::{StoreError, StoreResult};

/// One mutation of the ledger, as persisted.
///
/// On-disk framing:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogRecord)]
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LogRecord {
    Insert(Transaction),
    Delete { id: TransactionId, category: String },
}

/// Flush/sync strategy for the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

struct LogWriter {
    file: File,
    /// Current end of the log in bytes.
    offset: u64,
    /// Set when a failed append could not be rolled back. The file may end
    /// in a partial frame, so appends are refused until the log is reopened.
    torn: bool,
}

/// Crash-recoverable record log.
///
/// Records are framed with a length prefix and a CRC32 checksum. On
/// recovery the file is read front-to-back; entries that fail the CRC check
/// are skipped, and a torn tail ends recovery.
pub struct RecordLog {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    sync_mode: SyncMode,
}

impl RecordLog {
    /// Open (or create) the log file at `path`.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(LogWriter {
                file,
                offset,
                torn: false,
            }),
            sync_mode,
        })
    }

    /// Append one record. Returns the byte offset it was written at.
    ///
    /// Frames go straight to the file with no user-space buffer, so a
    /// failed append leaves nothing queued for a later one. The file is cut back to the previous end through a fresh
    /// handle; if that fails too, the log refuses further appends.
    pub fn append(&self, record: &LogRecord) -> StoreResult<u64> {
        let frame = encode_frame(record)?;
        let mut w = self.lock()?;
        if w.torn {
            return Err(StoreError::Unavailable(format!(
                "record log {} has an unrecovered partial frame; reopen to recover",
                self.path.display()
            )));
        }
        let entry_offset = w.offset;

        if let Err(e) = self.write_frame(&mut w, &frame) {
            warn!(offset = entry_offset, error = %e, "log append failed; rolling back tail");
            if let Err(rollback) = self.roll_back(&mut w, entry_offset) {
                error!(offset = entry_offset, error = %rollback, "log rollback failed; appends disabled");
                w.torn = true;
                return Err(StoreError::Unavailable(format!(
                    "append failed ({e}) and rollback failed ({rollback})"
                )));
            }
            return Err(e.into());
        }

        w.offset += frame.len() as u64;
        debug!(offset = entry_offset, len = frame.len(), "log append");
        Ok(entry_offset)
    }

    fn write_frame(&self, w: &mut LogWriter, frame: &[u8]) -> io::Result<()> {
        w.file.write_all(frame)?;
        if self.sync_mode == SyncMode::EveryWrite {
            w.file.sync_data()?;
        }
        Ok(())
    }

    /// Truncate the log to `offset` and swap in a fresh append handle.
    fn roll_back(&self, w: &mut LogWriter, offset: u64) -> io::Result<()> {
        let fresh = OpenOptions::new().read(true).append(true).open(&self.path)?;
        fresh.set_len(offset)?;
        if self.sync_mode == SyncMode::EveryWrite {
            fresh.sync_data()?;
        }
        w.file = fresh;
        w.offset = offset;
        Ok(())
    }

    /// Read back every intact record in write order.
    ///
    /// A torn tail is cut off so later appends start on a frame boundary.
    pub fn recover(&self) -> StoreResult<Vec<LogRecord>> {
        let mut file = BufReader::new(File::open(&self.path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut records = Vec::new();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            file.seek(SeekFrom::Start(offset))?;

            let mut header = [0u8; HEADER_SIZE];
            match file.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            if length == 0 || offset + HEADER_SIZE as u64 + length as u64 > file_len {
                warn!(offset, length, file_len, "invalid log entry length; stopping recovery");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match file.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "truncated log entry; stopping recovery");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(offset, expected = expected_crc, actual = actual_crc, "CRC mismatch; skipping entry");
            } else {
                match bincode::deserialize::<LogRecord>(&payload) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(offset, error = %e, "undecodable log entry; skipping"),
                }
            }

            offset += HEADER_SIZE as u64 + length as u64;
        }

        if offset < file_len {
            warn!(valid_len = offset, file_len, "discarding torn log tail");
            let mut w = self.lock()?;
            w.file.set_len(offset)?;
            w.offset = offset;
            w.torn = false;
        }

        debug!(recovered = records.len(), "log recovery complete");
        Ok(records)
    }

    /// Atomically replace the log contents with `records`.
    ///
    /// Writes a sibling file, syncs it, then renames it over the log.
    pub fn rewrite(&self, records: &[LogRecord]) -> StoreResult<()> {
        let mut w = self.lock()?;
        let tmp_path = self.path.with_extension("compact");

        let mut tmp = BufWriter::new(File::create(&tmp_path)?);
        let mut written: u64 = 0;
        for record in records {
            let frame = encode_frame(record)?;
            tmp.write_all(&frame)?;
            written += frame.len() as u64;
        }
        tmp.flush()?;
        tmp.get_ref().sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;

        w.file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        w.offset = written;
        w.torn = false;

        debug!(records = records.len(), bytes = written, "log rewritten");
        Ok(())
    }

    /// Current end of the log in bytes.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.lock()?.offset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    fn replace_handle(&self, file: File) {
        if let Ok(mut w) = self.writer.lock() {
            w.file = file;
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, LogWriter>> {
        self.writer
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("log mutex poisoned: {e}")))
    }
}

fn encode_frame(record: &LogRecord) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization(format!("record too large: {} bytes", payload.len())))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}
