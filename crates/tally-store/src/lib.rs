//! Transaction storage for the Tally ledger.
//!
//! The store owns every durable record and the secondary indexes derived
//! from them. It enforces exactly two things on write: the amount invariant
//! and identifier uniqueness. Parent links are stored as given, dangling or
//! cyclic, and left for readers to cope with.
//!
//! # Storage Backends
//!
//! All backends implement the [`LedgerStore`] trait:
//!
//! - [`InMemoryLedgerStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileLedgerStore`] -- in-memory state rebuilt from an append-only,
//!   CRC-framed record log on open
//!
//! # Design Rules
//!
//! 1. Records are immutable once written; there is no update path.
//! 2. Records and indexes change under one lock, so readers never see an
//!    index entry without its record.
//! 3. A write is either fully applied or not started: no suspension point
//!    separates the duplicate check, the log append and the index update.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod log;
pub mod memory;
pub mod state;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{FileLedgerStore, FileStoreConfig};
pub use log::{LogRecord, RecordLog, SyncMode};
pub use memory::InMemoryLedgerStore;
pub use traits::LedgerStore;
