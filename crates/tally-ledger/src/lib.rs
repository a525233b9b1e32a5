//! Ledger facade for Tally.
//!
//! [`Ledger`] is the single entry point a front end talks to. It parses and
//! validates primitive caller input, bounds every operation by a
//! [`Deadline`](tally_types::Deadline), and dispatches to the store for
//! writes and point reads, to the category index for membership reads and to
//! the rollup engine for sums. Failures come back as one [`LedgerError`]
//! taxonomy; nothing on these paths panics.

pub mod config;
pub mod error;
pub mod ledger;
pub mod view;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult, Operation};
pub use ledger::{Ledger, NewTransaction};
pub use view::{Health, SumView, TransactionDetail};

// Re-export the types callers need to drive the facade.
pub use tally_rollup::RollupReport;
pub use tally_types::{Category, Deadline, Transaction, TransactionId};
