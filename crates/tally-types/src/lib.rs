//! Foundation types for the Tally ledger.
//!
//! Every other Tally crate depends on `tally-types`. Input parsing lives here
//! so the store, the rollup engine and the facade all agree on what a valid
//! identifier, amount or category is.
//!
//! # Key Types
//!
//! - [`TransactionId`]: caller-supplied positive identifier, the primary key
//! - [`Category`]: non-empty free-form label shared by many transactions
//! - [`Transaction`]: the sole ledger record, with an optional parent link
//! - [`Deadline`]: absolute point in time after which an operation is abandoned

pub mod category;
pub mod deadline;
pub mod error;
pub mod id;
pub mod transaction;

pub use category::Category;
pub use deadline::Deadline;
pub use error::TypeError;
pub use id::TransactionId;
pub use transaction::{validate_amount, Transaction};
