//! Cycle-safe rollup aggregation for the Tally ledger.
//!
//! A rollup of a root transaction is the root's own amount plus the amount
//! of every transaction whose parent chain leads back to the root. Parent
//! links are never validated on write, so the traversal itself has to
//! terminate on cyclic data: a candidate whose id already appears on the
//! path that reached it is a *cycle node*, contributes nothing and is not
//! expanded.
//!
//! Traversal state lives entirely inside one call and is dropped on return,
//! including when the call is abandoned at its deadline, so any number of
//! rollups may run concurrently against the same store.

pub mod engine;
pub mod error;
pub mod report;

pub use engine::RollupEngine;
pub use error::{RollupError, RollupResult};
pub use report::RollupReport;
