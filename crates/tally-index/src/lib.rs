//! Secondary indexes for the Tally ledger.
//!
//! Both indexes are plain in-memory structures. The store owns one of each
//! next to its records and updates them under the same lock as the record
//! itself, so an index never observes a half-applied write.
//!
//! - [`CategoryIndex`]: category label to member ids, in insertion order
//! - [`ChildIndex`]: parent id to child ids, in insertion order. This is the
//!   reverse of the `parent` link and drives descendant traversal.

pub mod category;
pub mod children;

pub use category::CategoryIndex;
pub use children::ChildIndex;
