//! # mediatree-database
//!
//! The node table and everything that keeps its nested-set encoding
//! consistent: tree-scoped locks, all-or-nothing transactions, bound
//! arithmetic, structural queries, the node repository, and the
//! move/copy/delete/rebuild mutation protocol.
//!
//! Rows live in an in-memory table with secondary indexes on
//! `(tree_id, left)` and `(parent_id, name)`. The table can be persisted
//! as a JSON snapshot.

pub mod cursor;
pub mod database;
pub mod integrity;
pub mod locks;
pub mod mutation;
pub mod naming;
pub mod repositories;
pub mod snapshot;
pub mod transaction;

mod nested_set;
mod table;

pub use cursor::DescendantCursor;
pub use database::Database;
pub use integrity::{IntegrityReport, Violation};
pub use locks::{LockPlan, TreeLockManager};
pub use mutation::{DeleteReport, MutationEngine, RebuildReport};
pub use naming::NamePolicy;
pub use repositories::{NewNode, NodeRepository, NodeUpdate, TreeRepository};
pub use table::TableState;
pub use transaction::{CommitReport, TreeTransaction};
