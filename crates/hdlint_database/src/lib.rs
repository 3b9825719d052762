//! Project-wide database and build planner.
//!
//! The database indexes every configured source file, the design units it
//! declares and the dependencies it needs, re-parsing on mtime changes and
//! inferring libraries for files the configuration left unassigned. The
//! planner turns a target path into a deterministic compilation sequence
//! over that index.

mod database;
mod planner;

pub use database::Database;
pub use planner::{build_sequence, BuildPlan};
