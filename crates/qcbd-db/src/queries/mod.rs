//! Database query modules.

pub mod entities;
pub mod sync_runs;
