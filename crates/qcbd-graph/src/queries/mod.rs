//! Read-side graph queries.

pub mod explore;
pub mod search;
