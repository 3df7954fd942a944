//! Request-scoped relevance logic. Nothing in this crate performs I/O.

pub mod caption;
pub mod candidate;
pub mod query;
pub mod threshold;
pub mod verdict;
