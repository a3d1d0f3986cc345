//! # Domain Layer
//!
//! Pure types and rules. Nothing in here performs I/O.

pub mod entities;
pub mod errors;
pub mod run_root;
pub mod table_filter;
