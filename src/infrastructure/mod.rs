//! Adapters: concrete implementations of the ports.

pub mod bigquery;
pub mod gcs;
pub mod local_storage;
