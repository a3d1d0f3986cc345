//! # Ports
//!
//! Traits for the external collaborators: warehouse catalog, export job
//! service and object storage. Adapters live in `infrastructure`.

pub mod catalog_port;
pub mod export_job_port;
pub mod storage_port;
