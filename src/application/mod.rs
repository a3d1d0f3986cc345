//! Use cases: the pipeline logic, written against the ports only.

pub mod catalog_artifacts;
pub mod catalog_walker;
pub mod dataset_exporter;
pub mod report;
pub mod runtime;
pub mod snapshot_driver;
pub mod table_export;
pub mod task_group;
