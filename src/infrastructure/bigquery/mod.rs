//! BigQuery adapters built on the `bq` command line tool.

pub mod bq_catalog_adapter;
pub mod bq_cli;
pub mod bq_extract_adapter;
