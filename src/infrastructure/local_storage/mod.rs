pub mod local_storage_adapter;
