//! layerbak-storage: where encrypted backups live
//!
//! The cipher chain never touches storage. This crate moves finished blobs
//! in and out of an OpenDAL operator (local directory, S3-compatible, GCS
//! or in-memory) under timestamped names.

pub mod archive;
pub mod operator;

pub use archive::{BackupEntry, BackupNaming, BackupStore};
pub use operator::{build_operator, expand_tilde};
