//! Pre-deployment backups
//!
//! [`store::BackupStore`] is the durable append-only persistence seam;
//! [`manager::BackupManager`] builds records by snapshotting remote files
//! through the connector before a deployment mutates them.

pub mod manager;
pub mod store;
