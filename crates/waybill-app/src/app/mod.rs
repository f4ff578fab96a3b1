//! Use cases that talk to the remote backend

pub mod sync_service;

pub use sync_service::{PushReport, SyncService, SyncServiceError};
