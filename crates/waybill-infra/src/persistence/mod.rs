//! Persistence implementations
//!
//! This module provides file-based implementations of the repository traits.

mod file_waybill_repo;

pub use file_waybill_repo::FileWaybillRepository;
