//! Application service layer - editing sessions, sync, polling, config

pub mod app;
pub mod config;
pub mod polling;
pub mod repository;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use session::{AllocationContext, NewDrop, SessionUpdate, WaybillSession};
