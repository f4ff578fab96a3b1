//! Infrastructure layer for waybill allocation
//!
//! Concrete implementations of the domain repository trait, file loaders,
//! Excel export and the HTTP client for the waybill backend.

pub mod api;
pub mod document_loader;
pub mod drop_csv;
pub mod excel;
pub mod persistence;
