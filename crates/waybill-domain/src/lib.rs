//! Waybill domain: drops, entity summaries, and the allocation engine

pub mod model;
pub mod repository;
pub mod service;
