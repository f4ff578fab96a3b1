//! Repository trait definitions for data persistence

use crate::model::Waybill;
use waybill_types::Error;

/// Repository for locally kept waybills
pub trait WaybillRepository {
    /// Insert or replace a waybill keyed by its number
    fn save(&self, waybill: &Waybill) -> Result<(), Error>;

    /// Find a waybill by its number
    fn find_by_number(&self, waybill_number: &str) -> Result<Option<Waybill>, Error>;

    /// Find all waybills
    fn find_all(&self) -> Result<Vec<Waybill>, Error>;

    /// Remove a waybill; returns whether it existed
    fn delete(&self, waybill_number: &str) -> Result<bool, Error>;
}
