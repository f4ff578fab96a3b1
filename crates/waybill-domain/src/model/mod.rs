//! Domain model types

pub mod drop;
pub mod entity;
pub mod field_change;
pub mod shipper;
pub mod waybill;

pub use drop::Drop;
pub use entity::{entity_abbreviation, EntityKey, EntityStatus, EntitySummary, Tag};
pub use field_change::{DropField, FieldChange, FieldValue};
pub use shipper::Shipper;
pub use waybill::Waybill;
