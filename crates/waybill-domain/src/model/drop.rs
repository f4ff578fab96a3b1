use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{entity_abbreviation, Tag};

/// One consignee line item on a waybill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drop {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub consignee_name: String,
    pub cbm: f64,
    pub rate: f64,
    /// Derived; unset while the truck capacity is zero
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub entity_abbreviation: String,
    #[serde(default)]
    pub split_index: Option<u32>,
    #[serde(default)]
    pub payload_index: Option<u32>,
}

impl Drop {
    pub fn new(consignee_name: impl Into<String>, cbm: f64, rate: f64) -> Self {
        let mut drop = Self {
            id: Uuid::new_v4(),
            consignee_name: consignee_name.into(),
            cbm,
            rate,
            percentage: None,
            amount: None,
            entity_abbreviation: String::new(),
            split_index: None,
            payload_index: None,
        };
        drop.refresh_entity();
        drop
    }

    /// Re-derive abbreviation and split/payload tags from the consignee name.
    /// Explicit indices already on the drop are kept.
    pub fn refresh_entity(&mut self) {
        let key = entity_abbreviation(&self.consignee_name);
        self.entity_abbreviation = key.abbreviation;
        match key.tag {
            Some(Tag::Split(n)) => self.split_index = self.split_index.or(Some(n)),
            Some(Tag::Payload(n)) => self.payload_index = self.payload_index.or(Some(n)),
            None => {}
        }
    }

    /// Split and payload drops are sub-shipments of an already billed waybill
    pub fn is_tagged(&self) -> bool {
        self.split_index.is_some() || self.payload_index.is_some()
    }
}
