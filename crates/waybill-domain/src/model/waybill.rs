use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Drop, EntitySummary, Shipper};
use crate::service::allocation::{self, AmountMode};
use crate::service::fee::{rate_breakdown, RateBreakdown};

/// A truck load: one shipper, many drops, one shared rate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waybill {
    pub waybill_number: String,
    #[serde(default)]
    pub shipper: Option<Shipper>,
    pub truck_cbm: f64,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub amount_mode: AmountMode,
    #[serde(default)]
    pub drops: Vec<Drop>,
    #[serde(default)]
    pub entities: Vec<EntitySummary>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Waybill {
    pub fn new(waybill_number: impl Into<String>, truck_cbm: f64) -> Self {
        let now = Utc::now();
        Self {
            waybill_number: waybill_number.into(),
            shipper: None,
            truck_cbm,
            rate: 0.0,
            amount_mode: AmountMode::default(),
            drops: Vec::new(),
            entities: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn used_cbm(&self) -> f64 {
        self.drops.iter().map(|d| d.cbm).sum()
    }

    pub fn remaining_capacity(&self, pending_cbm: f64) -> f64 {
        allocation::remaining_capacity(self.truck_cbm, self.used_cbm(), pending_cbm)
    }

    pub fn is_capacity_full(&self) -> bool {
        let cbms: Vec<f64> = self.drops.iter().map(|d| d.cbm).collect();
        allocation::is_capacity_full(&cbms, self.truck_cbm)
    }

    pub fn rate_breakdown(&self, rate_per_drop: f64) -> RateBreakdown {
        rate_breakdown(&self.drops, rate_per_drop)
    }

    pub fn find_drop(&self, id: Uuid) -> Option<&Drop> {
        self.drops.iter().find(|d| d.id == id)
    }

    pub fn find_drop_mut(&mut self, id: Uuid) -> Option<&mut Drop> {
        self.drops.iter_mut().find(|d| d.id == id)
    }

    pub fn entity(&self, abbreviation: &str) -> Option<&EntitySummary> {
        self.entities
            .iter()
            .find(|e| e.entity_abbreviation == abbreviation)
    }

    pub fn total_percentage(&self) -> f64 {
        allocation::round2(self.drops.iter().filter_map(|d| d.percentage).sum())
    }

    pub fn total_amount(&self) -> f64 {
        allocation::round2(self.drops.iter().filter_map(|d| d.amount).sum())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
