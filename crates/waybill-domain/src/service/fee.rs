//! Highest rate and the additional-drop fee

use serde::{Deserialize, Serialize};

use crate::model::Drop;
use crate::service::allocation::round2;

/// Drops included in the base rate
pub const FREE_DROPS: usize = 2;

/// Flat fee for every drop beyond [`FREE_DROPS`].
///
/// No fee applies when any drop is a split or payload sub-shipment.
pub fn additional_fee_tier(drop_count: usize, rate_per_drop: f64, any_tagged: bool) -> f64 {
    if drop_count <= FREE_DROPS || any_tagged {
        return 0.0;
    }
    round2((drop_count - FREE_DROPS) as f64 * rate_per_drop)
}

pub fn highest_rate(drops: &[Drop]) -> f64 {
    drops.iter().map(|d| d.rate).fold(0.0, f64::max)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateBreakdown {
    pub highest_rate: f64,
    pub additional_adjustment: f64,
    pub total_rate: f64,
}

pub fn rate_breakdown(drops: &[Drop], rate_per_drop: f64) -> RateBreakdown {
    let highest_rate = highest_rate(drops);
    let any_tagged = drops.iter().any(Drop::is_tagged);
    let additional_adjustment = additional_fee_tier(drops.len(), rate_per_drop, any_tagged);
    RateBreakdown {
        highest_rate,
        additional_adjustment,
        total_rate: round2(highest_rate + additional_adjustment),
    }
}

impl RateBreakdown {
    /// Prefer backend figures where it has them; the local estimate fills the gaps
    pub fn reconcile(self, highest_rate: Option<f64>, additional_adjustment: Option<f64>) -> Self {
        let highest_rate = highest_rate.unwrap_or(self.highest_rate);
        let additional_adjustment = additional_adjustment.unwrap_or(self.additional_adjustment);
        Self {
            highest_rate,
            additional_adjustment,
            total_rate: round2(highest_rate + additional_adjustment),
        }
    }
}
