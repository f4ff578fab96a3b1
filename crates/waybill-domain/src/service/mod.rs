//! Domain services

pub mod allocation;
pub mod entity_totals;
pub mod fee;
pub mod report;

pub use allocation::{
    compute_amount, compute_percentage, is_capacity_full, normalize_to_hundred,
    remaining_capacity, AmountMode, CAPACITY_EPSILON,
};
pub use entity_totals::entity_totals;
pub use fee::{additional_fee_tier, rate_breakdown, RateBreakdown};
pub use report::generate_allocation_report;
