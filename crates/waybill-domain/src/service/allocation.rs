//! CBM / rate / percentage allocation
//!
//! Pure functions deriving each drop's share of a truck from its CBM and the
//! waybill's shared rate. Rounding is always to two decimal places.

use serde::{Deserialize, Serialize};
use waybill_types::ValidationError;

/// Tolerance used for capacity comparisons (CBM)
pub const CAPACITY_EPSILON: f64 = 0.01;

/// How a drop's amount is derived from the shared rate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmountMode {
    /// amount = rate x percentage / 100
    #[default]
    Percentage,
    /// amount = rate x cbm
    PerCbm,
}

impl std::fmt::Display for AmountMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AmountMode::Percentage => write!(f, "percentage"),
            AmountMode::PerCbm => write!(f, "per-cbm"),
        }
    }
}

impl std::str::FromStr for AmountMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "percentage" | "percent" => Ok(AmountMode::Percentage),
            "per-cbm" | "percbm" | "cbm" => Ok(AmountMode::PerCbm),
            other => Err(ValidationError::InvalidValue {
                field: "amount_mode".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round0(value: f64) -> f64 {
    value.round()
}

/// Percentage of the truck taken by `cbm`.
///
/// Returns `None` when `total_cbm` is zero (or not a finite positive number)
/// so callers leave the percentage unset instead of storing NaN/inf.
/// A CBM within [`CAPACITY_EPSILON`] of the total is reported as exactly 100.
pub fn compute_percentage(cbm: f64, total_cbm: f64) -> Option<f64> {
    if !total_cbm.is_finite() || total_cbm <= 0.0 || !cbm.is_finite() {
        return None;
    }
    if (cbm - total_cbm).abs() < CAPACITY_EPSILON {
        return Some(100.0);
    }
    Some(round2(cbm / total_cbm * 100.0))
}

pub fn compute_amount(rate: f64, percentage: f64) -> f64 {
    round2(rate * percentage / 100.0)
}

pub fn compute_amount_per_cbm(rate: f64, cbm: f64) -> f64 {
    round2(rate * cbm)
}

/// Amount for one drop under the given mode
pub fn amount_for(mode: AmountMode, rate: f64, cbm: f64, percentage: f64) -> f64 {
    match mode {
        AmountMode::Percentage => compute_amount(rate, percentage),
        AmountMode::PerCbm => compute_amount_per_cbm(rate, cbm),
    }
}

/// Rescale percentages so they total exactly 100.00.
///
/// Every value is scaled by `100 / sum` and rounded; the last one absorbs the
/// rounding remainder. A single value is forced to 100. A zero (or negative)
/// sum has nothing to scale and is returned unchanged.
pub fn normalize_to_hundred(percentages: &[f64]) -> Vec<f64> {
    match percentages.len() {
        0 => Vec::new(),
        1 => vec![100.0],
        n => {
            let sum: f64 = percentages.iter().sum();
            if sum <= 0.0 || !sum.is_finite() {
                return percentages.to_vec();
            }
            let factor = 100.0 / sum;
            let mut scaled: Vec<f64> = percentages[..n - 1]
                .iter()
                .map(|p| round2(p * factor))
                .collect();
            let others: f64 = scaled.iter().sum();
            scaled.push(round2(100.0 - others));
            scaled
        }
    }
}

/// CBM still available on the truck once `used_cbm` and the value currently
/// being typed (`pending_cbm`) are accounted for.
pub fn remaining_capacity(truck_cbm: f64, used_cbm: f64, pending_cbm: f64) -> f64 {
    round2(truck_cbm - used_cbm - pending_cbm)
}

/// True when the CBMs fill the truck to within [`CAPACITY_EPSILON`]
pub fn is_capacity_full(cbms: &[f64], truck_cbm: f64) -> bool {
    let used: f64 = cbms.iter().sum();
    (used - truck_cbm).abs() < CAPACITY_EPSILON
}

/// True when no further CBM may be added
pub fn is_exhausted(remaining: f64) -> bool {
    remaining < CAPACITY_EPSILON
}

/// CBM may only be entered once the shared rate is positive
pub fn ensure_rate_set(rate: f64) -> Result<(), ValidationError> {
    if rate > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::RateNotSet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_basic() {
        assert_eq!(compute_percentage(30.0, 100.0), Some(30.0));
        assert_eq!(compute_percentage(1.0, 3.0), Some(33.33));
    }

    #[test]
    fn test_percentage_clamps_near_total() {
        assert_eq!(compute_percentage(99.995, 100.0), Some(100.0));
        assert_eq!(compute_percentage(24.999, 25.0), Some(100.0));
    }

    #[test]
    fn test_percentage_zero_capacity_is_unset() {
        assert_eq!(compute_percentage(10.0, 0.0), None);
        assert_eq!(compute_percentage(10.0, -5.0), None);
        assert_eq!(compute_percentage(10.0, f64::NAN), None);
    }

    #[test]
    fn test_amount() {
        assert!((compute_amount(5000.0, 30.0) - 1500.0).abs() < 0.01);
        assert!((compute_amount(1000.0, 33.33) - 333.3).abs() < 0.01);
        assert!((compute_amount_per_cbm(120.5, 2.0) - 241.0).abs() < 0.01);
    }

    #[test]
    fn test_amount_for_mode() {
        assert!((amount_for(AmountMode::Percentage, 5000.0, 30.0, 30.0) - 1500.0).abs() < 0.01);
        assert!((amount_for(AmountMode::PerCbm, 50.0, 30.0, 30.0) - 1500.0).abs() < 0.01);
    }

    #[test]
    fn test_shared_rate_scenario() {
        let truck = 100.0;
        let rate = 5000.0;
        let p1 = compute_percentage(30.0, truck).unwrap();
        let p2 = compute_percentage(70.0, truck).unwrap();
        assert!((p1 - 30.0).abs() < 0.01);
        assert!((p2 - 70.0).abs() < 0.01);
        let a1 = compute_amount(rate, p1);
        let a2 = compute_amount(rate, p2);
        assert!((a1 - 1500.0).abs() < 0.01);
        assert!((a2 - 3500.0).abs() < 0.01);
        assert!((p1 + p2 - 100.0).abs() < 0.01);
        assert!((a1 + a2 - rate).abs() < 0.01);
    }

    #[test]
    fn test_amounts_sum_to_rate_when_truck_full() {
        let cbms = [12.5, 20.0, 17.5, 50.0];
        let total: f64 = cbms.iter().sum();
        let rate = 18000.0;
        let sum_amount: f64 = cbms
            .iter()
            .map(|c| compute_amount(rate, compute_percentage(*c, total).unwrap()))
            .sum();
        assert!((sum_amount - rate).abs() < 0.01);
    }

    #[test]
    fn test_normalize_thirds() {
        let normalized = normalize_to_hundred(&[33.33, 33.33, 33.33]);
        let sum: f64 = normalized.iter().sum();
        assert!((sum - 100.0).abs() < 0.001);
        assert!((normalized[2] - 33.34).abs() < 0.001);
    }

    #[test]
    fn test_normalize_under_capacity_scales_up() {
        // three drops of 10 CBM on a 100 CBM truck
        let normalized = normalize_to_hundred(&[10.0, 10.0, 10.0]);
        let sum: f64 = normalized.iter().sum();
        assert!((sum - 100.0).abs() < 0.001);
        assert!((normalized[0] - 33.33).abs() < 0.001);
    }

    #[test]
    fn test_normalize_single_and_empty() {
        assert_eq!(normalize_to_hundred(&[42.0]), vec![100.0]);
        assert!(normalize_to_hundred(&[]).is_empty());
    }

    #[test]
    fn test_normalize_zero_sum_unchanged() {
        assert_eq!(normalize_to_hundred(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_remaining_capacity() {
        assert!((remaining_capacity(100.0, 30.0, 0.0) - 70.0).abs() < 0.001);
        assert!((remaining_capacity(100.0, 30.0, 20.0) - 50.0).abs() < 0.001);
        assert!(is_exhausted(remaining_capacity(100.0, 99.999, 0.0)));
        assert!(!is_exhausted(remaining_capacity(100.0, 99.0, 0.0)));
    }

    #[test]
    fn test_capacity_full() {
        assert!(is_capacity_full(&[30.0, 70.0], 100.0));
        assert!(is_capacity_full(&[30.0, 69.995], 100.0));
        assert!(!is_capacity_full(&[30.0, 69.9], 100.0));
        assert!(!is_capacity_full(&[10.0, 10.0, 10.0], 100.0));
    }

    #[test]
    fn test_rate_precondition() {
        assert_eq!(ensure_rate_set(0.0), Err(ValidationError::RateNotSet));
        assert_eq!(ensure_rate_set(-1.0), Err(ValidationError::RateNotSet));
        assert!(ensure_rate_set(0.5).is_ok());
    }

    #[test]
    fn test_amount_mode_parse() {
        assert_eq!("per-cbm".parse::<AmountMode>().unwrap(), AmountMode::PerCbm);
        assert_eq!("Percentage".parse::<AmountMode>().unwrap(), AmountMode::Percentage);
        assert!("weight".parse::<AmountMode>().is_err());
    }
}
