//! Per-entity aggregation of drop amounts and percentages

use std::collections::BTreeMap;

use crate::model::{Drop, EntitySummary};
use crate::service::allocation::round2;

/// Group drops by entity abbreviation and total their amount and percentage.
///
/// Entities that are `Rounded` in `previous` are pinned: their summary is
/// copied verbatim, whatever their drops now hold, and it stays in the output
/// even if the entity has no drops left. The result is sorted by abbreviation.
pub fn entity_totals(drops: &[Drop], previous: &[EntitySummary]) -> Vec<EntitySummary> {
    let mut totals: BTreeMap<String, EntitySummary> = previous
        .iter()
        .filter(|e| e.is_rounded())
        .map(|e| (e.entity_abbreviation.clone(), e.clone()))
        .collect();

    for drop in drops {
        let key = drop.entity_abbreviation.clone();
        let summary = totals
            .entry(key.clone())
            .or_insert_with(|| EntitySummary::new(key));
        if summary.is_rounded() {
            continue;
        }
        summary.total_amount += drop.amount.unwrap_or(0.0);
        summary.total_percentage += drop.percentage.unwrap_or(0.0);
    }

    totals
        .into_values()
        .map(|mut summary| {
            if !summary.is_rounded() {
                summary.total_amount = round2(summary.total_amount);
                summary.total_percentage = round2(summary.total_percentage);
            }
            summary
        })
        .collect()
}

/// Abbreviations whose summaries are currently pinned
pub fn rounded_entities(summaries: &[EntitySummary]) -> Vec<&str> {
    summaries
        .iter()
        .filter(|e| e.is_rounded())
        .map(|e| e.entity_abbreviation.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityStatus;

    fn drop_with(name: &str, percentage: f64, amount: f64) -> Drop {
        let mut drop = Drop::new(name, 0.0, 5000.0);
        drop.percentage = Some(percentage);
        drop.amount = Some(amount);
        drop
    }

    fn find<'a>(summaries: &'a [EntitySummary], abbr: &str) -> &'a EntitySummary {
        summaries
            .iter()
            .find(|s| s.entity_abbreviation == abbr)
            .unwrap()
    }

    #[test]
    fn test_groups_by_prefix() {
        let drops = vec![
            drop_with("ABC - Store 1", 20.0, 1000.0),
            drop_with("ABC - Store 2", 20.0, 1000.0),
            drop_with("XYZ - Depot", 60.0, 3000.0),
        ];
        let totals = entity_totals(&drops, &[]);
        assert_eq!(totals.len(), 2);
        assert!((find(&totals, "ABC").total_percentage - 40.0).abs() < 0.01);
        assert!((find(&totals, "ABC").total_amount - 2000.0).abs() < 0.01);
        assert!((find(&totals, "XYZ").total_percentage - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_split_wrapper_groups_separately() {
        let drops = vec![
            drop_with("ABC - Store 1", 50.0, 2500.0),
            drop_with("split-1(ABC - Store 1)", 50.0, 2500.0),
        ];
        let totals = entity_totals(&drops, &[]);
        assert_eq!(totals.len(), 2);
        assert!((find(&totals, "split-1(ABC)").total_amount - 2500.0).abs() < 0.01);
    }

    #[test]
    fn test_rounded_entity_is_frozen() {
        let drops = vec![
            drop_with("A - 1", 40.0, 2000.0),
            drop_with("B - 1", 60.0, 3000.0),
        ];
        let mut previous = entity_totals(&drops, &[]);
        previous
            .iter_mut()
            .find(|s| s.entity_abbreviation == "A")
            .unwrap()
            .status = EntityStatus::Rounded;

        let mut more = drops.clone();
        more.push(drop_with("B - 2", 10.0, 500.0));
        more[0].percentage = Some(35.0);
        let totals = entity_totals(&more, &previous);

        let a = find(&totals, "A");
        assert!(a.is_rounded());
        assert!((a.total_percentage - 40.0).abs() < 0.01);
        assert!((a.total_amount - 2000.0).abs() < 0.01);
        assert!((find(&totals, "B").total_percentage - 70.0).abs() < 0.01);
    }

    #[test]
    fn test_rounded_entity_survives_without_drops() {
        let mut pinned = EntitySummary::new("GONE");
        pinned.total_percentage = 25.0;
        pinned.status = EntityStatus::Rounded;
        let totals = entity_totals(&[], &[pinned.clone()]);
        assert_eq!(totals, vec![pinned]);
        assert_eq!(rounded_entities(&totals), vec!["GONE"]);
    }

    #[test]
    fn test_calculated_previous_is_recomputed() {
        let mut stale = EntitySummary::new("A");
        stale.total_percentage = 99.0;
        let totals = entity_totals(&[drop_with("A - 1", 10.0, 500.0)], &[stale]);
        assert!((find(&totals, "A").total_percentage - 10.0).abs() < 0.01);
    }
}
