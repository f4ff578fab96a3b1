//! Editing session for one waybill
//!
//! Form handlers call into [`WaybillSession`]; every successful mutation
//! returns a fresh [`SessionUpdate`] for rendering. A rejected mutation
//! leaves the session exactly as it was.

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use waybill_domain::model::{Drop, DropField, EntitySummary, FieldChange, Waybill};
use waybill_domain::service::allocation::{
    amount_for, compute_percentage, ensure_rate_set, is_exhausted, normalize_to_hundred,
    remaining_capacity, AmountMode, CAPACITY_EPSILON,
};
use waybill_domain::service::{entity_totals, RateBreakdown};
use waybill_infra::document_loader::WaybillDocument;
use waybill_types::ValidationError;

/// Values the allocation engine needs beyond the waybill itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationContext {
    /// Fee per drop beyond the free ones
    pub rate_per_drop: f64,
    /// Mode for waybills that don't carry one
    pub amount_mode: AmountMode,
}

impl Default for AllocationContext {
    fn default() -> Self {
        Self {
            rate_per_drop: 0.0,
            amount_mode: AmountMode::Percentage,
        }
    }
}

/// Snapshot returned after each mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub drops: Vec<Drop>,
    pub entities: Vec<EntitySummary>,
    pub breakdown: RateBreakdown,
}

/// Drop as entered in the add-drop form
#[derive(Debug, Clone, PartialEq)]
pub struct NewDrop {
    pub consignee_name: String,
    pub cbm: f64,
    pub split_index: Option<u32>,
    pub payload_index: Option<u32>,
}

impl NewDrop {
    pub fn new(consignee_name: impl Into<String>, cbm: f64) -> Self {
        Self {
            consignee_name: consignee_name.into(),
            cbm,
            split_index: None,
            payload_index: None,
        }
    }

    pub fn split(mut self, index: u32) -> Self {
        self.split_index = Some(index);
        self
    }

    pub fn payload(mut self, index: u32) -> Self {
        self.payload_index = Some(index);
        self
    }
}

pub struct WaybillSession {
    waybill: Waybill,
    context: AllocationContext,
}

impl WaybillSession {
    pub fn new(waybill_number: impl Into<String>, truck_cbm: f64, context: AllocationContext) -> Self {
        let mut waybill = Waybill::new(waybill_number, truck_cbm);
        waybill.amount_mode = context.amount_mode;
        Self { waybill, context }
    }

    /// Resume a stored waybill. Stored percentages and amounts are kept, so
    /// normalization and overrides survive a reload; only drops missing a
    /// derived value are filled in. Rounded entities stay pinned.
    pub fn from_waybill(waybill: Waybill, context: AllocationContext) -> Self {
        let mut session = Self { waybill, context };
        fill_missing(&mut session.waybill);
        session.refresh_entities();
        session
    }

    /// Build a session from an operator document, validating every drop as
    /// if it had been typed into the form.
    pub fn from_document(
        document: WaybillDocument,
        context: AllocationContext,
    ) -> Result<Self, ValidationError> {
        if document.waybill_number.trim().is_empty() {
            return Err(ValidationError::MissingField("waybill_number".to_string()));
        }
        check_truck_cbm(document.truck_cbm)?;

        let mut session = Self::new(document.waybill_number, document.truck_cbm, context);
        session.waybill.shipper = document.shipper;
        if let Some(mode) = document.amount_mode {
            session.waybill.amount_mode = mode;
        }
        session.on_rate_change(document.rate)?;
        for drop in document.drops {
            session.on_add_drop(NewDrop::new(drop.consignee, drop.cbm))?;
        }
        Ok(session)
    }

    pub fn waybill(&self) -> &Waybill {
        &self.waybill
    }

    pub fn into_waybill(self) -> Waybill {
        self.waybill
    }

    pub fn context(&self) -> &AllocationContext {
        &self.context
    }

    pub fn set_rate_per_drop(&mut self, rate_per_drop: f64) -> SessionUpdate {
        self.context.rate_per_drop = rate_per_drop;
        self.snapshot()
    }

    pub fn snapshot(&self) -> SessionUpdate {
        SessionUpdate {
            drops: self.waybill.drops.clone(),
            entities: self.waybill.entities.clone(),
            breakdown: self.waybill.rate_breakdown(self.context.rate_per_drop),
        }
    }

    pub fn on_add_drop(&mut self, new_drop: NewDrop) -> Result<SessionUpdate, ValidationError> {
        self.mutate("add drop", |waybill| {
            let name = new_drop.consignee_name.trim();
            if name.is_empty() {
                return Err(ValidationError::MissingField("consignee_name".to_string()));
            }
            if waybill
                .drops
                .iter()
                .any(|d| d.consignee_name.trim().eq_ignore_ascii_case(name))
            {
                return Err(ValidationError::DuplicateConsignee(name.to_string()));
            }
            ensure_rate_set(waybill.rate)?;
            check_cbm(new_drop.cbm)?;
            if waybill.is_capacity_full() || is_exhausted(waybill.remaining_capacity(0.0)) {
                return Err(ValidationError::CapacityFull {
                    truck_cbm: waybill.truck_cbm,
                });
            }
            check_capacity(waybill.truck_cbm, waybill.used_cbm(), new_drop.cbm)?;

            let mut drop = Drop::new(name, new_drop.cbm, waybill.rate);
            drop.split_index = new_drop.split_index.or(drop.split_index);
            drop.payload_index = new_drop.payload_index.or(drop.payload_index);
            recalculate_drop(&mut drop, waybill.truck_cbm, waybill.amount_mode);
            info!(
                waybill = %waybill.waybill_number,
                consignee = %drop.consignee_name,
                cbm = drop.cbm,
                "drop added"
            );
            waybill.drops.push(drop);
            Ok(())
        })
    }

    pub fn on_cbm_change(&mut self, drop_id: Uuid, cbm: f64) -> Result<SessionUpdate, ValidationError> {
        self.mutate("change cbm", |waybill| {
            ensure_rate_set(waybill.rate)?;
            check_cbm(cbm)?;
            let previous = waybill
                .find_drop(drop_id)
                .map(|d| d.cbm)
                .ok_or_else(|| ValidationError::DropNotFound(drop_id.to_string()))?;
            check_capacity(waybill.truck_cbm, waybill.used_cbm() - previous, cbm)?;

            let (truck_cbm, mode) = (waybill.truck_cbm, waybill.amount_mode);
            let drop = find_drop_mut(waybill, drop_id)?;
            drop.cbm = cbm;
            recalculate_drop(drop, truck_cbm, mode);
            debug!(drop = %drop_id, cbm, percentage = ?drop.percentage, "cbm changed");
            Ok(())
        })
    }

    /// Set the shared rate on the waybill and every drop. Percentages are
    /// kept; amounts follow the new rate.
    pub fn on_rate_change(&mut self, rate: f64) -> Result<SessionUpdate, ValidationError> {
        self.mutate("change rate", |waybill| {
            check_non_negative("rate", rate)?;
            waybill.rate = rate;
            let mode = waybill.amount_mode;
            for drop in &mut waybill.drops {
                drop.rate = rate;
                drop.amount = drop
                    .percentage
                    .map(|pct| amount_for(mode, rate, drop.cbm, pct));
            }
            debug!(waybill = %waybill.waybill_number, rate, "rate changed");
            Ok(())
        })
    }

    /// Override a drop's percentage; only its amount is re-derived
    pub fn on_percentage_change(
        &mut self,
        drop_id: Uuid,
        percentage: f64,
    ) -> Result<SessionUpdate, ValidationError> {
        self.mutate("change percentage", |waybill| {
            if !(0.0..=100.0).contains(&percentage) {
                return Err(ValidationError::PercentageOutOfRange(percentage));
            }
            let mode = waybill.amount_mode;
            let drop = find_drop_mut(waybill, drop_id)?;
            drop.percentage = Some(percentage);
            drop.amount = Some(amount_for(mode, drop.rate, drop.cbm, percentage));
            debug!(drop = %drop_id, percentage, "percentage changed");
            Ok(())
        })
    }

    /// Remove a drop; the remaining drops are recomputed from their CBM
    pub fn on_delete_drop(&mut self, drop_id: Uuid) -> Result<SessionUpdate, ValidationError> {
        self.mutate("delete drop", |waybill| {
            let index = waybill
                .drops
                .iter()
                .position(|d| d.id == drop_id)
                .ok_or_else(|| ValidationError::DropNotFound(drop_id.to_string()))?;
            let removed = waybill.drops.remove(index);
            recalculate_all(waybill);
            info!(
                waybill = %waybill.waybill_number,
                consignee = %removed.consignee_name,
                "drop deleted"
            );
            Ok(())
        })
    }

    /// Dispatch one typed form edit.
    ///
    /// The rate is shared by the whole waybill, so a `rate` change through
    /// any drop goes to [`WaybillSession::on_rate_change`] and updates every
    /// drop.
    pub fn apply(&mut self, drop_id: Uuid, change: FieldChange) -> Result<SessionUpdate, ValidationError> {
        match change.field {
            DropField::ConsigneeName => self.rename_drop(drop_id, &change.value.as_text()),
            DropField::Cbm => self.on_cbm_change(drop_id, change.value.as_number(change.field)?),
            DropField::Rate => {
                if self.waybill.find_drop(drop_id).is_none() {
                    return Err(ValidationError::DropNotFound(drop_id.to_string()));
                }
                self.on_rate_change(change.value.as_number(change.field)?)
            }
            DropField::Percentage => {
                self.on_percentage_change(drop_id, change.value.as_number(change.field)?)
            }
        }
    }

    fn rename_drop(&mut self, drop_id: Uuid, name: &str) -> Result<SessionUpdate, ValidationError> {
        self.mutate("rename drop", |waybill| {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::MissingField("consignee_name".to_string()));
            }
            if waybill
                .drops
                .iter()
                .any(|d| d.id != drop_id && d.consignee_name.trim().eq_ignore_ascii_case(name))
            {
                return Err(ValidationError::DuplicateConsignee(name.to_string()));
            }
            let drop = find_drop_mut(waybill, drop_id)?;
            drop.consignee_name = name.to_string();
            drop.split_index = None;
            drop.payload_index = None;
            drop.refresh_entity();
            info!(drop = %drop_id, entity = %drop.entity_abbreviation, "drop renamed");
            Ok(())
        })
    }

    /// Change the truck capacity; the current drops must still fit
    pub fn on_truck_cbm_change(&mut self, truck_cbm: f64) -> Result<SessionUpdate, ValidationError> {
        self.mutate("change truck cbm", |waybill| {
            check_truck_cbm(truck_cbm)?;
            let used = waybill.used_cbm();
            if used - truck_cbm >= CAPACITY_EPSILON {
                return Err(ValidationError::CapacityExceeded {
                    requested: used,
                    remaining: truck_cbm,
                });
            }
            waybill.truck_cbm = truck_cbm;
            recalculate_all(waybill);
            info!(waybill = %waybill.waybill_number, truck_cbm, "truck capacity changed");
            Ok(())
        })
    }

    /// Rescale percentages of drops outside rounded entities to total 100
    pub fn normalize(&mut self) -> Result<SessionUpdate, ValidationError> {
        self.mutate("normalize", |waybill| {
            let pinned: Vec<String> = waybill
                .entities
                .iter()
                .filter(|e| e.is_rounded())
                .map(|e| e.entity_abbreviation.clone())
                .collect();
            let indices: Vec<usize> = waybill
                .drops
                .iter()
                .enumerate()
                .filter(|(_, d)| d.percentage.is_some() && !pinned.contains(&d.entity_abbreviation))
                .map(|(i, _)| i)
                .collect();
            let current: Vec<f64> = indices
                .iter()
                .filter_map(|&i| waybill.drops[i].percentage)
                .collect();

            let mode = waybill.amount_mode;
            for (&i, pct) in indices.iter().zip(normalize_to_hundred(&current)) {
                let drop = &mut waybill.drops[i];
                drop.percentage = Some(pct);
                drop.amount = Some(amount_for(mode, drop.rate, drop.cbm, pct));
            }
            info!(waybill = %waybill.waybill_number, drops = indices.len(), "percentages normalized");
            Ok(())
        })
    }

    /// Pin an entity at a whole-number percentage
    pub fn round_entity(&mut self, abbreviation: &str) -> Result<SessionUpdate, ValidationError> {
        self.mutate("round entity", |waybill| {
            find_entity_mut(waybill, abbreviation)?.round()?;
            info!(waybill = %waybill.waybill_number, entity = abbreviation, "entity rounded");
            Ok(())
        })
    }

    /// Release a rounded entity back to automatic aggregation
    pub fn reset_entity(&mut self, abbreviation: &str) -> Result<SessionUpdate, ValidationError> {
        self.mutate("reset entity", |waybill| {
            find_entity_mut(waybill, abbreviation)?.reset()?;
            info!(waybill = %waybill.waybill_number, entity = abbreviation, "entity reset");
            Ok(())
        })
    }

    /// Run `op` against a copy and commit only on success
    fn mutate<F>(&mut self, action: &str, op: F) -> Result<SessionUpdate, ValidationError>
    where
        F: FnOnce(&mut Waybill) -> Result<(), ValidationError>,
    {
        let mut draft = self.waybill.clone();
        if let Err(e) = op(&mut draft) {
            warn!(waybill = %self.waybill.waybill_number, action, error = %e, "rejected");
            return Err(e);
        }
        draft.touch();
        self.waybill = draft;
        self.refresh_entities();
        Ok(self.snapshot())
    }

    fn refresh_entities(&mut self) {
        self.waybill.entities = entity_totals(&self.waybill.drops, &self.waybill.entities);
        debug!(
            waybill = %self.waybill.waybill_number,
            entities = self.waybill.entities.len(),
            "entity totals recomputed"
        );
    }
}

fn find_drop_mut(waybill: &mut Waybill, drop_id: Uuid) -> Result<&mut Drop, ValidationError> {
    waybill
        .find_drop_mut(drop_id)
        .ok_or_else(|| ValidationError::DropNotFound(drop_id.to_string()))
}

fn find_entity_mut<'a>(
    waybill: &'a mut Waybill,
    abbreviation: &str,
) -> Result<&'a mut EntitySummary, ValidationError> {
    waybill
        .entities
        .iter_mut()
        .find(|e| e.entity_abbreviation == abbreviation)
        .ok_or_else(|| ValidationError::EntityNotFound(abbreviation.to_string()))
}

fn check_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

/// Truck capacity entered by the operator must be positive
pub fn check_truck_cbm(truck_cbm: f64) -> Result<(), ValidationError> {
    check_non_negative("truck_cbm", truck_cbm)?;
    if truck_cbm == 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "truck_cbm".to_string(),
            value: truck_cbm.to_string(),
        });
    }
    Ok(())
}

fn check_cbm(cbm: f64) -> Result<(), ValidationError> {
    check_non_negative("cbm", cbm)
}

fn check_capacity(truck_cbm: f64, used_cbm: f64, requested: f64) -> Result<(), ValidationError> {
    if remaining_capacity(truck_cbm, used_cbm, requested) <= -CAPACITY_EPSILON {
        return Err(ValidationError::CapacityExceeded {
            requested,
            remaining: remaining_capacity(truck_cbm, used_cbm, 0.0),
        });
    }
    Ok(())
}

/// Percentage from CBM, amount from percentage. Zero capacity leaves both unset.
fn recalculate_drop(drop: &mut Drop, truck_cbm: f64, mode: AmountMode) {
    drop.percentage = compute_percentage(drop.cbm, truck_cbm);
    drop.amount = drop
        .percentage
        .map(|pct| amount_for(mode, drop.rate, drop.cbm, pct));
}

fn fill_missing(waybill: &mut Waybill) {
    let (truck_cbm, mode) = (waybill.truck_cbm, waybill.amount_mode);
    for drop in &mut waybill.drops {
        match drop.percentage {
            None => recalculate_drop(drop, truck_cbm, mode),
            Some(pct) if drop.amount.is_none() => {
                drop.amount = Some(amount_for(mode, drop.rate, drop.cbm, pct));
            }
            Some(_) => {}
        }
    }
}

fn recalculate_all(waybill: &mut Waybill) {
    let (truck_cbm, mode) = (waybill.truck_cbm, waybill.amount_mode);
    for drop in &mut waybill.drops {
        recalculate_drop(drop, truck_cbm, mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waybill_domain::model::EntityStatus;
    use waybill_infra::document_loader::DocumentDrop;

    fn session(truck_cbm: f64, rate: f64) -> WaybillSession {
        let mut session = WaybillSession::new("WB-1", truck_cbm, AllocationContext::default());
        session.on_rate_change(rate).unwrap();
        session
    }

    fn id_of(session: &WaybillSession, name: &str) -> Uuid {
        session
            .waybill()
            .drops
            .iter()
            .find(|d| d.consignee_name == name)
            .map(|d| d.id)
            .unwrap()
    }

    fn entity_pct(update: &SessionUpdate, abbr: &str) -> f64 {
        update
            .entities
            .iter()
            .find(|e| e.entity_abbreviation == abbr)
            .map(|e| e.total_percentage)
            .unwrap()
    }

    #[test]
    fn test_two_drop_scenario() {
        let mut s = session(100.0, 5000.0);
        s.on_add_drop(NewDrop::new("ABC - Store 1", 30.0)).unwrap();
        let update = s.on_add_drop(NewDrop::new("XYZ - Depot", 70.0)).unwrap();

        let pcts: Vec<f64> = update.drops.iter().map(|d| d.percentage.unwrap()).collect();
        let amounts: Vec<f64> = update.drops.iter().map(|d| d.amount.unwrap()).collect();
        assert_eq!(pcts, vec![30.0, 70.0]);
        assert_eq!(amounts, vec![1500.0, 3500.0]);
        assert!((s.waybill().total_percentage() - 100.0).abs() < 0.01);
        assert!((s.waybill().total_amount() - 5000.0).abs() < 0.01);
        assert!(s.waybill().is_capacity_full());
    }

    #[test]
    fn test_under_capacity_scenario() {
        let mut s = session(100.0, 5000.0);
        for name in ["A - 1", "B - 1", "C - 1"] {
            s.on_add_drop(NewDrop::new(name, 10.0)).unwrap();
        }
        assert!(!s.waybill().is_capacity_full());
        assert!((s.waybill().remaining_capacity(0.0) - 70.0).abs() < 0.01);
    }

    #[test]
    fn test_add_drop_validation() {
        let mut s = WaybillSession::new("WB-1", 100.0, AllocationContext::default());
        assert_eq!(
            s.on_add_drop(NewDrop::new("ABC - 1", 10.0)),
            Err(ValidationError::RateNotSet)
        );

        s.on_rate_change(1000.0).unwrap();
        assert!(matches!(
            s.on_add_drop(NewDrop::new("  ", 10.0)),
            Err(ValidationError::MissingField(_))
        ));
        s.on_add_drop(NewDrop::new("ABC - 1", 60.0)).unwrap();
        assert!(matches!(
            s.on_add_drop(NewDrop::new("abc - 1", 10.0)),
            Err(ValidationError::DuplicateConsignee(_))
        ));
        assert!(matches!(
            s.on_add_drop(NewDrop::new("DEF - 1", -1.0)),
            Err(ValidationError::NegativeValue { .. })
        ));
        assert!(matches!(
            s.on_add_drop(NewDrop::new("DEF - 1", 40.5)),
            Err(ValidationError::CapacityExceeded { .. })
        ));
        s.on_add_drop(NewDrop::new("DEF - 1", 40.0)).unwrap();
        assert!(matches!(
            s.on_add_drop(NewDrop::new("GHI - 1", 0.5)),
            Err(ValidationError::CapacityFull { .. })
        ));
        assert_eq!(s.waybill().drops.len(), 2);
    }

    #[test]
    fn test_failed_mutation_keeps_state() {
        let mut s = session(100.0, 5000.0);
        s.on_add_drop(NewDrop::new("ABC - 1", 30.0)).unwrap();
        let before = s.snapshot();
        let id = id_of(&s, "ABC - 1");

        assert!(s.on_cbm_change(id, 130.0).is_err());
        assert!(s.on_percentage_change(id, 120.0).is_err());
        assert!(s.on_rate_change(-5.0).is_err());
        assert!(s.on_delete_drop(Uuid::new_v4()).is_err());
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn test_cbm_change_excludes_own_previous_value() {
        let mut s = session(100.0, 5000.0);
        s.on_add_drop(NewDrop::new("ABC - 1", 30.0)).unwrap();
        s.on_add_drop(NewDrop::new("XYZ - 1", 70.0)).unwrap();
        let id = id_of(&s, "ABC - 1");

        let update = s.on_cbm_change(id, 25.0).unwrap();
        assert_eq!(update.drops[0].percentage, Some(25.0));
        assert_eq!(update.drops[0].amount, Some(1250.0));

        s.on_cbm_change(id, 30.0).unwrap();
        assert!(s.on_cbm_change(id, 31.0).is_err());
    }

    #[test]
    fn test_cbm_change_requires_rate() {
        let mut s = session(100.0, 5000.0);
        s.on_add_drop(NewDrop::new("ABC - 1", 30.0)).unwrap();
        let id = id_of(&s, "ABC - 1");
        s.on_rate_change(0.0).unwrap();
        assert_eq!(s.on_cbm_change(id, 20.0), Err(ValidationError::RateNotSet));
    }

    #[test]
    fn test_rate_change_keeps_percentages() {
        let mut s = session(100.0, 5000.0);
        s.on_add_drop(NewDrop::new("ABC - 1", 30.0)).unwrap();
        s.on_add_drop(NewDrop::new("XYZ - 1", 70.0)).unwrap();

        let update = s.on_rate_change(8000.0).unwrap();
        assert!(update.drops.iter().all(|d| d.rate == 8000.0));
        assert_eq!(update.drops[0].percentage, Some(30.0));
        assert_eq!(update.drops[0].amount, Some(2400.0));
        assert_eq!(update.drops[1].amount, Some(5600.0));
        assert_eq!(update.breakdown.highest_rate, 8000.0);
    }

    #[test]
    fn test_per_cbm_mode() {
        let context = AllocationContext {
            rate_per_drop: 0.0,
            amount_mode: AmountMode::PerCbm,
        };
        let mut s = WaybillSession::new("WB-1", 50.0, context);
        s.on_rate_change(120.0).unwrap();
        let update = s.on_add_drop(NewDrop::new("ABC - 1", 12.5)).unwrap();
        assert_eq!(update.drops[0].percentage, Some(25.0));
        assert_eq!(update.drops[0].amount, Some(1500.0));
    }

    #[test]
    fn test_delete_recomputes_siblings() {
        let mut s = session(100.0, 1000.0);
        for (name, cbm) in [("A - 1", 20.0), ("A - 2", 30.0), ("B - 1", 50.0)] {
            s.on_add_drop(NewDrop::new(name, cbm)).unwrap();
        }
        let update = s.on_delete_drop(id_of(&s, "A - 2")).unwrap();
        assert_eq!(update.drops.len(), 2);
        assert!((entity_pct(&update, "A") - 20.0).abs() < 0.01);
        assert!((entity_pct(&update, "B") - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_normalize_skips_rounded_entities() {
        let mut s = session(90.0, 900.0);
        for (name, cbm) in [("A - 1", 30.0), ("B - 1", 30.0), ("C - 1", 20.0)] {
            s.on_add_drop(NewDrop::new(name, cbm)).unwrap();
        }
        s.round_entity("A").unwrap();

        let update = s.normalize().unwrap();
        let b = update.drops[1].percentage.unwrap();
        let c = update.drops[2].percentage.unwrap();
        assert!((b + c - 100.0).abs() < 0.01);
        assert!((b - 60.0).abs() < 0.01);
        // A keeps its drop value and stays pinned
        assert_eq!(update.drops[0].percentage, Some(33.33));
        let a = update.entities.iter().find(|e| e.entity_abbreviation == "A").unwrap();
        assert_eq!(a.status, EntityStatus::Rounded);
        assert_eq!(a.total_percentage, 33.0);
    }

    #[test]
    fn test_rounded_entity_stays_frozen() {
        let mut s = session(100.0, 5000.0);
        s.on_add_drop(NewDrop::new("A - 1", 40.0)).unwrap();
        s.on_add_drop(NewDrop::new("B - 1", 50.0)).unwrap();
        s.round_entity("A").unwrap();

        let update = s.on_add_drop(NewDrop::new("B - 2", 10.0)).unwrap();
        assert!((entity_pct(&update, "A") - 40.0).abs() < 0.01);
        assert!((entity_pct(&update, "B") - 60.0).abs() < 0.01);

        // Editing A's drop does not move a rounded entity
        let id = id_of(&s, "A - 1");
        let update = s.on_cbm_change(id, 30.0).unwrap();
        assert!((entity_pct(&update, "A") - 40.0).abs() < 0.01);

        // Reset releases it to the recomputed value
        let update = s.reset_entity("A").unwrap();
        assert!((entity_pct(&update, "A") - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_entity_transitions() {
        let mut s = session(100.0, 5000.0);
        s.on_add_drop(NewDrop::new("A - 1", 33.333)).unwrap();

        assert!(matches!(
            s.reset_entity("A"),
            Err(ValidationError::InvalidTransition { .. })
        ));
        let update = s.round_entity("A").unwrap();
        let a = &update.entities[0];
        assert_eq!(a.total_percentage, 33.0);
        assert!((a.total_amount - 1650.0).abs() < 0.01);
        assert!(matches!(
            s.round_entity("A"),
            Err(ValidationError::InvalidTransition { .. })
        ));
        assert!(matches!(
            s.round_entity("ZZZ"),
            Err(ValidationError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_apply_field_changes() {
        let mut s = session(100.0, 5000.0);
        s.on_add_drop(NewDrop::new("ABC - 1", 30.0)).unwrap();
        let id = id_of(&s, "ABC - 1");

        let update = s.apply(id, FieldChange::parse("cbm=40").unwrap()).unwrap();
        assert_eq!(update.drops[0].amount, Some(2000.0));

        let update = s.apply(id, FieldChange::parse("percentage=50").unwrap()).unwrap();
        assert_eq!(update.drops[0].percentage, Some(50.0));
        assert_eq!(update.drops[0].amount, Some(2500.0));

        let update = s
            .apply(id, FieldChange::text(DropField::ConsigneeName, "split-1(XYZ - Hub)"))
            .unwrap();
        assert_eq!(update.drops[0].entity_abbreviation, "split-1(XYZ)");
        assert_eq!(update.drops[0].split_index, Some(1));

        s.on_add_drop(NewDrop::new("DEF - 1", 10.0)).unwrap();
        let update = s.apply(id, FieldChange::number(DropField::Rate, 100.0)).unwrap();
        // shared rate: every drop follows, not only the selected one
        assert!(update.drops.iter().all(|d| d.rate == 100.0));
        assert_eq!(update.drops[1].amount, Some(10.0));

        assert!(matches!(
            s.apply(Uuid::new_v4(), FieldChange::number(DropField::Rate, 1.0)),
            Err(ValidationError::DropNotFound(_))
        ));
    }

    #[test]
    fn test_fee_breakdown_follows_drops() {
        let context = AllocationContext {
            rate_per_drop: 1000.0,
            amount_mode: AmountMode::Percentage,
        };
        let mut s = WaybillSession::new("WB-1", 100.0, context);
        s.on_rate_change(5000.0).unwrap();
        for name in ["A - 1", "B - 1", "C - 1", "D - 1", "E - 1"] {
            s.on_add_drop(NewDrop::new(name, 10.0)).unwrap();
        }
        assert_eq!(s.snapshot().breakdown.additional_adjustment, 3000.0);
        assert_eq!(s.snapshot().breakdown.total_rate, 8000.0);

        let update = s.on_add_drop(NewDrop::new("F - 1", 10.0).split(2)).unwrap();
        assert_eq!(update.breakdown.additional_adjustment, 0.0);
    }

    #[test]
    fn test_zero_capacity_leaves_values_unset() {
        let mut waybill = Waybill::new("WB-0", 0.0);
        waybill.rate = 1000.0;
        waybill.drops.push(Drop::new("A - 1", 5.0, 1000.0));
        let s = WaybillSession::from_waybill(waybill, AllocationContext::default());
        assert_eq!(s.waybill().drops[0].percentage, None);
        assert_eq!(s.waybill().drops[0].amount, None);
        assert_eq!(s.waybill().entities[0].total_percentage, 0.0);
    }

    #[test]
    fn test_truck_cbm_change() {
        let mut s = session(100.0, 1000.0);
        s.on_add_drop(NewDrop::new("A - 1", 40.0)).unwrap();
        let update = s.on_truck_cbm_change(80.0).unwrap();
        assert_eq!(update.drops[0].percentage, Some(50.0));
        assert!(s.on_truck_cbm_change(30.0).is_err());
        assert!(matches!(
            s.on_truck_cbm_change(0.0),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert_eq!(s.waybill().truck_cbm, 80.0);
    }

    #[test]
    fn test_reload_keeps_normalized_percentages() {
        let mut s = session(100.0, 900.0);
        for name in ["A - 1", "B - 1", "C - 1"] {
            s.on_add_drop(NewDrop::new(name, 10.0)).unwrap();
        }
        s.normalize().unwrap();
        let c = id_of(&s, "C - 1");
        s.on_percentage_change(c, 40.0).unwrap();
        let saved = s.into_waybill();

        let mut s = WaybillSession::from_waybill(saved.clone(), AllocationContext::default());
        assert_eq!(s.waybill().drops, saved.drops);
        let pcts: Vec<f64> = s.waybill().drops.iter().filter_map(|d| d.percentage).collect();
        assert_eq!(pcts, vec![33.33, 33.33, 40.0]);

        // a later edit leaves the other drops alone
        let update = s.on_rate_change(1000.0).unwrap();
        assert_eq!(update.drops[2].percentage, Some(40.0));
        assert_eq!(update.drops[2].amount, Some(400.0));
        assert_eq!(update.drops[0].percentage, Some(33.33));
    }

    #[test]
    fn test_reload_fills_missing_amounts() {
        let mut waybill = Waybill::new("WB-2", 100.0);
        waybill.rate = 1000.0;
        let mut with_pct = Drop::new("A - 1", 10.0, 1000.0);
        with_pct.percentage = Some(25.0);
        waybill.drops.push(with_pct);
        waybill.drops.push(Drop::new("B - 1", 20.0, 1000.0));

        let s = WaybillSession::from_waybill(waybill, AllocationContext::default());
        let drops = &s.waybill().drops;
        assert_eq!(drops[0].percentage, Some(25.0));
        assert_eq!(drops[0].amount, Some(250.0));
        assert_eq!(drops[1].percentage, Some(20.0));
        assert_eq!(drops[1].amount, Some(200.0));
    }

    #[test]
    fn test_round_entity_per_cbm_keeps_amount_scale() {
        let context = AllocationContext {
            rate_per_drop: 0.0,
            amount_mode: AmountMode::PerCbm,
        };
        let mut s = WaybillSession::new("WB-1", 50.0, context);
        s.on_rate_change(120.0).unwrap();
        s.on_add_drop(NewDrop::new("A - 1", 12.5)).unwrap();

        let update = s.round_entity("A").unwrap();
        let a = &update.entities[0];
        assert_eq!(a.total_percentage, 25.0);
        assert!((a.total_amount - 1500.0).abs() < 0.01);
    }

    #[test]
    fn test_from_document() {
        let document = WaybillDocument {
            waybill_number: "WB-9".to_string(),
            truck_cbm: 100.0,
            rate: 5000.0,
            amount_mode: None,
            shipper: None,
            drops: vec![
                DocumentDrop {
                    consignee: "ABC - Store 1".to_string(),
                    cbm: 30.0,
                },
                DocumentDrop {
                    consignee: "XYZ - Depot".to_string(),
                    cbm: 70.0,
                },
            ],
        };
        let s = WaybillSession::from_document(document.clone(), AllocationContext::default())
            .unwrap();
        assert_eq!(s.waybill().drops.len(), 2);
        assert!((s.waybill().total_amount() - 5000.0).abs() < 0.01);

        let mut over = document.clone();
        over.truck_cbm = 50.0;
        assert!(WaybillSession::from_document(over, AllocationContext::default()).is_err());

        let mut empty_truck = document;
        empty_truck.truck_cbm = 0.0;
        assert!(matches!(
            WaybillSession::from_document(empty_truck, AllocationContext::default()),
            Err(ValidationError::InvalidValue { .. })
        ));
    }
}
