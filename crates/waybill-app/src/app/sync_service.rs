//! Sync Service - exchange waybills with the remote backend
//!
//! The backend is the authority across sessions. Pulling builds a local
//! waybill from the consignee, shipper and summary resources; pushing sends
//! every drop and the entity summaries back. Nothing is retried here: a
//! failed call is reported and the operator re-triggers it.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use waybill_domain::model::Waybill;
use waybill_domain::service::allocation::{remaining_capacity, CAPACITY_EPSILON};
use waybill_domain::service::{entity_totals, RateBreakdown};
use waybill_domain::service::fee::highest_rate;
use waybill_infra::api::{ApprovalAction, ApprovalDraft, ApprovalRequest, SubDetail, WaybillApi};
use waybill_types::{ApiError, Error, ValidationError};

/// Errors specific to the sync service
#[derive(Debug, Error)]
pub enum SyncServiceError {
    #[error("Remote request failed: {0}")]
    Remote(#[from] ApiError),

    #[error("Backend returned invalid data: {0}")]
    InvalidRemoteData(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl From<SyncServiceError> for Error {
    fn from(err: SyncServiceError) -> Self {
        match err {
            SyncServiceError::Remote(e) => Error::Api(e),
            SyncServiceError::Validation(e) => Error::Validation(e),
            SyncServiceError::InvalidRemoteData(msg) => Error::Import(msg),
        }
    }
}

/// Outcome of a push
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub consignees: usize,
    pub summaries: usize,
}

pub struct SyncService<A: WaybillApi + ?Sized> {
    api: Arc<A>,
}

impl<A: WaybillApi + ?Sized> SyncService<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> Arc<A> {
        Arc::clone(&self.api)
    }

    /// Build a waybill from the backend. Missing resources give an empty
    /// waybill; remote rounded summaries stay pinned.
    pub async fn pull(&self, waybill_number: &str, truck_cbm: f64) -> Result<Waybill, SyncServiceError> {
        let drops = self.api.consignees(waybill_number).await?;
        if let Some(bad) = drops.iter().find(|d| d.cbm < 0.0 || d.rate < 0.0) {
            return Err(SyncServiceError::InvalidRemoteData(format!(
                "consignee {} has negative cbm or rate",
                bad.consignee_name
            )));
        }
        let used: f64 = drops.iter().map(|d| d.cbm).sum();
        if remaining_capacity(truck_cbm, used, 0.0) <= -CAPACITY_EPSILON {
            return Err(SyncServiceError::InvalidRemoteData(format!(
                "consignees use {:.2} CBM but the truck holds {:.2}",
                used, truck_cbm
            )));
        }
        let shipper = self.api.shipper(waybill_number).await?;
        let remote_summaries = self.api.entity_summaries(waybill_number).await?;
        let remote_highest = self.api.highest_rate(waybill_number).await?;

        let mut waybill = Waybill::new(waybill_number, truck_cbm);
        waybill.shipper = shipper;
        waybill.rate = remote_highest.unwrap_or_else(|| highest_rate(&drops));
        waybill.entities = entity_totals(&drops, &remote_summaries);
        waybill.drops = drops;

        info!(
            waybill = waybill_number,
            drops = waybill.drops.len(),
            entities = waybill.entities.len(),
            "waybill pulled"
        );
        Ok(waybill)
    }

    /// Send every drop and the entity summaries
    pub async fn push(&self, waybill: &Waybill) -> Result<PushReport, SyncServiceError> {
        let number = waybill.waybill_number.as_str();
        for drop in &waybill.drops {
            self.api.push_consignee(number, drop).await.map_err(|e| {
                warn!(waybill = number, drop = %drop.id, error = %e, "consignee push failed");
                e
            })?;
            debug!(waybill = number, drop = %drop.id, "consignee pushed");
        }
        self.api
            .push_entity_summaries(number, &waybill.entities)
            .await?;

        info!(
            waybill = number,
            consignees = waybill.drops.len(),
            summaries = waybill.entities.len(),
            "waybill pushed"
        );
        Ok(PushReport {
            consignees: waybill.drops.len(),
            summaries: waybill.entities.len(),
        })
    }

    /// Flat fee per extra drop; the backend value wins over `fallback`
    pub async fn rate_per_drop(&self, fallback: f64) -> Result<f64, SyncServiceError> {
        match self.api.additional_rate().await? {
            Some(rate) if rate >= 0.0 => Ok(rate),
            Some(rate) => Err(SyncServiceError::InvalidRemoteData(format!(
                "negative additional rate {}",
                rate
            ))),
            None => {
                debug!(fallback, "no additional rate on the backend");
                Ok(fallback)
            }
        }
    }

    /// Fee breakdown with the backend's highest rate and adjustment taking
    /// precedence over the local estimate
    pub async fn rate_breakdown(
        &self,
        waybill: &Waybill,
        rate_per_drop: f64,
    ) -> Result<RateBreakdown, SyncServiceError> {
        let number = waybill.waybill_number.as_str();
        let local = waybill.rate_breakdown(rate_per_drop);
        let remote_highest = self.api.highest_rate(number).await?;
        let remote_adjustment = self.api.additional_adjustment(number).await?;
        if let Some(adjustment) = remote_adjustment {
            if adjustment < 0.0 {
                return Err(SyncServiceError::InvalidRemoteData(format!(
                    "negative additional adjustment {}",
                    adjustment
                )));
            }
            if (adjustment - local.additional_adjustment).abs() >= CAPACITY_EPSILON {
                debug!(
                    waybill = number,
                    local = local.additional_adjustment,
                    remote = adjustment,
                    "additional adjustment differs from the local estimate"
                );
            }
        }
        Ok(local.reconcile(remote_highest, remote_adjustment))
    }

    /// Ask the control panel to approve editing or deleting a drop
    pub async fn request_approval(
        &self,
        waybill: &Waybill,
        drop_id: Uuid,
        action: ApprovalAction,
        reason: Option<String>,
    ) -> Result<ApprovalRequest, SyncServiceError> {
        if waybill.find_drop(drop_id).is_none() {
            return Err(ValidationError::DropNotFound(drop_id.to_string()).into());
        }
        let draft = ApprovalDraft {
            waybill_number: waybill.waybill_number.clone(),
            consignee_id: drop_id,
            action,
            reason,
        };
        let request = self.api.request_approval(&draft).await?;
        info!(
            waybill = %waybill.waybill_number,
            reference_id = %request.reference_id,
            "approval requested"
        );
        Ok(request)
    }

    /// Remove a drop on the backend; an unknown drop counts as removed
    pub async fn delete_drop(&self, waybill_number: &str, drop_id: Uuid) -> Result<(), SyncServiceError> {
        self.api.delete_consignee(waybill_number, drop_id).await?;
        info!(waybill = waybill_number, drop = %drop_id, "consignee deleted");
        Ok(())
    }

    pub async fn subdetails(&self, waybill_number: &str) -> Result<Vec<SubDetail>, SyncServiceError> {
        Ok(self.api.subdetails(waybill_number).await?)
    }
}
