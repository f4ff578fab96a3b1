//! Client for the remote waybill REST API
//!
//! The backend owns consignees, shippers, rates and entity summaries. Missing
//! resources (HTTP 404) come back as empty results, not errors.

pub mod approval;
mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use waybill_domain::model::{Drop, EntitySummary, Shipper};
use waybill_types::ApiError;

pub use approval::{ApprovalAction, ApprovalDraft, ApprovalRequest, ApprovalStatus};
pub use http::{ApiSettings, HttpWaybillApi};

/// Line of cargo detail under a waybill (`subdetails`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubDetail {
    #[serde(default)]
    pub id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

#[async_trait]
pub trait WaybillApi: Send + Sync {
    async fn consignees(&self, waybill_number: &str) -> Result<Vec<Drop>, ApiError>;

    async fn shipper(&self, waybill_number: &str) -> Result<Option<Shipper>, ApiError>;

    async fn entity_summaries(&self, waybill_number: &str)
        -> Result<Vec<EntitySummary>, ApiError>;

    async fn push_entity_summaries(
        &self,
        waybill_number: &str,
        summaries: &[EntitySummary],
    ) -> Result<(), ApiError>;

    async fn highest_rate(&self, waybill_number: &str) -> Result<Option<f64>, ApiError>;

    async fn additional_adjustment(&self, waybill_number: &str) -> Result<Option<f64>, ApiError>;

    /// Flat fee charged per drop beyond the free ones
    async fn additional_rate(&self) -> Result<Option<f64>, ApiError>;

    /// Create or update a consignee drop
    async fn push_consignee(&self, waybill_number: &str, drop: &Drop) -> Result<(), ApiError>;

    async fn delete_consignee(&self, waybill_number: &str, drop_id: Uuid) -> Result<(), ApiError>;

    async fn subdetails(&self, waybill_number: &str) -> Result<Vec<SubDetail>, ApiError>;

    async fn approval_request(&self, reference_id: &str)
        -> Result<Option<ApprovalRequest>, ApiError>;

    async fn request_approval(&self, draft: &ApprovalDraft) -> Result<ApprovalRequest, ApiError>;
}
