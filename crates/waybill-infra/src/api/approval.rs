//! Approval requests for consignee edits and deletes (control panel)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Edit,
    Delete,
}

impl std::fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalAction::Edit => write!(f, "edit"),
            ApprovalAction::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Approval request as stored by the control panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    #[serde(rename = "ReferenceID")]
    pub reference_id: String,
    #[serde(rename = "Action")]
    pub action: ApprovalAction,
    #[serde(rename = "Status")]
    pub status: ApprovalStatus,
    #[serde(rename = "ExpiresAt", default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "WaybillNumber", default)]
    pub waybill_number: Option<String>,
    #[serde(rename = "ConsigneeID", default)]
    pub consignee_id: Option<Uuid>,
}

impl ApprovalRequest {
    /// Approved or rejected
    pub fn is_resolved(&self) -> bool {
        self.status != ApprovalStatus::Pending
    }

    /// A pending request past its expiry can no longer be approved
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_resolved() && self.expires_at.map(|t| t <= now).unwrap_or(false)
    }
}

/// Body sent when asking for approval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDraft {
    #[serde(rename = "WaybillNumber")]
    pub waybill_number: String,
    #[serde(rename = "ConsigneeID")]
    pub consignee_id: Uuid,
    #[serde(rename = "Action")]
    pub action: ApprovalAction,
    #[serde(rename = "Reason", default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
