//! In-memory `WaybillApi` for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use waybill_domain::model::{Drop, EntitySummary, Shipper};
use waybill_infra::api::{
    ApprovalAction, ApprovalDraft, ApprovalRequest, ApprovalStatus, SubDetail, WaybillApi,
};
use waybill_types::ApiError;

pub fn pending_request(reference_id: &str) -> ApprovalRequest {
    ApprovalRequest {
        reference_id: reference_id.to_string(),
        action: ApprovalAction::Edit,
        status: ApprovalStatus::Pending,
        expires_at: None,
        waybill_number: None,
        consignee_id: None,
    }
}

#[derive(Default)]
pub struct MockApi {
    pub consignees: Vec<Drop>,
    pub shipper: Option<Shipper>,
    pub summaries: Vec<EntitySummary>,
    pub highest_rate: Option<f64>,
    pub additional_rate: Option<f64>,
    pub additional_adjustment: Option<f64>,
    pub fail_writes: bool,
    pub approvals: Mutex<VecDeque<Result<Option<ApprovalRequest>, ApiError>>>,
    pub approval_calls: AtomicU32,
    pub pushed_consignees: Mutex<Vec<Drop>>,
    pub pushed_summaries: Mutex<Vec<EntitySummary>>,
    pub deleted_consignees: Mutex<Vec<Uuid>>,
}

impl MockApi {
    pub fn with_approvals(responses: Vec<Result<Option<ApprovalRequest>, ApiError>>) -> Self {
        Self {
            approvals: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn approval_calls(&self) -> u32 {
        self.approval_calls.load(Ordering::SeqCst)
    }

    fn write_result(&self) -> Result<(), ApiError> {
        if self.fail_writes {
            Err(ApiError::Status {
                status: 500,
                url: "http://mock/".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WaybillApi for MockApi {
    async fn consignees(&self, _waybill_number: &str) -> Result<Vec<Drop>, ApiError> {
        Ok(self.consignees.clone())
    }

    async fn shipper(&self, _waybill_number: &str) -> Result<Option<Shipper>, ApiError> {
        Ok(self.shipper.clone())
    }

    async fn entity_summaries(
        &self,
        _waybill_number: &str,
    ) -> Result<Vec<EntitySummary>, ApiError> {
        Ok(self.summaries.clone())
    }

    async fn push_entity_summaries(
        &self,
        _waybill_number: &str,
        summaries: &[EntitySummary],
    ) -> Result<(), ApiError> {
        self.write_result()?;
        self.pushed_summaries
            .lock()
            .unwrap()
            .extend_from_slice(summaries);
        Ok(())
    }

    async fn highest_rate(&self, _waybill_number: &str) -> Result<Option<f64>, ApiError> {
        Ok(self.highest_rate)
    }

    async fn additional_adjustment(&self, _waybill_number: &str) -> Result<Option<f64>, ApiError> {
        Ok(self.additional_adjustment)
    }

    async fn additional_rate(&self) -> Result<Option<f64>, ApiError> {
        Ok(self.additional_rate)
    }

    async fn push_consignee(&self, _waybill_number: &str, drop: &Drop) -> Result<(), ApiError> {
        self.write_result()?;
        self.pushed_consignees.lock().unwrap().push(drop.clone());
        Ok(())
    }

    async fn delete_consignee(&self, _waybill_number: &str, drop_id: Uuid) -> Result<(), ApiError> {
        self.write_result()?;
        self.deleted_consignees.lock().unwrap().push(drop_id);
        Ok(())
    }

    async fn subdetails(&self, _waybill_number: &str) -> Result<Vec<SubDetail>, ApiError> {
        Ok(Vec::new())
    }

    async fn approval_request(
        &self,
        _reference_id: &str,
    ) -> Result<Option<ApprovalRequest>, ApiError> {
        self.approval_calls.fetch_add(1, Ordering::SeqCst);
        self.approvals
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }

    async fn request_approval(&self, draft: &ApprovalDraft) -> Result<ApprovalRequest, ApiError> {
        self.write_result()?;
        Ok(ApprovalRequest {
            action: draft.action,
            waybill_number: Some(draft.waybill_number.clone()),
            consignee_id: Some(draft.consignee_id),
            ..pending_request("REQ-MOCK")
        })
    }
}
