//! reqwest implementation of [`WaybillApi`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use waybill_domain::model::{Drop, EntitySummary, Shipper};
use waybill_types::ApiError;

use super::{ApprovalDraft, ApprovalRequest, SubDetail, WaybillApi};

/// Connection settings for the remote API
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Sub-detail lookups are aborted sooner than other requests
    pub subdetail_timeout: Duration,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
            subdetail_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_subdetail_timeout(mut self, timeout: Duration) -> Self {
        self.subdetail_timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HighestRateBody {
    highest_rate: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdditionalAdjustmentBody {
    additional_adjustment: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdditionalRateBody {
    additional_rate: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConsigneePayload<'a> {
    waybill_number: &'a str,
    #[serde(flatten)]
    drop: &'a Drop,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntitySummaryPayload<'a> {
    waybill_number: &'a str,
    summaries: &'a [EntitySummary],
}

pub struct HttpWaybillApi {
    client: Client,
    base: Url,
    settings: ApiSettings,
}

impl HttpWaybillApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", settings.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(settings.base_url.clone()));
        }
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base,
            settings,
        })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.settings.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON resource; 404 is `None`
    async fn get_optional<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<Option<T>, ApiError> {
        let url = self.endpoint(segments)?;
        let mut request = self.client.get(url.clone()).query(query);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        debug!(%url, "GET");
        let response = request.send().await.map_err(|e| {
            warn!(%url, error = %e, "request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%url, "not found, treating as empty");
            return Ok(None);
        }
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "unexpected status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.json::<T>().await.map_err(ApiError::from)?;
        Ok(Some(body))
    }

    /// Send a write request; any 2xx is success
    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            warn!(%url, error = %e, "request failed");
            ApiError::from(e)
        })?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "unexpected status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn waybill_value<T: DeserializeOwned>(
        &self,
        resource: &str,
        waybill_number: &str,
    ) -> Result<Option<T>, ApiError> {
        self.get_optional(&[resource], &[("waybillNumber", waybill_number)], None)
            .await
    }
}

#[async_trait]
impl WaybillApi for HttpWaybillApi {
    async fn consignees(&self, waybill_number: &str) -> Result<Vec<Drop>, ApiError> {
        let drops: Option<Vec<Drop>> = self.waybill_value("consigneeInfo", waybill_number).await?;
        let mut drops = drops.unwrap_or_default();
        for drop in &mut drops {
            if drop.entity_abbreviation.is_empty() {
                drop.refresh_entity();
            }
        }
        Ok(drops)
    }

    async fn shipper(&self, waybill_number: &str) -> Result<Option<Shipper>, ApiError> {
        self.waybill_value("shipperInfo", waybill_number).await
    }

    async fn entity_summaries(
        &self,
        waybill_number: &str,
    ) -> Result<Vec<EntitySummary>, ApiError> {
        Ok(self
            .waybill_value("entity-abbreviation-summary", waybill_number)
            .await?
            .unwrap_or_default())
    }

    async fn push_entity_summaries(
        &self,
        waybill_number: &str,
        summaries: &[EntitySummary],
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["entity-abbreviation-summary"])?;
        let payload = EntitySummaryPayload {
            waybill_number,
            summaries,
        };
        debug!(%url, count = summaries.len(), "PUT entity summaries");
        self.send(self.client.put(url.clone()).json(&payload), &url).await?;
        Ok(())
    }

    async fn highest_rate(&self, waybill_number: &str) -> Result<Option<f64>, ApiError> {
        let body: Option<HighestRateBody> = self.waybill_value("highestRate", waybill_number).await?;
        Ok(body.map(|b| b.highest_rate))
    }

    async fn additional_adjustment(&self, waybill_number: &str) -> Result<Option<f64>, ApiError> {
        let body: Option<AdditionalAdjustmentBody> = self
            .waybill_value("additionalAdjustment", waybill_number)
            .await?;
        Ok(body.map(|b| b.additional_adjustment))
    }

    async fn additional_rate(&self) -> Result<Option<f64>, ApiError> {
        let body: Option<AdditionalRateBody> =
            self.get_optional(&["additionalRate"], &[], None).await?;
        Ok(body.map(|b| b.additional_rate))
    }

    async fn push_consignee(&self, waybill_number: &str, drop: &Drop) -> Result<(), ApiError> {
        let url = self.endpoint(&["consigneeInfo"])?;
        let payload = ConsigneePayload {
            waybill_number,
            drop,
        };
        debug!(%url, drop = %drop.id, "POST consignee");
        self.send(self.client.post(url.clone()).json(&payload), &url).await?;
        Ok(())
    }

    async fn delete_consignee(&self, waybill_number: &str, drop_id: Uuid) -> Result<(), ApiError> {
        let id = drop_id.to_string();
        let url = self.endpoint(&["consigneeInfo", &id])?;
        debug!(%url, "DELETE consignee");
        let request = self
            .client
            .delete(url.clone())
            .query(&[("waybillNumber", waybill_number)]);
        match self.send(request, &url).await {
            Ok(_) => Ok(()),
            // already gone
            Err(ApiError::Status { status: 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn subdetails(&self, waybill_number: &str) -> Result<Vec<SubDetail>, ApiError> {
        let details: Option<Vec<SubDetail>> = self
            .get_optional(
                &["subdetails"],
                &[("waybillNumber", waybill_number)],
                Some(self.settings.subdetail_timeout),
            )
            .await?;
        Ok(details.unwrap_or_default())
    }

    async fn approval_request(
        &self,
        reference_id: &str,
    ) -> Result<Option<ApprovalRequest>, ApiError> {
        self.get_optional(&["control-panel", reference_id], &[], None)
            .await
    }

    async fn request_approval(&self, draft: &ApprovalDraft) -> Result<ApprovalRequest, ApiError> {
        let url = self.endpoint(&["control-panel"])?;
        debug!(%url, consignee = %draft.consignee_id, "POST approval request");
        let response = self.send(self.client.post(url.clone()).json(draft), &url).await?;
        response.json::<ApprovalRequest>().await.map_err(ApiError::from)
    }
}
