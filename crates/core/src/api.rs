//! Analysis service access.
//!
//! [`AnalysisApi`] is the seam between the views and the network. [`HttpAnalysisApi`] speaks the
//! service's HTTP contract:
//!
//! | Operation | Request | Success body |
//! |---|---|---|
//! | `analyze` | `POST /analyze`, multipart `file` + `drugs` | analysis |
//! | `list_drugs` | `GET /drugs` | `{ "drugs": [...] }` |
//! | `get_results` | `GET /results/{id}` | analysis |
//! | `regenerate_explanation` | `POST /regenerate-explanation`, form `analysis_id` + `drug` | `{ "llm_explanation": {...} }` |
//!
//! Only `analyze` carries a timeout. No call is retried.

use crate::config::ClientConfig;
use crate::upload::VcfUpload;
use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use pharmaguard_types::{
    from_json_str, AnalysisResponse, DrugName, DrugsResponse, LlmExplanation, RegenerateResponse,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use std::time::Duration;

/// Payload of `POST /analyze`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub file: VcfUpload,
    pub drugs: Vec<DrugName>,
}

impl AnalysisRequest {
    /// Value of the `drugs` form field: upper-cased names joined by commas.
    pub fn drugs_field(&self) -> String {
        self.drugs
            .iter()
            .map(DrugName::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[async_trait]
pub trait AnalysisApi: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> ClientResult<AnalysisResponse>;

    /// Drugs the service supports. An unsuccessful reply yields an empty list.
    async fn list_drugs(&self) -> ClientResult<Vec<String>>;

    async fn get_results(&self, analysis_id: &str) -> ClientResult<AnalysisResponse>;

    async fn regenerate_explanation(
        &self,
        analysis_id: &str,
        drug: &str,
    ) -> ClientResult<LlmExplanation>;
}

/// Body of a non-2xx reply. `detail` is usually a string but validation errors send a list.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

#[derive(Clone, Debug)]
pub struct HttpAnalysisApi {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpAnalysisApi {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: ClientConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisApi {
    async fn analyze(&self, request: AnalysisRequest) -> ClientResult<AnalysisResponse> {
        let url = self.config.endpoint(&["analyze"])?;
        let timeout = self.config.analyze_timeout();
        let drugs = request.drugs_field();
        let (file_name, bytes) = request.file.into_parts();

        tracing::info!(
            "submitting {} ({} bytes) for drugs {}",
            file_name,
            bytes.len(),
            drugs
        );

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("drugs", drugs);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(e, Some(timeout)))?;

        if !response.status().is_success() {
            return Err(server_error(response).await);
        }

        let body = read_body(response, Some(timeout)).await?;
        Ok(AnalysisResponse::from_json(&body)?)
    }

    async fn list_drugs(&self) -> ClientResult<Vec<String>> {
        let url = self.config.endpoint(&["drugs"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_transport_error(e, None))?;

        if !response.status().is_success() {
            tracing::warn!("drug list unavailable: HTTP {}", response.status());
            return Ok(Vec::new());
        }

        let body = read_body(response, None).await?;
        let parsed: DrugsResponse = from_json_str("drug list", &body)?;
        Ok(parsed.drugs)
    }

    async fn get_results(&self, analysis_id: &str) -> ClientResult<AnalysisResponse> {
        let url = self.config.endpoint(&["results", analysis_id])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_transport_error(e, None))?;

        if !response.status().is_success() {
            tracing::debug!(
                "results for {} unavailable: HTTP {}",
                analysis_id,
                response.status()
            );
            return Err(ClientError::NotFound);
        }

        let body = read_body(response, None).await?;
        Ok(AnalysisResponse::from_json(&body)?)
    }

    async fn regenerate_explanation(
        &self,
        analysis_id: &str,
        drug: &str,
    ) -> ClientResult<LlmExplanation> {
        let url = self.config.endpoint(&["regenerate-explanation"])?;
        let form = Form::new()
            .text("analysis_id", analysis_id.to_string())
            .text("drug", drug.to_string());

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_transport_error(e, None))?;

        if !response.status().is_success() {
            tracing::debug!(
                "regenerate for {}/{} rejected: HTTP {}",
                analysis_id,
                drug,
                response.status()
            );
            return Err(ClientError::Regenerate);
        }

        let body = read_body(response, None).await?;
        let parsed: RegenerateResponse = from_json_str("regenerated explanation", &body)?;
        Ok(parsed.llm_explanation)
    }
}

async fn read_body(response: Response, timeout: Option<Duration>) -> ClientResult<String> {
    response
        .text()
        .await
        .map_err(|e| map_transport_error(e, timeout))
}

fn map_transport_error(err: reqwest::Error, timeout: Option<Duration>) -> ClientError {
    match timeout {
        Some(timeout) if err.is_timeout() => ClientError::Aborted(timeout),
        _ => ClientError::Transport(err.to_string()),
    }
}

/// Build the error for a non-2xx reply from its `detail`, falling back to the status text.
async fn server_error(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.detail)
        .and_then(|detail| match detail {
            serde_json::Value::String(text) if !text.trim().is_empty() => Some(text),
            serde_json::Value::String(_) | serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });

    ClientError::Server(detail.unwrap_or_else(|| status_text(status)))
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}
