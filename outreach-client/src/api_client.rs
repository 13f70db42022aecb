//! Remote campaign service client.
//!
//! [`CampaignService`] is the seam stage controllers talk to; [`RestClient`]
//! is the HTTP implementation. Every method returns either a parsed result or
//! a [`ServiceError`] whose kind names the failed operation. Transport and
//! response errors never escape untranslated.

use crate::config::ClientConfig;
use async_trait::async_trait;
use outreach_core::{
    confirmable_contacts, validate_step_number, Campaign, CampaignDraftMetadata, CampaignId,
    CampaignStatusSummary, ConfirmCampaignRequest, Contact, ContactId, ContactRow, EmailDraft,
    EmailId, EmailPatch, EmailStatus, ErrorKind, GenerateSequenceRequest, IngestPreview,
    SendStepRequest, ServiceError, ServiceResult,
};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// A contact file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "contacts".to_string());
        Ok(Self { file_name, bytes })
    }

    /// Content type derived from the file extension.
    pub fn mime_type(&self) -> &'static str {
        let extension = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("csv") => "text/csv",
            Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Some("xls") => "application/vnd.ms-excel",
            _ => "application/octet-stream",
        }
    }
}

/// Operations offered by the remote campaign service.
#[async_trait]
pub trait CampaignService: Send + Sync {
    /// Hand a contact file to the service for parsing.
    async fn ingest_contacts(&self, file: &UploadFile) -> ServiceResult<IngestPreview>;

    /// Create a campaign from confirmed preview rows.
    async fn confirm_campaign(
        &self,
        metadata: &CampaignDraftMetadata,
        contacts: &[ContactRow],
    ) -> ServiceResult<Campaign>;

    /// Contacts persisted by the service.
    async fn list_contacts(&self) -> ServiceResult<Vec<Contact>>;

    async fn list_emails(
        &self,
        campaign_id: CampaignId,
        status: Option<EmailStatus>,
    ) -> ServiceResult<Vec<EmailDraft>>;

    async fn update_email(&self, email_id: EmailId, patch: &EmailPatch)
        -> ServiceResult<EmailDraft>;

    /// Request sequence generation. `None` means every contact.
    ///
    /// The service guarantees re-generation never duplicates drafts.
    async fn generate_sequence(
        &self,
        campaign_id: CampaignId,
        contact_ids: Option<&[ContactId]>,
    ) -> ServiceResult<()>;

    /// Dispatch one sequence step. Returns how many emails went out.
    async fn send_step(&self, campaign_id: CampaignId, step_number: u32) -> ServiceResult<u32>;

    async fn campaign_status(&self, campaign_id: CampaignId)
        -> ServiceResult<CampaignStatusSummary>;
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, &config.api_base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T, Q>(&self, kind: ErrorKind, path: &str, query: Option<&Q>) -> ServiceResult<T>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let mut request = self.client.get(self.url(path));
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await.map_err(|e| transport_error(kind, e))?;
        parse_response(kind, response).await
    }

    async fn post_json<T, B>(&self, kind: ErrorKind, path: &str, body: &B) -> ServiceResult<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(kind, e))?;
        parse_response(kind, response).await
    }
}

#[async_trait]
impl CampaignService for RestClient {
    async fn ingest_contacts(&self, file: &UploadFile) -> ServiceResult<IngestPreview> {
        if file.bytes.is_empty() {
            return Err(ServiceError::ingest(format!("{} is empty", file.file_name)));
        }
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.mime_type())
            .map_err(|e| transport_error(ErrorKind::Ingest, e))?;
        let form = Form::new().part("file", part);

        tracing::debug!(file_name = %file.file_name, size = file.bytes.len(), "Uploading contacts");
        let response = self
            .client
            .post(self.url("/upload-contacts"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(ErrorKind::Ingest, e))?;
        let preview: IngestPreview = parse_response(ErrorKind::Ingest, response).await?;
        tracing::info!(rows = preview.preview_rows.len(), "Contact file parsed");
        Ok(preview)
    }

    async fn confirm_campaign(
        &self,
        metadata: &CampaignDraftMetadata,
        contacts: &[ContactRow],
    ) -> ServiceResult<Campaign> {
        let contacts = confirmable_contacts(contacts)
            .map_err(|e| e.into_service_error(ErrorKind::Confirm))?;
        let body = ConfirmCampaignRequest::new(metadata, &contacts);
        let campaign: Campaign = self
            .post_json(ErrorKind::Confirm, "/contacts/confirm", &body)
            .await?;
        tracing::info!(campaign_id = %campaign.id, contacts = contacts.len(), "Campaign confirmed");
        Ok(campaign)
    }

    async fn list_contacts(&self) -> ServiceResult<Vec<Contact>> {
        self.get_json::<_, ()>(ErrorKind::Fetch, "/contacts", None).await
    }

    async fn list_emails(
        &self,
        campaign_id: CampaignId,
        status: Option<EmailStatus>,
    ) -> ServiceResult<Vec<EmailDraft>> {
        let mut query = vec![("campaign_id", campaign_id.to_string())];
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }
        self.get_json(ErrorKind::Fetch, "/emails/", Some(&query)).await
    }

    async fn update_email(&self, email_id: EmailId, patch: &EmailPatch) -> ServiceResult<EmailDraft> {
        if patch.is_empty() {
            return Err(ServiceError::update("Nothing to update"));
        }
        let response = self
            .client
            .put(self.url(&format!("/emails/{}", email_id)))
            .json(patch)
            .send()
            .await
            .map_err(|e| transport_error(ErrorKind::Update, e))?;
        let updated: EmailDraft = parse_response(ErrorKind::Update, response).await?;
        tracing::debug!(email_id = %email_id, status = %updated.status, "Email updated");
        Ok(updated)
    }

    async fn generate_sequence(
        &self,
        campaign_id: CampaignId,
        contact_ids: Option<&[ContactId]>,
    ) -> ServiceResult<()> {
        let body = GenerateSequenceRequest::for_contacts(contact_ids);
        let path = format!("/campaigns/{}/generate-emails", campaign_id);
        let response = self
            .client
            .post(self.url(&path))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(ErrorKind::Generate, e))?;
        parse_ack(ErrorKind::Generate, response).await?;
        tracing::info!(
            campaign_id = %campaign_id,
            contacts = ?body.contact_ids.as_ref().map(Vec::len),
            "Sequence generation acknowledged"
        );
        Ok(())
    }

    async fn send_step(&self, campaign_id: CampaignId, step_number: u32) -> ServiceResult<u32> {
        validate_step_number(step_number).map_err(|e| e.into_service_error(ErrorKind::Send))?;
        let response = self
            .client
            .post(self.url("/emails/send"))
            .query(&[("campaign_id", campaign_id.to_string())])
            .json(&SendStepRequest::immediate(step_number))
            .send()
            .await
            .map_err(|e| transport_error(ErrorKind::Send, e))?;
        let count: u32 = parse_response(ErrorKind::Send, response).await?;
        tracing::info!(campaign_id = %campaign_id, step_number, count, "Sequence step sent");
        Ok(count)
    }

    async fn campaign_status(&self, campaign_id: CampaignId) -> ServiceResult<CampaignStatusSummary> {
        let path = format!("/campaigns/{}", campaign_id);
        self.get_json::<_, ()>(ErrorKind::Fetch, &path, None).await
    }
}

fn transport_error(kind: ErrorKind, err: reqwest::Error) -> ServiceError {
    tracing::warn!(kind = %kind, error = %err, "Campaign service request failed");
    if err.is_timeout() {
        return ServiceError::new(kind, "Request timed out");
    }
    ServiceError::new(kind, err.to_string())
}

async fn parse_response<T: DeserializeOwned>(
    kind: ErrorKind,
    response: reqwest::Response,
) -> ServiceResult<T> {
    let status = response.status();
    let body = response.bytes().await.map_err(|e| transport_error(kind, e))?;
    if !status.is_success() {
        return Err(rejected(kind, status, &body));
    }
    serde_json::from_slice(&body)
        .map_err(|e| ServiceError::new(kind, format!("Unexpected response: {}", e)))
}

async fn parse_ack(kind: ErrorKind, response: reqwest::Response) -> ServiceResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.bytes().await.map_err(|e| transport_error(kind, e))?;
    Err(rejected(kind, status, &body))
}

fn rejected(kind: ErrorKind, status: StatusCode, body: &[u8]) -> ServiceError {
    let message = error_message(status, body);
    tracing::warn!(kind = %kind, status = status.as_u16(), message = %message, "Campaign service rejected request");
    ServiceError::new(kind, message)
}

/// Structured error body: `{"detail": "..."}` or `{"detail": [{"msg": "..."}]}`.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    detail: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Items(Vec<DetailItem>),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct DetailItem {
    msg: String,
}

/// Human-readable message for a non-success response.
pub(crate) fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(payload) = serde_json::from_slice::<ErrorPayload>(body) {
        match payload.detail {
            ErrorDetail::Text(text) if !text.trim().is_empty() => return text,
            ErrorDetail::Items(items) if !items.is_empty() => {
                return items
                    .into_iter()
                    .map(|item| item.msg)
                    .collect::<Vec<_>>()
                    .join("; ");
            }
            ErrorDetail::Other(value) if !value.is_null() => return value.to_string(),
            _ => {}
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), text)
    }
}
