//! Entity and payload types exchanged with the campaign service.

use crate::enums::{EmailStatus, SendMode};
use crate::identity::{
    deserialize_optional_timestamp, CampaignId, ContactId, EmailId, StepId, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_CAMPAIGN_NAME: &str = "My Campaign";
pub const DEFAULT_PRODUCT_NAME: &str = "My Product";

// ============================================================================
// CONTACTS
// ============================================================================

/// One parsed row of an uploaded contact list.
///
/// Fields the workflow does not recognise are carried in `extra` and sent
/// back unchanged on confirmation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactRow {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hobbies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbti_type: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ContactRow {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }
}

/// A contact persisted by the service after confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ContactId>,
    #[serde(flatten)]
    pub row: ContactRow,
}

/// Result of handing a contact file to the service for parsing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IngestPreview {
    pub preview_rows: Vec<ContactRow>,
    /// Columns the service recognised in the file.
    #[serde(default)]
    pub inferred_columns: Vec<String>,
}

// ============================================================================
// CAMPAIGNS
// ============================================================================

/// User-entered campaign details collected alongside the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDraftMetadata {
    pub campaign_name: String,
    pub product_name: String,
    pub product_description: String,
}

impl CampaignDraftMetadata {
    /// Build metadata from raw form input, substituting defaults for blanks.
    pub fn from_form(campaign_name: &str, product_name: &str, product_description: &str) -> Self {
        Self {
            campaign_name: non_blank_or(campaign_name, DEFAULT_CAMPAIGN_NAME),
            product_name: non_blank_or(product_name, DEFAULT_PRODUCT_NAME),
            product_description: non_blank_or(product_description, ""),
        }
    }
}

impl Default for CampaignDraftMetadata {
    fn default() -> Self {
        Self::from_form("", "", "")
    }
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Body of `POST /contacts/confirm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmCampaignRequest {
    pub campaign_name: String,
    pub product_name: String,
    pub product_description: String,
    pub contacts: Vec<ContactRow>,
}

impl ConfirmCampaignRequest {
    pub fn new(metadata: &CampaignDraftMetadata, contacts: &[ContactRow]) -> Self {
        Self {
            campaign_name: metadata.campaign_name.clone(),
            product_name: metadata.product_name.clone(),
            product_description: metadata.product_description.clone(),
            contacts: contacts.to_vec(),
        }
    }
}

/// Campaign record returned on confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_description: Option<String>,
}

/// Body of `POST /campaigns/{id}/generate-emails`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateSequenceRequest {
    pub regenerate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_ids: Option<Vec<ContactId>>,
}

impl GenerateSequenceRequest {
    /// An empty id list means "every contact", so it is not sent at all.
    pub fn for_contacts(contact_ids: Option<&[ContactId]>) -> Self {
        Self {
            regenerate: true,
            contact_ids: contact_ids
                .filter(|ids| !ids.is_empty())
                .map(|ids| ids.to_vec()),
        }
    }
}

/// Body of `POST /emails/send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendStepRequest {
    pub step_number: u32,
    #[serde(default)]
    pub send_mode: SendMode,
}

impl SendStepRequest {
    pub fn immediate(step_number: u32) -> Self {
        Self {
            step_number,
            send_mode: SendMode::Immediate,
        }
    }
}

/// Human label for a sequence step number.
pub fn step_label(step_number: u32) -> String {
    match step_number {
        1 => "Initial email".to_string(),
        2 => "Follow-up".to_string(),
        3 => "Final reminder".to_string(),
        n => format!("Step {}", n),
    }
}

// ============================================================================
// EMAILS
// ============================================================================

/// An email instance owned by the service: a sequence step or a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub id: EmailId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    pub contact_id: ContactId,
    /// `None` marks a reply rather than a sequence step.
    #[serde(default)]
    pub sequence_step_id: Option<StepId>,
    pub subject: String,
    pub body_text: String,
    pub status: EmailStatus,
    #[serde(default)]
    pub is_reply: bool,
    #[serde(default)]
    pub open_count: u32,
    #[serde(default)]
    pub click_count: u32,
    #[serde(default)]
    pub bounce: bool,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub sent_at: Option<Timestamp>,
}

impl EmailDraft {
    pub fn is_sequence_draft(&self) -> bool {
        !self.is_reply
    }
}

/// Split a listing into (sequence drafts, reply drafts). Order is preserved.
pub fn partition_drafts(drafts: Vec<EmailDraft>) -> (Vec<EmailDraft>, Vec<EmailDraft>) {
    drafts.into_iter().partition(EmailDraft::is_sequence_draft)
}

/// Partial update for `PUT /emails/{id}`. Unset fields are left alone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmailPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EmailStatus>,
}

impl EmailPatch {
    /// Patch carrying the two client-editable content fields of `draft`.
    pub fn content_of(draft: &EmailDraft) -> Self {
        Self {
            subject: Some(draft.subject.clone()),
            body_text: Some(draft.body_text.clone()),
            status: None,
        }
    }

    pub fn with_status(mut self, status: EmailStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.body_text.is_none() && self.status.is_none()
    }

    /// Apply to a local copy the way the service applies it server-side.
    pub fn apply_to(&self, draft: &mut EmailDraft) {
        if let Some(subject) = &self.subject {
            draft.subject = subject.clone();
        }
        if let Some(body_text) = &self.body_text {
            draft.body_text = body_text.clone();
        }
        if let Some(status) = self.status {
            draft.status = status;
        }
    }
}

// ============================================================================
// STATUS
// ============================================================================

/// Engagement record for one sent email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAnalytics {
    pub id: EmailId,
    pub subject: String,
    pub recipient_email: String,
    #[serde(default)]
    pub recipient_name: String,
    pub status: String,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub sent_at: Option<Timestamp>,
    #[serde(default)]
    pub open_count: u32,
    #[serde(default)]
    pub click_count: u32,
    #[serde(default)]
    pub bounce: bool,
}

/// Aggregate counters for a campaign. A snapshot, re-fetched per view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CampaignStatusSummary {
    pub total_emails: u32,
    pub sent: u32,
    pub delivered: u32,
    pub failed: u32,
    pub replied: u32,
    pub draft: u32,
    #[serde(default)]
    pub sent_emails: Vec<EmailAnalytics>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EntityIdType;

    fn draft(id: i64, is_reply: bool) -> EmailDraft {
        EmailDraft {
            id: EmailId::new(id),
            campaign_id: Some(CampaignId::new(1)),
            contact_id: ContactId::new(1),
            sequence_step_id: if is_reply { None } else { Some(StepId::new(1)) },
            subject: format!("subject {}", id),
            body_text: "body".to_string(),
            status: EmailStatus::Draft,
            is_reply,
            open_count: 0,
            click_count: 0,
            bounce: false,
            sent_at: None,
        }
    }

    #[test]
    fn blank_form_fields_get_defaults() {
        let meta = CampaignDraftMetadata::from_form("  ", "", "");
        assert_eq!(meta.campaign_name, "My Campaign");
        assert_eq!(meta.product_name, "My Product");
        assert_eq!(meta.product_description, "");

        let meta = CampaignDraftMetadata::from_form("Q3 push", "Widget", "A widget");
        assert_eq!(meta.campaign_name, "Q3 push");
        assert_eq!(meta.product_name, "Widget");
        assert_eq!(meta.product_description, "A widget");
    }

    #[test]
    fn unknown_contact_columns_pass_through() {
        let json = r#"{"email":"a@x.com","first_name":"Ann","linkedin":"ann-x"}"#;
        let row: ContactRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.first_name.as_deref(), Some("Ann"));
        assert_eq!(row.extra.get("linkedin"), Some(&serde_json::json!("ann-x")));

        let back = serde_json::to_value(&row).unwrap();
        assert_eq!(back["linkedin"], "ann-x");
        assert!(back.get("company").is_none());
    }

    #[test]
    fn contact_keeps_server_id_out_of_row_extras() {
        let json = r#"{"id":9,"email":"a@x.com"}"#;
        let contact: Contact = serde_json::from_str(json).unwrap();
        assert_eq!(contact.id, Some(ContactId::new(9)));
        assert!(contact.row.extra.is_empty());
    }

    #[test]
    fn generate_request_omits_empty_contact_selection() {
        let all = GenerateSequenceRequest::for_contacts(Some(&[][..]));
        assert_eq!(serde_json::to_value(&all).unwrap(), serde_json::json!({"regenerate": true}));

        let some = GenerateSequenceRequest::for_contacts(Some(&[ContactId::new(4)][..]));
        assert_eq!(
            serde_json::to_value(&some).unwrap(),
            serde_json::json!({"regenerate": true, "contact_ids": [4]})
        );
    }

    #[test]
    fn send_request_is_immediate() {
        let body = serde_json::to_value(SendStepRequest::immediate(2)).unwrap();
        assert_eq!(body, serde_json::json!({"step_number": 2, "send_mode": "immediate"}));
    }

    #[test]
    fn email_draft_tolerates_missing_engagement_fields() {
        let json = r#"{
            "id": 5, "campaign_id": 1, "contact_id": 2, "sequence_step_id": null,
            "subject": "Re: hi", "body_text": "thanks", "status": "awaiting_review",
            "is_reply": true
        }"#;
        let draft: EmailDraft = serde_json::from_str(json).unwrap();
        assert!(draft.is_reply);
        assert_eq!(draft.open_count, 0);
        assert!(draft.sent_at.is_none());
        assert_eq!(draft.status, EmailStatus::AwaitingReview);
    }

    #[test]
    fn status_summary_accepts_naive_sent_at() {
        let body = r#"{
            "total_emails": 1, "sent": 1, "delivered": 0,
            "failed": 0, "replied": 0, "draft": 0,
            "sent_emails": [{"id": 5, "subject": "Hi", "recipient_email": "a@x.com",
                        "status": "sent", "sent_at": "2026-10-18T09:30:00.123456"}]
        }"#;
        let summary: CampaignStatusSummary = serde_json::from_str(body).unwrap();
        let sent_at = summary.sent_emails[0].sent_at.unwrap();
        assert_eq!(sent_at.to_rfc3339(), "2026-10-18T09:30:00.123456+00:00");

        let mut draft = draft(1, false);
        draft.sent_at = Some(sent_at);
        let back: EmailDraft = serde_json::from_str(&serde_json::to_string(&draft).unwrap()).unwrap();
        assert_eq!(back.sent_at, Some(sent_at));
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = EmailPatch::content_of(&draft(1, false));
        let body = serde_json::to_value(&patch).unwrap();
        assert_eq!(body, serde_json::json!({"subject": "subject 1", "body_text": "body"}));

        let body = serde_json::to_value(patch.with_status(EmailStatus::Sent)).unwrap();
        assert_eq!(body["status"], "sent");
    }

    #[test]
    fn patch_apply_leaves_unset_fields() {
        let mut d = draft(1, false);
        EmailPatch {
            subject: Some("new".to_string()),
            ..EmailPatch::default()
        }
        .apply_to(&mut d);
        assert_eq!(d.subject, "new");
        assert_eq!(d.body_text, "body");
        assert_eq!(d.status, EmailStatus::Draft);
    }

    #[test]
    fn partition_splits_on_reply_flag() {
        let (sequence, replies) =
            partition_drafts(vec![draft(1, false), draft(2, true), draft(3, false)]);
        assert_eq!(sequence.iter().map(|d| d.id.as_i64()).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(replies.iter().map(|d| d.id.as_i64()).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn step_labels() {
        assert_eq!(step_label(1), "Initial email");
        assert_eq!(step_label(3), "Final reminder");
        assert_eq!(step_label(5), "Step 5");
    }
}
