//! Outreach Test Utilities
//!
//! Shared test infrastructure for the outreach workspace:
//! - An in-memory campaign service stub
//! - Proptest generators for contact rows and email drafts
//! - Fixtures for sessions, uploads and drafts
//! - Assertions for normalized service errors

pub use outreach_client::{CampaignService, UploadFile, WorkflowSession, WorkflowStore};
pub use outreach_core::{
    confirmable_contacts, step_label, Campaign, CampaignDraftMetadata, CampaignId,
    CampaignStatusSummary, Contact, ContactId, ContactRow, EmailAnalytics, EmailDraft, EmailId,
    EmailPatch, EmailStatus, EntityIdType, ErrorKind, IngestPreview, ServiceError, ServiceResult,
    StepId,
};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

// ============================================================================
// STUB SERVICE
// ============================================================================

/// Service operations, as recorded by [`StubCampaignService::calls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StubOp {
    Ingest,
    Confirm,
    ListContacts,
    ListEmails,
    UpdateEmail,
    Generate,
    Send,
    Status,
}

#[derive(Debug)]
struct StubCampaign {
    campaign: Campaign,
    contact_ids: Vec<ContactId>,
}

#[derive(Debug)]
struct StubState {
    next_campaign_id: i64,
    next_contact_id: i64,
    next_email_id: i64,
    step_count: u32,
    campaigns: BTreeMap<CampaignId, StubCampaign>,
    contacts: Vec<Contact>,
    emails: Vec<EmailDraft>,
    failures: BTreeMap<StubOp, ServiceError>,
    calls: Vec<StubOp>,
}

/// In-memory campaign service with the remote service's observable rules.
///
/// Step ids equal step numbers. Generation only fills missing
/// (contact, step) pairs, so repeating it never duplicates drafts.
#[derive(Debug)]
pub struct StubCampaignService {
    state: Mutex<StubState>,
}

impl Default for StubCampaignService {
    fn default() -> Self {
        Self::new()
    }
}

impl StubCampaignService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StubState {
                next_campaign_id: 1,
                next_contact_id: 1,
                next_email_id: 1,
                step_count: 3,
                campaigns: BTreeMap::new(),
                contacts: Vec::new(),
                emails: Vec::new(),
                failures: BTreeMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Id handed to the next confirmed campaign.
    pub fn with_next_campaign_id(self, id: i64) -> Self {
        self.lock().next_campaign_id = id;
        self
    }

    /// Sequence steps created per confirmed campaign.
    pub fn with_step_count(self, steps: u32) -> Self {
        self.lock().step_count = steps;
        self
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: StubOp, error: ServiceError) {
        self.lock().failures.insert(op, error);
    }

    /// Every operation invoked so far, in order.
    pub fn calls(&self) -> Vec<StubOp> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn emails(&self) -> Vec<EmailDraft> {
        self.lock().emails.clone()
    }

    /// Simulate an inbound reply for which a response was drafted.
    pub fn inject_reply(
        &self,
        campaign_id: CampaignId,
        contact_id: ContactId,
        subject: &str,
        body_text: &str,
    ) -> EmailId {
        let mut state = self.lock();
        let id = EmailId::new(state.next_email_id);
        state.next_email_id += 1;
        state.emails.push(EmailDraft {
            id,
            campaign_id: Some(campaign_id),
            contact_id,
            sequence_step_id: None,
            subject: subject.to_string(),
            body_text: body_text.to_string(),
            status: EmailStatus::AwaitingReview,
            is_reply: true,
            open_count: 0,
            click_count: 0,
            bounce: false,
            sent_at: None,
        });
        id
    }

    /// Delete an email server-side, as if another client removed it.
    pub fn remove_email(&self, email_id: EmailId) -> bool {
        let mut state = self.lock();
        let before = state.emails.len();
        state.emails.retain(|e| e.id != email_id);
        state.emails.len() != before
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record the call and consume any injected failure for it.
    fn enter(&self, op: StubOp) -> Result<MutexGuard<'_, StubState>, ServiceError> {
        let mut state = self.lock();
        state.calls.push(op);
        match state.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl CampaignService for StubCampaignService {
    async fn ingest_contacts(&self, file: &UploadFile) -> ServiceResult<IngestPreview> {
        let _state = self.enter(StubOp::Ingest)?;
        if !file.file_name.to_ascii_lowercase().ends_with(".csv") {
            return Err(ServiceError::ingest("Only CSV files are supported"));
        }
        let text = std::str::from_utf8(&file.bytes)
            .map_err(|_| ServiceError::ingest("File is not valid UTF-8"))?;
        parse_csv(text)
    }

    async fn confirm_campaign(
        &self,
        metadata: &CampaignDraftMetadata,
        contacts: &[ContactRow],
    ) -> ServiceResult<Campaign> {
        let mut state = self.enter(StubOp::Confirm)?;
        let contacts = confirmable_contacts(contacts)
            .map_err(|e| e.into_service_error(ErrorKind::Confirm))?;

        let mut contact_ids = Vec::with_capacity(contacts.len());
        for row in &contacts {
            let existing = state
                .contacts
                .iter()
                .find(|c| c.row.email.eq_ignore_ascii_case(&row.email))
                .and_then(|c| c.id);
            let id = match existing {
                Some(id) => id,
                None => {
                    let id = ContactId::new(state.next_contact_id);
                    state.next_contact_id += 1;
                    state.contacts.push(Contact {
                        id: Some(id),
                        row: row.clone(),
                    });
                    id
                }
            };
            contact_ids.push(id);
        }

        let campaign = Campaign {
            id: CampaignId::new(state.next_campaign_id),
            name: metadata.campaign_name.clone(),
            product_name: metadata.product_name.clone(),
            product_description: Some(metadata.product_description.clone()),
        };
        state.next_campaign_id += 1;
        state.campaigns.insert(
            campaign.id,
            StubCampaign {
                campaign: campaign.clone(),
                contact_ids,
            },
        );
        Ok(campaign)
    }

    async fn list_contacts(&self) -> ServiceResult<Vec<Contact>> {
        let state = self.enter(StubOp::ListContacts)?;
        Ok(state.contacts.clone())
    }

    async fn list_emails(
        &self,
        campaign_id: CampaignId,
        status: Option<EmailStatus>,
    ) -> ServiceResult<Vec<EmailDraft>> {
        let state = self.enter(StubOp::ListEmails)?;
        let mut emails: Vec<EmailDraft> = state
            .emails
            .iter()
            .filter(|e| e.campaign_id == Some(campaign_id))
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect();
        emails.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(emails)
    }

    async fn update_email(&self, email_id: EmailId, patch: &EmailPatch) -> ServiceResult<EmailDraft> {
        let mut state = self.enter(StubOp::UpdateEmail)?;
        let email = state
            .emails
            .iter_mut()
            .find(|e| e.id == email_id)
            .ok_or_else(|| ServiceError::update("Email not found"))?;
        patch.apply_to(email);
        if patch.status == Some(EmailStatus::Sent) && email.sent_at.is_none() {
            email.sent_at = Some(Utc::now());
        }
        Ok(email.clone())
    }

    async fn generate_sequence(
        &self,
        campaign_id: CampaignId,
        contact_ids: Option<&[ContactId]>,
    ) -> ServiceResult<()> {
        let mut state = self.enter(StubOp::Generate)?;
        let (campaign, members) = match state.campaigns.get(&campaign_id) {
            Some(c) => (c.campaign.clone(), c.contact_ids.clone()),
            None => return Err(ServiceError::generate("Campaign not found")),
        };
        let targets: Vec<ContactId> = match contact_ids {
            Some(ids) if !ids.is_empty() => {
                let wanted: BTreeSet<ContactId> = ids.iter().copied().collect();
                let targets: Vec<ContactId> =
                    members.into_iter().filter(|id| wanted.contains(id)).collect();
                if targets.is_empty() {
                    return Err(ServiceError::generate("No valid contacts found"));
                }
                targets
            }
            _ => members,
        };
        if targets.is_empty() || state.step_count == 0 {
            return Err(ServiceError::generate("Campaign missing contacts or steps"));
        }

        for contact_id in targets {
            for step in 1..=state.step_count {
                let step_id = StepId::new(step as i64);
                let exists = state.emails.iter().any(|e| {
                    e.campaign_id == Some(campaign_id)
                        && e.contact_id == contact_id
                        && e.sequence_step_id == Some(step_id)
                        && !e.is_reply
                });
                if exists {
                    continue;
                }
                let id = EmailId::new(state.next_email_id);
                state.next_email_id += 1;
                state.emails.push(EmailDraft {
                    id,
                    campaign_id: Some(campaign_id),
                    contact_id,
                    sequence_step_id: Some(step_id),
                    subject: format!("{}: {}", step_label(step), campaign.product_name),
                    body_text: format!("Hello! A note about {}.", campaign.product_name),
                    status: EmailStatus::Draft,
                    is_reply: false,
                    open_count: 0,
                    click_count: 0,
                    bounce: false,
                    sent_at: None,
                });
            }
        }
        Ok(())
    }

    async fn send_step(&self, campaign_id: CampaignId, step_number: u32) -> ServiceResult<u32> {
        let mut state = self.enter(StubOp::Send)?;
        if !state.campaigns.contains_key(&campaign_id) {
            return Err(ServiceError::send("Campaign not found"));
        }
        if step_number == 0 || step_number > state.step_count {
            return Err(ServiceError::send("Step not found"));
        }
        let step_id = StepId::new(step_number as i64);
        let now = Utc::now();
        let mut sent = 0;
        for email in state.emails.iter_mut().filter(|e| {
            e.campaign_id == Some(campaign_id)
                && e.sequence_step_id == Some(step_id)
                && !e.is_reply
                && e.status.is_sendable()
        }) {
            email.status = EmailStatus::Sent;
            email.sent_at = Some(now);
            sent += 1;
        }
        Ok(sent)
    }

    async fn campaign_status(&self, campaign_id: CampaignId) -> ServiceResult<CampaignStatusSummary> {
        let state = self.enter(StubOp::Status)?;
        if !state.campaigns.contains_key(&campaign_id) {
            return Err(ServiceError::fetch("Campaign not found"));
        }
        let emails: Vec<&EmailDraft> = state
            .emails
            .iter()
            .filter(|e| e.campaign_id == Some(campaign_id))
            .collect();
        let count = |status: EmailStatus| emails.iter().filter(|e| e.status == status).count() as u32;

        let sent_emails = emails
            .iter()
            .filter(|e| e.status == EmailStatus::Sent)
            .map(|e| {
                let contact = state.contacts.iter().find(|c| c.id == Some(e.contact_id));
                EmailAnalytics {
                    id: e.id,
                    subject: e.subject.clone(),
                    recipient_email: contact.map(|c| c.row.email.clone()).unwrap_or_default(),
                    recipient_name: contact
                        .and_then(|c| c.row.first_name.clone())
                        .unwrap_or_default(),
                    status: e.status.as_str().to_string(),
                    sent_at: e.sent_at,
                    open_count: e.open_count,
                    click_count: e.click_count,
                    bounce: e.bounce,
                }
            })
            .collect();

        Ok(CampaignStatusSummary {
            total_emails: emails.len() as u32,
            sent: count(EmailStatus::Sent),
            delivered: count(EmailStatus::Delivered),
            failed: count(EmailStatus::Failed),
            replied: count(EmailStatus::Replied),
            draft: count(EmailStatus::Draft),
            sent_emails,
        })
    }
}

/// Header row names the columns; quoted fields may contain commas.
fn parse_csv(text: &str) -> ServiceResult<IngestPreview> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let header: Vec<String> = reader
        .headers()
        .map_err(|e| ServiceError::ingest(format!("Unreadable header: {}", e)))?
        .iter()
        .map(str::to_ascii_lowercase)
        .collect();
    if header.iter().all(String::is_empty) {
        return Err(ServiceError::ingest("File is empty"));
    }
    if !header.iter().any(|h| h == "email") {
        return Err(ServiceError::ingest("Missing required column: email"));
    }

    let mut preview_rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ServiceError::ingest(format!("Malformed row: {}", e)))?;
        let mut object = serde_json::Map::new();
        for (name, value) in header.iter().zip(record.iter()) {
            if !value.is_empty() {
                object.insert(name.clone(), serde_json::Value::String(value.to_string()));
            }
        }
        if object.is_empty() {
            continue;
        }
        let row: ContactRow = serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| ServiceError::ingest(format!("Malformed row: {}", e)))?;
        preview_rows.push(row);
    }
    Ok(IngestPreview {
        preview_rows,
        inferred_columns: header,
    })
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for outreach entity types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_email_status() -> impl Strategy<Value = EmailStatus> {
        prop::sample::select(EmailStatus::all().to_vec())
    }

    pub fn arb_email_address() -> impl Strategy<Value = String> {
        ("[a-z]{1,8}", "[a-z]{2,6}").prop_map(|(user, domain)| format!("{}@{}.com", user, domain))
    }

    pub fn arb_contact_row() -> impl Strategy<Value = ContactRow> {
        (
            arb_email_address(),
            proptest::option::of("[A-Z][a-z]{1,8}"),
            proptest::option::of("[A-Z][a-z]{1,10}"),
        )
            .prop_map(|(email, first_name, company)| ContactRow {
                email,
                first_name,
                company,
                ..ContactRow::default()
            })
    }

    /// A draft with the given id; reply drafts carry no step.
    pub fn arb_email_draft(id: i64) -> impl Strategy<Value = EmailDraft> {
        (any::<bool>(), 1u32..4, arb_email_status(), "[a-z ]{0,20}").prop_map(
            move |(is_reply, step, status, subject)| EmailDraft {
                sequence_step_id: (!is_reply).then(|| StepId::new(step as i64)),
                status,
                subject,
                ..fixtures::email_draft(id, is_reply)
            },
        )
    }

    /// A listing with unique ids, mixing sequence drafts and replies.
    pub fn arb_listing(max: usize) -> impl Strategy<Value = Vec<EmailDraft>> {
        prop::collection::btree_set(1i64..1000, 0..max).prop_flat_map(|ids| {
            ids.into_iter()
                .map(arb_email_draft)
                .collect::<Vec<_>>()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    pub fn contact_rows(emails: &[&str]) -> Vec<ContactRow> {
        emails.iter().map(|e| ContactRow::new(*e)).collect()
    }

    /// A CSV upload with one row per address.
    pub fn csv_upload(emails: &[&str]) -> UploadFile {
        let mut text = String::from("email,first_name,company\n");
        for (i, email) in emails.iter().enumerate() {
            text.push_str(&format!("{},Person{},Company{}\n", email, i + 1, i + 1));
        }
        UploadFile::new("contacts.csv", text.into_bytes())
    }

    pub fn email_draft(id: i64, is_reply: bool) -> EmailDraft {
        EmailDraft {
            id: EmailId::new(id),
            campaign_id: Some(CampaignId::new(1)),
            contact_id: ContactId::new(1),
            sequence_step_id: if is_reply { None } else { Some(StepId::new(1)) },
            subject: format!("Subject {}", id),
            body_text: format!("Body {}", id),
            status: EmailStatus::Draft,
            is_reply,
            open_count: 0,
            click_count: 0,
            bounce: false,
            sent_at: None,
        }
    }

    /// A session over `stub` whose store lives in a fresh temp dir.
    ///
    /// Keep the returned `TempDir` alive for the duration of the test.
    pub fn stub_session(stub: Arc<StubCampaignService>) -> (TempDir, WorkflowSession) {
        let dir = TempDir::new().expect("temp dir");
        let session = reopen_session(&dir, "test-session", stub);
        (dir, session)
    }

    /// Open (or reopen) `session_id` under `dir` against `stub`.
    pub fn reopen_session(
        dir: &TempDir,
        session_id: &str,
        stub: Arc<StubCampaignService>,
    ) -> WorkflowSession {
        let store = WorkflowStore::open(dir.path(), session_id).expect("open store");
        WorkflowSession::with_service(stub, store)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for normalized service errors.

    use super::*;

    /// Assert that a result failed with the given error kind.
    #[track_caller]
    pub fn assert_service_error<T: std::fmt::Debug>(result: &ServiceResult<T>, kind: ErrorKind) {
        match result {
            Err(err) => assert_eq!(err.kind, kind, "Wrong error kind: {:?}", err),
            Ok(value) => panic!("Expected {} error, got Ok({:?})", kind, value),
        }
    }

    /// Assert that sequence drafts and replies split `listing` exactly.
    #[track_caller]
    pub fn assert_partition(listing: &[EmailDraft], sequence: &[EmailDraft], replies: &[EmailDraft]) {
        assert_eq!(sequence.len() + replies.len(), listing.len());
        assert!(sequence.iter().all(|d| !d.is_reply));
        assert!(replies.iter().all(|d| d.is_reply));
        for draft in listing {
            let in_sequence = sequence.iter().any(|d| d.id == draft.id);
            let in_replies = replies.iter().any(|d| d.id == draft.id);
            assert!(in_sequence != in_replies, "Draft {} must be in exactly one view", draft.id);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
