//! Selectable, locally editable list of email drafts.
//!
//! Shared by the Generate and Replies stages. The board only ever holds the
//! drafts of its own partition, keeps one local edit copy of the selected
//! draft, and is reconciled by replacing its contents with a fresh listing.

use crate::api_client::CampaignService;
use crate::stages::StageError;
use outreach_core::{CampaignId, EmailDraft, EmailId, EmailPatch, EmailStatus, ServiceResult};
use std::sync::Arc;

/// Which side of the `is_reply` split a board shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftPartition {
    Sequence,
    Replies,
}

impl DraftPartition {
    pub fn admits(&self, draft: &EmailDraft) -> bool {
        match self {
            DraftPartition::Sequence => !draft.is_reply,
            DraftPartition::Replies => draft.is_reply,
        }
    }

    pub fn filter(&self, drafts: Vec<EmailDraft>) -> Vec<EmailDraft> {
        drafts.into_iter().filter(|d| self.admits(d)).collect()
    }
}

/// Selection after a refresh: keep `previous` if still listed, else the
/// first draft, else nothing.
pub fn reconcile_selection(drafts: &[EmailDraft], previous: Option<EmailId>) -> Option<EmailId> {
    previous
        .filter(|id| drafts.iter().any(|d| d.id == *id))
        .or_else(|| drafts.first().map(|d| d.id))
}

/// Persist `patch`, then fetch the campaign's listing again.
pub(crate) async fn save_and_relist(
    api: Arc<dyn CampaignService>,
    campaign_id: CampaignId,
    email_id: EmailId,
    patch: EmailPatch,
) -> ServiceResult<Vec<EmailDraft>> {
    let updated = api.update_email(email_id, &patch).await?;
    tracing::debug!(email_id = %updated.id, status = %updated.status, "Draft saved");
    api.list_emails(campaign_id, None).await
}

#[derive(Debug, Clone)]
pub struct DraftBoard {
    partition: DraftPartition,
    drafts: Vec<EmailDraft>,
    selected: Option<EmailId>,
    editing: Option<EmailDraft>,
}

impl DraftBoard {
    pub fn new(partition: DraftPartition) -> Self {
        Self {
            partition,
            drafts: Vec::new(),
            selected: None,
            editing: None,
        }
    }

    pub fn partition(&self) -> DraftPartition {
        self.partition
    }

    pub fn drafts(&self) -> &[EmailDraft] {
        &self.drafts
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Swap in a fresh server listing.
    ///
    /// Drafts outside the partition are dropped. The edit copy is reset to
    /// the server's version of whatever ends up selected.
    pub fn replace(&mut self, drafts: Vec<EmailDraft>) {
        self.drafts = self.partition.filter(drafts);
        let selected = reconcile_selection(&self.drafts, self.selected);
        self.set_selected(selected);
    }

    pub fn select(&mut self, id: EmailId) -> Result<(), StageError> {
        if !self.drafts.iter().any(|d| d.id == id) {
            return Err(StageError::NoSelection);
        }
        self.set_selected(Some(id));
        Ok(())
    }

    pub fn selected_id(&self) -> Option<EmailId> {
        self.selected
    }

    /// Server copy of the selected draft.
    pub fn selected(&self) -> Option<&EmailDraft> {
        let id = self.selected?;
        self.drafts.iter().find(|d| d.id == id)
    }

    /// Local copy of the selected draft, including unsaved edits.
    pub fn editing(&self) -> Option<&EmailDraft> {
        self.editing.as_ref()
    }

    pub fn edit_subject(&mut self, subject: &str) -> Result<(), StageError> {
        let draft = self.editing.as_mut().ok_or(StageError::NoSelection)?;
        draft.subject = subject.to_string();
        Ok(())
    }

    pub fn edit_body(&mut self, body_text: &str) -> Result<(), StageError> {
        let draft = self.editing.as_mut().ok_or(StageError::NoSelection)?;
        draft.body_text = body_text.to_string();
        Ok(())
    }

    /// The local copy differs from the server copy.
    pub fn is_dirty(&self) -> bool {
        match (self.editing.as_ref(), self.selected()) {
            (Some(local), Some(server)) => {
                local.subject != server.subject || local.body_text != server.body_text
            }
            _ => false,
        }
    }

    /// Patch that persists the edit copy: subject and body, plus `status`
    /// when given.
    pub fn pending_patch(
        &self,
        status: Option<EmailStatus>,
    ) -> Result<(EmailId, EmailPatch), StageError> {
        let draft = self.editing.as_ref().ok_or(StageError::NoSelection)?;
        let patch = EmailPatch::content_of(draft);
        let patch = match status {
            Some(status) => patch.with_status(status),
            None => patch,
        };
        Ok((draft.id, patch))
    }

    fn set_selected(&mut self, id: Option<EmailId>) {
        self.selected = id;
        self.editing = self.selected().cloned();
    }
}
