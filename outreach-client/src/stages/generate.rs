//! Generate/Edit stage: request sequence drafts and edit them one at a time.

use crate::nav::Stage;
use crate::notifications::NotificationLevel;
use crate::session::WorkflowContext;
use crate::stages::drafts::save_and_relist;
use crate::stages::{
    Completion, DraftBoard, DraftPartition, Gate, Pending, Settled, StageError, StageScope,
};
use outreach_core::{Contact, ContactId, EmailDraft, ServiceResult};
use std::collections::BTreeSet;

/// Contacts and drafts fetched together when the stage loads.
#[derive(Debug)]
pub struct GenerateListing {
    pub contacts: ServiceResult<Vec<Contact>>,
    pub drafts: Vec<EmailDraft>,
}

#[derive(Debug)]
pub struct GenerateStage {
    ctx: WorkflowContext,
    scope: StageScope,
    contacts: Vec<Contact>,
    selected_contacts: BTreeSet<ContactId>,
    board: DraftBoard,
}

impl GenerateStage {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            ctx,
            scope: StageScope::new(Stage::Generate),
            contacts: Vec::new(),
            selected_contacts: BTreeSet::new(),
            board: DraftBoard::new(DraftPartition::Sequence),
        }
    }

    pub fn enter(&mut self) -> Gate {
        self.scope.enter();
        self.ctx.gate(Stage::Generate)
    }

    pub fn leave(&mut self) {
        self.scope.leave();
    }

    pub fn is_busy(&self) -> bool {
        self.scope.is_busy()
    }

    pub fn board(&self) -> &DraftBoard {
        &self.board
    }

    /// Selection and local edits. Nothing here touches the network.
    pub fn board_mut(&mut self) -> &mut DraftBoard {
        &mut self.board
    }

    // ------------------------------------------------------------------------
    // Contact selection
    // ------------------------------------------------------------------------

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn selected_contacts(&self) -> Vec<ContactId> {
        self.selected_contacts.iter().copied().collect()
    }

    /// Flip `contact_id` in or out of the generation target set.
    pub fn toggle_contact(&mut self, contact_id: ContactId) -> bool {
        if self.selected_contacts.remove(&contact_id) {
            false
        } else {
            self.selected_contacts.insert(contact_id);
            true
        }
    }

    /// Empty selection means every contact of the campaign.
    pub fn clear_contact_selection(&mut self) {
        self.selected_contacts.clear();
    }

    // ------------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------------

    pub fn begin_load(&mut self) -> Result<Pending<GenerateListing>, StageError> {
        let started = self.start_load();
        started.map_err(|e| self.ctx.fail(Stage::Generate, e))
    }

    fn start_load(&mut self) -> Result<Pending<GenerateListing>, StageError> {
        let campaign_id = self.ctx.require_campaign()?;
        let ticket = self.scope.begin()?;
        let api = self.ctx.api();
        Ok(Pending::new(ticket, async move {
            let contacts = api.list_contacts().await;
            let drafts = api.list_emails(campaign_id, None).await?;
            Ok(GenerateListing { contacts, drafts })
        }))
    }

    pub fn complete_load(&mut self, done: Completion<GenerateListing>) -> Result<Settled, StageError> {
        if self.scope.settle(done.ticket) == Settled::Discarded {
            return Ok(Settled::Discarded);
        }
        let listing = done
            .result
            .map_err(|e| self.ctx.fail(Stage::Generate, e.into()))?;
        match listing.contacts {
            Ok(contacts) => {
                self.selected_contacts
                    .retain(|id| contacts.iter().any(|c| c.id == Some(*id)));
                self.contacts = contacts;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Contact list unavailable; generating for all contacts");
                self.ctx.notifications().notify(
                    NotificationLevel::Warning,
                    format!("Could not load contacts: {}", err.message),
                );
            }
        }
        self.board.replace(listing.drafts);
        Ok(Settled::Applied)
    }

    pub async fn load(&mut self) -> Result<Settled, StageError> {
        let pending = self.begin_load()?;
        let done = pending.settle().await;
        self.complete_load(done)
    }

    // ------------------------------------------------------------------------
    // Generate
    // ------------------------------------------------------------------------

    /// Request drafts for the selected contacts (or all), then re-list.
    pub fn begin_generate(&mut self) -> Result<Pending<Vec<EmailDraft>>, StageError> {
        let started = self.start_generate();
        started.map_err(|e| self.ctx.fail(Stage::Generate, e))
    }

    fn start_generate(&mut self) -> Result<Pending<Vec<EmailDraft>>, StageError> {
        let campaign_id = self.ctx.require_campaign()?;
        let ticket = self.scope.begin()?;
        let contact_ids = self.selected_contacts();
        let api = self.ctx.api();
        tracing::info!(campaign_id = %campaign_id, contacts = contact_ids.len(), "Generating sequence");
        Ok(Pending::new(ticket, async move {
            let target = (!contact_ids.is_empty()).then_some(contact_ids.as_slice());
            api.generate_sequence(campaign_id, target).await?;
            api.list_emails(campaign_id, None).await
        }))
    }

    pub fn complete_generate(
        &mut self,
        done: Completion<Vec<EmailDraft>>,
    ) -> Result<Settled, StageError> {
        if self.scope.settle(done.ticket) == Settled::Discarded {
            return Ok(Settled::Discarded);
        }
        let drafts = done
            .result
            .map_err(|e| self.ctx.fail(Stage::Generate, e.into()))?;
        self.board.replace(drafts);
        self.ctx
            .success(format!("{} draft(s) ready", self.board.drafts().len()));
        Ok(Settled::Applied)
    }

    pub async fn generate(&mut self) -> Result<Settled, StageError> {
        let pending = self.begin_generate()?;
        let done = pending.settle().await;
        self.complete_generate(done)
    }

    // ------------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------------

    /// Persist subject and body of the selected draft, then re-list.
    pub fn begin_save(&mut self) -> Result<Pending<Vec<EmailDraft>>, StageError> {
        let started = self.start_save();
        started.map_err(|e| self.ctx.fail(Stage::Generate, e))
    }

    fn start_save(&mut self) -> Result<Pending<Vec<EmailDraft>>, StageError> {
        let campaign_id = self.ctx.require_campaign()?;
        let (email_id, patch) = self.board.pending_patch(None)?;
        let ticket = self.scope.begin()?;
        let api = self.ctx.api();
        Ok(Pending::new(
            ticket,
            save_and_relist(api, campaign_id, email_id, patch),
        ))
    }

    pub fn complete_save(&mut self, done: Completion<Vec<EmailDraft>>) -> Result<Settled, StageError> {
        if self.scope.settle(done.ticket) == Settled::Discarded {
            return Ok(Settled::Discarded);
        }
        let drafts = done
            .result
            .map_err(|e| self.ctx.fail(Stage::Generate, e.into()))?;
        self.board.replace(drafts);
        self.ctx.success("Draft saved");
        Ok(Settled::Applied)
    }

    pub async fn save(&mut self) -> Result<Settled, StageError> {
        let pending = self.begin_save()?;
        let done = pending.settle().await;
        self.complete_save(done)
    }
}
