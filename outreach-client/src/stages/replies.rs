//! Replies stage: review AI-drafted answers to inbound mail and mark them sent.

use crate::nav::Stage;
use crate::session::WorkflowContext;
use crate::stages::drafts::save_and_relist;
use crate::stages::{
    Completion, DraftBoard, DraftPartition, Gate, Pending, Settled, StageError, StageScope,
};
use outreach_core::{EmailDraft, EmailStatus};

#[derive(Debug)]
pub struct RepliesStage {
    ctx: WorkflowContext,
    scope: StageScope,
    board: DraftBoard,
}

impl RepliesStage {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            ctx,
            scope: StageScope::new(Stage::Replies),
            board: DraftBoard::new(DraftPartition::Replies),
        }
    }

    pub fn enter(&mut self) -> Gate {
        self.scope.enter();
        self.ctx.gate(Stage::Replies)
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

    pub fn board_mut(&mut self) -> &mut DraftBoard {
        &mut self.board
    }

    /// Fetch the unfiltered listing; the board keeps only replies.
    pub fn begin_load(&mut self) -> Result<Pending<Vec<EmailDraft>>, StageError> {
        let started = self.start_load();
        started.map_err(|e| self.ctx.fail(Stage::Replies, e))
    }

    fn start_load(&mut self) -> Result<Pending<Vec<EmailDraft>>, StageError> {
        let campaign_id = self.ctx.require_campaign()?;
        let ticket = self.scope.begin()?;
        let api = self.ctx.api();
        Ok(Pending::new(ticket, async move {
            api.list_emails(campaign_id, None).await
        }))
    }

    pub fn complete_load(&mut self, done: Completion<Vec<EmailDraft>>) -> Result<Settled, StageError> {
        self.apply_listing(done, None)
    }

    pub async fn load(&mut self) -> Result<Settled, StageError> {
        let pending = self.begin_load()?;
        let done = pending.settle().await;
        self.complete_load(done)
    }

    /// Save the edited reply with `status = sent`, then re-list.
    pub fn begin_mark_sent(&mut self) -> Result<Pending<Vec<EmailDraft>>, StageError> {
        let started = self.start_mark_sent();
        started.map_err(|e| self.ctx.fail(Stage::Replies, e))
    }

    fn start_mark_sent(&mut self) -> Result<Pending<Vec<EmailDraft>>, StageError> {
        let campaign_id = self.ctx.require_campaign()?;
        let (email_id, patch) = self.board.pending_patch(Some(EmailStatus::Sent))?;
        let ticket = self.scope.begin()?;
        let api = self.ctx.api();
        tracing::info!(email_id = %email_id, "Marking reply sent");
        Ok(Pending::new(
            ticket,
            save_and_relist(api, campaign_id, email_id, patch),
        ))
    }

    pub fn complete_mark_sent(
        &mut self,
        done: Completion<Vec<EmailDraft>>,
    ) -> Result<Settled, StageError> {
        self.apply_listing(done, Some("Reply marked as sent"))
    }

    pub async fn mark_sent(&mut self) -> Result<Settled, StageError> {
        let pending = self.begin_mark_sent()?;
        let done = pending.settle().await;
        self.complete_mark_sent(done)
    }

    fn apply_listing(
        &mut self,
        done: Completion<Vec<EmailDraft>>,
        success: Option<&str>,
    ) -> Result<Settled, StageError> {
        if self.scope.settle(done.ticket) == Settled::Discarded {
            return Ok(Settled::Discarded);
        }
        let drafts = done
            .result
            .map_err(|e| self.ctx.fail(Stage::Replies, e.into()))?;
        self.board.replace(drafts);
        if let Some(message) = success {
            self.ctx.success(message);
        }
        Ok(Settled::Applied)
    }
}
