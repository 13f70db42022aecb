//! Campaign status: a read-only snapshot fetched on demand.

use crate::nav::Stage;
use crate::session::WorkflowContext;
use crate::stages::{Completion, Gate, Pending, Settled, StageError, StageScope};
use outreach_core::CampaignStatusSummary;

#[derive(Debug)]
pub struct StatusStage {
    ctx: WorkflowContext,
    scope: StageScope,
    summary: Option<CampaignStatusSummary>,
}

impl StatusStage {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            ctx,
            scope: StageScope::new(Stage::Status),
            summary: None,
        }
    }

    pub fn enter(&mut self) -> Gate {
        self.scope.enter();
        self.summary = None;
        self.ctx.gate(Stage::Status)
    }

    /// Drops the snapshot; it is never carried to another stage.
    pub fn leave(&mut self) {
        self.scope.leave();
        self.summary = None;
    }

    pub fn is_busy(&self) -> bool {
        self.scope.is_busy()
    }

    pub fn summary(&self) -> Option<&CampaignStatusSummary> {
        self.summary.as_ref()
    }

    pub fn begin_refresh(&mut self) -> Result<Pending<CampaignStatusSummary>, StageError> {
        let started = self.start_refresh();
        started.map_err(|e| self.ctx.fail(Stage::Status, e))
    }

    fn start_refresh(&mut self) -> Result<Pending<CampaignStatusSummary>, StageError> {
        let campaign_id = self.ctx.require_campaign()?;
        let ticket = self.scope.begin()?;
        let api = self.ctx.api();
        Ok(Pending::new(ticket, async move {
            api.campaign_status(campaign_id).await
        }))
    }

    pub fn complete_refresh(
        &mut self,
        done: Completion<CampaignStatusSummary>,
    ) -> Result<Settled, StageError> {
        if self.scope.settle(done.ticket) == Settled::Discarded {
            return Ok(Settled::Discarded);
        }
        let summary = done
            .result
            .map_err(|e| self.ctx.fail(Stage::Status, e.into()))?;
        tracing::debug!(total = summary.total_emails, sent = summary.sent, "Campaign status loaded");
        self.summary = Some(summary);
        Ok(Settled::Applied)
    }

    pub async fn refresh(&mut self) -> Result<Settled, StageError> {
        let pending = self.begin_refresh()?;
        let done = pending.settle().await;
        self.complete_refresh(done)
    }
}
