//! Preview/Confirm stage: review the uploaded rows and create the campaign.

use crate::nav::Stage;
use crate::session::WorkflowContext;
use crate::stages::{Completion, Gate, Pending, Settled, StageError, StageScope};
use outreach_core::{Campaign, CampaignDraftMetadata, ContactRow};

#[derive(Debug)]
pub struct PreviewStage {
    ctx: WorkflowContext,
    scope: StageScope,
    rows: Option<Vec<ContactRow>>,
    metadata: Option<CampaignDraftMetadata>,
    campaign: Option<Campaign>,
}

impl PreviewStage {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            ctx,
            scope: StageScope::new(Stage::Preview),
            rows: None,
            metadata: None,
            campaign: None,
        }
    }

    /// Loads the relayed rows and campaign details from the store.
    pub fn enter(&mut self) -> Gate {
        self.scope.enter();
        self.rows = self.ctx.store().preview_rows();
        self.metadata = self.ctx.store().draft_metadata();
        self.campaign = None;
        self.ctx.gate(Stage::Preview)
    }

    pub fn leave(&mut self) {
        self.scope.leave();
    }

    pub fn is_busy(&self) -> bool {
        self.scope.is_busy()
    }

    pub fn rows(&self) -> &[ContactRow] {
        self.rows.as_deref().unwrap_or_default()
    }

    pub fn metadata(&self) -> Option<&CampaignDraftMetadata> {
        self.metadata.as_ref()
    }

    pub fn campaign(&self) -> Option<&Campaign> {
        self.campaign.as_ref()
    }

    pub fn next_stage(&self) -> Option<Stage> {
        self.campaign.as_ref().map(|_| Stage::Generate)
    }

    pub fn begin_confirm(&mut self) -> Result<Pending<Campaign>, StageError> {
        let started = self.start_confirm();
        started.map_err(|e| self.ctx.fail(Stage::Preview, e))
    }

    fn start_confirm(&mut self) -> Result<Pending<Campaign>, StageError> {
        let rows = self.rows.clone().ok_or(StageError::MissingPreview)?;
        let metadata = self.metadata.clone().ok_or(StageError::MissingMetadata)?;
        let ticket = self.scope.begin()?;
        let api = self.ctx.api();
        Ok(Pending::new(ticket, async move {
            api.confirm_campaign(&metadata, &rows).await
        }))
    }

    /// On success the campaign id replaces the relayed rows and details,
    /// which are consumed by confirmation.
    pub fn complete_confirm(&mut self, done: Completion<Campaign>) -> Result<Settled, StageError> {
        if self.scope.settle(done.ticket) == Settled::Discarded {
            return Ok(Settled::Discarded);
        }
        let campaign = done
            .result
            .map_err(|e| self.ctx.fail(Stage::Preview, e.into()))?;
        self.commit(&campaign)
            .map_err(|e| self.ctx.fail(Stage::Preview, e))?;
        tracing::info!(campaign_id = %campaign.id, name = %campaign.name, "Campaign ready");
        self.ctx
            .success(format!("Campaign \"{}\" created", campaign.name));
        self.rows = None;
        self.metadata = None;
        self.campaign = Some(campaign);
        Ok(Settled::Applied)
    }

    pub async fn confirm(&mut self) -> Result<Settled, StageError> {
        let pending = self.begin_confirm()?;
        let done = pending.settle().await;
        self.complete_confirm(done)
    }

    fn commit(&self, campaign: &Campaign) -> Result<(), StageError> {
        self.ctx.store().commit_campaign(campaign.id)?;
        Ok(())
    }
}
