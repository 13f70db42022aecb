//! Ingest stage: campaign details form plus contact file upload.

use crate::api_client::UploadFile;
use crate::nav::Stage;
use crate::session::WorkflowContext;
use crate::stages::{Completion, Gate, Pending, Settled, StageError, StageScope};
use outreach_core::{CampaignDraftMetadata, IngestPreview};
use serde::Serialize;

/// What a successful upload relayed to the Preview stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub preview: IngestPreview,
    pub metadata: CampaignDraftMetadata,
}

#[derive(Debug)]
pub struct IngestStage {
    ctx: WorkflowContext,
    scope: StageScope,
    campaign_name: String,
    product_name: String,
    product_description: String,
    file: Option<UploadFile>,
    outcome: Option<UploadOutcome>,
}

impl IngestStage {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            ctx,
            scope: StageScope::new(Stage::Ingest),
            campaign_name: String::new(),
            product_name: String::new(),
            product_description: String::new(),
            file: None,
            outcome: None,
        }
    }

    pub fn enter(&mut self) -> Gate {
        self.scope.enter();
        self.outcome = None;
        self.ctx.gate(Stage::Ingest)
    }

    pub fn leave(&mut self) {
        self.scope.leave();
    }

    pub fn is_busy(&self) -> bool {
        self.scope.is_busy()
    }

    pub fn set_campaign_name(&mut self, value: &str) {
        self.campaign_name = value.to_string();
    }

    pub fn set_product_name(&mut self, value: &str) {
        self.product_name = value.to_string();
    }

    pub fn set_product_description(&mut self, value: &str) {
        self.product_description = value.to_string();
    }

    pub fn select_file(&mut self, file: UploadFile) {
        self.file = Some(file);
    }

    pub fn file(&self) -> Option<&UploadFile> {
        self.file.as_ref()
    }

    /// Form contents with blank fields defaulted.
    pub fn metadata(&self) -> CampaignDraftMetadata {
        CampaignDraftMetadata::from_form(
            &self.campaign_name,
            &self.product_name,
            &self.product_description,
        )
    }

    pub fn outcome(&self) -> Option<&UploadOutcome> {
        self.outcome.as_ref()
    }

    /// Where to go after a successful upload.
    pub fn next_stage(&self) -> Option<Stage> {
        self.outcome.as_ref().map(|_| Stage::Preview)
    }

    /// Start the upload. The form is captured now, not when the response lands.
    pub fn begin_upload(&mut self) -> Result<Pending<UploadOutcome>, StageError> {
        let started = self.start_upload();
        started.map_err(|e| self.ctx.fail(Stage::Ingest, e))
    }

    fn start_upload(&mut self) -> Result<Pending<UploadOutcome>, StageError> {
        let file = self.file.clone().ok_or(StageError::NoFile)?;
        let ticket = self.scope.begin()?;
        let metadata = self.metadata();
        let api = self.ctx.api();
        Ok(Pending::new(ticket, async move {
            let preview = api.ingest_contacts(&file).await?;
            Ok(UploadOutcome { preview, metadata })
        }))
    }

    pub fn complete_upload(&mut self, done: Completion<UploadOutcome>) -> Result<Settled, StageError> {
        if self.scope.settle(done.ticket) == Settled::Discarded {
            return Ok(Settled::Discarded);
        }
        let outcome = done
            .result
            .map_err(|e| self.ctx.fail(Stage::Ingest, e.into()))?;
        self.relay(&outcome)
            .map_err(|e| self.ctx.fail(Stage::Ingest, e))?;
        tracing::info!(
            rows = outcome.preview.preview_rows.len(),
            campaign_name = %outcome.metadata.campaign_name,
            "Upload relayed to preview"
        );
        self.ctx.success(format!(
            "Parsed {} contact(s)",
            outcome.preview.preview_rows.len()
        ));
        self.outcome = Some(outcome);
        Ok(Settled::Applied)
    }

    pub async fn upload(&mut self) -> Result<Settled, StageError> {
        let pending = self.begin_upload()?;
        let done = pending.settle().await;
        self.complete_upload(done)
    }

    fn relay(&self, outcome: &UploadOutcome) -> Result<(), StageError> {
        let store = self.ctx.store();
        store.set_preview_rows(&outcome.preview.preview_rows)?;
        store.set_draft_metadata(&outcome.metadata)?;
        Ok(())
    }
}
