//! One orchestrator session: the shared context handed to every stage
//! controller, plus explicit init and teardown.

use crate::api_client::{CampaignService, RestClient};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::nav::Stage;
use crate::notifications::{Notification, NotificationAction, NotificationCenter, NotificationLevel};
use crate::persistence::{StoreError, WorkflowStore};
use crate::stages::{
    gate_for, Gate, GenerateStage, IngestStage, PreviewStage, RepliesStage, SendStage, StageError,
    StatusStage,
};
use outreach_core::CampaignId;
use std::sync::Arc;

/// Collaborators shared by all stage controllers of one session.
#[derive(Clone)]
pub struct WorkflowContext {
    api: Arc<dyn CampaignService>,
    store: Arc<WorkflowStore>,
    notifications: Arc<NotificationCenter>,
}

impl WorkflowContext {
    pub fn new(
        api: Arc<dyn CampaignService>,
        store: Arc<WorkflowStore>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        Self {
            api,
            store,
            notifications,
        }
    }

    pub fn api(&self) -> Arc<dyn CampaignService> {
        Arc::clone(&self.api)
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn gate(&self, stage: Stage) -> Gate {
        gate_for(stage, &self.store)
    }

    /// The confirmed campaign, or the missing-campaign guard.
    pub fn require_campaign(&self) -> Result<CampaignId, StageError> {
        self.store.campaign_id().ok_or(StageError::MissingCampaign)
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notifications.notify(NotificationLevel::Success, message);
    }

    /// Surface a failed action to the user and hand the error back.
    pub fn fail(&self, stage: Stage, err: StageError) -> StageError {
        let notification = match &err {
            e if e.is_guard() => {
                let notification = Notification::new(NotificationLevel::Warning, e.to_string());
                match stage.fallback() {
                    Some(to) => notification.with_action(NotificationAction::GoBack(to)),
                    None => notification,
                }
            }
            StageError::Service(service) => {
                tracing::warn!(stage = ?stage, kind = %service.kind, message = %service.message, "Stage action failed");
                Notification::new(NotificationLevel::Error, service.to_string())
                    .with_action(NotificationAction::Retry)
            }
            StageError::Store(store) => {
                tracing::error!(stage = ?stage, error = %store, "Workflow store write failed");
                Notification::new(NotificationLevel::Error, err.to_string())
                    .with_action(NotificationAction::Retry)
            }
            StageError::InFlight(_) | StageError::NotEntered(_) => {
                tracing::debug!(stage = ?stage, error = %err, "Action ignored");
                Notification::new(NotificationLevel::Info, err.to_string())
            }
            _ => Notification::new(NotificationLevel::Warning, err.to_string())
                .with_action(NotificationAction::Dismiss),
        };
        self.notifications.push(notification);
        err
    }
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("session_id", &self.store.session_id())
            .finish_non_exhaustive()
    }
}

/// Explicit owner of a session's lifetime.
#[derive(Debug, Clone)]
pub struct WorkflowSession {
    ctx: WorkflowContext,
}

impl WorkflowSession {
    /// Open the REST-backed session `session_id` described by `config`.
    pub fn init(config: &ClientConfig, session_id: &str) -> Result<Self, ClientError> {
        let api = RestClient::new(config)?;
        let store = WorkflowStore::open(&config.session_dir, session_id)?;
        tracing::info!(
            session_id,
            api_base_url = %api.base_url(),
            "Workflow session started"
        );
        Ok(Self::with_service(Arc::new(api), store))
    }

    pub fn with_service(api: Arc<dyn CampaignService>, store: WorkflowStore) -> Self {
        Self {
            ctx: WorkflowContext::new(api, Arc::new(store), Arc::new(NotificationCenter::new())),
        }
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.ctx
    }

    pub fn session_id(&self) -> &str {
        self.ctx.store().session_id()
    }

    pub fn store(&self) -> &WorkflowStore {
        self.ctx.store()
    }

    pub fn notifications(&self) -> &NotificationCenter {
        self.ctx.notifications()
    }

    pub fn gate(&self, stage: Stage) -> Gate {
        self.ctx.gate(stage)
    }

    pub fn ingest(&self) -> IngestStage {
        IngestStage::new(self.ctx.clone())
    }

    pub fn preview(&self) -> PreviewStage {
        PreviewStage::new(self.ctx.clone())
    }

    pub fn generate(&self) -> GenerateStage {
        GenerateStage::new(self.ctx.clone())
    }

    pub fn send(&self) -> SendStage {
        SendStage::new(self.ctx.clone())
    }

    pub fn status(&self) -> StatusStage {
        StatusStage::new(self.ctx.clone())
    }

    pub fn replies(&self) -> RepliesStage {
        RepliesStage::new(self.ctx.clone())
    }

    /// End the session: forget every relayed artifact and delete its file.
    pub fn teardown(self) -> Result<(), StoreError> {
        self.ctx.store().destroy()?;
        tracing::info!(session_id = self.session_id(), "Workflow session ended");
        Ok(())
    }
}
