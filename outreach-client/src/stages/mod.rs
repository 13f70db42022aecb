//! Stage controllers for the campaign pipeline.
//!
//! There is no central state machine. Each controller checks its own entry
//! precondition against the workflow store, issues at most one request at a
//! time through the campaign service, and writes back whatever the next stage
//! needs. Once a campaign exists, Generate, Send, Status and Replies can be
//! visited in any order and as often as the user likes.

pub mod drafts;
pub mod generate;
pub mod ingest;
pub mod lifecycle;
pub mod preview;
pub mod replies;
pub mod send;
pub mod status;

pub use drafts::{reconcile_selection, DraftBoard, DraftPartition};
pub use generate::{GenerateListing, GenerateStage};
pub use ingest::{IngestStage, UploadOutcome};
pub use lifecycle::{Completion, Pending, Settled, StageScope, Ticket};
pub use preview::PreviewStage;
pub use replies::RepliesStage;
pub use send::{SendReceipt, SendStage, DEFAULT_STEP_COUNT};
pub use status::StatusStage;

use crate::nav::Stage;
use crate::persistence::{StoreError, WorkflowStore};
use outreach_core::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("No campaign selected. Go back to Preview and confirm contacts.")]
    MissingCampaign,
    #[error("No preview rows found. Go back to Upload.")]
    MissingPreview,
    #[error("No campaign details found. Go back to Upload.")]
    MissingMetadata,
    #[error("No contact file selected")]
    NoFile,
    #[error("No email selected")]
    NoSelection,
    #[error("{0} is not active")]
    NotEntered(Stage),
    #[error("{0} is still waiting on a previous request")]
    InFlight(Stage),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StageError {
    /// Precondition failures the user fixes by going back a stage.
    pub fn is_guard(&self) -> bool {
        matches!(
            self,
            StageError::MissingCampaign | StageError::MissingPreview | StageError::MissingMetadata
        )
    }

    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            StageError::Service(err) => Some(err),
            _ => None,
        }
    }
}

/// Result of checking a stage's entry precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Ready,
    GoBack { to: Stage, reason: String },
}

impl Gate {
    pub fn is_ready(&self) -> bool {
        matches!(self, Gate::Ready)
    }
}

/// Evaluate `stage`'s precondition from store contents alone.
pub fn gate_for(stage: Stage, store: &WorkflowStore) -> Gate {
    let blocked = match stage {
        Stage::Ingest => None,
        Stage::Preview => store.preview_rows().is_none().then_some(StageError::MissingPreview),
        Stage::Generate | Stage::Send | Stage::Status | Stage::Replies => {
            store.campaign_id().is_none().then_some(StageError::MissingCampaign)
        }
    };
    match (blocked, stage.fallback()) {
        (Some(err), Some(to)) => Gate::GoBack {
            to,
            reason: err.to_string(),
        },
        _ => Gate::Ready,
    }
}
