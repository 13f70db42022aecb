//! Outreach campaign workflow client.
//!
//! Drives a remote campaign service through six stages (upload, preview and
//! confirm, generate and edit, send, status, replies), relaying artifacts
//! between stages through a session-scoped store.

pub mod api_client;
pub mod config;
pub mod error;
pub mod nav;
pub mod notifications;
pub mod persistence;
pub mod session;
pub mod stages;
pub mod telemetry;

pub use api_client::{CampaignService, RestClient, UploadFile};
pub use config::ClientConfig;
pub use error::ClientError;
pub use nav::Stage;
pub use persistence::{StoreError, StoreKey, WorkflowStore};
pub use session::{WorkflowContext, WorkflowSession};
pub use stages::{Gate, Settled, StageError};
