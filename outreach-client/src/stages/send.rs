//! Send stage: dispatch one sequence step of the confirmed campaign.

use crate::nav::Stage;
use crate::session::WorkflowContext;
use crate::stages::{Completion, Gate, Pending, Settled, StageError, StageScope};
use outreach_core::{step_label, validate_step_number, ErrorKind};
use serde::Serialize;

/// Steps offered by the selector. Confirmation creates this many.
pub const DEFAULT_STEP_COUNT: u32 = 3;

/// Outcome of the last send action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub step_number: u32,
    pub sent: u32,
}

#[derive(Debug)]
pub struct SendStage {
    ctx: WorkflowContext,
    scope: StageScope,
    step_number: u32,
    last_receipt: Option<SendReceipt>,
}

impl SendStage {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            ctx,
            scope: StageScope::new(Stage::Send),
            step_number: 1,
            last_receipt: None,
        }
    }

    pub fn enter(&mut self) -> Gate {
        self.scope.enter();
        self.ctx.gate(Stage::Send)
    }

    pub fn leave(&mut self) {
        self.scope.leave();
    }

    pub fn is_busy(&self) -> bool {
        self.scope.is_busy()
    }

    /// `(step number, label)` pairs for the step selector.
    pub fn step_options(&self) -> Vec<(u32, String)> {
        (1..=DEFAULT_STEP_COUNT).map(|n| (n, step_label(n))).collect()
    }

    pub fn step_number(&self) -> u32 {
        self.step_number
    }

    pub fn select_step(&mut self, step_number: u32) -> Result<(), StageError> {
        validate_step_number(step_number)
            .map_err(|e| self.ctx.fail(Stage::Send, e.into_service_error(ErrorKind::Send).into()))?;
        self.step_number = step_number;
        Ok(())
    }

    pub fn last_receipt(&self) -> Option<SendReceipt> {
        self.last_receipt
    }

    /// Start sending the selected step. The step is captured now; changing
    /// the selector afterwards does not affect this request.
    pub fn begin_send(&mut self) -> Result<Pending<SendReceipt>, StageError> {
        let started = self.start_send();
        started.map_err(|e| self.ctx.fail(Stage::Send, e))
    }

    fn start_send(&mut self) -> Result<Pending<SendReceipt>, StageError> {
        let campaign_id = self.ctx.require_campaign()?;
        let ticket = self.scope.begin()?;
        let step_number = self.step_number;
        let api = self.ctx.api();
        tracing::info!(campaign_id = %campaign_id, step_number, "Sending step");
        Ok(Pending::new(ticket, async move {
            let sent = api.send_step(campaign_id, step_number).await?;
            Ok(SendReceipt { step_number, sent })
        }))
    }

    pub fn complete_send(&mut self, done: Completion<SendReceipt>) -> Result<Settled, StageError> {
        if self.scope.settle(done.ticket) == Settled::Discarded {
            return Ok(Settled::Discarded);
        }
        let receipt = done
            .result
            .map_err(|e| self.ctx.fail(Stage::Send, e.into()))?;
        self.ctx.success(format!(
            "Sent {} email(s) for {}",
            receipt.sent,
            step_label(receipt.step_number)
        ));
        self.last_receipt = Some(receipt);
        Ok(Settled::Applied)
    }

    pub async fn send(&mut self) -> Result<Settled, StageError> {
        let pending = self.begin_send()?;
        let done = pending.settle().await;
        self.complete_send(done)
    }
}
