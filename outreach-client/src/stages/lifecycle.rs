//! Enter/leave lifecycle and in-flight request tracking for stage controllers.
//!
//! A controller hands out one [`Ticket`] per user action. The ticket is only
//! honoured if the stage is still entered and no enter/leave happened since it
//! was issued; otherwise the settled result is dropped without side effects.

use crate::nav::Stage;
use crate::stages::StageError;
use futures_util::future::BoxFuture;
use outreach_core::ServiceResult;
use std::future::Future;

/// Proof that an action was started in a particular stage generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    stage: Stage,
    generation: u64,
}

impl Ticket {
    pub fn stage(&self) -> Stage {
        self.stage
    }
}

/// Whether a settled result was applied to controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Applied,
    /// The stage was left (or re-entered) while the request was in flight.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct StageScope {
    stage: Stage,
    generation: u64,
    entered: bool,
    in_flight: Option<Ticket>,
}

impl StageScope {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            generation: 0,
            entered: false,
            in_flight: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn enter(&mut self) {
        self.generation += 1;
        self.entered = true;
        self.in_flight = None;
        tracing::debug!(stage = ?self.stage, generation = self.generation, "Stage entered");
    }

    pub fn leave(&mut self) {
        if self.in_flight.is_some() {
            tracing::debug!(stage = ?self.stage, "Leaving stage with request in flight");
        }
        self.generation += 1;
        self.entered = false;
        self.in_flight = None;
        tracing::debug!(stage = ?self.stage, generation = self.generation, "Stage left");
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }

    /// A request is pending; the triggering control should be disabled.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Claim the single in-flight slot for a new action.
    pub fn begin(&mut self) -> Result<Ticket, StageError> {
        if !self.entered {
            return Err(StageError::NotEntered(self.stage));
        }
        if self.in_flight.is_some() {
            return Err(StageError::InFlight(self.stage));
        }
        let ticket = Ticket {
            stage: self.stage,
            generation: self.generation,
        };
        self.in_flight = Some(ticket);
        Ok(ticket)
    }

    /// Release the slot if `ticket` is still current.
    pub fn settle(&mut self, ticket: Ticket) -> Settled {
        if self.entered && self.in_flight == Some(ticket) {
            self.in_flight = None;
            Settled::Applied
        } else {
            tracing::debug!(
                stage = ?self.stage,
                ticket_generation = ticket.generation,
                generation = self.generation,
                "Discarding stale result"
            );
            Settled::Discarded
        }
    }
}

/// A started action: its ticket plus the detached request future.
///
/// The future owns everything it needs, so the caller may drive it on any
/// executor and hand the [`Completion`] back later.
pub struct Pending<T> {
    ticket: Ticket,
    future: BoxFuture<'static, ServiceResult<T>>,
}

impl<T> Pending<T> {
    pub(crate) fn new<F>(ticket: Ticket, future: F) -> Self
    where
        F: Future<Output = ServiceResult<T>> + Send + 'static,
    {
        Self {
            ticket,
            future: Box::pin(future),
        }
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Drive the request to completion.
    pub async fn settle(self) -> Completion<T> {
        let result = self.future.await;
        Completion {
            ticket: self.ticket,
            result,
        }
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending").field("ticket", &self.ticket).finish()
    }
}

/// A settled request waiting to be applied by its controller.
#[derive(Debug)]
pub struct Completion<T> {
    pub ticket: Ticket,
    pub result: ServiceResult<T>,
}
