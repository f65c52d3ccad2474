use std::time::Duration;

use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;

/// Structured events for one refresh cycle, correlated by a per-cycle id.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    cycle_id: Uuid,
    context: String,
}

impl RefreshTelemetry {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            context: context.into(),
        }
    }

    pub fn cycle_id(&self) -> Uuid {
        self.cycle_id
    }

    pub fn emit_start(&self, attempt: u32) {
        event!(
            Level::INFO,
            cycle_id = %self.cycle_id,
            context = %self.context,
            attempt,
            "refresh.start"
        );
    }

    pub fn emit_retry(&self, attempt: u32, error: &Error) {
        event!(
            Level::WARN,
            cycle_id = %self.cycle_id,
            context = %self.context,
            attempt,
            error = %error,
            "refresh.retry"
        );
    }

    pub fn emit_success(&self, attempt: u32, parked: usize) {
        event!(
            Level::INFO,
            cycle_id = %self.cycle_id,
            context = %self.context,
            attempt,
            parked,
            "refresh.success"
        );
    }

    pub fn emit_exhausted(&self, attempts: u32, parked: usize) {
        event!(
            Level::ERROR,
            cycle_id = %self.cycle_id,
            context = %self.context,
            attempts,
            parked,
            "refresh.exhausted"
        );
    }
}

/// Summary of one replay pass over the pending queue.
#[derive(Debug, Clone)]
pub struct DrainOutcome {
    pub parked: usize,
    pub reissued: usize,
    pub total_delay: Duration,
}

impl DrainOutcome {
    pub fn log(&self) {
        event!(
            Level::INFO,
            parked = self.parked,
            reissued = self.reissued,
            total_delay_ms = self.total_delay.as_millis() as u64,
            "drain.outcome"
        );
    }
}
