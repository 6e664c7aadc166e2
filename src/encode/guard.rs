//! Cancellation token and per-render wall-clock budget.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::foundation::error::{ReelError, ReelResult};

/// Cooperative cancellation flag shared between a caller and a render.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wall-clock budget plus cancellation, checked between frames and while waiting on `ffmpeg`.
#[derive(Clone, Debug)]
pub struct RenderGuard {
    cancel: CancelToken,
    started: Instant,
    budget: Option<Duration>,
}

impl RenderGuard {
    /// Guard starting now. A non-positive or non-finite budget disables the timeout.
    pub fn new(cancel: CancelToken, budget_secs: f64) -> Self {
        let budget = (budget_secs.is_finite() && budget_secs > 0.0)
            .then(|| Duration::from_secs_f64(budget_secs));
        Self {
            cancel,
            started: Instant::now(),
            budget,
        }
    }

    /// Guard with no budget that can only be cancelled.
    pub fn unbounded(cancel: CancelToken) -> Self {
        Self::new(cancel, 0.0)
    }

    /// Instant after which the render is over budget.
    pub fn deadline(&self) -> Option<Instant> {
        self.budget.map(|b| self.started + b)
    }

    /// Cancellation token.
    pub fn token(&self) -> &CancelToken {
        &self.cancel
    }

    /// `Cancelled` or `Timeout` when the render must stop.
    pub fn check(&self) -> ReelResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ReelError::Cancelled);
        }
        if let Some(budget) = self.budget
            && self.started.elapsed() > budget
        {
            return Err(ReelError::Timeout {
                seconds: budget.as_secs_f64(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/guard.rs"]
mod tests;
