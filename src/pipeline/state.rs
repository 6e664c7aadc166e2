use crate::foundation::error::{ReelError, ReelResult};

/// Step within one render format's pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPhase {
    /// Frames are being composited.
    Composing,
    /// Frames are streaming into the encoder, or audio is being muxed.
    Encoding,
}

/// Where a render invocation is.
///
/// `Idle -> AssetCheck -> Rendering(format: Composing -> Encoding)... -> QualityGate -> Done`,
/// with `Failed` reachable from every non-terminal state.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RenderState {
    /// Nothing started.
    Idle,
    /// Validating the script and resolving assets (advisory).
    AssetCheck,
    /// Producing one render format.
    Rendering {
        /// Render format name.
        format: String,
        /// Current phase.
        phase: RenderPhase,
    },
    /// Probing outputs against the acceptance bounds.
    QualityGate,
    /// Every output passed the gate.
    Done,
    /// Fatal error, or at least one output failed the gate.
    Failed {
        /// Short cause.
        reason: String,
    },
}

impl RenderState {
    /// `Done` and `Failed` are final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: &RenderState) -> bool {
        use RenderState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Failed { .. }) => true,
            (Idle, AssetCheck) => true,
            (
                AssetCheck,
                Rendering {
                    phase: RenderPhase::Composing,
                    ..
                },
            ) => true,
            // Formats may run concurrently, so any format may report progress after any other.
            (Rendering { .. }, Rendering { .. }) => true,
            (
                Rendering {
                    phase: RenderPhase::Encoding,
                    ..
                },
                QualityGate,
            ) => true,
            (QualityGate, Done) => true,
            _ => false,
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Rendering { format, phase } => format!("rendering({format}, {phase:?})"),
            Self::Failed { reason } => format!("failed({reason})"),
            other => format!("{other:?}").to_lowercase(),
        }
    }
}

/// Validated sequence of [`RenderState`]s for one invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct StateMachine {
    current: RenderState,
    history: Vec<RenderState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Machine in [`RenderState::Idle`].
    pub fn new() -> Self {
        Self {
            current: RenderState::Idle,
            history: vec![RenderState::Idle],
        }
    }

    /// Current state.
    pub fn current(&self) -> &RenderState {
        &self.current
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[RenderState] {
        &self.history
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn advance(&mut self, next: RenderState) -> ReelResult<()> {
        if !self.current.can_transition_to(&next) {
            return Err(ReelError::Other(anyhow::anyhow!(
                "illegal render state transition {} -> {}",
                self.current.label(),
                next.label()
            )));
        }
        tracing::debug!(from = %self.current.label(), to = %next.label(), "render state");
        self.history.push(next.clone());
        self.current = next;
        Ok(())
    }

    /// Enter `Failed` unless already terminal.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.current.is_terminal() {
            let next = RenderState::Failed {
                reason: reason.into(),
            };
            self.history.push(next.clone());
            self.current = next;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/state.rs"]
mod tests;
