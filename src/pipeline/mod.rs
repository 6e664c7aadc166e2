//! Render orchestration: the per-invocation state machine, the quality gate, and the
//! orchestrator that drives assets, audio, and encoding for every render format.

/// Output acceptance checks.
pub mod gate;
/// Asset check, mixing, per-format encoding with retries, and reporting.
pub mod orchestrator;
/// Render lifecycle states and legal transitions.
pub mod state;
