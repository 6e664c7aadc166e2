//! Symbolic position slots to output pixels.

/// Location catalog and slot resolution.
pub mod positions;
