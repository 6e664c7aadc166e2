use crate::config::QualityConfig;
use crate::encode::probe::MediaProbe;
use crate::render::format::RenderFormat;

/// Outcome of the quality gate for one output file.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GateVerdict {
    /// No issues found.
    pub passed: bool,
    /// Human readable reasons the output is not publish-ready.
    pub issues: Vec<String>,
}

/// Check a probed output against the declared formats and acceptance bounds.
///
/// `target_secs` is the script's target duration, or the planned duration when the script
/// declares none.
pub fn evaluate_gate(
    probe: &MediaProbe,
    accepted: &[RenderFormat],
    target_secs: f64,
    q: &QualityConfig,
) -> GateVerdict {
    let mut issues = Vec::new();

    if !accepted
        .iter()
        .any(|f| f.width == probe.width && f.height == probe.height)
    {
        issues.push(format!(
            "resolution {}x{} matches no declared render format",
            probe.width, probe.height
        ));
    }

    if target_secs > 0.0 {
        let lo = target_secs * (1.0 - q.duration_tolerance);
        let hi = target_secs * (1.0 + q.duration_tolerance);
        if probe.duration_secs < lo || probe.duration_secs > hi {
            issues.push(format!(
                "duration {:.2}s outside {lo:.2}..{hi:.2}s (target {target_secs:.2}s +/- {:.0}%)",
                probe.duration_secs,
                q.duration_tolerance * 100.0
            ));
        }
    }
    if let Some(min) = q.min_duration_seconds
        && probe.duration_secs < min
    {
        issues.push(format!(
            "duration {:.2}s below minimum {min:.2}s",
            probe.duration_secs
        ));
    }
    if let Some(max) = q.max_duration_seconds
        && probe.duration_secs > max
    {
        issues.push(format!(
            "duration {:.2}s above maximum {max:.2}s",
            probe.duration_secs
        ));
    }

    if probe.size_bytes < q.min_file_bytes {
        issues.push(format!(
            "file size {} bytes below minimum {}",
            probe.size_bytes, q.min_file_bytes
        ));
    }
    if probe.size_bytes > q.max_file_bytes {
        issues.push(format!(
            "file size {} bytes above maximum {}",
            probe.size_bytes, q.max_file_bytes
        ));
    }

    if !probe.has_audio {
        issues.push("no audio stream".to_string());
    }

    GateVerdict {
        passed: issues.is_empty(),
        issues,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/gate.rs"]
mod tests;
