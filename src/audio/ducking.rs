/// Music attenuation under dialogue.
///
/// Inside a dialogue interval the offset is exactly `duck_db`. The ramp to and from that level
/// happens in the `fade_secs` just outside each interval, so the ducked level is reached by the
/// time the line starts and held until it ends.
#[derive(Clone, Debug, PartialEq)]
pub struct DuckingEnvelope {
    intervals: Vec<(f64, f64)>,
    duck_db: f32,
    fade_secs: f64,
}

impl DuckingEnvelope {
    /// Envelope over `[start, end)` second intervals. Overlapping intervals, and intervals whose
    /// ramps would overlap, are merged so the music never swells between back-to-back lines.
    pub fn new(intervals: &[(f64, f64)], duck_db: f32, fade_secs: f64) -> Self {
        let fade_secs = fade_secs.max(0.0);
        let mut sorted: Vec<(f64, f64)> = intervals
            .iter()
            .copied()
            .filter(|(s, e)| s.is_finite() && e.is_finite() && e > s)
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut merged: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
        for (s, e) in sorted {
            match merged.last_mut() {
                Some(last) if s <= last.1 + 2.0 * fade_secs => last.1 = last.1.max(e),
                _ => merged.push((s, e)),
            }
        }
        Self {
            intervals: merged,
            duck_db,
            fade_secs,
        }
    }

    /// Merged intervals.
    pub fn intervals(&self) -> &[(f64, f64)] {
        &self.intervals
    }

    /// Configured offset in dB.
    pub fn duck_db(&self) -> f32 {
        self.duck_db
    }

    /// Fraction of the full duck applied at `t` seconds, in `[0, 1]`.
    pub fn weight_at(&self, t: f64) -> f64 {
        let mut w = 0.0f64;
        for &(s, e) in &self.intervals {
            let v = if t >= s && t < e {
                1.0
            } else if self.fade_secs > 0.0 && t < s && t >= s - self.fade_secs {
                1.0 - (s - t) / self.fade_secs
            } else if self.fade_secs > 0.0 && t >= e && t < e + self.fade_secs {
                1.0 - (t - e) / self.fade_secs
            } else {
                0.0
            };
            w = w.max(v);
            if s > t + self.fade_secs {
                break;
            }
        }
        w.clamp(0.0, 1.0)
    }

    /// Offset in dB applied to the music at `t` seconds (zero or negative).
    pub fn offset_db_at(&self, t: f64) -> f32 {
        let w = self.weight_at(t);
        if w >= 1.0 {
            self.duck_db
        } else {
            self.duck_db * w as f32
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/ducking.rs"]
mod tests;
