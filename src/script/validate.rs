use crate::foundation::error::{ReelError, ReelResult};
use crate::script::model::{CameraState, Scene, Script};

/// Fail fast on malformed scripts, naming the offending field path.
pub(crate) fn validate_script(script: &Script) -> ReelResult<()> {
    if script.episode_id.trim().is_empty() {
        return Err(ReelError::script("episode_id", "must be non-empty"));
    }
    if let Some(t) = script.target_duration_seconds
        && !(t.is_finite() && t > 0.0)
    {
        return Err(ReelError::script(
            "target_duration_seconds",
            "must be finite and > 0",
        ));
    }
    if script.scenes.is_empty() {
        return Err(ReelError::script("scenes", "at least one scene is required"));
    }
    for (i, scene) in script.scenes.iter().enumerate() {
        validate_scene(scene, &format!("scenes[{i}]"))?;
    }
    if let Some(d) = script.end_card.duration_seconds
        && !(d.is_finite() && d >= 0.0)
    {
        return Err(ReelError::script(
            "end_card.duration_seconds",
            "must be finite and >= 0",
        ));
    }
    Ok(())
}

fn validate_scene(scene: &Scene, at: &str) -> ReelResult<()> {
    if scene.background.trim().is_empty() {
        return Err(ReelError::script(
            format!("{at}.background"),
            "location identifier is required",
        ));
    }
    match scene.duration_seconds {
        None => {
            return Err(ReelError::script(
                format!("{at}.duration_seconds"),
                "is required",
            ));
        }
        Some(d) if !(d.is_finite() && d > 0.0) => {
            return Err(ReelError::script(
                format!("{at}.duration_seconds"),
                format!("must be finite and > 0, got {d}"),
            ));
        }
        Some(_) => {}
    }

    for (j, c) in scene.characters_present.iter().enumerate() {
        if c.trim().is_empty() {
            return Err(ReelError::script(
                format!("{at}.characters_present[{j}]"),
                "character identifier must be non-empty",
            ));
        }
        match scene.character_positions.get(c) {
            Some(slot) if !slot.trim().is_empty() => {}
            _ => {
                return Err(ReelError::script(
                    format!("{at}.character_positions.{c}"),
                    "every present character needs a position slot",
                ));
            }
        }
    }

    for (j, line) in scene.dialogue.iter().enumerate() {
        let at = format!("{at}.dialogue[{j}]");
        if line.character.trim().is_empty() {
            return Err(ReelError::script(
                format!("{at}.character"),
                "speaker identifier is required",
            ));
        }
        if line.text.is_none() {
            return Err(ReelError::script(format!("{at}.text"), "is required"));
        }
        if let Some(cps) = line.cps
            && !(cps.is_finite() && cps > 0.0)
        {
            return Err(ReelError::script(
                format!("{at}.cps"),
                "must be finite and > 0",
            ));
        }
        if let Some(h) = line.hold_seconds
            && !(h.is_finite() && h >= 0.0)
        {
            return Err(ReelError::script(
                format!("{at}.hold_seconds"),
                "must be finite and >= 0",
            ));
        }
    }

    for (j, sfx) in scene.sfx_triggers.iter().enumerate() {
        if sfx.sfx.trim().is_empty() {
            return Err(ReelError::script(
                format!("{at}.sfx_triggers[{j}].sfx"),
                "sound identifier is required",
            ));
        }
        if sfx.time_ms.is_none()
            && let Some(timing) = sfx.timing.as_deref()
        {
            match sfx.dialogue_anchor() {
                Some(k) if k < scene.dialogue.len() => {}
                _ => {
                    return Err(ReelError::script(
                        format!("{at}.sfx_triggers[{j}].timing"),
                        format!(
                            "'{timing}' must be 'with_dialogue_N' with N in 1..={}",
                            scene.dialogue.len()
                        ),
                    ));
                }
            }
        }
    }

    if let Some(cam) = scene.camera {
        validate_camera(&cam.start, &format!("{at}.camera.start"))?;
        validate_camera(&cam.end_state(), &format!("{at}.camera.end"))?;
    }
    Ok(())
}

fn validate_camera(state: &CameraState, at: &str) -> ReelResult<()> {
    if !(state.x.is_finite() && state.y.is_finite()) {
        return Err(ReelError::script(at, "pan must be finite"));
    }
    if !(state.zoom.is_finite() && state.zoom > 0.0) {
        return Err(ReelError::script(
            format!("{at}.zoom"),
            "must be finite and > 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/script/validate.rs"]
mod tests;
