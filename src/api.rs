//! # Public API
//!
//! Entry points that go from a YAML score document to resolved playback data.
//!
//! ## Functions
//!
//! - [`resolve()`] - Resolve one part with the default configuration
//! - [`resolve_with_config()`] - Resolve one part with custom easing steps
//! - [`playback_report()`] - Resolve and render every part of a score
//!
//! ## Typical Usage
//!
//! ```rust
//! use gen_playback::resolve;
//!
//! let source = r#"
//! parts:
//!   - { id: 1, start-track: 0, end-track: 4 }
//! measures:
//!   - tick: 0
//!     ticks: 1920
//!     segments:
//!       - tick: 0
//!         annotations:
//!           - { kind: dynamic, track: 0, part: 1, dynamic-type: pp }
//! "#;
//!
//! let ctx = resolve(source, 1)?;
//! assert_eq!(ctx.appliable_dynamic_level(0, 960), 3500);
//! # Ok::<(), gen_playback::PlaybackError>(())
//! ```

use serde::Serialize;
use std::sync::Arc;

use crate::playback::rendering::{render_part_events, ArticulationsProfile, NoteEvent};
use crate::playback::{ArticulationTimeline, DynamicLevelLayers, PlaybackParamMap};
use crate::{PartId, PlaybackContext, PlaybackError, ResolverConfig, Score};

/// Resolve one part of a YAML score document.
///
/// # Errors
/// Returns [`PlaybackError`] if the document cannot be read or the part does not exist.
pub fn resolve(source: &str, part: PartId) -> Result<PlaybackContext, PlaybackError> {
    resolve_with_config(source, part, ResolverConfig::default())
}

/// Resolve one part of a YAML score document with a custom configuration.
pub fn resolve_with_config(source: &str, part: PartId, config: ResolverConfig) -> Result<PlaybackContext, PlaybackError> {
    let score = Score::from_yaml(source)?;
    let mut ctx = PlaybackContext::with_config(config);
    ctx.update(part, &score)?;
    Ok(ctx)
}

/// Resolved playback data of one part, projected to real time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PartReport {
    pub part: PartId,
    pub name: String,
    pub dynamics: DynamicLevelLayers,
    pub articulations: ArticulationTimeline,
    pub params: PlaybackParamMap,
    pub events: Vec<NoteEvent>,
}

/// Resolve and render every part of `score`, in score order.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use gen_playback::{playback_report, ResolverConfig, Score};
/// use gen_playback::playback::rendering::ArticulationsProfile;
///
/// let score = Score::from_yaml(r#"
/// parts:
///   - { id: 1, name: Violin, start-track: 0, end-track: 4 }
/// measures:
///   - tick: 0
///     ticks: 1920
///     segments:
///       - tick: 0
///         notes:
///           - { track: 0, tpc: 14, octave: 4, duration-ticks: 1920 }
/// "#)?;
///
/// let report = playback_report(&score, ResolverConfig::default(), Arc::new(ArticulationsProfile::universal()))?;
/// assert_eq!(report[0].name, "Violin");
/// assert_eq!(report[0].events.len(), 1);
/// # Ok::<(), gen_playback::PlaybackError>(())
/// ```
pub fn playback_report(
    score: &Score,
    config: ResolverConfig,
    profile: Arc<ArticulationsProfile>,
) -> Result<Vec<PartReport>, PlaybackError> {
    let mut ctx = PlaybackContext::with_config(config);
    let mut reports = Vec::with_capacity(score.parts.len());

    for part in &score.parts {
        ctx.update(part.id, score)?;

        reports.push(PartReport {
            part: part.id,
            name: part.name.clone(),
            dynamics: ctx.dynamic_level_layers(score),
            articulations: ctx.articulation_map(score),
            params: ctx.playback_param_map(score),
            events: render_part_events(&ctx, score, part.id, Arc::clone(&profile))?,
        });
    }

    Ok(reports)
}
