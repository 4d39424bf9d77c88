//! Note event construction
//!
//! Combines a resolved [`PlaybackContext`] with the score's tempo map into the
//! discrete note events an audio renderer consumes.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, trace};

use super::context::PlaybackContext;
use super::types::*;
use crate::error::PlaybackError;
use crate::score::{Note, PartId, Score, StaffIdx, Tick, TimeSignature, Timestamp, TrackIdx, DIVISION};

/// Length of time in microseconds.
pub type Duration = i64;
/// Pitch on a fixed integer scale, [`PITCH_LEVEL_STEP`] per semitone.
pub type PitchLevel = i32;
/// Pitch deviation over a note's length, keyed by percent of the length.
pub type PitchCurve = BTreeMap<i32, PitchLevel>;

pub const PITCH_LEVEL_STEP: PitchLevel = 50;
const SEMITONES_PER_OCTAVE: i32 = 12;
/// Tonal pitch class of C on the line of fifths.
const TPC_C: i32 = 14;

/// Articulations a sound library can render.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArticulationsProfile {
    pub name: String,
    pub supported: BTreeSet<ArticulationType>,
}

impl ArticulationsProfile {
    pub fn new(name: impl Into<String>, supported: impl IntoIterator<Item = ArticulationType>) -> Self {
        Self {
            name: name.into(),
            supported: supported.into_iter().collect(),
        }
    }

    /// A profile rendering every articulation.
    pub fn universal() -> Self {
        Self::new("universal", ArticulationType::ALL)
    }

    /// `Standard` is always renderable.
    pub fn supports(&self, articulation: ArticulationType) -> bool {
        articulation == ArticulationType::Standard || self.supported.contains(&articulation)
    }
}

/// Where an articulation applies on the real-time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArticulationMeta {
    pub timestamp: Timestamp,
    pub duration: Duration,
}

pub type ArticulationMap = BTreeMap<ArticulationType, ArticulationMeta>;

/// Everything known about one rhythmic position of one track.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingContext {
    pub nominal_timestamp: Timestamp,
    pub nominal_duration: Duration,
    pub nominal_dynamic_level: DynamicLevel,
    pub nominal_position_start_tick: Tick,
    pub nominal_position_end_tick: Tick,
    pub nominal_duration_ticks: Tick,
    pub position_tick_offset: Tick,
    pub beats_per_second: f64,
    pub time_signature: TimeSignature,
    pub persistent_articulation: ArticulationType,
    pub common_articulations: ArticulationMap,
    pub profile: Option<Arc<ArticulationsProfile>>,
}

impl Default for RenderingContext {
    fn default() -> Self {
        Self {
            nominal_timestamp: 0,
            nominal_duration: 0,
            nominal_dynamic_level: NATURAL_DYNAMIC_LEVEL,
            nominal_position_start_tick: 0,
            nominal_position_end_tick: 0,
            nominal_duration_ticks: 0,
            position_tick_offset: 0,
            beats_per_second: 0.0,
            time_signature: TimeSignature::default(),
            persistent_articulation: ArticulationType::Standard,
            common_articulations: ArticulationMap::new(),
            profile: None,
        }
    }
}

impl RenderingContext {
    /// Compose the context of `duration_ticks` starting at score tick `tick` on `track`,
    /// for the repeat pass with tick offset `tick_offset`.
    pub fn for_position(
        playback: &PlaybackContext,
        score: &Score,
        track: TrackIdx,
        tick: Tick,
        tick_offset: Tick,
        duration_ticks: Tick,
    ) -> Self {
        let utick = tick + tick_offset;
        let timestamp = score.timestamp_from_ticks(utick);
        let duration = score.timestamp_from_ticks(utick + duration_ticks) - timestamp;
        let persistent_articulation = playback.persistent_articulation_type(utick);

        let mut common_articulations = ArticulationMap::new();
        common_articulations.insert(persistent_articulation, ArticulationMeta { timestamp, duration });

        Self {
            nominal_timestamp: timestamp,
            nominal_duration: duration,
            nominal_dynamic_level: playback.appliable_dynamic_level(track, utick),
            nominal_position_start_tick: tick,
            nominal_position_end_tick: tick + duration_ticks,
            nominal_duration_ticks: duration_ticks,
            position_tick_offset: tick_offset,
            beats_per_second: score.tempo_at(utick),
            time_signature: score.time_signature_at(tick),
            persistent_articulation,
            common_articulations,
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: Arc<ArticulationsProfile>) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Attach note articulations spanning the whole position.
    pub fn with_articulations(mut self, articulations: impl IntoIterator<Item = ArticulationType>) -> Self {
        let meta = ArticulationMeta {
            timestamp: self.nominal_timestamp,
            duration: self.nominal_duration,
        };
        for articulation in articulations {
            self.common_articulations.entry(articulation).or_insert(meta);
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.profile.is_some()
            && self.beats_per_second > 0.0
            && self.nominal_duration > 0
            && self.nominal_duration_ticks > 0
    }
}

/// Per-note view of a [`RenderingContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct NominalNoteCtx {
    pub voice: usize,
    pub staff: StaffIdx,
    pub timestamp: Timestamp,
    pub duration: Duration,
    pub tempo: f64,
    pub user_velocity_fraction: f32,
    pub pitch_level: PitchLevel,
    pub chord_ctx: RenderingContext,
}

impl NominalNoteCtx {
    /// A non-zero user velocity on the note replaces the resolved dynamic level.
    pub fn new(note: &Note, ctx: RenderingContext) -> Self {
        let mut chord_ctx = ctx;

        if note.user_velocity_fraction != 0.0 {
            let level = (f64::from(note.user_velocity_fraction) * f64::from(MAX_DYNAMIC_LEVEL)) as DynamicLevel;
            chord_ctx.nominal_dynamic_level = level.clamp(MIN_DYNAMIC_LEVEL, MAX_DYNAMIC_LEVEL);
        }

        Self {
            voice: note.voice(),
            staff: note.staff(),
            timestamp: chord_ctx.nominal_timestamp,
            duration: chord_ctx.nominal_duration,
            tempo: chord_ctx.beats_per_second,
            user_velocity_fraction: note.user_velocity_fraction,
            pitch_level: note_pitch_level(note.tpc, note.octave, note.tuning),
            chord_ctx,
        }
    }
}

/// A single sounding note, ready for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NoteEvent {
    pub timestamp: Timestamp,
    pub duration: Duration,
    pub voice: usize,
    pub staff: StaffIdx,
    pub pitch_level: PitchLevel,
    pub dynamic_level: DynamicLevel,
    pub articulations: ArticulationMap,
    pub beats_per_second: f64,
    pub user_velocity_fraction: f32,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pitch_curve: PitchCurve,
}

/// Pitch level of a note spelled as a tonal pitch class, octave and detuning in cents.
///
/// ```rust
/// use gen_playback::playback::rendering::{note_pitch_level, PITCH_LEVEL_STEP};
///
/// // A4 is 9 semitones above C4
/// let c4 = note_pitch_level(14, 4, 0.0);
/// assert_eq!(note_pitch_level(17, 4, 0.0) - c4, 9 * PITCH_LEVEL_STEP);
/// ```
pub fn note_pitch_level(tpc: i32, octave: i32, tuning_cents: f64) -> PitchLevel {
    let pitch_class = ((tpc - TPC_C) * 7).rem_euclid(SEMITONES_PER_OCTAVE);
    let tuning = (tuning_cents * f64::from(PITCH_LEVEL_STEP) / 100.0).round() as PitchLevel;

    (octave * SEMITONES_PER_OCTAVE + pitch_class) * PITCH_LEVEL_STEP + tuning
}

/// Whether `note` starts a sound of its own.
///
/// Tied-back notes normally extend the sound of the note they continue; the last
/// note of a tie still sounds when it carries a multi-note articulation that is not
/// a ranged one (a glissando leaving it, for instance).
pub fn is_note_playable(note: &Note, articulations: &ArticulationMap) -> bool {
    if !note.play {
        return false;
    }

    let Some(tie) = &note.tie_back else {
        return true;
    };

    if !tie.has_start_note || !tie.has_end_note {
        return false;
    }

    if !note.tie_forward
        && articulations
            .keys()
            .any(|articulation| articulation.is_multi_note() && !articulation.is_ranged())
    {
        return true;
    }

    !tie.equal_tremolo
}

/// Duration of `ticks` at a constant tempo.
pub fn duration_from_tempo_and_ticks(beats_per_second: f64, ticks: Tick) -> Duration {
    if beats_per_second <= 0.0 {
        return 0;
    }
    (f64::from(ticks) / f64::from(DIVISION) / beats_per_second * 1_000_000.0).round() as Duration
}

/// Real-time length of `note`.
///
/// With a score, follows its tempo map from the note's position; without one,
/// assumes the context's tempo stays constant.
pub fn note_nominal_duration(note: &Note, ctx: &RenderingContext, score: Option<&Score>) -> Duration {
    match score {
        Some(score) => {
            let start = ctx.nominal_position_start_tick + ctx.position_tick_offset;
            score.timestamp_from_ticks(start + note.duration_ticks) - score.timestamp_from_ticks(start)
        }
        None => duration_from_tempo_and_ticks(ctx.beats_per_second, note.duration_ticks),
    }
}

pub fn build_note_event(ctx: NominalNoteCtx) -> NoteEvent {
    build_note_event_with_curve(ctx, PitchCurve::new())
}

pub fn build_note_event_with_curve(ctx: NominalNoteCtx, pitch_curve: PitchCurve) -> NoteEvent {
    NoteEvent {
        timestamp: ctx.timestamp,
        duration: ctx.duration,
        voice: ctx.voice,
        staff: ctx.staff,
        pitch_level: ctx.pitch_level,
        dynamic_level: ctx.chord_ctx.nominal_dynamic_level,
        articulations: ctx.chord_ctx.common_articulations,
        beats_per_second: ctx.tempo,
        user_velocity_fraction: ctx.user_velocity_fraction,
        pitch_curve,
    }
}

/// Event for a sub-note (ornament, tremolo stroke, ...) inside the note's span.
pub fn build_note_event_with_offsets(
    ctx: NominalNoteCtx,
    event_duration: Duration,
    timestamp_offset: Timestamp,
    pitch_level_offset: PitchLevel,
) -> NoteEvent {
    let mut event = build_note_event(ctx);
    event.timestamp += timestamp_offset;
    event.duration = event_duration;
    event.pitch_level += pitch_level_offset;
    event
}

/// Event built straight from the note, ignoring any user velocity override.
pub fn build_note_event_for(note: &Note, ctx: &RenderingContext, score: Option<&Score>) -> NoteEvent {
    NoteEvent {
        timestamp: ctx.nominal_timestamp,
        duration: note_nominal_duration(note, ctx, score),
        voice: note.voice(),
        staff: note.staff(),
        pitch_level: note_pitch_level(note.tpc, note.octave, note.tuning),
        dynamic_level: ctx.nominal_dynamic_level,
        articulations: ctx.common_articulations.clone(),
        beats_per_second: ctx.beats_per_second,
        user_velocity_fraction: note.user_velocity_fraction,
        pitch_curve: PitchCurve::new(),
    }
}

/// Render every playable note of a part, in unrolled order.
///
/// `playback` must already be resolved for `part_id`.
pub fn render_part_events(
    playback: &PlaybackContext,
    score: &Score,
    part_id: PartId,
    profile: Arc<ArticulationsProfile>,
) -> Result<Vec<NoteEvent>, PlaybackError> {
    let part = score
        .part(part_id)
        .ok_or(PlaybackError::UnknownPart { part: part_id })?;
    let tracks = part.start_track..part.end_track;

    let mut events = Vec::new();

    for repeat_segment in score.repeat_list().iter() {
        let offset = repeat_segment.tick_offset();

        for measure in repeat_segment.measures.iter().filter_map(|&idx| score.measure(idx)) {
            for segment in &measure.segments {
                for note in segment.notes.iter().filter(|note| tracks.contains(&note.track)) {
                    let supported = note
                        .articulations
                        .iter()
                        .copied()
                        .filter(|articulation| profile.supports(*articulation));

                    let ctx = RenderingContext::for_position(
                        playback,
                        score,
                        note.track,
                        segment.tick,
                        offset,
                        note.duration_ticks,
                    )
                    .with_profile(Arc::clone(&profile))
                    .with_articulations(supported);

                    if !ctx.is_valid() {
                        trace!(track = note.track, tick = segment.tick, "skipping note without a valid context");
                        continue;
                    }
                    if !is_note_playable(note, &ctx.common_articulations) {
                        continue;
                    }

                    events.push(build_note_event(NominalNoteCtx::new(note, ctx)));
                }
            }
        }
    }

    debug!(part = part_id, events = events.len(), profile = %profile.name, "rendered note events");
    Ok(events)
}
