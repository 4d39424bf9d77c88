//! # Score Model
//!
//! The read-only score the playback resolver walks. It is usually loaded from a
//! YAML document with [`Score::from_yaml`].
//!
//! ## Type Hierarchy
//! ```text
//! Score
//!   ├── Vec<Part> (id, track range)
//!   ├── Vec<Measure>
//!   │     ├── tick, ticks, time_signature
//!   │     └── Vec<Segment>
//!   │           ├── tick
//!   │           ├── Vec<Annotation> (track, part, kind)
//!   │           │     └── AnnotationKind
//!   │           │           ├── Dynamic
//!   │           │           ├── PlayingTechnique
//!   │           │           ├── StaffText (optional SoundFlag)
//!   │           │           ├── MeasureRepeat
//!   │           │           └── Other
//!   │           └── Vec<Note>
//!   ├── Vec<Spanner> (tick, ticks, track, part, kind: Hairpin | Other)
//!   ├── Vec<RepeatSegment> (tick, utick, len, measure indices)
//!   └── TempoMap (utick -> beats per second)
//! ```
//!
//! ## Ticks
//! Measures, segments and spanners carry *score* ticks. A [`RepeatSegment`] maps a
//! run of measures onto the *unrolled* timeline: a score tick `t` inside it plays at
//! `t + utick - tick`. The tempo map and every resolver output use unrolled ticks.
//!
//! ## Tracks and staves
//! Each staff owns [`VOICES`] consecutive tracks, so `staff = track / VOICES`.
//!
//! ## Example
//! ```rust
//! use gen_playback::Score;
//!
//! let score = Score::from_yaml(r#"
//! parts:
//!   - { id: 1, start-track: 0, end-track: 4 }
//! measures:
//!   - tick: 0
//!     ticks: 1920
//!     segments:
//!       - tick: 0
//!         annotations:
//!           - { kind: dynamic, track: 0, part: 1, dynamic-type: mf }
//! "#).unwrap();
//!
//! assert_eq!(score.repeat_list().len(), 1);
//! assert_eq!(score.end_tick(), 1920);
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::PlaybackError;
use crate::playback::{ArticulationType, ChangeMethod, DynamicType, PlayingTechniqueType, VoiceAssignment};

/// Position on a tick axis (score or unrolled).
pub type Tick = i32;
/// Real time in microseconds.
pub type Timestamp = i64;
pub type TrackIdx = usize;
pub type StaffIdx = usize;
pub type PartId = u64;
pub type MeasureIdx = usize;

/// Ticks per quarter note.
pub const DIVISION: Tick = 480;
/// Tracks per staff.
pub const VOICES: usize = 4;
/// Tempo used before the first tempo mark: 120 quarter notes per minute.
pub const DEFAULT_BEATS_PER_SECOND: f64 = 2.0;

pub fn track_to_staff(track: TrackIdx) -> StaffIdx {
    track / VOICES
}

pub fn track_to_voice(track: TrackIdx) -> usize {
    track % VOICES
}

fn yes() -> bool {
    true
}

fn default_change_length() -> Tick {
    DIVISION
}

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

impl TimeSignature {
    /// Length of one full measure in ticks.
    pub fn measure_ticks(&self) -> Tick {
        Tick::from(self.beats) * DIVISION * 4 / Tick::from(self.beat_type.max(1))
    }
}

/// An instrument, owning the half-open track range `[start_track, end_track)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Part {
    pub id: PartId,
    #[serde(default)]
    pub name: String,
    pub start_track: TrackIdx,
    pub end_track: TrackIdx,
}

impl Part {
    pub fn nstaves(&self) -> usize {
        self.end_track.saturating_sub(self.start_track) / VOICES
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Measure {
    pub tick: Tick,
    pub ticks: Tick,
    #[serde(default)]
    pub time_signature: TimeSignature,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Measure {
    pub fn end_tick(&self) -> Tick {
        self.tick + self.ticks
    }
}

/// A single time position inside a measure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Segment {
    pub tick: Tick,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Segment {
    /// The dynamic marking attached to `track` at this position, if any.
    pub fn dynamic_on_track(&self, track: TrackIdx) -> Option<&Dynamic> {
        self.annotations.iter().find_map(|annotation| match &annotation.kind {
            AnnotationKind::Dynamic(dynamic) if annotation.track == track => Some(dynamic),
            _ => None,
        })
    }
}

/// A marking attached to a segment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Annotation {
    pub track: TrackIdx,
    pub part: PartId,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AnnotationKind {
    Dynamic(Dynamic),
    PlayingTechnique(PlayTechAnnotation),
    StaffText(StaffText),
    /// Always attached to the first measure of the repeated group.
    MeasureRepeat(MeasureRepeat),
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Dynamic {
    pub dynamic_type: DynamicType,
    #[serde(default = "yes")]
    pub play: bool,
    #[serde(default)]
    pub voice_assignment: VoiceAssignment,
    /// Length of the level change for transitional markings.
    #[serde(default = "default_change_length")]
    pub velocity_change_length: Tick,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayTechAnnotation {
    pub technique: PlayingTechniqueType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StaffText {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sound_flag: Option<SoundFlag>,
}

/// Sound preset / playing technique request carried by a staff text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SoundFlag {
    pub staff: StaffIdx,
    #[serde(default)]
    pub apply_to_all_staves: bool,
    #[serde(default)]
    pub sound_presets: Vec<String>,
    #[serde(default)]
    pub playing_technique: String,
    #[serde(default = "yes")]
    pub play: bool,
}

impl SoundFlag {
    pub fn is_playable(&self) -> bool {
        self.play && (!self.sound_presets.is_empty() || !self.playing_technique.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MeasureRepeat {
    /// Size of the repeated group; the group replays the same number of measures right before it.
    pub num_measures: usize,
}

/// A marking spanning a tick range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Spanner {
    pub tick: Tick,
    /// Duration; the sign is ignored.
    pub ticks: Tick,
    pub track: TrackIdx,
    pub part: PartId,
    #[serde(default = "yes")]
    pub play: bool,
    #[serde(flatten)]
    pub kind: SpannerKind,
}

impl Spanner {
    /// `None` when the end does not fit in a tick.
    pub fn end_tick(&self) -> Option<Tick> {
        self.ticks.checked_abs().and_then(|ticks| self.tick.checked_add(ticks))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SpannerKind {
    Hairpin(Hairpin),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HairpinType {
    CrescHairpin,
    DecrescHairpin,
    CrescLine,
    DecrescLine,
}

impl HairpinType {
    pub fn is_crescendo(self) -> bool {
        matches!(self, HairpinType::CrescHairpin | HairpinType::CrescLine)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Hairpin {
    pub hairpin_type: HairpinType,
    /// Dynamic written in the hairpin's begin text.
    #[serde(default)]
    pub dynamic_from: Option<DynamicType>,
    /// Dynamic written in the hairpin's end text.
    #[serde(default)]
    pub dynamic_to: Option<DynamicType>,
    #[serde(default)]
    pub change_method: ChangeMethod,
    #[serde(default)]
    pub voice_assignment: VoiceAssignment,
}

/// One unrolled pass through a run of measures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepeatSegment {
    /// Score tick of the first measure.
    pub tick: Tick,
    /// Unrolled tick the pass starts at.
    pub utick: Tick,
    pub len: Tick,
    pub measures: Vec<MeasureIdx>,
}

impl RepeatSegment {
    /// Offset from score ticks to unrolled ticks for this pass.
    pub fn tick_offset(&self) -> Tick {
        self.utick - self.tick
    }

    pub fn end_tick(&self) -> Tick {
        self.tick + self.len
    }
}

/// Both ends of a tie as seen from the tied-back note.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Tie {
    #[serde(default = "yes")]
    pub has_start_note: bool,
    #[serde(default = "yes")]
    pub has_end_note: bool,
    /// The first and last chord of the tie carry the same tremolo.
    #[serde(default)]
    pub equal_tremolo: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Note {
    pub track: TrackIdx,
    /// Tonal pitch class on the line of fifths, C = 14.
    pub tpc: i32,
    pub octave: i32,
    /// Detuning in cents.
    #[serde(default)]
    pub tuning: f64,
    /// Actual length of the owning chord.
    pub duration_ticks: Tick,
    #[serde(default)]
    pub user_velocity_fraction: f32,
    #[serde(default = "yes")]
    pub play: bool,
    #[serde(default)]
    pub tie_back: Option<Tie>,
    #[serde(default)]
    pub tie_forward: bool,
    #[serde(default)]
    pub articulations: Vec<ArticulationType>,
}

impl Note {
    pub fn voice(&self) -> usize {
        track_to_voice(self.track)
    }

    pub fn staff(&self) -> StaffIdx {
        track_to_staff(self.track)
    }
}

/// Tempo changes keyed by unrolled tick, in beats (quarter notes) per second.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct TempoMap(BTreeMap<Tick, f64>);

impl TempoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tempo(&mut self, tick: Tick, beats_per_second: f64) {
        self.0.insert(tick, beats_per_second);
    }

    pub fn tempo_at(&self, tick: Tick) -> f64 {
        self.0
            .range(..=tick)
            .next_back()
            .map(|(_, bps)| *bps)
            .unwrap_or(DEFAULT_BEATS_PER_SECOND)
    }

    /// Real time at `tick`, integrating every tempo change before it.
    pub fn timestamp(&self, tick: Tick) -> Timestamp {
        let mut seconds = 0.0;
        let mut position = 0;
        let mut bps = DEFAULT_BEATS_PER_SECOND;

        for (&change, &next_bps) in self.0.range(..tick) {
            if change > position {
                seconds += seconds_for(change - position, bps);
                position = change;
            }
            bps = next_bps;
        }
        if tick > position {
            seconds += seconds_for(tick - position, bps);
        }

        (seconds * 1_000_000.0).round() as Timestamp
    }
}

fn seconds_for(ticks: Tick, beats_per_second: f64) -> f64 {
    if beats_per_second <= 0.0 {
        return 0.0;
    }
    f64::from(ticks) / f64::from(DIVISION) / beats_per_second
}

/// The score document
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub spanners: Vec<Spanner>,
    #[serde(default)]
    pub repeats: Vec<RepeatSegment>,
    #[serde(default)]
    pub tempo: TempoMap,
}

impl Score {
    /// Load a score document from YAML.
    pub fn from_yaml(content: &str) -> Result<Self, PlaybackError> {
        serde_yaml::from_str(content).map_err(|e| PlaybackError::ScoreFormat(e.to_string()))
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.iter().find(|part| part.id == id)
    }

    pub fn measure(&self, idx: MeasureIdx) -> Option<&Measure> {
        self.measures.get(idx)
    }

    pub fn next_measure(&self, idx: MeasureIdx) -> Option<MeasureIdx> {
        let next = idx + 1;
        (next < self.measures.len()).then_some(next)
    }

    /// The measure a measure repeat of `num_measures` replays when it sounds at `idx`.
    pub fn referring_measure(&self, idx: MeasureIdx, num_measures: usize) -> Option<MeasureIdx> {
        if num_measures == 0 || idx >= self.measures.len() {
            return None;
        }
        idx.checked_sub(num_measures)
    }

    /// The repeat-unrolled pass list.
    ///
    /// A score without explicit repeats plays straight through once.
    pub fn repeat_list(&self) -> Cow<'_, [RepeatSegment]> {
        if !self.repeats.is_empty() {
            return Cow::Borrowed(&self.repeats);
        }
        if self.measures.is_empty() {
            return Cow::Owned(Vec::new());
        }

        let tick = self.measures[0].tick;
        Cow::Owned(vec![RepeatSegment {
            tick,
            utick: tick,
            len: self.end_tick() - tick,
            measures: (0..self.measures.len()).collect(),
        }])
    }

    pub fn end_tick(&self) -> Tick {
        self.measures.last().map(Measure::end_tick).unwrap_or(0)
    }

    /// The segment sitting exactly at score tick `tick`.
    pub fn segment_at(&self, tick: Tick) -> Option<&Segment> {
        self.measures
            .iter()
            .filter(|m| m.tick <= tick && tick < m.end_tick())
            .flat_map(|m| m.segments.iter())
            .find(|s| s.tick == tick)
    }

    /// Spanners overlapping the half-open score tick range `[from, to)`.
    ///
    /// Spanners whose end overflows are yielded too, so the caller can skip them.
    pub fn spanners_overlapping(&self, from: Tick, to: Tick) -> impl Iterator<Item = &Spanner> {
        self.spanners
            .iter()
            .filter(move |s| s.tick < to && s.end_tick().map_or(true, |end| end > from))
    }

    pub fn time_signature_at(&self, tick: Tick) -> TimeSignature {
        self.measures
            .iter()
            .rev()
            .find(|m| m.tick <= tick)
            .map(|m| m.time_signature)
            .unwrap_or_default()
    }

    pub fn tempo_at(&self, utick: Tick) -> f64 {
        self.tempo.tempo_at(utick)
    }

    /// Real time of an unrolled tick.
    pub fn timestamp_from_ticks(&self, utick: Tick) -> Timestamp {
        self.tempo.timestamp(utick)
    }
}
