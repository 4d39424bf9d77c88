//! Playback value types
//!
//! This module defines the dynamic scale, articulation and playing technique
//! types, playback parameters, and the tick-indexed maps the resolver fills in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::score::{StaffIdx, Tick, Timestamp, TrackIdx};

/// Loudness on a fixed integer scale, in 1/100 of a percent.
pub type DynamicLevel = i32;

pub const ONE_PERCENT: DynamicLevel = 100;
pub const MIN_DYNAMIC_LEVEL: DynamicLevel = 0;
pub const MAX_DYNAMIC_LEVEL: DynamicLevel = 100 * ONE_PERCENT;
pub const DYNAMIC_LEVEL_STEP: DynamicLevel = 5 * ONE_PERCENT;
pub const NATURAL_DYNAMIC_LEVEL: DynamicLevel = 50 * ONE_PERCENT;

/// Technique code that cancels any previously requested playing technique.
pub const ORDINARY_PLAYING_TECHNIQUE_CODE: &str = "ordinary";

/// Dynamic markings
///
/// Three families are handled differently during resolution:
/// - **Ordinary** levels (`pp`, `mf`, ...) apply from their tick onwards
/// - **Single-note** accents (`sf`, `rfz`, ...) apply to one segment, then revert
/// - **Transitional** markings (`fp`, `sfp`, ...) ramp between two levels
///
/// `Other` covers text dynamics with no playback meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DynamicType {
    Pppppp,
    Ppppp,
    Pppp,
    Ppp,
    Pp,
    P,
    Mp,
    Natural,
    Mf,
    F,
    Ff,
    Fff,
    Ffff,
    Fffff,
    Ffffff,
    Sf,
    Sfz,
    Sff,
    Sffz,
    Sfff,
    Sfffz,
    Rf,
    Rfz,
    Fz,
    Fp,
    Pf,
    Sfp,
    Sfpp,
    Other,
}

impl DynamicType {
    /// The ordinary ladder, softest first. `Natural` sits between mp and mf.
    const LADDER: [DynamicType; 15] = [
        DynamicType::Pppppp,
        DynamicType::Ppppp,
        DynamicType::Pppp,
        DynamicType::Ppp,
        DynamicType::Pp,
        DynamicType::P,
        DynamicType::Mp,
        DynamicType::Natural,
        DynamicType::Mf,
        DynamicType::F,
        DynamicType::Ff,
        DynamicType::Fff,
        DynamicType::Ffff,
        DynamicType::Fffff,
        DynamicType::Ffffff,
    ];

    pub fn is_ordinary(self) -> bool {
        Self::LADDER.contains(&self)
    }

    pub fn is_single_note(self) -> bool {
        matches!(
            self,
            DynamicType::Sf
                | DynamicType::Sfz
                | DynamicType::Sff
                | DynamicType::Sffz
                | DynamicType::Sfff
                | DynamicType::Sfffz
                | DynamicType::Rf
                | DynamicType::Rfz
                | DynamicType::Fz
        )
    }

    /// The `(from, to)` pair for transitional markings.
    pub fn transition(self) -> Option<(DynamicType, DynamicType)> {
        match self {
            DynamicType::Fp | DynamicType::Sfp => Some((DynamicType::F, DynamicType::P)),
            DynamicType::Pf => Some((DynamicType::P, DynamicType::F)),
            DynamicType::Sfpp => Some((DynamicType::F, DynamicType::Pp)),
            _ => None,
        }
    }

    /// The level this marking sets, if it names a single level.
    ///
    /// Single-note accents sound at the level of their accented value
    /// (`sf` and `sfz` at f, `sff` at ff, ...).
    pub fn level(self) -> Option<DynamicLevel> {
        let ordinary = match self {
            DynamicType::Sf | DynamicType::Sfz | DynamicType::Rf | DynamicType::Rfz | DynamicType::Fz => {
                DynamicType::F
            }
            DynamicType::Sff | DynamicType::Sffz => DynamicType::Ff,
            DynamicType::Sfff | DynamicType::Sfffz => DynamicType::Fff,
            other => other,
        };

        let index = Self::LADDER.iter().position(|t| *t == ordinary)?;
        Some(MIN_DYNAMIC_LEVEL + (index as DynamicLevel + 3) * DYNAMIC_LEVEL_STEP)
    }
}

/// Level of a dynamic type, or the natural level when the type names none.
pub fn dynamic_level_from_type(dynamic_type: DynamicType) -> DynamicLevel {
    dynamic_type.level().unwrap_or(NATURAL_DYNAMIC_LEVEL)
}

/// Level of an optional dynamic type, or `fallback` when it is absent or names no level.
pub fn dynamic_level_or(dynamic_type: Option<DynamicType>, fallback: DynamicLevel) -> DynamicLevel {
    dynamic_type.and_then(DynamicType::level).unwrap_or(fallback)
}

/// Breadth of voices a dynamic or hairpin applies to.
///
/// The ordering doubles as the write priority: broader scopes win over
/// narrower ones at the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoiceAssignment {
    CurrentVoiceOnly,
    AllVoicesInStaff,
    #[default]
    AllVoicesInInstrument,
}

impl VoiceAssignment {
    pub fn priority(self) -> i32 {
        self as i32
    }
}

/// A resolved dynamic write: the level plus the priority of the marking that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DynamicInfo {
    pub level: DynamicLevel,
    pub priority: i32,
}

/// Articulations understood by the renderer.
///
/// The first group are persistent techniques that stay in effect until changed;
/// the rest are note-attached articulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ArticulationType {
    #[default]
    Standard,
    Open,
    Mute,
    Pizzicato,
    Arco,
    Tremolo64th,
    Detache,
    Martele,
    ColLegno,
    SulPont,
    SulTasto,
    Vibrato,
    Legato,
    Distortion,
    Overdrive,
    Harmonic,
    JazzTone,
    Accent,
    Staccato,
    Tenuto,
    Slur,
    Glissando,
    Trill,
}

impl ArticulationType {
    pub const ALL: [ArticulationType; 23] = [
        ArticulationType::Standard,
        ArticulationType::Open,
        ArticulationType::Mute,
        ArticulationType::Pizzicato,
        ArticulationType::Arco,
        ArticulationType::Tremolo64th,
        ArticulationType::Detache,
        ArticulationType::Martele,
        ArticulationType::ColLegno,
        ArticulationType::SulPont,
        ArticulationType::SulTasto,
        ArticulationType::Vibrato,
        ArticulationType::Legato,
        ArticulationType::Distortion,
        ArticulationType::Overdrive,
        ArticulationType::Harmonic,
        ArticulationType::JazzTone,
        ArticulationType::Accent,
        ArticulationType::Staccato,
        ArticulationType::Tenuto,
        ArticulationType::Slur,
        ArticulationType::Glissando,
        ArticulationType::Trill,
    ];

    /// Articulations spanning more than one note.
    pub fn is_multi_note(self) -> bool {
        self.is_ranged() || self == ArticulationType::Glissando
    }

    /// Multi-note articulations that cover a whole range of notes.
    pub fn is_ranged(self) -> bool {
        matches!(
            self,
            ArticulationType::Slur | ArticulationType::Legato | ArticulationType::Trill
        )
    }
}

/// Playing technique annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayingTechniqueType {
    Undefined,
    Natural,
    Open,
    Mute,
    Pizzicato,
    Arco,
    Tremolo,
    Detache,
    Martele,
    ColLegno,
    SulPonticello,
    SulTasto,
    Vibrato,
    Legato,
    Distortion,
    Overdrive,
    Harmonics,
    JazzTone,
}

impl PlayingTechniqueType {
    /// The persistent articulation this technique switches to.
    pub fn articulation(self) -> Option<ArticulationType> {
        let articulation = match self {
            PlayingTechniqueType::Undefined => return None,
            PlayingTechniqueType::Natural => ArticulationType::Standard,
            PlayingTechniqueType::Open => ArticulationType::Open,
            PlayingTechniqueType::Mute => ArticulationType::Mute,
            PlayingTechniqueType::Pizzicato => ArticulationType::Pizzicato,
            PlayingTechniqueType::Arco => ArticulationType::Arco,
            PlayingTechniqueType::Tremolo => ArticulationType::Tremolo64th,
            PlayingTechniqueType::Detache => ArticulationType::Detache,
            PlayingTechniqueType::Martele => ArticulationType::Martele,
            PlayingTechniqueType::ColLegno => ArticulationType::ColLegno,
            PlayingTechniqueType::SulPonticello => ArticulationType::SulPont,
            PlayingTechniqueType::SulTasto => ArticulationType::SulTasto,
            PlayingTechniqueType::Vibrato => ArticulationType::Vibrato,
            PlayingTechniqueType::Legato => ArticulationType::Legato,
            PlayingTechniqueType::Distortion => ArticulationType::Distortion,
            PlayingTechniqueType::Overdrive => ArticulationType::Overdrive,
            PlayingTechniqueType::Harmonics => ArticulationType::Harmonic,
            PlayingTechniqueType::JazzTone => ArticulationType::JazzTone,
        };
        Some(articulation)
    }

    /// Techniques that explicitly cancel earlier technique parameters.
    pub fn cancels_techniques(self) -> bool {
        matches!(self, PlayingTechniqueType::Natural | PlayingTechniqueType::Open)
    }
}

/// What a playback parameter controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamKind {
    SoundPreset,
    PlayingTechnique,
}

/// A named playback parameter, tagged with the staff it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PlaybackParam {
    pub kind: ParamKind,
    pub value: String,
    pub staff: StaffIdx,
}

impl PlaybackParam {
    pub fn new(kind: ParamKind, value: impl Into<String>, staff: StaffIdx) -> Self {
        Self {
            kind,
            value: value.into(),
            staff,
        }
    }
}

pub type PlaybackParamList = Vec<PlaybackParam>;

// Tick-indexed maps, as stored by the resolver
pub type DynamicMap = BTreeMap<Tick, DynamicInfo>;
pub type ParamMap = BTreeMap<Tick, PlaybackParamList>;
pub type PlayTechniquesMap = BTreeMap<Tick, ArticulationType>;

// Timestamp-indexed views, as handed to the renderer
pub type DynamicLevelMap = BTreeMap<Timestamp, DynamicLevel>;
pub type DynamicLevelLayers = BTreeMap<TrackIdx, DynamicLevelMap>;
pub type PlaybackParamMap = BTreeMap<Timestamp, PlaybackParamList>;
pub type PlaybackParamLayers = BTreeMap<TrackIdx, PlaybackParamMap>;
pub type ArticulationTimeline = BTreeMap<Timestamp, ArticulationType>;

/// The entry at or immediately before `key`.
pub fn find_less_or_equal<V>(map: &BTreeMap<Tick, V>, key: Tick) -> Option<&V> {
    map.range(..=key).next_back().map(|(_, value)| value)
}

/// Copy every entry in `[start, end)` to `tick + offset`, overwriting what is already there.
pub fn copy_range_with_offset<V: Clone>(map: &mut BTreeMap<Tick, V>, start: Tick, end: Tick, offset: Tick) {
    if start >= end {
        return;
    }

    let copied: Vec<(Tick, V)> = map
        .range(start..end)
        .map(|(tick, value)| (tick + offset, value.clone()))
        .collect();

    map.extend(copied);
}
