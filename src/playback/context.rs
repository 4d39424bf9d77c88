//! Playback context resolution
//!
//! Walks the repeat-unrolled timeline of one part and resolves its markings into
//! tick-indexed maps:
//! - dynamic levels per track (dynamics, single-note accents, transitions, hairpins)
//! - the part's persistent articulation (playing technique annotations)
//! - playback parameters per track (sound flags on staff texts)
//!
//! Measure repeats copy everything resolved in their source measures to the
//! measures they stand for.
//!
//! Every [`PlaybackContext::update`] resolves into a fresh [`Resolution`] and swaps it
//! in once complete, so a [`PlaybackContext::snapshot`] taken earlier keeps
//! describing the previous state in full.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, trace};

use super::easing::{easing_value_curve, ChangeMethod};
use super::types::*;
use crate::config::ResolverConfig;
use crate::error::PlaybackError;
use crate::score::{
    track_to_staff, AnnotationKind, Dynamic, MeasureIdx, MeasureRepeat, Part, PartId, RepeatSegment, Score,
    Segment, SoundFlag, SpannerKind, StaffIdx, Tick, TrackIdx, VOICES,
};

#[derive(Debug, Clone, Default, PartialEq)]
struct TrackMaps {
    dynamics: DynamicMap,
    params: ParamMap,
}

/// The resolved maps of one part.
///
/// Tracks live in a fixed slot per track of the part's `[start_track, end_track)`
/// range; queries for tracks outside it answer with the neutral defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    start_track: TrackIdx,
    end_track: TrackIdx,
    tracks: Vec<TrackMaps>,
    play_techniques: PlayTechniquesMap,
}

impl Resolution {
    fn for_part(part: &Part) -> Self {
        Self {
            start_track: part.start_track,
            end_track: part.end_track,
            tracks: vec![TrackMaps::default(); part.end_track - part.start_track],
            play_techniques: PlayTechniquesMap::new(),
        }
    }

    fn track(&self, track: TrackIdx) -> Option<&TrackMaps> {
        track
            .checked_sub(self.start_track)
            .and_then(|slot| self.tracks.get(slot))
    }

    pub fn start_track(&self) -> TrackIdx {
        self.start_track
    }

    pub fn end_track(&self) -> TrackIdx {
        self.end_track
    }

    /// Level in effect at `tick`: the last one written at or before it.
    pub fn appliable_dynamic_level(&self, track: TrackIdx, tick: Tick) -> DynamicLevel {
        self.track(track)
            .and_then(|maps| find_less_or_equal(&maps.dynamics, tick))
            .map(|info| info.level)
            .unwrap_or(NATURAL_DYNAMIC_LEVEL)
    }

    /// Level written exactly at `tick`.
    pub fn nominal_dynamic_level(&self, track: TrackIdx, tick: Tick) -> DynamicLevel {
        self.track(track)
            .and_then(|maps| maps.dynamics.get(&tick))
            .map(|info| info.level)
            .unwrap_or(NATURAL_DYNAMIC_LEVEL)
    }

    pub fn persistent_articulation_type(&self, tick: Tick) -> ArticulationType {
        find_less_or_equal(&self.play_techniques, tick)
            .copied()
            .unwrap_or(ArticulationType::Standard)
    }

    /// Parameters written exactly at `tick`.
    pub fn playback_params(&self, track: TrackIdx, tick: Tick) -> PlaybackParamList {
        self.track(track)
            .and_then(|maps| maps.params.get(&tick))
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_sound_flags(&self) -> bool {
        self.tracks.iter().any(|maps| !maps.params.is_empty())
    }

    pub fn dynamic_map(&self, track: TrackIdx) -> Option<&DynamicMap> {
        self.track(track).map(|maps| &maps.dynamics)
    }

    pub fn param_map(&self, track: TrackIdx) -> Option<&ParamMap> {
        self.track(track).map(|maps| &maps.params)
    }

    pub fn play_techniques_map(&self) -> &PlayTechniquesMap {
        &self.play_techniques
    }

    fn slots(&self) -> impl Iterator<Item = (TrackIdx, &TrackMaps)> {
        self.tracks
            .iter()
            .enumerate()
            .map(move |(slot, maps)| (self.start_track + slot, maps))
    }

    /// Timestamped dynamic levels for every track that has any.
    pub fn dynamic_level_layers(&self, score: &Score) -> DynamicLevelLayers {
        self.slots()
            .filter(|(_, maps)| !maps.dynamics.is_empty())
            .map(|(track, maps)| {
                let levels: DynamicLevelMap = maps
                    .dynamics
                    .iter()
                    .map(|(tick, info)| (score.timestamp_from_ticks(*tick), info.level))
                    .collect();
                (track, levels)
            })
            .collect()
    }

    /// Timestamped dynamic levels of the part's first track.
    pub fn dynamic_level_map(&self, score: &Score) -> DynamicLevelMap {
        self.dynamic_level_layers(score)
            .remove(&self.start_track)
            .unwrap_or_default()
    }

    /// Timestamped parameters for every track that has any.
    pub fn playback_param_layers(&self, score: &Score) -> PlaybackParamLayers {
        self.slots()
            .filter(|(_, maps)| !maps.params.is_empty())
            .map(|(track, maps)| {
                let params: PlaybackParamMap = maps
                    .params
                    .iter()
                    .map(|(tick, list)| (score.timestamp_from_ticks(*tick), list.clone()))
                    .collect();
                (track, params)
            })
            .collect()
    }

    /// Timestamped parameters of the whole part, one copy per staff.
    pub fn playback_param_map(&self, score: &Score) -> PlaybackParamMap {
        let mut merged: BTreeMap<Tick, PlaybackParamList> = BTreeMap::new();

        for (_, maps) in self.slots() {
            for (tick, list) in &maps.params {
                let entry = merged.entry(*tick).or_default();
                for param in list {
                    if !entry.contains(param) {
                        entry.push(param.clone());
                    }
                }
            }
        }

        merged
            .into_iter()
            .map(|(tick, mut list)| {
                list.sort_by_key(|param| param.staff);
                (score.timestamp_from_ticks(tick), list)
            })
            .collect()
    }

    /// Parameters of `staff` from the latest parameter change at or before `tick`.
    ///
    /// Empty when that change does not touch `staff`.
    pub fn playback_param_map_at(&self, score: &Score, tick: Tick, staff: StaffIdx) -> PlaybackParamMap {
        let latest = self
            .slots()
            .filter_map(|(_, maps)| maps.params.range(..=tick).next_back().map(|(t, _)| *t))
            .max();

        let Some(latest) = latest else {
            return PlaybackParamMap::new();
        };

        let Some((first_track, last_track)) = staff
            .checked_mul(VOICES)
            .and_then(|first| first.checked_add(VOICES).map(|last| (first, last)))
        else {
            return PlaybackParamMap::new();
        };
        let list: PlaybackParamList = (first_track..last_track)
            .find_map(|track| self.track(track).and_then(|maps| maps.params.get(&latest)))
            .map(|list| list.iter().filter(|param| param.staff == staff).cloned().collect())
            .unwrap_or_default();

        if list.is_empty() {
            return PlaybackParamMap::new();
        }

        PlaybackParamMap::from([(score.timestamp_from_ticks(latest), list)])
    }

    /// Timestamped persistent articulation changes.
    pub fn articulation_map(&self, score: &Score) -> ArticulationTimeline {
        self.play_techniques
            .iter()
            .map(|(tick, articulation)| (score.timestamp_from_ticks(*tick), *articulation))
            .collect()
    }

    fn copy_range(&mut self, start: Tick, end: Tick, offset: Tick) {
        for maps in &mut self.tracks {
            copy_range_with_offset(&mut maps.dynamics, start, end, offset);
            copy_range_with_offset(&mut maps.params, start, end, offset);
        }
        copy_range_with_offset(&mut self.play_techniques, start, end, offset);
    }
}

/// Resolves and holds the playback intent of one part.
///
/// # Example
/// ```rust
/// use gen_playback::{PlaybackContext, Score};
/// use gen_playback::playback::{dynamic_level_from_type, DynamicType};
///
/// let score = Score::from_yaml(r#"
/// parts:
///   - { id: 1, start-track: 0, end-track: 4 }
/// measures:
///   - tick: 0
///     ticks: 1920
///     segments:
///       - tick: 960
///         annotations:
///           - { kind: dynamic, track: 0, part: 1, dynamic-type: ff }
/// "#).unwrap();
///
/// let mut ctx = PlaybackContext::new();
/// ctx.update(1, &score).unwrap();
///
/// assert_eq!(ctx.appliable_dynamic_level(0, 480), dynamic_level_from_type(DynamicType::Natural));
/// assert_eq!(ctx.appliable_dynamic_level(0, 1440), dynamic_level_from_type(DynamicType::Ff));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlaybackContext {
    config: ResolverConfig,
    resolved: Arc<Resolution>,
}

impl PlaybackContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            config,
            resolved: Arc::default(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve every marking of `part_id` in `score`, replacing the previous result.
    ///
    /// Fails only when the score breaks its own invariants (the part is missing or
    /// its track range is inverted); the previous result is kept in that case.
    pub fn update(&mut self, part_id: PartId, score: &Score) -> Result<(), PlaybackError> {
        let Some(part) = score.part(part_id) else {
            error!(part = part_id, "cannot resolve playback context of an unknown part");
            return Err(PlaybackError::UnknownPart { part: part_id });
        };

        if part.start_track > part.end_track {
            error!(
                part = part_id,
                start = part.start_track,
                end = part.end_track,
                "cannot resolve playback context of a part with an inverted track range"
            );
            return Err(PlaybackError::InvertedTrackRange {
                part: part_id,
                start: part.start_track,
                end: part.end_track,
            });
        }

        let mut resolver = Resolver::new(score, part, &self.config);
        for repeat_segment in score.repeat_list().iter() {
            resolver.handle_repeat_segment(repeat_segment);
        }

        let resolution = resolver.out;
        debug!(
            part = part_id,
            tracks = resolution.tracks.len(),
            play_techniques = resolution.play_techniques.len(),
            sound_flags = resolution.has_sound_flags(),
            "resolved playback context"
        );

        self.resolved = Arc::new(resolution);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.resolved = Arc::default();
    }

    /// The current result, shareable with readers on other threads.
    pub fn snapshot(&self) -> Arc<Resolution> {
        Arc::clone(&self.resolved)
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolved
    }

    pub fn appliable_dynamic_level(&self, track: TrackIdx, tick: Tick) -> DynamicLevel {
        self.resolved.appliable_dynamic_level(track, tick)
    }

    pub fn nominal_dynamic_level(&self, track: TrackIdx, tick: Tick) -> DynamicLevel {
        self.resolved.nominal_dynamic_level(track, tick)
    }

    pub fn persistent_articulation_type(&self, tick: Tick) -> ArticulationType {
        self.resolved.persistent_articulation_type(tick)
    }

    pub fn playback_params(&self, track: TrackIdx, tick: Tick) -> PlaybackParamList {
        self.resolved.playback_params(track, tick)
    }

    pub fn has_sound_flags(&self) -> bool {
        self.resolved.has_sound_flags()
    }

    pub fn dynamic_level_layers(&self, score: &Score) -> DynamicLevelLayers {
        self.resolved.dynamic_level_layers(score)
    }

    pub fn dynamic_level_map(&self, score: &Score) -> DynamicLevelMap {
        self.resolved.dynamic_level_map(score)
    }

    pub fn playback_param_layers(&self, score: &Score) -> PlaybackParamLayers {
        self.resolved.playback_param_layers(score)
    }

    pub fn playback_param_map(&self, score: &Score) -> PlaybackParamMap {
        self.resolved.playback_param_map(score)
    }

    pub fn playback_param_map_at(&self, score: &Score, tick: Tick, staff: StaffIdx) -> PlaybackParamMap {
        self.resolved.playback_param_map_at(score, tick, staff)
    }

    pub fn articulation_map(&self, score: &Score) -> ArticulationTimeline {
        self.resolved.articulation_map(score)
    }
}

/// Track and scope of the marking a dynamic write comes from.
#[derive(Debug, Clone, Copy)]
struct DynamicSource {
    track: TrackIdx,
    voice_assignment: VoiceAssignment,
}

impl DynamicSource {
    fn accepts(&self, track: TrackIdx) -> bool {
        match self.voice_assignment {
            VoiceAssignment::CurrentVoiceOnly => track == self.track,
            VoiceAssignment::AllVoicesInStaff => track_to_staff(track) == track_to_staff(self.track),
            VoiceAssignment::AllVoicesInInstrument => true,
        }
    }
}

/// One resolution pass over a part.
struct Resolver<'a> {
    score: &'a Score,
    part_id: PartId,
    config: &'a ResolverConfig,
    out: Resolution,
}

impl<'a> Resolver<'a> {
    fn new(score: &'a Score, part: &Part, config: &'a ResolverConfig) -> Self {
        Self {
            score,
            part_id: part.id,
            config,
            out: Resolution::for_part(part),
        }
    }

    fn owns_track(&self, track: TrackIdx) -> bool {
        (self.out.start_track..self.out.end_track).contains(&track)
    }

    fn handle_repeat_segment(&mut self, repeat_segment: &RepeatSegment) {
        let score = self.score;
        let offset = repeat_segment.tick_offset();
        let mut measure_repeats: Vec<(MeasureIdx, &'a MeasureRepeat)> = Vec::new();

        for &measure_idx in &repeat_segment.measures {
            let Some(measure) = score.measure(measure_idx) else {
                trace!(measure = measure_idx, "repeat segment refers to a missing measure");
                continue;
            };

            for (segment_idx, segment) in measure.segments.iter().enumerate() {
                for annotation in &segment.annotations {
                    if let AnnotationKind::MeasureRepeat(measure_repeat) = &annotation.kind {
                        if self.owns_track(annotation.track) {
                            measure_repeats.push((measure_idx, measure_repeat));
                        }
                    }
                }

                let next_position = measure
                    .segments
                    .get(segment_idx + 1)
                    .map(|next| next.tick + offset);
                self.handle_annotations(segment, segment.tick + offset, next_position);
            }
        }

        self.handle_spanners(repeat_segment.tick, repeat_segment.end_tick(), offset);
        self.handle_measure_repeats(&measure_repeats, offset);
    }

    fn handle_annotations(&mut self, segment: &Segment, position: Tick, next_position: Option<Tick>) {
        let part_id = self.part_id;
        let mut sound_flags: BTreeMap<StaffIdx, &SoundFlag> = BTreeMap::new();

        for annotation in segment.annotations.iter().filter(|a| a.part == part_id) {
            match &annotation.kind {
                AnnotationKind::Dynamic(dynamic) => {
                    self.update_dynamic_map(annotation.track, dynamic, position, next_position);
                }
                AnnotationKind::PlayingTechnique(annotation) => {
                    self.update_play_tech_map(annotation.technique, position);
                }
                AnnotationKind::StaffText(text) => {
                    if let Some(flag) = text.sound_flag.as_ref().filter(|flag| flag.is_playable()) {
                        sound_flags.entry(flag.staff).or_insert(flag);
                    }
                }
                AnnotationKind::MeasureRepeat(_) | AnnotationKind::Other => {}
            }
        }

        if !sound_flags.is_empty() {
            self.update_playback_params(&sound_flags, position);
        }
    }

    fn update_dynamic_map(&mut self, track: TrackIdx, dynamic: &Dynamic, position: Tick, next_position: Option<Tick>) {
        if !dynamic.play {
            return;
        }

        let source = DynamicSource {
            track,
            voice_assignment: dynamic.voice_assignment,
        };
        let dynamic_type = dynamic.dynamic_type;

        if dynamic_type.is_ordinary() {
            self.apply_dynamic(source, dynamic_level_from_type(dynamic_type), position);
            return;
        }

        if dynamic_type.is_single_note() {
            let previous = self.out.appliable_dynamic_level(track, position);
            self.apply_dynamic(source, dynamic_level_from_type(dynamic_type), position);

            // Only the accented segment changes; the next one is back to the previous level
            if let Some(next_position) = next_position {
                self.apply_dynamic(source, previous, next_position);
            }
            return;
        }

        let Some((from, to)) = dynamic_type.transition() else {
            trace!(?dynamic_type, tick = position, "dynamic has no playback level");
            return;
        };

        let length = dynamic.velocity_change_length;
        if length <= 0 || position.checked_add(length).is_none() {
            trace!(?dynamic_type, tick = position, length, "skipping transition with an invalid length");
            return;
        }

        let level_from = dynamic_level_from_type(from);
        let level_to = dynamic_level_from_type(to);
        let curve = easing_value_curve(
            length,
            self.config.transition_steps,
            level_to - level_from,
            ChangeMethod::Normal,
        );

        for (tick_offset, value) in curve {
            self.apply_dynamic(source, level_from + value, position + tick_offset);
        }
    }

    fn update_play_tech_map(&mut self, technique: PlayingTechniqueType, position: Tick) {
        let Some(articulation) = technique.articulation() else {
            return;
        };

        self.out.play_techniques.insert(position, articulation);

        if technique.cancels_techniques() && self.out.has_sound_flags() {
            let start_track = self.out.start_track;
            for (slot, maps) in self.out.tracks.iter_mut().enumerate() {
                let staff = track_to_staff(start_track + slot);
                maps.params.entry(position).or_default().push(PlaybackParam::new(
                    ParamKind::PlayingTechnique,
                    ORDINARY_PLAYING_TECHNIQUE_CODE,
                    staff,
                ));
            }
        }
    }

    fn update_playback_params(&mut self, flags: &BTreeMap<StaffIdx, &SoundFlag>, position: Tick) {
        let start_track = self.out.start_track;

        for flag in flags.values() {
            for (slot, maps) in self.out.tracks.iter_mut().enumerate() {
                let staff = track_to_staff(start_track + slot);
                let accepted =
                    flag.staff == staff || (flag.apply_to_all_staves && !flags.contains_key(&staff));
                if !accepted {
                    continue;
                }

                let params = maps.params.entry(position).or_default();
                for preset in flag.sound_presets.iter().filter(|preset| !preset.is_empty()) {
                    params.push(PlaybackParam::new(ParamKind::SoundPreset, preset.as_str(), staff));
                }
                if !flag.playing_technique.is_empty() {
                    params.push(PlaybackParam::new(
                        ParamKind::PlayingTechnique,
                        flag.playing_technique.as_str(),
                        staff,
                    ));
                }
            }

            if flag.playing_technique == ORDINARY_PLAYING_TECHNIQUE_CODE {
                self.out.play_techniques.insert(position, ArticulationType::Standard);
            }
        }
    }

    /// Resolve hairpins overlapping the score tick range `[from, to)`.
    fn handle_spanners(&mut self, from: Tick, to: Tick, offset: Tick) {
        let score = self.score;

        for spanner in score.spanners_overlapping(from, to) {
            if !spanner.play || spanner.part != self.part_id {
                continue;
            }
            let SpannerKind::Hairpin(hairpin) = &spanner.kind else {
                continue;
            };

            let Some(end) = spanner.end_tick() else {
                trace!(tick = spanner.tick, ticks = spanner.ticks, "skipping hairpin whose end overflows");
                continue;
            };
            let mut start = spanner.tick;
            if end.checked_sub(start).map_or(true, |duration| duration <= 0) {
                trace!(tick = spanner.tick, "skipping hairpin without duration");
                continue;
            }

            let track = spanner.track;

            // A transition at the hairpin's start has to finish before the hairpin begins
            let start_dynamic = score
                .segment_at(start)
                .and_then(|segment| segment.dynamic_on_track(track));
            if let Some(dynamic) = start_dynamic {
                let length = dynamic.velocity_change_length;
                if dynamic.dynamic_type.transition().is_some() && length > 0 {
                    let Some(shifted) = start.checked_add(length) else {
                        trace!(tick = spanner.tick, "skipping hairpin whose start transition overflows");
                        continue;
                    };
                    start = shifted;
                    if end - start <= 0 {
                        trace!(tick = spanner.tick, "hairpin is covered by its starting transition");
                        continue;
                    }
                }
            }

            if end.checked_add(offset).is_none() {
                trace!(tick = spanner.tick, offset, "skipping hairpin beyond the unrolled timeline");
                continue;
            }

            let level_from = dynamic_level_or(
                hairpin.dynamic_from,
                self.out.appliable_dynamic_level(track, start + offset),
            );
            let nominal_level_to = dynamic_level_or(
                hairpin.dynamic_to,
                self.out.nominal_dynamic_level(track, end + offset),
            );

            let crescendo = hairpin.hairpin_type.is_crescendo();
            let has_nominal_level_to = nominal_level_to != NATURAL_DYNAMIC_LEVEL;
            let use_nominal_level_to = has_nominal_level_to
                && if crescendo {
                    nominal_level_to > level_from
                } else {
                    nominal_level_to < level_from
                };

            let level_to = if use_nominal_level_to {
                nominal_level_to
            } else if crescendo {
                level_from + self.config.hairpin_fallback_step
            } else {
                level_from - self.config.hairpin_fallback_step
            };

            let source = DynamicSource {
                track,
                voice_assignment: hairpin.voice_assignment,
            };
            let curve = easing_value_curve(
                end - start,
                self.config.hairpin_steps,
                level_to - level_from,
                hairpin.change_method,
            );

            for (tick_offset, value) in curve {
                self.apply_dynamic(source, level_from + value, start + tick_offset + offset);
            }

            if has_nominal_level_to && !use_nominal_level_to {
                // The end dynamic goes against the hairpin; it takes over once the hairpin is done
                self.apply_dynamic(source, nominal_level_to, end + offset);
            }
        }
    }

    fn handle_measure_repeats(&mut self, measure_repeats: &[(MeasureIdx, &MeasureRepeat)], offset: Tick) {
        let score = self.score;

        for &(group_start, measure_repeat) in measure_repeats {
            let num_measures = measure_repeat.num_measures;
            let mut current = group_start;

            let Some(mut referring) = score.referring_measure(current, num_measures) else {
                trace!(measure = group_start, "measure repeat has nothing to repeat");
                continue;
            };
            let (Some(current_measure), Some(referring_measure)) =
                (score.measure(current), score.measure(referring))
            else {
                continue;
            };
            let shift = current_measure.tick - referring_measure.tick;

            for _ in 0..num_measures {
                let Some(source) = score.measure(referring) else {
                    break;
                };
                self.out
                    .copy_range(source.tick + offset, source.end_tick() + offset, shift);

                current = match score.next_measure(current) {
                    Some(next) => next,
                    None => break,
                };
                referring = match score.referring_measure(current, num_measures) {
                    Some(next) => next,
                    None => break,
                };
            }
        }
    }

    fn apply_dynamic(&mut self, source: DynamicSource, level: DynamicLevel, tick: Tick) {
        let priority = source.voice_assignment.priority();
        let start_track = self.out.start_track;

        for (slot, maps) in self.out.tracks.iter_mut().enumerate() {
            if !source.accepts(start_track + slot) {
                continue;
            }

            maps.dynamics
                .entry(tick)
                .and_modify(|info| {
                    if info.priority < priority {
                        *info = DynamicInfo { level, priority };
                    }
                })
                .or_insert(DynamicInfo { level, priority });
        }
    }
}
