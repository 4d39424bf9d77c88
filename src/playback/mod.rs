//! # Playback Module
//!
//! Resolve the playback intent of a score part: how loud, with which technique,
//! and with which sound parameters every track plays at every tick.
//!
//! ## Purpose
//! Scores mark performance intent in many overlapping ways. This module reduces
//! them to per-track timelines a renderer can read:
//! 1. **Dynamics** - levels from dynamics, accents, transitions and hairpins
//! 2. **Articulation** - the persistent playing technique of the part
//! 3. **Parameters** - sound presets and techniques requested by sound flags
//!
//! ## Sub-modules
//! - `types` - Dynamic scale, articulations, parameters and map types
//! - `easing` - Easing curves for hairpins and transitional dynamics
//! - `context` - The resolver itself
//! - `rendering` - Rendering contexts and note events built on a resolved part
//!
//! ## Key Types
//! - [`PlaybackContext`] - Resolves and owns the maps of one part
//! - [`Resolution`] - One complete, immutable resolution result
//! - [`DynamicInfo`] - A resolved level with the priority of its source
//! - [`PlaybackParam`] - A sound preset or playing technique, tagged with its staff
//!
//! ## Entry Point
//! [`PlaybackContext::update`] - Resolve a part of a [`Score`](crate::Score)
//!
//! ## Example
//! ```rust
//! use gen_playback::{PlaybackContext, Score};
//! use gen_playback::playback::ArticulationType;
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
//!           - { kind: playing-technique, track: 0, part: 1, technique: pizzicato }
//!       - tick: 960
//!         annotations:
//!           - { kind: playing-technique, track: 0, part: 1, technique: arco }
//! "#).unwrap();
//!
//! let mut ctx = PlaybackContext::new();
//! ctx.update(1, &score).unwrap();
//!
//! assert_eq!(ctx.persistent_articulation_type(480), ArticulationType::Pizzicato);
//! assert_eq!(ctx.persistent_articulation_type(1000), ArticulationType::Arco);
//! ```
//!
//! ## Tick Spaces
//!
//! Every map is keyed by *unrolled* ticks: a measure played twice by a repeat
//! has its markings resolved twice, at two different positions. Queries take
//! unrolled ticks as well. The timestamp projections (`*_layers`, `*_map`)
//! convert through the score's tempo map at read time.
//!
//! ## Write Priority
//!
//! Dynamics and hairpins carry a voice assignment. It limits the tracks a write
//! touches and decides conflicts at the same tick: a broader scope replaces a
//! narrower one, never the reverse, and equal scopes keep the first write.
//!
//! ## Related Modules
//! - `score` - The read-only score model the resolver walks
//! - `config` - Step counts used for the easing curves

mod context;
mod easing;
mod types;

pub mod rendering;


pub use context::{PlaybackContext, Resolution};
pub use easing::{easing_value_curve, ChangeMethod};
pub use types::*;
