//! # Layout Module
//!
//! Vertical collision geometry for laid-out staff systems.
//!
//! ## Sub-modules
//! - `shape` - Rectangles, the items they belong to, and shapes made of them
//! - `skyline` - North/south envelopes with staff-line suppression
//!
//! ## Key Types
//! - [`Skyline`] - Both envelopes of a system, and the distance between systems
//! - [`SkylineLine`] - One envelope
//! - [`Shape`] / [`ShapeElement`] - Item footprints
//!
//! ## Example
//! ```rust
//! use gen_playback::layout::{ItemKind, Rect, ShapeElement, ShapeItem, Skyline};
//!
//! let mut upper = Skyline::new();
//! upper.add(&ShapeElement::new(Rect::new(0.0, 0.0, 100.0, 40.0), Some(ShapeItem::new(1, ItemKind::StaffLines))));
//! upper.add(&ShapeElement::new(Rect::new(10.0, 30.0, 10.0, 20.0), None));
//!
//! let mut lower = Skyline::new();
//! lower.add(&ShapeElement::new(Rect::new(0.0, -5.0, 100.0, 45.0), None));
//!
//! // The note poking 10 below the upper staff collides with the lower one's top
//! assert_eq!(upper.min_distance(&lower), 55.0);
//! ```

mod shape;
mod skyline;

#[cfg(test)]
mod tests;

pub use shape::*;
pub use skyline::{Skyline, SkylineLine, StaffLineEdge};
