//! Easing curves for continuous dynamic changes
//!
//! Hairpins and transitional dynamics are written into the dynamic map as a
//! fixed number of discrete steps. The curve shape follows the marking's
//! change method.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::score::Tick;

/// How a value moves from its start to its end over a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeMethod {
    /// Linear
    #[default]
    Normal,
    /// Slow start, fast finish
    EaseIn,
    /// Fast start, slow finish
    EaseOut,
    EaseInOut,
    Exponential,
}

impl ChangeMethod {
    /// Map linear progress in `[0, 1]` onto the curve, also in `[0, 1]`.
    fn ease(self, progress: f64) -> f64 {
        match self {
            ChangeMethod::Normal => progress,
            ChangeMethod::EaseIn => progress * progress,
            ChangeMethod::EaseOut => 1.0 - (1.0 - progress) * (1.0 - progress),
            ChangeMethod::EaseInOut => {
                if progress < 0.5 {
                    2.0 * progress * progress
                } else {
                    1.0 - (-2.0 * progress + 2.0).powi(2) / 2.0
                }
            }
            ChangeMethod::Exponential => {
                if progress <= 0.0 {
                    0.0
                } else {
                    2f64.powf(10.0 * (progress - 1.0))
                }
            }
        }
    }
}

/// Sample an easing curve of `amplitude` over `duration` ticks in `steps` steps.
///
/// Returns `steps + 1` points keyed by tick offset, from `0` to `duration`. When
/// two steps round to the same tick (very short durations) the earlier one is kept.
///
/// # Example
/// ```rust
/// use gen_playback::playback::{easing_value_curve, ChangeMethod};
///
/// let curve = easing_value_curve(480, 4, 100, ChangeMethod::Normal);
/// let points: Vec<(i32, i32)> = curve.into_iter().collect();
/// assert_eq!(points, vec![(0, 0), (120, 25), (240, 50), (360, 75), (480, 100)]);
/// ```
pub fn easing_value_curve(duration: Tick, steps: u32, amplitude: i32, method: ChangeMethod) -> BTreeMap<Tick, i32> {
    let mut curve = BTreeMap::new();
    if steps == 0 {
        return curve;
    }

    for step in 0..=steps {
        let progress = f64::from(step) / f64::from(steps);
        let tick = (f64::from(duration) * progress).round() as Tick;
        let value = (f64::from(amplitude) * method.ease(progress)).round() as i32;
        curve.entry(tick).or_insert(value);
    }

    curve
}
