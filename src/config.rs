//! Resolver configuration.
//!
//! The defaults are the values every playback session uses; a YAML document can
//! override any of them, with missing keys falling back to the defaults:
//!
//! ```rust
//! use gen_playback::ResolverConfig;
//!
//! let config = ResolverConfig::from_yaml("hairpin-steps: 12").unwrap();
//! assert_eq!(config.hairpin_steps, 12);
//! assert_eq!(config.transition_steps, 6);
//! ```

use serde::Deserialize;

use crate::error::PlaybackError;
use crate::playback::{DynamicLevel, DYNAMIC_LEVEL_STEP};

/// Tuning knobs for [`PlaybackContext`](crate::PlaybackContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResolverConfig {
    /// Number of easing steps written for a hairpin.
    pub hairpin_steps: u32,
    /// Number of easing steps written for a transitional dynamic (fp, sfp, ...).
    pub transition_steps: u32,
    /// Level change assumed for a hairpin with no usable end dynamic.
    pub hairpin_fallback_step: DynamicLevel,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            hairpin_steps: 24,
            transition_steps: 6,
            hairpin_fallback_step: DYNAMIC_LEVEL_STEP,
        }
    }
}

impl ResolverConfig {
    /// Parse a configuration from YAML.
    pub fn from_yaml(content: &str) -> Result<Self, PlaybackError> {
        // An empty document is a valid "all defaults" configuration.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|e| PlaybackError::ConfigError(e.to_string()))
    }
}
