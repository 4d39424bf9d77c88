pub mod api;
pub mod config;
pub mod error;
pub mod layout;
pub mod playback;
pub mod score;

pub use api::{playback_report, resolve, resolve_with_config, PartReport};
pub use config::ResolverConfig;
pub use error::*;
pub use layout::{Shape, ShapeElement, Skyline, SkylineLine};
pub use playback::{PlaybackContext, Resolution};
pub use score::*;
