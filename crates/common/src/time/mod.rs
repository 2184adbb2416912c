//! Time utilities: duration-string parsing for configuration fields.

pub mod duration;

pub use duration::{parse_duration, DurationParseError};
