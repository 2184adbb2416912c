//! # PulseArc Core
//!
//! Adapters, the resilient/cached source wrapper, and the per-site
//! registry that wires them together. No adapter is reachable except
//! through a [`Registry`]; no part of this crate parses the site
//! configuration document itself, only the already-decoded
//! [`pulsearc_domain::SourceConfig`] descriptors.

pub mod adapters;
pub mod cached;
pub mod registry;
pub mod source;

pub use cached::{CacheInfo, CachedSource};
pub use registry::Registry;
pub use source::{Source, SourceHandle, WritableSource};
