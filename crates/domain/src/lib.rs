//! # pulsearc-domain
//!
//! Domain types shared by every source adapter and the markdown writer:
//! the row value space, source descriptor configuration, the error
//! taxonomy, and the write-action vocabulary.
//!
//! This crate has no knowledge of connection pools, HTTP clients, or
//! file I/O — those live in `pulsearc-core`. It depends only on
//! `pulsearc-common` for the shared [`pulsearc_common::ErrorClassification`]
//! vocabulary and duration-string parsing.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod config;
pub mod constants;
pub mod errors;
pub mod value;
pub mod write;

pub use config::{CacheSpec, CacheStrategy, ExecFormat, HttpMethod, RetrySpec, SourceConfig, SourceKind};
pub use errors::{ConflictError, SourceError, WriteError};
pub use value::{row_byte_size, row_byte_size_all, row_from_pairs, Row};
pub use write::WriteAction;
