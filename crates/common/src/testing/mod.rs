//! Test helpers shared across crates: temp files/dirs for adapters that
//! touch the filesystem (markdown, json/csv file, sqlite). Deterministic
//! time mocking lives with the thing it mocks, in
//! [`crate::resilience::MockClock`].

pub mod temp;

pub use temp::{TempDir, TempFile};
