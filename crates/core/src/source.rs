//! The `Source` / `WritableSource` interface every adapter implements.

use async_trait::async_trait;
use pulsearc_domain::{Row, SourceError, WriteAction, WriteError};
use tokio_util::sync::CancellationToken;

/// A readable data source: something that can be asked to produce rows.
///
/// Implementors hold state only between fetches (a connection pool, an
/// HTTP client, a compiled query) — not per-call state. `fetch` is
/// expected to be called concurrently by a [`crate::cached::CachedSource`]
/// wrapper and a direct caller alike, so it must not assume exclusive
/// access to `&self`.
#[async_trait]
pub trait Source: Send + Sync {
    /// The name this source was registered under.
    fn name(&self) -> &str;

    /// Fetches the current rows, respecting `cancel`.
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Vec<Row>, SourceError>;

    /// Releases held resources (connection pool, file handles). Called
    /// once, at registry shutdown.
    async fn close(&self) -> Result<(), SourceError>;
}

/// A [`Source`] that additionally accepts mutations.
#[async_trait]
pub trait WritableSource: Source {
    /// Applies a single write action and persists it.
    async fn write_item(
        &self,
        cancel: &CancellationToken,
        action: WriteAction,
    ) -> Result<(), WriteError>;

    /// Whether this source currently refuses writes.
    fn is_readonly(&self) -> bool;
}

/// A handle returned by [`crate::registry::Registry::get`]: either a
/// read-only or a writable source, type-erased behind a trait object so
/// the registry can hold adapters of differing concrete types uniformly.
pub enum SourceHandle {
    ReadOnly(std::sync::Arc<dyn Source>),
    Writable(std::sync::Arc<dyn WritableSource>),
}

impl SourceHandle {
    /// The underlying [`Source`] view, available regardless of
    /// writability.
    pub fn as_source(&self) -> &dyn Source {
        match self {
            SourceHandle::ReadOnly(source) => source.as_ref(),
            SourceHandle::Writable(source) => source.as_ref(),
        }
    }

    /// The underlying [`WritableSource`] view, if this handle is
    /// writable.
    pub fn as_writable(&self) -> Option<&dyn WritableSource> {
        match self {
            SourceHandle::ReadOnly(_) => None,
            SourceHandle::Writable(source) => Some(source.as_ref()),
        }
    }
}
