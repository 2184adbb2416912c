//! Owns every configured source for a site and the caches they share.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use pulsearc_common::cache::Cache;
use pulsearc_domain::{CacheSpec, Row, SourceConfig, SourceError, SourceKind};

use crate::adapters::{csv_file, exec, graphql, json_file, markdown, pg, rest, sqlite};
use crate::cached::CachedSource;
use crate::source::SourceHandle;

/// Owns every source configured for one site: their caches and adapter
/// resources. Created per site, closed on shutdown. Never referenced by
/// the adapters or wrappers it owns — invalidation-after-write is
/// routed through each `CachedSource`'s own reference to its cache, and
/// the registry keeps a second reference to the same `Arc<Cache<_>>`
/// purely so an external caller can force-invalidate without going
/// through a write. Neither direction creates a cycle back into the
/// registry.
pub struct Registry {
    handles: HashMap<String, SourceHandle>,
    caches: HashMap<String, Arc<Cache<Vec<Row>>>>,
}

impl Registry {
    /// Builds every adapter named in `configs`, rooted at `site_dir` for
    /// relative file paths (`exec`'s working directory, `json`/`csv`/
    /// `markdown`'s file paths, `graphql`'s query file). Fails fast on
    /// the first descriptor that does not validate.
    pub async fn build(configs: Vec<SourceConfig>, site_dir: &Path) -> Result<Self, SourceError> {
        let mut handles = HashMap::with_capacity(configs.len());
        let mut caches = HashMap::with_capacity(configs.len());
        for config in configs {
            let name = config.name.clone();
            let cache = Arc::new(Cache::new());
            let spec = config.cache.clone();
            let handle = build_handle(&config, site_dir, Arc::clone(&cache), spec).await?;
            handles.insert(name.clone(), handle);
            caches.insert(name, cache);
        }
        Ok(Self { handles, caches })
    }

    /// Looks up a registered source by name.
    pub fn get(&self, name: &str) -> Option<&SourceHandle> {
        self.handles.get(name)
    }

    /// Invalidates the named source's cache entry without closing it.
    pub fn invalidate_cache(&self, name: &str) {
        if let Some(cache) = self.caches.get(name) {
            cache.invalidate(name);
        }
    }

    /// Invalidates every registered source's cache entry.
    pub fn invalidate_all_caches(&self) {
        for cache in self.caches.values() {
            cache.invalidate_all();
        }
    }

    /// Closes every registered source, collecting the first error (if
    /// any) while still attempting to close the rest.
    pub async fn close(&self) -> Result<(), SourceError> {
        let mut first_err = None;
        for handle in self.handles.values() {
            if let Err(err) = handle.as_source().close().await {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

async fn build_handle(
    config: &SourceConfig,
    site_dir: &Path,
    cache: Arc<Cache<Vec<Row>>>,
    cache_spec: CacheSpec,
) -> Result<SourceHandle, SourceError> {
    match &config.kind {
        SourceKind::Exec { .. } => {
            let adapter = Arc::new(exec::ExecSource::new(config, site_dir)?);
            Ok(SourceHandle::ReadOnly(Arc::new(CachedSource::new(adapter, cache, cache_spec))))
        }
        SourceKind::Pg { .. } => {
            let adapter = Arc::new(pg::PgSource::new(config).await?);
            Ok(SourceHandle::ReadOnly(Arc::new(CachedSource::new(adapter, cache, cache_spec))))
        }
        SourceKind::Rest { .. } => {
            let adapter = Arc::new(rest::RestSource::new(config)?);
            Ok(SourceHandle::ReadOnly(Arc::new(CachedSource::new(adapter, cache, cache_spec))))
        }
        SourceKind::Graphql { .. } => {
            let adapter = Arc::new(graphql::GraphqlSource::new(config, site_dir)?);
            Ok(SourceHandle::ReadOnly(Arc::new(CachedSource::new(adapter, cache, cache_spec))))
        }
        SourceKind::Json { .. } => {
            let adapter = Arc::new(json_file::JsonFileSource::new(config, site_dir)?);
            Ok(SourceHandle::ReadOnly(Arc::new(CachedSource::new(adapter, cache, cache_spec))))
        }
        SourceKind::Csv { .. } => {
            let adapter = Arc::new(csv_file::CsvFileSource::new(config, site_dir)?);
            Ok(SourceHandle::ReadOnly(Arc::new(CachedSource::new(adapter, cache, cache_spec))))
        }
        SourceKind::Sqlite { readonly, .. } => {
            let adapter = Arc::new(sqlite::SqliteSource::new(config, site_dir)?);
            if *readonly {
                Ok(SourceHandle::ReadOnly(Arc::new(CachedSource::new(adapter, cache, cache_spec))))
            } else {
                Ok(SourceHandle::Writable(Arc::new(CachedSource::new(adapter, cache, cache_spec))))
            }
        }
        SourceKind::Markdown { readonly, .. } => {
            let adapter = Arc::new(markdown::MarkdownSource::new(config, site_dir)?);
            if *readonly {
                Ok(SourceHandle::ReadOnly(Arc::new(CachedSource::new(adapter, cache, cache_spec))))
            } else {
                Ok(SourceHandle::Writable(Arc::new(CachedSource::new(adapter, cache, cache_spec))))
            }
        }
    }
}
