//! TOC client-configuration store.
//!
//! TOC clients persist their buddy-list layout server-side as an opaque
//! ASCII blob (`toc_set_config`) and read it back at sign-on. The store is
//! a backend concern; the in-memory implementation backs tests and
//! single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{ScreenName, error::ServiceError};

/// Persistence for per-user TOC configuration blobs.
#[async_trait]
pub trait TocConfigStore: Send + Sync {
    /// Stored configuration for `user`, if any.
    async fn toc_config(&self, user: &ScreenName) -> Result<Option<String>, ServiceError>;

    /// Replace the stored configuration for `user`.
    async fn set_toc_config(&self, user: &ScreenName, config: &str) -> Result<(), ServiceError>;
}

/// In-memory store keyed by canonical screen name.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with per-user configuration blobs.
    pub fn seeded<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ScreenName, String)>,
    {
        let entries =
            entries.into_iter().map(|(user, config)| (user.ident(), config)).collect();
        Self { entries: RwLock::new(entries) }
    }
}

#[async_trait]
impl TocConfigStore for MemoryConfigStore {
    async fn toc_config(&self, user: &ScreenName) -> Result<Option<String>, ServiceError> {
        Ok(self.entries.read().await.get(&user.ident()).cloned())
    }

    async fn set_toc_config(&self, user: &ScreenName, config: &str) -> Result<(), ServiceError> {
        self.entries.write().await.insert(user.ident(), config.to_owned());
        Ok(())
    }
}
