//! Revalidating content cache for menu, gallery and home-page reads
//!
//! An entry is fresh for `ttl`. A request hitting a stale or missing entry
//! regenerates it; if regeneration fails while a stale copy exists, the
//! stale copy is served.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{ServiceError, ServiceResult};

struct CacheEntry {
    value: Arc<Value>,
    refreshed_at: Instant,
}

#[derive(Clone)]
pub struct ContentCache {
    entries: Arc<RwLock<HashMap<&'static str, CacheEntry>>>,
    ttl: Duration,
}

impl ContentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Return the cached value for `key`, regenerating it with `load` when stale
    pub async fn get_or_refresh<T, F, Fut>(
        &self,
        key: &'static str,
        load: F,
    ) -> ServiceResult<Arc<Value>>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ServiceResult<T>>,
    {
        let stale = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.refreshed_at.elapsed() < self.ttl => {
                    return Ok(entry.value.clone());
                }
                Some(entry) => Some(entry.value.clone()),
                None => None,
            }
        };

        let fresh = match load().await {
            Ok(v) => serde_json::to_value(v).map_err(|e| ServiceError::Db(e.into())),
            Err(e) => Err(e),
        };

        match fresh {
            Ok(value) => {
                let value = Arc::new(value);
                self.entries.write().await.insert(
                    key,
                    CacheEntry {
                        value: value.clone(),
                        refreshed_at: Instant::now(),
                    },
                );
                Ok(value)
            }
            Err(ServiceError::Db(e)) if stale.is_some() => {
                tracing::warn!(key, error = %e, "Content regeneration failed, serving stale copy");
                stale.ok_or(ServiceError::Db(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Drop an entry so the next read regenerates it
    pub async fn invalidate(&self, key: &'static str) {
        self.entries.write().await.remove(key);
    }
}
