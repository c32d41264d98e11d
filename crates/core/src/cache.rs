//! Session-scoped analysis cache.
//!
//! The store is a string key-value map that lives as long as the application session. Analyses
//! are written under `pharmaguard-{analysis_id}` as compact JSON. Clones share the same entries,
//! so the submission and result views see one cache. [`SessionStore::clear`] ends the session.

use crate::constants::CACHE_KEY_PREFIX;
use crate::ClientResult;
use parking_lot::RwLock;
use pharmaguard_types::AnalysisResponse;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache key for an analysis id.
pub fn cache_key(analysis_id: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{analysis_id}")
}

#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    pub fn set_item(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Drop every entry. Called when the session ends.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Read a cached analysis.
    ///
    /// Entries that fail to decode are treated as absent so the caller falls back to the
    /// network.
    pub fn load_analysis(&self, analysis_id: &str) -> Option<AnalysisResponse> {
        let key = cache_key(analysis_id);
        let raw = self.get_item(&key)?;

        match AnalysisResponse::from_json(&raw) {
            Ok(analysis) => {
                tracing::debug!("session cache hit: {}", key);
                Some(analysis)
            }
            Err(e) => {
                tracing::warn!("ignoring unreadable session cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Write an analysis under its own id, replacing any previous entry.
    pub fn store_analysis(&self, analysis: &AnalysisResponse) -> ClientResult<()> {
        let json = analysis.to_json()?;
        self.set_item(cache_key(&analysis.analysis_id), json);
        Ok(())
    }
}
