//! # PharmaGuard Core
//!
//! Client logic for the PharmaGuard pharmacogenomics service.
//!
//! This crate contains the two client views and the data access they rely on:
//! - [`SubmissionView`]: file and drug selection, local validation, `analyze`
//! - [`ResultView`]: cache-or-network loading, regeneration, JSON copy and PDF export
//! - [`HttpAnalysisApi`]: the HTTP contract of the analysis service
//! - [`SessionStore`]: the session-scoped analysis cache
//!
//! **No analysis logic**: genotype calling, risk scoring and explanation generation happen
//! server-side and are reached only through [`AnalysisApi`].

pub mod api;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod messages;
pub mod presentation;
pub mod result;
pub mod submission;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AnalysisApi, AnalysisRequest, HttpAnalysisApi};
pub use cache::{cache_key, SessionStore};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use messages::user_message;
pub use presentation::ResultPage;
pub use result::{Clipboard, LoadSource, LoadState, MemoryClipboard, RegenerateOutcome, ResultView};
pub use submission::SubmissionView;
pub use upload::VcfUpload;

pub use pharmaguard_types as types;

use std::sync::Arc;

/// Where the client should go next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Submission,
    Result { analysis_id: String },
}

/// Services shared by every view of one application session.
#[derive(Clone)]
pub struct AppContext {
    config: ClientConfig,
    api: Arc<dyn AnalysisApi>,
    session: SessionStore,
}

impl AppContext {
    /// Context backed by the HTTP client for `config`, with an empty session.
    pub fn new(config: ClientConfig) -> Self {
        let api = Arc::new(HttpAnalysisApi::new(config.clone()));
        Self::with_api(config, api)
    }

    pub fn with_api(config: ClientConfig, api: Arc<dyn AnalysisApi>) -> Self {
        Self {
            config,
            api,
            session: SessionStore::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn submission_view(&self) -> SubmissionView {
        SubmissionView::new(Arc::clone(&self.api), self.session.clone())
    }

    pub fn result_view(&self, analysis_id: impl Into<String>) -> ResultView {
        ResultView::new(
            Arc::clone(&self.api),
            self.session.clone(),
            self.config.clone(),
            analysis_id,
        )
    }

    /// Drop every cached analysis.
    pub fn end_session(&self) {
        tracing::debug!("ending session, {} cached entries dropped", self.session.len());
        self.session.clear();
    }
}
