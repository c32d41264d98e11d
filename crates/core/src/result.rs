//! Result view.
//!
//! Shows one analysis, addressed by id. The analysis comes from the session cache when present
//! and from `get_results` otherwise; either way the rendered page is the same. Per-drug toggles,
//! explanation regeneration, JSON copy and PDF export act on the loaded analysis.
//!
//! The view state sits behind a mutex that is never held across an await, so regenerations for
//! different drugs may run concurrently against one view.

use crate::api::AnalysisApi;
use crate::cache::SessionStore;
use crate::config::ClientConfig;
use crate::constants::COPY_FEEDBACK;
use crate::presentation::{ResultPage, ViewToggles};
use crate::{ClientError, ClientResult, Route};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pharmaguard_types::{AnalysisResponse, DrugOutcome};
use reqwest::Url;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum LoadState {
    Loading,
    Ready(AnalysisResponse),
    NotFound,
}

/// Where a successful load found the analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    Network,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegenerateOutcome {
    /// The explanation was replaced and its panel expanded.
    Updated,
    /// A regeneration for this drug is already running; nothing was sent.
    AlreadyRunning,
    /// No analysis is loaded.
    NotLoaded,
    /// The drug has no pharmacogenomic entry in this analysis; nothing was sent.
    NoExplanationSlot,
    /// The request failed; the previous explanation is kept.
    Failed(String),
}

/// Destination for "copy JSON".
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> ClientResult<()>;
}

/// Clipboard that keeps the last copied text in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> ClientResult<()> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}

struct ViewState {
    load: LoadState,
    toggles: ViewToggles,
    copied_at: Option<DateTime<Utc>>,
}

pub struct ResultView {
    api: Arc<dyn AnalysisApi>,
    session: SessionStore,
    config: ClientConfig,
    analysis_id: String,
    state: Mutex<ViewState>,
}

/// Marks a drug as regenerating for as long as it lives.
struct RegeneratingGuard<'a> {
    state: &'a Mutex<ViewState>,
    drug: &'a str,
}

impl Drop for RegeneratingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().toggles.regenerating.remove(self.drug);
    }
}

impl ResultView {
    pub fn new(
        api: Arc<dyn AnalysisApi>,
        session: SessionStore,
        config: ClientConfig,
        analysis_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            session,
            config,
            analysis_id: analysis_id.into(),
            state: Mutex::new(ViewState {
                load: LoadState::Loading,
                toggles: ViewToggles::default(),
                copied_at: None,
            }),
        }
    }

    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }

    /// Load the analysis: session cache first, then exactly one `get_results` call.
    ///
    /// A network result is written to the cache. Any network failure moves the view to
    /// [`LoadState::NotFound`] and returns `None`.
    pub async fn load(&self) -> Option<LoadSource> {
        if let Some(analysis) = self.session.load_analysis(&self.analysis_id) {
            self.state.lock().load = LoadState::Ready(analysis);
            return Some(LoadSource::Cache);
        }

        match self.api.get_results(&self.analysis_id).await {
            Ok(analysis) => {
                if let Err(e) = self.session.store_analysis(&analysis) {
                    tracing::warn!("could not cache analysis {}: {}", self.analysis_id, e);
                }
                self.state.lock().load = LoadState::Ready(analysis);
                Some(LoadSource::Network)
            }
            Err(e) => {
                tracing::info!("analysis {} unavailable: {}", self.analysis_id, e);
                self.state.lock().load = LoadState::NotFound;
                None
            }
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.state.lock().load.clone()
    }

    pub fn analysis(&self) -> Option<AnalysisResponse> {
        match &self.state.lock().load {
            LoadState::Ready(analysis) => Some(analysis.clone()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.state.lock().load, LoadState::NotFound)
    }

    /// Action offered by the not-found state.
    pub fn back_to_submission(&self) -> Route {
        Route::Submission
    }

    /// Presentation of the loaded analysis with the current toggles applied.
    pub fn page(&self) -> Option<ResultPage> {
        let state = self.state.lock();
        match &state.load {
            LoadState::Ready(analysis) => Some(ResultPage::build(analysis, &state.toggles)),
            _ => None,
        }
    }

    /// Expand or collapse the variant list of a drug. Returns `true` if it is now expanded.
    pub fn toggle_variants(&self, drug: &str) -> bool {
        toggle(&mut self.state.lock().toggles.expanded_variants, drug)
    }

    /// Expand or collapse the explanation panel of a drug. Returns `true` if it is now expanded.
    pub fn toggle_explanation(&self, drug: &str) -> bool {
        toggle(&mut self.state.lock().toggles.expanded_explanations, drug)
    }

    pub fn is_regenerating(&self, drug: &str) -> bool {
        self.state.lock().toggles.regenerating.contains(drug)
    }

    /// Request a new explanation for one drug.
    ///
    /// Only that drug's explanation changes, and its panel is expanded. The updated analysis is
    /// written back to the session cache. A second request for a drug that is still regenerating
    /// is refused without a network call, as is a drug without a pharmacogenomic entry.
    /// Failures leave the view unchanged.
    pub async fn regenerate(&self, drug: &str) -> RegenerateOutcome {
        {
            let mut state = self.state.lock();
            let LoadState::Ready(analysis) = &state.load else {
                return RegenerateOutcome::NotLoaded;
            };
            if analysis.result(drug).and_then(DrugOutcome::profile).is_none() {
                return RegenerateOutcome::NoExplanationSlot;
            }
            if !state.toggles.regenerating.insert(drug.to_string()) {
                return RegenerateOutcome::AlreadyRunning;
            }
        }
        let _regenerating = RegeneratingGuard {
            state: &self.state,
            drug,
        };

        let result = self
            .api
            .regenerate_explanation(&self.analysis_id, drug)
            .await;

        let mut state = self.state.lock();
        match result {
            Ok(explanation) => {
                let LoadState::Ready(analysis) = &mut state.load else {
                    return RegenerateOutcome::NotLoaded;
                };
                if !analysis.replace_explanation(drug, &explanation) {
                    tracing::debug!("no explanation slot for {} in {}", drug, self.analysis_id);
                    return RegenerateOutcome::NoExplanationSlot;
                }
                if let Err(e) = self.session.store_analysis(analysis) {
                    tracing::warn!("could not cache analysis {}: {}", self.analysis_id, e);
                }
                state.toggles.expanded_explanations.insert(drug.to_string());
                RegenerateOutcome::Updated
            }
            Err(e) => {
                tracing::warn!(
                    "regenerating explanation for {} in {} failed: {}",
                    drug,
                    self.analysis_id,
                    e
                );
                RegenerateOutcome::Failed(e.to_string())
            }
        }
    }

    /// Copy the analysis as indented JSON and start the "Copied" feedback window.
    pub fn copy_json(&self, clipboard: &mut dyn Clipboard) -> ClientResult<()> {
        let analysis = self.analysis().ok_or(ClientError::NotFound)?;
        clipboard.write_text(&analysis.to_json_pretty()?)?;
        self.state.lock().copied_at = Some(Utc::now());
        Ok(())
    }

    pub fn copied_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().copied_at
    }

    /// Whether the "Copied" feedback is still showing at `now`.
    pub fn copy_feedback_visible_at(&self, now: DateTime<Utc>) -> bool {
        let Some(copied_at) = self.copied_at() else {
            return false;
        };
        match now.signed_duration_since(copied_at).to_std() {
            Ok(elapsed) => elapsed < COPY_FEEDBACK,
            Err(_) => true,
        }
    }

    /// Render the loaded analysis as a PDF report.
    pub fn download_pdf(&self) -> ClientResult<Vec<u8>> {
        let analysis = self.analysis().ok_or(ClientError::NotFound)?;
        Ok(pharmaguard_report::export_pdf(&analysis)?)
    }

    /// Suggested file name for [`Self::download_pdf`].
    pub fn pdf_file_name(&self) -> String {
        pharmaguard_report::file_name(&self.analysis_id)
    }

    pub fn audit_export_url(&self) -> ClientResult<Url> {
        self.config.audit_export_url()
    }
}

fn toggle(set: &mut std::collections::HashSet<String>, drug: &str) -> bool {
    if set.remove(drug) {
        false
    } else {
        set.insert(drug.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fresh_explanation, sample_analysis, FakeApi};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn view_with(api: &Arc<FakeApi>, session: &SessionStore) -> ResultView {
        let config = ClientConfig::new("https://pharmaguard.test", Duration::from_secs(5)).unwrap();
        let api: Arc<dyn AnalysisApi> = api.clone();
        ResultView::new(api, session.clone(), config, "an-42")
    }

    fn networked_api() -> Arc<FakeApi> {
        Arc::new(FakeApi {
            analysis: Some(sample_analysis()),
            explain_per_drug: true,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn cached_analysis_renders_without_network_call() {
        let api = networked_api();
        let session = SessionStore::new();
        session.store_analysis(&sample_analysis()).unwrap();

        let cached = view_with(&api, &session);
        assert_eq!(cached.load().await, Some(LoadSource::Cache));
        assert_eq!(FakeApi::calls(&api.get_results_calls), 0);

        let fetched = view_with(&api, &SessionStore::new());
        assert_eq!(fetched.load().await, Some(LoadSource::Network));
        assert_eq!(FakeApi::calls(&api.get_results_calls), 1);

        assert_eq!(cached.page(), fetched.page());
    }

    #[tokio::test]
    async fn network_load_is_cached() {
        let api = networked_api();
        let session = SessionStore::new();
        let view = view_with(&api, &session);

        assert_eq!(view.load().await, Some(LoadSource::Network));
        assert_eq!(session.load_analysis("an-42"), Some(sample_analysis()));
    }

    #[tokio::test]
    async fn missing_analysis_moves_to_not_found_after_one_call() {
        let api = Arc::new(FakeApi::default());
        let view = view_with(&api, &SessionStore::new());
        assert_eq!(view.load_state(), LoadState::Loading);

        assert_eq!(view.load().await, None);
        assert!(view.is_not_found());
        assert!(view.page().is_none());
        assert_eq!(view.back_to_submission(), Route::Submission);
        assert_eq!(FakeApi::calls(&api.get_results_calls), 1);
    }

    #[tokio::test]
    async fn unreadable_cache_entry_falls_back_to_network() {
        let api = networked_api();
        let session = SessionStore::new();
        session.set_item(crate::cache_key("an-42"), "{not json");
        let view = view_with(&api, &session);

        assert_eq!(view.load().await, Some(LoadSource::Network));
        assert_eq!(FakeApi::calls(&api.get_results_calls), 1);
    }

    #[tokio::test]
    async fn regenerate_updates_only_that_drug_and_expands_panel() {
        let api = networked_api();
        let session = SessionStore::new();
        let view = view_with(&api, &session);
        view.load().await;
        let before = view.analysis().unwrap();

        assert_eq!(view.regenerate("CODEINE").await, RegenerateOutcome::Updated);

        let mut expected = before.clone();
        assert!(expected.replace_explanation("CODEINE", &fresh_explanation("CODEINE")));
        let after = view.analysis().unwrap();
        assert_eq!(after, expected);
        assert_ne!(after, before);

        let page = view.page().unwrap();
        let panel = page.card("CODEINE").unwrap().genomic.as_ref().unwrap();
        assert!(panel.explanation.as_ref().unwrap().expanded);
        let other = page.card("CLOPIDOGREL").unwrap().genomic.as_ref().unwrap();
        assert!(!other.explanation.as_ref().unwrap().expanded);
        assert!(!view.is_regenerating("CODEINE"));

        assert_eq!(session.load_analysis("an-42"), Some(after));
    }

    #[tokio::test]
    async fn regenerate_without_genomic_entry_changes_nothing() {
        let api = networked_api();
        let session = SessionStore::new();
        let view = view_with(&api, &session);
        view.load().await;
        session.clear();
        let page_before = view.page();

        assert_eq!(
            view.regenerate("ASPIRIN").await,
            RegenerateOutcome::NoExplanationSlot
        );
        assert_eq!(
            view.regenerate("NOT_IN_ANALYSIS").await,
            RegenerateOutcome::NoExplanationSlot
        );

        assert_eq!(FakeApi::calls(&api.regenerate_calls), 0);
        assert_eq!(view.analysis(), Some(sample_analysis()));
        assert_eq!(view.page(), page_before);
        assert!(session.is_empty());
        assert!(!view.is_regenerating("ASPIRIN"));
    }

    #[tokio::test]
    async fn second_regenerate_for_same_drug_is_refused_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(FakeApi {
            analysis: Some(sample_analysis()),
            explain_per_drug: true,
            regenerate_gate: Some(Arc::clone(&gate)),
            ..Default::default()
        });
        let view = view_with(&api, &SessionStore::new());
        view.load().await;

        let first = view.regenerate("CODEINE");
        let second = async {
            tokio::task::yield_now().await;
            assert!(view.is_regenerating("CODEINE"));
            let page = view.page().unwrap();
            let panel = page.card("CODEINE").unwrap().genomic.as_ref().unwrap();
            assert!(!panel.explanation.as_ref().unwrap().regenerate_enabled);

            let outcome = view.regenerate("CODEINE").await;
            gate.notify_one();
            outcome
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first, RegenerateOutcome::Updated);
        assert_eq!(second, RegenerateOutcome::AlreadyRunning);
        assert_eq!(FakeApi::calls(&api.regenerate_calls), 1);
        assert!(!view.is_regenerating("CODEINE"));
    }

    #[tokio::test]
    async fn different_drugs_regenerate_concurrently() {
        let api = networked_api();
        let view = view_with(&api, &SessionStore::new());
        view.load().await;

        let (codeine, clopidogrel) =
            tokio::join!(view.regenerate("CODEINE"), view.regenerate("CLOPIDOGREL"));

        assert_eq!(codeine, RegenerateOutcome::Updated);
        assert_eq!(clopidogrel, RegenerateOutcome::Updated);
        let analysis = view.analysis().unwrap();
        assert_eq!(
            analysis.result("CLOPIDOGREL").unwrap().llm_explanation(),
            Some(&fresh_explanation("CLOPIDOGREL"))
        );
        assert_eq!(
            analysis.result("CODEINE").unwrap().llm_explanation(),
            Some(&fresh_explanation("CODEINE"))
        );
        assert_eq!(FakeApi::calls(&api.regenerate_calls), 2);
    }

    #[tokio::test]
    async fn failed_regenerate_keeps_previous_explanation() {
        let api = Arc::new(FakeApi {
            analysis: Some(sample_analysis()),
            ..Default::default()
        });
        let view = view_with(&api, &SessionStore::new());
        view.load().await;
        let page_before = view.page();

        let outcome = view.regenerate("CODEINE").await;

        assert_eq!(outcome, RegenerateOutcome::Failed("Failed to regenerate".into()));
        assert_eq!(view.analysis(), Some(sample_analysis()));
        assert_eq!(view.page(), page_before);
        assert!(!view.is_regenerating("CODEINE"));
    }

    #[tokio::test]
    async fn regenerate_before_load_is_a_no_op() {
        let api = networked_api();
        let view = view_with(&api, &SessionStore::new());

        assert_eq!(view.regenerate("CODEINE").await, RegenerateOutcome::NotLoaded);
        assert_eq!(FakeApi::calls(&api.regenerate_calls), 0);
    }

    #[tokio::test]
    async fn toggles_flip_independently_per_drug() {
        let api = networked_api();
        let view = view_with(&api, &SessionStore::new());
        view.load().await;

        assert!(view.toggle_variants("CLOPIDOGREL"));
        assert!(view.toggle_explanation("CODEINE"));
        let page = view.page().unwrap();
        let clopidogrel = page.card("CLOPIDOGREL").unwrap().genomic.as_ref().unwrap();
        assert_eq!(clopidogrel.visible_variants.len(), 2);
        let codeine = page.card("CODEINE").unwrap().genomic.as_ref().unwrap();
        assert!(codeine.visible_variants.is_empty());

        assert!(!view.toggle_variants("CLOPIDOGREL"));
        let page = view.page().unwrap();
        let clopidogrel = page.card("CLOPIDOGREL").unwrap().genomic.as_ref().unwrap();
        assert!(clopidogrel.visible_variants.is_empty());
    }

    #[tokio::test]
    async fn copy_json_writes_indented_analysis_and_shows_feedback() {
        let api = networked_api();
        let view = view_with(&api, &SessionStore::new());
        let mut clipboard = MemoryClipboard::default();

        assert!(matches!(
            view.copy_json(&mut clipboard),
            Err(ClientError::NotFound)
        ));

        view.load().await;
        view.copy_json(&mut clipboard).unwrap();

        let copied = clipboard.contents().unwrap();
        assert!(copied.contains("\n  \"patient_id\": \"PATIENT_007\""));
        assert_eq!(AnalysisResponse::from_json(copied).unwrap(), sample_analysis());

        let at = view.copied_at().unwrap();
        assert!(view.copy_feedback_visible_at(at + chrono::Duration::milliseconds(1500)));
        assert!(!view.copy_feedback_visible_at(at + chrono::Duration::seconds(2)));
    }

    #[tokio::test]
    async fn pdf_export_needs_a_loaded_analysis() {
        let api = networked_api();
        let view = view_with(&api, &SessionStore::new());
        assert!(matches!(view.download_pdf(), Err(ClientError::NotFound)));

        view.load().await;
        let bytes = view.download_pdf().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(view.pdf_file_name(), "pharmaguard-report-an-42.pdf");
    }

    #[test]
    fn audit_link_is_derived_from_base_url() {
        let api = networked_api();
        let view = view_with(&api, &SessionStore::new());
        assert_eq!(
            view.audit_export_url().unwrap().as_str(),
            "https://pharmaguard.test/audit/export"
        );
    }
}
