//! Submission view.
//!
//! Holds the selected file, the selected drugs, an optional error message and a loading flag.
//! Submission is possible only with a file, at least one drug and no active error. A successful
//! analysis is written to the session cache and the view routes to its result.

use crate::api::{AnalysisApi, AnalysisRequest};
use crate::cache::SessionStore;
use crate::constants::{DEFAULT_DRUG, FALLBACK_DRUGS};
use crate::messages::user_message;
use crate::upload::VcfUpload;
use crate::{ClientError, ClientResult, Route};
use pharmaguard_types::DrugName;
use std::path::Path;
use std::sync::Arc;

pub struct SubmissionView {
    api: Arc<dyn AnalysisApi>,
    session: SessionStore,
    file: Option<VcfUpload>,
    drugs: Vec<DrugName>,
    available_drugs: Vec<String>,
    error: Option<String>,
    loading: bool,
}

/// Clears the loading flag when an analysis ends, including when the request is dropped.
struct LoadingGuard<'a>(&'a mut bool);

impl<'a> LoadingGuard<'a> {
    fn start(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

impl SubmissionView {
    pub fn new(api: Arc<dyn AnalysisApi>, session: SessionStore) -> Self {
        Self {
            api,
            session,
            file: None,
            drugs: DrugName::new(DEFAULT_DRUG).into_iter().collect(),
            available_drugs: FALLBACK_DRUGS.iter().map(|d| d.to_string()).collect(),
            error: None,
            loading: false,
        }
    }

    /// Replace the drug catalogue with the service's list.
    ///
    /// The built-in catalogue stays in place when the service reports no drugs or cannot be
    /// reached.
    pub async fn load_drug_options(&mut self) -> &[String] {
        match self.api.list_drugs().await {
            Ok(drugs) if !drugs.is_empty() => self.available_drugs = drugs,
            Ok(_) => tracing::debug!("service reported no drugs, keeping built-in catalogue"),
            Err(e) => tracing::warn!("failed to load drug catalogue: {}", e),
        }
        &self.available_drugs
    }

    pub fn available_drugs(&self) -> &[String] {
        &self.available_drugs
    }

    /// Select a file. Files over the size limit are rejected: the error is set and the file is
    /// not stored. An accepted file clears any previous error.
    pub fn select_file(&mut self, upload: VcfUpload) -> ClientResult<()> {
        if upload.exceeds_limit() {
            return Err(self.reject_file(ClientError::FileTooLarge {
                size_bytes: upload.size_bytes(),
            }));
        }

        self.file = Some(upload);
        self.error = None;
        Ok(())
    }

    /// Select a file from disk. Oversized files are rejected before they are read.
    pub fn select_file_path(&mut self, path: &Path) -> ClientResult<()> {
        match VcfUpload::from_path(path) {
            Ok(upload) => self.select_file(upload),
            Err(err) => Err(self.reject_file(err)),
        }
    }

    fn reject_file(&mut self, err: ClientError) -> ClientError {
        self.error = Some(user_message(&err.to_string()));
        err
    }

    /// Toggle a drug in or out of the selection. Returns `true` if it is now selected.
    pub fn toggle_drug(&mut self, drug: &str) -> ClientResult<bool> {
        let drug = DrugName::new(drug).map_err(ClientError::InvalidDrug)?;
        if let Some(position) = self.drugs.iter().position(|d| *d == drug) {
            self.drugs.remove(position);
            Ok(false)
        } else {
            self.drugs.push(drug);
            Ok(true)
        }
    }

    /// Replace the whole selection, keeping first-seen order and dropping duplicates.
    pub fn set_drugs<I, S>(&mut self, drugs: I) -> ClientResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected: Vec<DrugName> = Vec::new();
        for drug in drugs {
            let drug = DrugName::new(drug).map_err(ClientError::InvalidDrug)?;
            if !selected.contains(&drug) {
                selected.push(drug);
            }
        }
        self.drugs = selected;
        Ok(())
    }

    pub fn selected_drugs(&self) -> &[DrugName] {
        &self.drugs
    }

    pub fn file(&self) -> Option<&VcfUpload> {
        self.file.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn can_submit(&self) -> bool {
        self.file.is_some() && !self.drugs.is_empty() && self.error.is_none() && !self.loading
    }

    /// Run the analysis.
    ///
    /// On success the response is cached under its id and the result route is returned. On
    /// failure the user-facing message is stored in [`Self::error`] and the error is returned.
    pub async fn submit(&mut self) -> ClientResult<Route> {
        if self.loading {
            return Err(ClientError::Busy);
        }
        let Some(file) = self.file.clone() else {
            return Err(ClientError::NoFile);
        };
        if self.drugs.is_empty() {
            return Err(ClientError::NoDrugs);
        }
        if let Some(error) = &self.error {
            return Err(ClientError::SubmitBlocked(error.clone()));
        }

        let request = AnalysisRequest {
            file,
            drugs: self.drugs.clone(),
        };
        let api = Arc::clone(&self.api);

        let result = {
            let _loading = LoadingGuard::start(&mut self.loading);
            api.analyze(request).await
        };

        match result {
            Ok(analysis) => {
                tracing::info!(
                    "analysis {} completed with {} results",
                    analysis.analysis_id,
                    analysis.results.len()
                );
                if let Err(e) = self.session.store_analysis(&analysis) {
                    tracing::warn!("could not cache analysis {}: {}", analysis.analysis_id, e);
                }
                Ok(Route::Result {
                    analysis_id: analysis.analysis_id,
                })
            }
            Err(err) => {
                tracing::warn!("analysis failed: {}", err);
                self.error = Some(user_message(&err.to_string()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_UPLOAD_BYTES;
    use crate::messages::{FILE_TOO_LARGE, PARSE_FAILED, SERVER_UNREACHABLE};
    use crate::testing::{sample_analysis, FakeApi};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    fn new_view(api: &Arc<FakeApi>) -> (SubmissionView, SessionStore) {
        let session = SessionStore::new();
        let api: Arc<dyn AnalysisApi> = api.clone();
        (SubmissionView::new(api, session.clone()), session)
    }

    fn small_file() -> VcfUpload {
        VcfUpload::new("patient.vcf", b"##fileformat=VCFv4.2\n".to_vec())
    }

    fn oversized_file() -> VcfUpload {
        VcfUpload::new("big.vcf", vec![0u8; MAX_UPLOAD_BYTES as usize + 1])
    }

    #[test]
    fn starts_with_default_drug_and_no_file() {
        let api = Arc::new(FakeApi::default());
        let (view, _) = new_view(&api);

        assert_eq!(view.selected_drugs(), &[DrugName::new("CODEINE").unwrap()]);
        assert!(view.file().is_none());
        assert!(!view.can_submit());
        assert_eq!(view.available_drugs().len(), FALLBACK_DRUGS.len());
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_without_network_call() {
        let api = Arc::new(FakeApi {
            analysis: Some(sample_analysis()),
            ..Default::default()
        });
        let (mut view, _) = new_view(&api);

        let err = view.select_file(oversized_file()).expect_err("too large");
        assert!(matches!(err, ClientError::FileTooLarge { .. }));
        assert_eq!(view.error(), Some(FILE_TOO_LARGE));
        assert!(view.file().is_none());
        assert!(!view.can_submit());

        assert!(matches!(view.submit().await, Err(ClientError::NoFile)));
        assert_eq!(api.analyze_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn oversized_path_is_rejected_before_reading() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.vcf.gz");
        std::fs::File::create(&path)
            .unwrap()
            .set_len(MAX_UPLOAD_BYTES + 10)
            .unwrap();

        let api = Arc::new(FakeApi::default());
        let (mut view, _) = new_view(&api);

        assert!(view.select_file_path(&path).is_err());
        assert_eq!(view.error(), Some(FILE_TOO_LARGE));
        assert!(view.file().is_none());
    }

    #[test]
    fn accepted_file_clears_previous_error() {
        let api = Arc::new(FakeApi::default());
        let (mut view, _) = new_view(&api);

        let _ = view.select_file(oversized_file());
        assert!(view.error().is_some());

        view.select_file(small_file()).unwrap();
        assert_eq!(view.error(), None);
        assert!(view.can_submit());
    }

    #[test]
    fn submit_enabled_iff_file_drugs_and_no_error() {
        let api = Arc::new(FakeApi::default());
        let (mut view, _) = new_view(&api);
        view.select_file(small_file()).unwrap();
        assert!(view.can_submit());

        // Deselecting the only drug disables submission regardless of the file.
        assert!(!view.toggle_drug("codeine").unwrap());
        assert!(view.selected_drugs().is_empty());
        assert!(!view.can_submit());

        assert!(view.toggle_drug("warfarin").unwrap());
        assert!(view.can_submit());

        view.error = Some("something went wrong".into());
        assert!(!view.can_submit());
    }

    #[test]
    fn blank_drug_names_are_rejected_as_input_errors() {
        let api = Arc::new(FakeApi::default());
        let (mut view, _) = new_view(&api);

        let err = view.toggle_drug("   ").expect_err("blank name");
        assert!(matches!(err, ClientError::InvalidDrug(_)));
        assert!(err.to_string().starts_with("invalid drug selection"));

        assert!(matches!(
            view.set_drugs(["warfarin", ""]),
            Err(ClientError::InvalidDrug(_))
        ));
        assert_eq!(view.selected_drugs(), &[DrugName::new("CODEINE").unwrap()]);
    }

    #[tokio::test]
    async fn zero_drugs_never_submits() {
        let api = Arc::new(FakeApi {
            analysis: Some(sample_analysis()),
            ..Default::default()
        });
        let (mut view, _) = new_view(&api);
        view.set_drugs(Vec::<String>::new()).unwrap();

        assert!(!view.can_submit());
        view.select_file(small_file()).unwrap();
        assert!(!view.can_submit());
        assert!(matches!(view.submit().await, Err(ClientError::NoDrugs)));
        assert_eq!(api.analyze_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_submit_caches_and_routes() {
        let api = Arc::new(FakeApi {
            analysis: Some(sample_analysis()),
            ..Default::default()
        });
        let (mut view, session) = new_view(&api);
        view.select_file(small_file()).unwrap();
        view.set_drugs(["codeine", "Clopidogrel", "CODEINE", "aspirin"])
            .unwrap();

        let route = view.submit().await.unwrap();

        assert_eq!(
            route,
            Route::Result {
                analysis_id: "an-42".into()
            }
        );
        assert_eq!(
            api.last_drugs_field.lock().as_deref(),
            Some("CODEINE,CLOPIDOGREL,ASPIRIN")
        );
        assert_eq!(session.load_analysis("an-42"), Some(sample_analysis()));
        assert!(!view.is_loading());
        assert_eq!(view.error(), None);
    }

    #[tokio::test]
    async fn server_error_is_mapped_and_blocks_resubmit() {
        let api = Arc::new(FakeApi {
            analyze_failure: Some(|| ClientError::Server("Invalid VCF header on line 1".into())),
            ..Default::default()
        });
        let (mut view, session) = new_view(&api);
        view.select_file(small_file()).unwrap();

        assert!(view.submit().await.is_err());
        assert_eq!(view.error(), Some(PARSE_FAILED));
        assert!(!view.is_loading());
        assert!(session.is_empty());
        assert!(view.file().is_some());
        assert!(!view.can_submit());
        assert!(matches!(
            view.submit().await,
            Err(ClientError::SubmitBlocked(_))
        ));
        assert_eq!(api.analyze_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_maps_to_server_unreachable() {
        let api = Arc::new(FakeApi {
            analyze_failure: Some(|| ClientError::Aborted(Duration::from_secs(120))),
            ..Default::default()
        });
        let (mut view, _) = new_view(&api);
        view.select_file(small_file()).unwrap();

        assert!(matches!(view.submit().await, Err(ClientError::Aborted(_))));
        assert_eq!(view.error(), Some(SERVER_UNREACHABLE));
        assert!(!view.is_loading());
    }

    #[tokio::test]
    async fn drug_catalogue_falls_back_when_service_lists_none() {
        let api = Arc::new(FakeApi::default());
        let (mut view, _) = new_view(&api);
        assert_eq!(view.load_drug_options().await.len(), FALLBACK_DRUGS.len());

        let api = Arc::new(FakeApi {
            drugs: vec!["CODEINE".into(), "TRAMADOL".into()],
            ..Default::default()
        });
        let (mut view, _) = new_view(&api);
        assert_eq!(view.load_drug_options().await, ["CODEINE", "TRAMADOL"]);
        assert_eq!(api.list_drugs_calls.load(Ordering::SeqCst), 1);
    }
}
