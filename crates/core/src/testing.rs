//! Shared fixtures for unit tests.

use crate::api::{AnalysisApi, AnalysisRequest};
use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use pharmaguard_types::{AnalysisResponse, LlmExplanation};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) fn sample_analysis_json() -> Value {
    json!({
        "patient_id": "PATIENT_007",
        "analysis_id": "an-42",
        "timestamp": "2026-03-01T09:30:00Z",
        "vcf_hash": "3a7bd3e2360a3d29eea436fcfb7e44c7",
        "audit_id": "audit-9",
        "results": [
            {
                "drug": "CODEINE",
                "pharmacogenomic_profile": {
                    "gene": "CYP2D6",
                    "diplotype": "*1/*4",
                    "phenotype": "IM",
                    "detected_variants": ["rs3892097"],
                    "activity_score": 1.0
                },
                "risk_assessment": {
                    "risk_label": "Adjust Dosage",
                    "confidence_score": 0.85,
                    "severity": "moderate",
                    "rationale": "Reduced CYP2D6 activity"
                },
                "clinical_recommendation": {
                    "action": "Use label-recommended dosing and monitor response.",
                    "monitoring": "Watch for inadequate pain relief.",
                    "alternative_drugs": ["MORPHINE"]
                },
                "quality_metrics": { "vcf_parsing_success": true },
                "llm_explanation": {
                    "summary": "Codeine may work less well.",
                    "mechanism": "One non-functional CYP2D6 allele.",
                    "citation": "CPIC codeine guideline"
                }
            },
            {
                "drug": "CLOPIDOGREL",
                "pharmacogenomic_profile": {
                    "gene": "CYP2C19",
                    "diplotype": "*2/*2",
                    "phenotype": "PM",
                    "detected_variants": ["rs4244285", "rs12769205"]
                },
                "risk_assessment": {
                    "risk_label": "Ineffective",
                    "confidence_score": 0.9,
                    "severity": "high"
                },
                "clinical_recommendation": {
                    "action": "Avoid clopidogrel.",
                    "alternative_drugs": ["PRASUGREL", "TICAGRELOR"]
                },
                "quality_metrics": {},
                "llm_explanation": {
                    "summary": "Clopidogrel is not activated.",
                    "mechanism": "CYP2C19 loss of function.",
                    "citation": "CPIC clopidogrel guideline"
                }
            },
            {
                "drug": "ASPIRIN",
                "risk_assessment": {
                    "risk_label": "Unknown",
                    "confidence_score": 0.0,
                    "severity": "none"
                },
                "clinical_recommendation": {
                    "action": "No pharmacogenomic guidance available."
                }
            }
        ]
    })
}

pub(crate) fn sample_analysis() -> AnalysisResponse {
    serde_json::from_value(sample_analysis_json()).expect("sample analysis is valid")
}

pub(crate) fn fresh_explanation(tag: &str) -> LlmExplanation {
    LlmExplanation {
        summary: format!("{tag} summary"),
        mechanism: format!("{tag} mechanism"),
        citation: format!("{tag} citation"),
    }
}

/// In-memory [`AnalysisApi`] that records how often each operation was called.
#[derive(Default)]
pub(crate) struct FakeApi {
    pub analysis: Option<AnalysisResponse>,
    pub analyze_failure: Option<fn() -> ClientError>,
    pub drugs: Vec<String>,
    pub explanation: Option<LlmExplanation>,
    /// Reply with an explanation derived from the drug name instead of `explanation`.
    pub explain_per_drug: bool,
    /// When set, regeneration waits for a notification before replying.
    pub regenerate_gate: Option<Arc<tokio::sync::Notify>>,
    pub analyze_calls: AtomicUsize,
    pub list_drugs_calls: AtomicUsize,
    pub get_results_calls: AtomicUsize,
    pub regenerate_calls: AtomicUsize,
    pub last_drugs_field: Mutex<Option<String>>,
}

impl FakeApi {
    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisApi for FakeApi {
    async fn analyze(&self, request: AnalysisRequest) -> ClientResult<AnalysisResponse> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_drugs_field.lock() = Some(request.drugs_field());

        if let Some(failure) = self.analyze_failure {
            return Err(failure());
        }
        self.analysis
            .clone()
            .ok_or_else(|| ClientError::Server("Internal Server Error".into()))
    }

    async fn list_drugs(&self) -> ClientResult<Vec<String>> {
        self.list_drugs_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.drugs.clone())
    }

    async fn get_results(&self, analysis_id: &str) -> ClientResult<AnalysisResponse> {
        self.get_results_calls.fetch_add(1, Ordering::SeqCst);
        self.analysis
            .clone()
            .filter(|analysis| analysis.analysis_id == analysis_id)
            .ok_or(ClientError::NotFound)
    }

    async fn regenerate_explanation(
        &self,
        _analysis_id: &str,
        drug: &str,
    ) -> ClientResult<LlmExplanation> {
        self.regenerate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.regenerate_gate {
            gate.notified().await;
        }
        if self.explain_per_drug {
            return Ok(fresh_explanation(drug));
        }
        self.explanation.clone().ok_or(ClientError::Regenerate)
    }
}
