//! Analysis result wire models.
//!
//! These types mirror the JSON returned by the analysis service. A response carries one entry
//! per requested drug. Entries for drugs with pharmacogenomic coverage include a gene profile;
//! entries for unsupported drugs do not.
//!
//! On the wire the two entry shapes carry no tag. [`DrugOutcome`] resolves the variant once,
//! at deserialisation time, by checking for the [`PROFILE_KEY`] key, and serialises back to the
//! same untagged shape so cached JSON stays byte-compatible with what the service sent.

use crate::{from_json_str, TypesError, TypesResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// JSON key whose presence marks a supported-drug result.
pub const PROFILE_KEY: &str = "pharmacogenomic_profile";

/// Structural predicate over raw JSON: `true` iff `value` is an object carrying
/// [`PROFILE_KEY`].
pub fn is_drug_result(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|fields| fields.contains_key(PROFILE_KEY))
}

/// Full analysis returned by `POST /analyze` and `GET /results/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub patient_id: String,
    pub analysis_id: String,
    pub timestamp: String,
    pub results: Vec<DrugOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcf_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<String>,
}

impl AnalysisResponse {
    /// Parse an analysis from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::Schema`] with the failing field path if the text does not match
    /// the wire schema.
    pub fn from_json(text: &str) -> TypesResult<Self> {
        from_json_str("analysis", text)
    }

    /// Serialise to compact JSON, as stored in the session cache.
    pub fn to_json(&self) -> TypesResult<String> {
        serde_json::to_string(self).map_err(|source| TypesError::Serialization {
            what: "analysis",
            source,
        })
    }

    /// Serialise to two-space indented JSON, as copied to the clipboard.
    pub fn to_json_pretty(&self) -> TypesResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| TypesError::Serialization {
            what: "analysis",
            source,
        })
    }

    pub fn first_result(&self) -> Option<&DrugOutcome> {
        self.results.first()
    }

    /// Find the result entry for `drug` (exact match on the service's drug string).
    pub fn result(&self, drug: &str) -> Option<&DrugOutcome> {
        self.results.iter().find(|outcome| outcome.drug() == drug)
    }

    /// Replace `llm_explanation` on every supported-drug entry whose drug equals `drug`.
    ///
    /// All other fields are left untouched. Returns `true` if at least one entry changed.
    pub fn replace_explanation(&mut self, drug: &str, explanation: &LlmExplanation) -> bool {
        let mut replaced = false;
        for outcome in &mut self.results {
            if let DrugOutcome::Genomic(result) = outcome {
                if result.drug == drug {
                    result.llm_explanation = Some(explanation.clone());
                    replaced = true;
                }
            }
        }
        replaced
    }
}

/// One per-drug entry of an analysis.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DrugOutcome {
    /// Drug with pharmacogenomic coverage.
    Genomic(DrugResult),
    /// Drug without coverage; risk and recommendation only.
    Unsupported(UnsupportedDrugResult),
}

impl DrugOutcome {
    pub fn is_drug_result(&self) -> bool {
        matches!(self, DrugOutcome::Genomic(_))
    }

    pub fn drug(&self) -> &str {
        match self {
            DrugOutcome::Genomic(result) => &result.drug,
            DrugOutcome::Unsupported(result) => &result.drug,
        }
    }

    pub fn risk_assessment(&self) -> &RiskAssessment {
        match self {
            DrugOutcome::Genomic(result) => &result.risk_assessment,
            DrugOutcome::Unsupported(result) => &result.risk_assessment,
        }
    }

    pub fn clinical_recommendation(&self) -> &ClinicalRecommendation {
        match self {
            DrugOutcome::Genomic(result) => &result.clinical_recommendation,
            DrugOutcome::Unsupported(result) => &result.clinical_recommendation,
        }
    }

    pub fn profile(&self) -> Option<&PharmacogenomicProfile> {
        match self {
            DrugOutcome::Genomic(result) => Some(&result.pharmacogenomic_profile),
            DrugOutcome::Unsupported(_) => None,
        }
    }

    pub fn llm_explanation(&self) -> Option<&LlmExplanation> {
        match self {
            DrugOutcome::Genomic(result) => result.llm_explanation.as_ref(),
            DrugOutcome::Unsupported(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for DrugOutcome {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if is_drug_result(&value) {
            serde_json::from_value(value)
                .map(DrugOutcome::Genomic)
                .map_err(serde::de::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(DrugOutcome::Unsupported)
                .map_err(serde::de::Error::custom)
        }
    }
}

/// Result for a drug with pharmacogenomic coverage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrugResult {
    pub drug: String,
    pub pharmacogenomic_profile: PharmacogenomicProfile,
    pub risk_assessment: RiskAssessment,
    pub clinical_recommendation: ClinicalRecommendation,
    #[serde(default)]
    pub quality_metrics: QualityMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_explanation: Option<LlmExplanation>,
}

/// Result for a drug the service has no gene coverage for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnsupportedDrugResult {
    pub drug: String,
    pub risk_assessment: RiskAssessment,
    pub clinical_recommendation: ClinicalRecommendation,
}

/// Sequencing and parsing quality indicators, kept verbatim.
pub type QualityMetrics = serde_json::Map<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_label: RiskLabel,
    /// Model confidence in `[0, 1]`.
    pub confidence_score: f64,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl RiskAssessment {
    /// Confidence as a whole percentage, clamped to `0..=100`.
    pub fn confidence_percent(&self) -> u8 {
        let clamped = self.confidence_score.clamp(0.0, 1.0);
        (clamped * 100.0).round() as u8
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PharmacogenomicProfile {
    /// Primary gene, e.g. `CYP2D6`.
    pub gene: String,
    pub diplotype: String,
    pub phenotype: String,
    #[serde(default)]
    pub detected_variants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_number: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecommendation {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_adjustment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_drugs: Vec<String>,
}

/// Generated plain-language explanation. The only part of an analysis that changes after
/// creation (via regeneration).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmExplanation {
    pub summary: String,
    pub mechanism: String,
    pub citation: String,
}

/// Body of `POST /regenerate-explanation`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerateResponse {
    pub llm_explanation: LlmExplanation,
}

/// Body of `GET /drugs`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugsResponse {
    #[serde(default)]
    pub drugs: Vec<String>,
}

/// Risk category assigned to a drug.
///
/// Labels the client does not know are kept as [`RiskLabel::Other`] rather than rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLabel {
    Safe,
    AdjustDosage,
    Toxic,
    Ineffective,
    Unknown,
    Other(String),
}

impl RiskLabel {
    /// Wire string, e.g. `"Adjust Dosage"`.
    pub fn as_str(&self) -> &str {
        match self {
            RiskLabel::Safe => "Safe",
            RiskLabel::AdjustDosage => "Adjust Dosage",
            RiskLabel::Toxic => "Toxic",
            RiskLabel::Ineffective => "Ineffective",
            RiskLabel::Unknown => "Unknown",
            RiskLabel::Other(label) => label,
        }
    }
}

impl From<String> for RiskLabel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Safe" => RiskLabel::Safe,
            "Adjust Dosage" => RiskLabel::AdjustDosage,
            "Toxic" => RiskLabel::Toxic,
            "Ineffective" => RiskLabel::Ineffective,
            "Unknown" => RiskLabel::Unknown,
            _ => RiskLabel::Other(value),
        }
    }
}

impl From<RiskLabel> for String {
    fn from(value: RiskLabel) -> Self {
        match value {
            RiskLabel::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clinical severity of the assigned risk.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
    Critical,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Other(severity) => severity,
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.as_str() {
            "none" => Severity::None,
            "low" => Severity::Low,
            "moderate" => Severity::Moderate,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Other(value),
        }
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Other(severity) => severity,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
