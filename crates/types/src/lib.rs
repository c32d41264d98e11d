//! # PharmaGuard Types
//!
//! Wire models shared by the PharmaGuard client crates.
//!
//! This crate holds the JSON shapes exchanged with the analysis service and the small validated
//! primitives built on top of them:
//! - [`AnalysisResponse`] and its per-drug [`DrugOutcome`] entries
//! - [`DrugName`], the upper-cased drug identifier sent to the service
//! - strict JSON decoding that reports the failing field path
//!
//! **No transport concerns**: HTTP, caching and views live in `pharmaguard-core`.

pub mod analysis;

pub use analysis::{
    is_drug_result, AnalysisResponse, ClinicalRecommendation, DrugOutcome, DrugResult,
    DrugsResponse, LlmExplanation, PharmacogenomicProfile, QualityMetrics, RegenerateResponse,
    RiskAssessment, RiskLabel, Severity, UnsupportedDrugResult, PROFILE_KEY,
};

use serde::de::DeserializeOwned;

/// Errors that can occur when building or decoding wire types.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The drug name was empty or contained only whitespace
    #[error("drug name cannot be empty")]
    EmptyDrugName,

    /// JSON text did not match the expected wire schema
    #[error("{what} schema mismatch at {path}: {message}")]
    Schema {
        what: &'static str,
        path: String,
        message: String,
    },

    #[error("failed to serialise {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for Results that can fail with a [`TypesError`].
pub type TypesResult<T> = Result<T, TypesError>;

/// Decode JSON text into `T`, reporting the path of the first mismatching field.
///
/// `what` names the payload in the resulting error (for example `"analysis"`).
pub fn from_json_str<T: DeserializeOwned>(what: &'static str, text: &str) -> TypesResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(text);

    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        TypesError::Schema {
            what,
            path,
            message: source.to_string(),
        }
    })
}

/// A drug identifier as sent to the analysis service.
///
/// The input is trimmed and upper-cased during construction, so `" codeine "` and `"CODEINE"`
/// produce the same value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrugName(String);

impl DrugName {
    /// Creates a new `DrugName` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TypesError::EmptyDrugName)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> TypesResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyDrugName);
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DrugName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DrugName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for DrugName {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for DrugName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DrugName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DrugName::new(&s).map_err(serde::de::Error::custom)
    }
}
