//! Constants used throughout the PharmaGuard core crate.
//!
//! Limits, keys and defaults shared by the views and the API client live here so the
//! submission rules and the cache layout stay consistent.

use std::time::Duration;

/// Default analysis service base URL when no explicit URL is configured.
pub const DEFAULT_API_URL: &str = "https://pharmaguard-api.onrender.com";

/// Client-side budget for a single `POST /analyze` round trip.
pub const DEFAULT_ANALYZE_TIMEOUT: Duration = Duration::from_secs(120);

/// Largest upload accepted by the submission view (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Prefix of every session cache key; the analysis id follows it.
pub const CACHE_KEY_PREFIX: &str = "pharmaguard-";

/// File extensions offered by the file picker. Advisory only.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[".vcf", ".vcf.gz", ".vcf.bgz"];

/// Drug preselected in a fresh submission view.
pub const DEFAULT_DRUG: &str = "CODEINE";

/// Drug catalogue used when the service does not report its supported drugs.
pub const FALLBACK_DRUGS: &[&str] = &[
    "CODEINE",
    "WARFARIN",
    "CLOPIDOGREL",
    "SIMVASTATIN",
    "AZATHIOPRINE",
    "FLUOROURACIL",
];

/// How long "Copied" feedback stays visible after copying the JSON.
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

/// Path of the audit export, relative to the API base URL.
pub const AUDIT_EXPORT_PATH: &[&str] = &["audit", "export"];
