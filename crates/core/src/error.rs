use std::time::Duration;

/// Errors raised by the PharmaGuard client.
///
/// Display strings feed [`crate::messages::user_message`], which picks the user-facing text by
/// keyword. Transport failures therefore mention "Failed to fetch" and timeouts mention
/// "aborted".
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("File exceeds 5MB limit. Please provide a smaller VCF file.")]
    FileTooLarge { size_bytes: u64 },
    #[error("no file selected")]
    NoFile,
    #[error("select at least one drug")]
    NoDrugs,
    #[error("an analysis is already in progress")]
    Busy,
    /// The view still shows an error from an earlier attempt.
    #[error("submission blocked: {0}")]
    SubmitBlocked(String),
    #[error("request aborted after {}s timeout", .0.as_secs())]
    Aborted(Duration),
    #[error("Failed to fetch: {0}")]
    Transport(String),
    /// Non-2xx reply; carries the server `detail` or the HTTP status text.
    #[error("{0}")]
    Server(String),
    #[error("Analysis not found")]
    NotFound,
    #[error("Failed to regenerate")]
    Regenerate,
    #[error("invalid drug selection: {0}")]
    InvalidDrug(#[source] pharmaguard_types::TypesError),
    #[error("invalid response: {0}")]
    Decode(#[from] pharmaguard_types::TypesError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to export report: {0}")]
    Report(#[from] pharmaguard_report::ReportError),
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
