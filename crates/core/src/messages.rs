//! User-facing error messages.
//!
//! Raw error text from validation, transport or the service is mapped onto a fixed set of
//! messages by keyword. Categories are checked in order; the first match wins and unmatched
//! text is shown unchanged.

pub const FILE_TOO_LARGE: &str = "File exceeds 5MB limit. Please provide a smaller VCF file.";

pub const PARSE_FAILED: &str =
    "We couldn't parse this VCF file. Please ensure it's a valid VCF v4.2 format.";

pub const ANALYSIS_FAILED: &str =
    "Analysis failed. Please try again. If problem persists, contact support.";

pub const SERVER_UNREACHABLE: &str = "Failed to connect to server. The backend may be waking up (Render free tier)\u{2014}please wait 1\u{2013}2 minutes and try again.";

/// Map a raw error message onto the text shown to the user.
pub fn user_message(raw: &str) -> String {
    let contains_any = |needles: &[&str]| needles.iter().any(|needle| raw.contains(needle));

    if contains_any(&["5MB"]) {
        FILE_TOO_LARGE.to_string()
    } else if contains_any(&["parse", "VCF"]) {
        PARSE_FAILED.to_string()
    } else if contains_any(&["support", "contact"]) {
        ANALYSIS_FAILED.to_string()
    } else if contains_any(&["fetch", "Failed", "abort"]) {
        SERVER_UNREACHABLE.to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;
    use std::time::Duration;

    #[test]
    fn abort_maps_to_server_unreachable() {
        assert_eq!(user_message("The user aborted a request."), SERVER_UNREACHABLE);
        let timeout = ClientError::Aborted(Duration::from_secs(120));
        assert_eq!(user_message(&timeout.to_string()), SERVER_UNREACHABLE);
    }

    #[test]
    fn vcf_maps_to_parse_failure() {
        assert_eq!(user_message("Invalid VCF header"), PARSE_FAILED);
        assert_eq!(user_message("could not parse line 12"), PARSE_FAILED);
    }

    #[test]
    fn size_limit_wins_over_later_categories() {
        // Mentions "VCF" too, but the size category is checked first.
        assert_eq!(user_message(FILE_TOO_LARGE), FILE_TOO_LARGE);
        let err = ClientError::FileTooLarge { size_bytes: 6_000_000 };
        assert_eq!(user_message(&err.to_string()), FILE_TOO_LARGE);
    }

    #[test]
    fn support_and_contact_map_to_analysis_failed() {
        assert_eq!(user_message("Drug not supported"), ANALYSIS_FAILED);
        assert_eq!(user_message("please contact admin"), ANALYSIS_FAILED);
    }

    #[test]
    fn transport_errors_map_to_server_unreachable() {
        let err = ClientError::Transport("connection refused".into());
        assert_eq!(user_message(&err.to_string()), SERVER_UNREACHABLE);
        assert_eq!(user_message("Failed"), SERVER_UNREACHABLE);
    }

    #[test]
    fn unrecognised_messages_pass_through() {
        assert_eq!(user_message("Internal Server Error"), "Internal Server Error");
        assert_eq!(
            user_message(&ClientError::NotFound.to_string()),
            "Analysis not found"
        );
    }
}
