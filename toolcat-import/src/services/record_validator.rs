//! Structural validation of raw records
//!
//! Runs before any network access so malformed input never costs a
//! dedup query or an enrichment call.

use url::Url;

use crate::models::{ImportFailure, RawRecord};

/// Why a record was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    MissingName,
    MissingLink,
    MalformedUrl,
}

/// Result of validating one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(InvalidReason),
}

impl From<InvalidReason> for ImportFailure {
    fn from(reason: InvalidReason) -> Self {
        match reason {
            InvalidReason::MissingName => ImportFailure::MissingName,
            InvalidReason::MissingLink => ImportFailure::MissingLink,
            InvalidReason::MalformedUrl => ImportFailure::MalformedUrl,
        }
    }
}

/// Validate one record
///
/// Checks run in order: name, link presence, then link shape. The link must
/// parse as an absolute URL with a host; `mailto:` or `data:` style links
/// are rejected. `index` is only used for log correlation.
pub fn validate(record: &RawRecord, index: usize) -> ValidationOutcome {
    let outcome = if record.name.trim().is_empty() {
        ValidationOutcome::Invalid(InvalidReason::MissingName)
    } else if record.link.trim().is_empty() {
        ValidationOutcome::Invalid(InvalidReason::MissingLink)
    } else {
        match Url::parse(&record.link) {
            Ok(url) if url.has_host() => ValidationOutcome::Valid,
            _ => ValidationOutcome::Invalid(InvalidReason::MalformedUrl),
        }
    };

    if let ValidationOutcome::Invalid(reason) = outcome {
        tracing::debug!(index, name = %record.name, link = %record.link, ?reason, "Record failed validation");
    }

    outcome
}
