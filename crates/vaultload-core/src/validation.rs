//! Field validation for the connection settings.
//!
//! Pure functions: each takes the raw user input and returns either the
//! normalized value or a [`ValidationError`] whose message is shown next to
//! the offending field.

use url::Url;

use crate::error::{PathField, ValidationError};

/// Longest allowed path or namespace segment, in characters.
pub const MAX_SEGMENT_LEN: usize = 255;

/// Characters rejected anywhere in a path or namespace.
const FORBIDDEN_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

/// Advisory shown when a base path does not target the KV v2 data prefix.
pub const KV_DATA_WARNING: &str =
    "Warning: Path should typically start with \"kv/data/\" for KV v2 secrets engine";

/// A base path that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPath {
    /// Trimmed path.
    pub normalized: String,
    /// Non-fatal advisory, if any.
    pub warning: Option<&'static str>,
}

/// Validate a backend URL and return it without a trailing slash.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the URL is empty, unparseable, not
/// `http`/`https`, or has no host.
pub fn validate_vault_url(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::UrlRequired);
    }

    let url = Url::parse(trimmed).map_err(|_| ValidationError::UrlMalformed)?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ValidationError::UrlScheme);
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::UrlHost);
    }

    let serialized = url.as_str();
    Ok(serialized
        .strip_suffix('/')
        .unwrap_or(serialized)
        .to_owned())
}

/// Validate a secrets base path.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the path is empty or malformed.
pub fn validate_vault_path(input: &str) -> Result<ValidPath, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::PathRequired);
    }

    check_segments(trimmed, PathField::Path)?;

    let warning = if trimmed.to_lowercase().starts_with("kv/data/") {
        None
    } else {
        Some(KV_DATA_WARNING)
    };

    Ok(ValidPath {
        normalized: trimmed.to_owned(),
        warning,
    })
}

/// Validate an optional namespace. Blank input means "no namespace".
///
/// # Errors
///
/// Returns a [`ValidationError`] if a non-blank namespace is malformed.
pub fn validate_namespace(input: &str) -> Result<Option<String>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    check_segments(trimmed, PathField::Namespace)?;
    Ok(Some(trimmed.to_owned()))
}

fn check_segments(value: &str, field: PathField) -> Result<(), ValidationError> {
    if value.contains(FORBIDDEN_CHARS) {
        return Err(ValidationError::InvalidCharacters { field });
    }
    if value.contains("//") {
        return Err(ValidationError::ConsecutiveSlashes { field });
    }
    if value.starts_with('/') {
        return Err(ValidationError::LeadingSlash { field });
    }
    if value.ends_with('/') {
        return Err(ValidationError::TrailingSlash { field });
    }

    for segment in value.split('/').filter(|s| !s.is_empty()) {
        if segment.chars().count() > MAX_SEGMENT_LEN {
            return Err(ValidationError::SegmentTooLong { field });
        }
        if !segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
        {
            return Err(ValidationError::SegmentCharacters { field });
        }
    }

    Ok(())
}
