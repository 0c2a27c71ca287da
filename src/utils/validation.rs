use crate::utils::error::{CharmError, Result};
use base64::Engine;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(CharmError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(CharmError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(CharmError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

/// A blank value counts as not configured at all.
pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CharmError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(())
}

/// Decodes key material pasted as wrapped `base64` output; whitespace and
/// line breaks are ignored.
pub fn decode_base64_key(value: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: String = value.split_ascii_whitespace().collect();
    base64::engine::general_purpose::STANDARD.decode(compact)
}

/// Key material is never echoed back in the error.
pub fn validate_base64(field_name: &str, value: &str) -> Result<()> {
    decode_base64_key(value)
        .map(|_| ())
        .map_err(|e| CharmError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: "<redacted>".to_string(),
            reason: format!("Not valid base64: {}", e),
        })
}
