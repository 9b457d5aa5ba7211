//! Share links
//!
//! A share link is `prompttemplate://` followed by base64 of the JSON
//! `{"templates": [...]}`. Decoding guards size and alphabet before touching
//! the base64 body, and every failure mode has its own message.

use super::validate::{validate_payload, ImportLimits, ValidationError};
use super::{text_len, Template};
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// Scheme prefix of every share link
pub const SHARE_PREFIX: &str = "prompttemplate://";

/// Largest accepted link body, in characters
pub const MAX_IMPORT_CHARS: usize = 100 * 1024;

static BASE64_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/=]+$").expect("base64 pattern is valid"));

// Accepts bodies with or without trailing padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Why a share link could not be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShareLinkError {
    #[error("Invalid import link.")]
    InvalidLink,
    #[error("Import link is empty.")]
    Empty,
    #[error("Import payload exceeds 100KB limit.")]
    TooLarge,
    #[error("Import payload is not valid base64.")]
    NotBase64,
    #[error("Import payload could not be decoded.")]
    Undecodable,
}

/// Any reason an import was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error(transparent)]
    Link(#[from] ShareLinkError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Serialize)]
struct SharePayload<'a> {
    templates: &'a [Template],
}

/// Build a share link carrying the given templates
pub fn encode_share_link(templates: &[Template]) -> serde_json::Result<String> {
    let json = serde_json::to_string(&SharePayload { templates })?;
    Ok(format!("{SHARE_PREFIX}{}", STANDARD.encode(json)))
}

/// Decode a share link into its untrusted JSON payload
pub fn decode_share_link(link: &str) -> Result<Value, ShareLinkError> {
    let link = link.trim();
    let raw = link
        .strip_prefix(SHARE_PREFIX)
        .ok_or(ShareLinkError::InvalidLink)?;
    if raw.is_empty() {
        return Err(ShareLinkError::Empty);
    }
    if text_len(link) > text_len(SHARE_PREFIX) + MAX_IMPORT_CHARS {
        return Err(ShareLinkError::TooLarge);
    }
    if !BASE64_PATTERN.is_match(raw) {
        return Err(ShareLinkError::NotBase64);
    }

    let bytes = LENIENT.decode(raw).map_err(|_| ShareLinkError::Undecodable)?;
    let json = String::from_utf8(bytes).map_err(|_| ShareLinkError::Undecodable)?;
    serde_json::from_str(&json).map_err(|_| ShareLinkError::Undecodable)
}

/// Decode and validate a share link, yielding templates ready to import
pub fn parse_share_link(link: &str, limits: &ImportLimits) -> Result<Vec<Template>, ImportError> {
    let payload = decode_share_link(link)?;
    let decoded = validate_payload(&payload, limits)?;
    Ok(decoded.templates)
}
