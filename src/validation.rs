use std::sync::LazyLock;

use regex::Regex;
use validator::ValidateUrl;

use crate::{
    console::{Console, Question},
    error::{AppError, Result},
};

/// Characters that would escape the profiles directory or clash with dotted file names
const FORBIDDEN_NAME_CHARS: [char; 3] = ['/', '\\', '.'];

static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid address pattern"));

static PRIVATE_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0x)?[0-9a-fA-F]{64}$").expect("valid key pattern"));

/// Prompts until the answer passes `input_validation`. Validation messages are shown and the
/// question is asked again; any other error is returned.
pub fn prompt_until_valid<F>(
    console: &mut dyn Console,
    question: &Question,
    input_validation: F,
) -> Result<String>
where
    F: Fn(&str) -> Result<()>,
{
    loop {
        let input: String = console.ask(question)?;
        match input_validation(&input) {
            Ok(()) => break Ok(input),
            Err(AppError::Validation(msg)) => console.error(&msg),
            Err(e) => return Err(e),
        }
    }
}

/// Validates a profile name
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(FORBIDDEN_NAME_CHARS) {
        return Err(AppError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Validates an EVM account address (`0x` followed by 40 hex digits)
pub fn validate_address(label: &str, address: &str) -> Result<()> {
    if ADDRESS_PATTERN.is_match(address) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{label} must be 0x followed by 40 hex characters"
        )))
    }
}

/// Validates a signer private key (64 hex digits, optional `0x`)
pub fn validate_private_key(key: &str) -> Result<()> {
    if PRIVATE_KEY_PATTERN.is_match(key) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "signer private key must be 64 hex characters".to_string(),
        ))
    }
}

/// Validates an RPC endpoint URL
pub fn validate_rpc_url(label: &str, url: &str) -> Result<()> {
    if url.validate_url() {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{label} is not a valid URL")))
    }
}

/// Accepts blank input, otherwise applies `validate`
pub fn optional<F>(value: &str, validate: F) -> Result<()>
where
    F: Fn(&str) -> Result<()>,
{
    if value.trim().is_empty() {
        Ok(())
    } else {
        validate(value)
    }
}
