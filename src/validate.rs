//! Field validators for instance records.
//!
//! The same validators back the configuration wizard prompts and the check
//! performed when `instances.toml` is loaded, so a record that made it onto
//! disk through the wizard always loads back cleanly.

use std::net::Ipv4Addr;

use thiserror::Error;

/// Maximum length of an instance name, in bytes.
pub const MAX_NAME_LEN: usize = 72;

/// Maximum length of an instance secret, in bytes (the bcrypt input limit).
pub const MAX_SECRET_LEN: usize = 72;

/// Malformed operator input. Never reaches the network layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Instance names: 1–72 chars of `[a-z0-9_-]`.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new("instance name cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::new(format!(
            "instance name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    let valid = name
        .bytes()
        .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-'));
    if !valid {
        return Err(ValidationError::new(
            "instance name can only contain lowercase letters (a-z), numbers (0-9), \
             hyphens (-), and underscores (_)",
        ));
    }
    Ok(name.to_string())
}

/// IPv4 dotted-quad with every octet in `0..=255`.
pub fn validate_address(address: &str) -> Result<String, ValidationError> {
    if address.is_empty() {
        return Err(ValidationError::new("address cannot be empty"));
    }

    let parts: Vec<&str> = address.split('.').collect();
    if parts.len() != 4 {
        return Err(ValidationError::new(
            "address must have exactly 4 parts separated by dots",
        ));
    }

    for (i, part) in parts.iter().enumerate() {
        let octet: u32 = part.parse().map_err(|_| {
            ValidationError::new(format!(
                "address part {} is not a valid number: {part}",
                i + 1
            ))
        })?;
        if octet > 255 {
            return Err(ValidationError::new(format!(
                "address part {} must be between 0 and 255, got: {octet}",
                i + 1
            )));
        }
    }

    // Catches what the per-octet pass lets through, e.g. leading zeros or `+1`.
    address
        .parse::<Ipv4Addr>()
        .map_err(|_| ValidationError::new("invalid IPv4 address format"))?;

    Ok(address.to_string())
}

/// TCP port in `0..=65535`.
pub fn validate_port(port: &str) -> Result<u16, ValidationError> {
    if port.is_empty() {
        return Err(ValidationError::new("port cannot be empty"));
    }
    let value: i64 = port
        .parse()
        .map_err(|_| ValidationError::new(format!("port must be a number: {port}")))?;
    u16::try_from(value).map_err(|_| {
        ValidationError::new(format!("port must be between 0 and 65535, got: {value}"))
    })
}

/// Shared secret: non-empty, at most 72 bytes.
pub fn validate_secret(secret: &str) -> Result<String, ValidationError> {
    if secret.is_empty() {
        return Err(ValidationError::new("secret cannot be empty"));
    }
    if secret.len() > MAX_SECRET_LEN {
        return Err(ValidationError::new(format!(
            "secret cannot exceed {MAX_SECRET_LEN} characters"
        )));
    }
    Ok(secret.to_string())
}

/// Render a secret for display: first two characters, the rest masked.
/// Secrets of three characters or fewer are masked entirely.
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 3 {
        return "*".repeat(len);
    }
    let head: String = secret.chars().take(2).collect();
    format!("{head}{}", "*".repeat(len - 2))
}
