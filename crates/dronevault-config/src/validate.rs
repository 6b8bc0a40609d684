//! Validation helpers and parsing utilities for environment values.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Parse a non-zero TCP port.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric, out-of-range, or zero values.
pub fn parse_port(field: &'static str, value: &str) -> ConfigResult<u16> {
    let port = value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::invalid(field, value, "not_a_port"))?;
    if port == 0 {
        return Err(ConfigError::invalid(field, value, "zero"));
    }
    Ok(port)
}

/// Parse an IP address to bind.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an IP address.
pub fn parse_bind_addr(field: &'static str, value: &str) -> ConfigResult<IpAddr> {
    value
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ConfigError::invalid(field, value, "not_an_ip_address"))
}

/// Parse a strictly positive count.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric or zero values.
pub fn parse_positive_usize(field: &'static str, value: &str) -> ConfigResult<usize> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::invalid(field, value, "zero")),
        Ok(count) => Ok(count),
        Err(_) => Err(ConfigError::invalid(field, value, "not_a_number")),
    }
}

/// Parse a strictly positive number of seconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric or zero values.
pub fn parse_timeout_secs(field: &'static str, value: &str) -> ConfigResult<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::invalid(field, value, "zero")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(ConfigError::invalid(field, value, "not_a_number")),
    }
}

/// Parse a boolean flag (`1/true/yes/on`, `0/false/no/off`).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for anything else.
pub fn parse_flag(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, value, "not_a_flag")),
    }
}

/// Reject blank values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the trimmed value is empty.
pub fn require_non_empty(field: &'static str, value: &str) -> ConfigResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidField {
            field,
            value: None,
            reason: "empty",
        });
    }
    Ok(trimmed.to_string())
}

/// Normalise a URL prefix to `/segment` form without a trailing slash.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for prefixes containing `..` or `?`/`#`.
pub fn normalize_url_prefix(field: &'static str, value: &str) -> ConfigResult<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.contains("..") || trimmed.contains(['?', '#']) {
        return Err(ConfigError::invalid(field, value, "invalid_prefix"));
    }
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if trimmed.starts_with('/') || trimmed.contains("://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{trimmed}"))
    }
}

/// Make a configured directory absolute relative to `base`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is empty.
pub fn absolute_dir(field: &'static str, value: &str, base: &Path) -> ConfigResult<PathBuf> {
    let raw = PathBuf::from(require_non_empty(field, value)?);
    if raw.is_absolute() {
        Ok(raw)
    } else {
        Ok(base.join(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_parsing_rejects_zero_and_garbage() {
        assert_eq!(parse_port("PORT", " 5050 ").ok(), Some(5050));
        assert!(matches!(
            parse_port("PORT", "0"),
            Err(ConfigError::InvalidField { reason: "zero", .. })
        ));
        assert!(matches!(
            parse_port("PORT", "70000"),
            Err(ConfigError::InvalidField { reason: "not_a_port", .. })
        ));
    }

    #[test]
    fn numeric_helpers_reject_zero() {
        assert_eq!(parse_positive_usize("W", "4").ok(), Some(4));
        assert!(parse_positive_usize("W", "0").is_err());
        assert_eq!(
            parse_timeout_secs("T", "90").ok(),
            Some(Duration::from_secs(90))
        );
        assert!(parse_timeout_secs("T", "-1").is_err());
    }

    #[test]
    fn flags_and_addresses() {
        assert_eq!(parse_flag("F", "Yes").ok(), Some(true));
        assert_eq!(parse_flag("F", "off").ok(), Some(false));
        assert!(parse_flag("F", "maybe").is_err());
        assert!(parse_bind_addr("A", "127.0.0.1").is_ok());
        assert!(parse_bind_addr("A", "localhost").is_err());
    }

    #[test]
    fn url_prefix_is_normalised() {
        assert_eq!(
            normalize_url_prefix("P", "pointclouds/").ok().as_deref(),
            Some("/pointclouds")
        );
        assert_eq!(normalize_url_prefix("P", "/").ok().as_deref(), Some(""));
        assert_eq!(
            normalize_url_prefix("P", "https://viewer.local:3000/pointclouds")
                .ok()
                .as_deref(),
            Some("https://viewer.local:3000/pointclouds")
        );
        assert!(normalize_url_prefix("P", "/a/../b").is_err());
    }

    #[test]
    fn relative_dirs_are_anchored() {
        let base = Path::new("/srv/dronevault");
        assert_eq!(
            absolute_dir("D", "surveys", base).ok(),
            Some(PathBuf::from("/srv/dronevault/surveys"))
        );
        assert_eq!(
            absolute_dir("D", "/data/surveys", base).ok(),
            Some(PathBuf::from("/data/surveys"))
        );
        assert!(absolute_dir("D", "  ", base).is_err());
    }
}
