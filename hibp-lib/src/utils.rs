//! Utility functions for parameter validation and input handling.
//!
//! Validation here is a best-effort guard against obviously malformed input,
//! not a security boundary: the service is the final judge of what exists.

use crate::error::HibpError;
use regex::Regex;
use std::fs;
use std::path::Path;

lazy_static::lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref DOMAIN_RE: Regex =
        Regex::new(r"^[A-Za-z0-9-]{1,63}(\.[A-Za-z0-9-]{1,63})+$").unwrap();
}

/// Validate an account identifier (email address or username).
///
/// Values containing `@` must look like an email address. Anything else is
/// treated as a username and only has to be free of whitespace and slashes,
/// since it is placed into a URL path segment.
///
/// Returns the trimmed account on success.
pub fn validate_account(account: &str) -> Result<&str, HibpError> {
    let account = account.trim();

    if account.is_empty() {
        return Err(HibpError::invalid_input(
            "account",
            account,
            "Account cannot be empty",
        ));
    }

    if account.contains('@') {
        if !EMAIL_RE.is_match(account) {
            return Err(HibpError::invalid_input(
                "account",
                account,
                "Not a valid email address",
            ));
        }
    } else if account.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(HibpError::invalid_input(
            "account",
            account,
            "Username cannot contain whitespace or '/'",
        ));
    } else if account == "." || account == ".." {
        return Err(HibpError::invalid_input(
            "account",
            account,
            "Username cannot be '.' or '..'",
        ));
    }

    Ok(account)
}

/// Validate a domain against a permissive hostname pattern.
///
/// Letters, digits and hyphens in dot-separated labels of 1-63 characters,
/// with at least two labels. Returns the trimmed domain on success.
pub fn validate_domain(domain: &str) -> Result<&str, HibpError> {
    let domain = domain.trim();

    if domain.is_empty() {
        return Err(HibpError::invalid_input(
            "domain",
            domain,
            "Domain cannot be empty",
        ));
    }

    if !DOMAIN_RE.is_match(domain) {
        return Err(HibpError::invalid_input(
            "domain",
            domain,
            "Not a valid hostname",
        ));
    }

    Ok(domain)
}

/// Read query parameters from a file, one per line.
///
/// Blank lines and lines starting with `#` are skipped; surrounding
/// whitespace is trimmed.
pub fn read_parameters_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, HibpError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        HibpError::file_error(path.to_string_lossy(), format!("Failed to read file: {}", e))
    })?;

    let parameters: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();

    if parameters.is_empty() {
        return Err(HibpError::file_error(
            path.to_string_lossy(),
            "No parameters found in file",
        ));
    }

    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_account() {
        assert_eq!(validate_account("test@example.com").unwrap(), "test@example.com");
        assert_eq!(validate_account("  someuser ").unwrap(), "someuser");

        assert!(validate_account("").is_err());
        assert!(validate_account("   ").is_err());
        assert!(validate_account("no-tld@example").is_err());
        assert!(validate_account("two@@example.com").is_err());
        assert!(validate_account("has space").is_err());
        assert!(validate_account("a/b").is_err());
        assert!(validate_account("..").is_err());
        assert_eq!(validate_account("a#b@example.com").unwrap(), "a#b@example.com");
        assert_eq!(validate_account("bob?x=1").unwrap(), "bob?x=1");
    }

    #[test]
    fn test_validate_domain() {
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("sub.example.co.uk").is_ok());
        assert!(validate_domain("xn--bcher-kva.example").is_ok());
        assert!(validate_domain("123.example").is_ok());

        assert!(validate_domain("").is_err());
        assert!(validate_domain("localhost").is_err());
        assert!(validate_domain(".com").is_err());
        assert!(validate_domain("example.").is_err());
        assert!(validate_domain("exa_mple.com").is_err());
        assert!(validate_domain("example..com").is_err());
        assert!(validate_domain("exa mple.com").is_err());
    }

    #[test]
    fn test_validate_domain_label_length() {
        let label63 = "a".repeat(63);
        let label64 = "a".repeat(64);

        assert!(validate_domain(&format!("{}.com", label63)).is_ok());
        assert!(validate_domain(&format!("{}.com", label64)).is_err());
    }

    #[test]
    fn test_read_parameters_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# breach names").unwrap();
        writeln!(file, "adobe").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  myspace  ").unwrap();
        file.flush().unwrap();

        let params = read_parameters_from_file(file.path()).unwrap();
        assert_eq!(params, vec!["adobe", "myspace"]);
    }

    #[test]
    fn test_read_parameters_from_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let result = read_parameters_from_file(file.path());
        assert!(matches!(result, Err(HibpError::FileError { .. })));
    }
}
