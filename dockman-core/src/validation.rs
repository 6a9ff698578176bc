//! Centralized validation for identifiers and operator-supplied names.
//!
//! Everything here runs before a command is built, so a rejected input never
//! reaches the runtime.

use crate::error::ValidationError;
use crate::kind::ResourceKind;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]{12,}$").expect("identifier pattern is a valid regex")
});

/// Runtime identifiers are at least 12 ASCII alphanumeric characters.
pub fn is_valid_identifier(id: &str) -> bool {
    let valid = IDENTIFIER_PATTERN.is_match(id);
    debug!("Validating identifier '{}': {}", id, if valid { "valid" } else { "invalid" });
    valid
}

/// Validate a container, image or network identifier.
pub fn validate_identifier(kind: ResourceKind, id: &str) -> Result<(), ValidationError> {
    if is_valid_identifier(id) {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier {
            kind,
            id: id.to_string(),
        })
    }
}

/// Validate an operator-supplied name (image tag, container name) and return it trimmed.
pub fn validate_name<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName { field });
    }
    Ok(trimmed)
}

/// Project names become directory names directly under the projects root.
pub fn validate_project_name(value: &str) -> Result<&str, ValidationError> {
    let name = validate_name("project name", value)?;

    let reason = if name == "." || name == ".." {
        Some("reserved directory name")
    } else if name.contains('/') || name.contains('\\') {
        Some("must not contain path separators")
    } else if name.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ValidationError::InvalidProjectName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_accepts_twelve_alphanumerics() {
        assert!(is_valid_identifier("abc123def456"));
        assert!(is_valid_identifier(
            "4f66ad9a0b2e9c1d4f66ad9a0b2e9c1d4f66ad9a0b2e9c1d4f66ad9a0b2e9c1d"
        ));
    }

    #[test]
    fn test_identifier_rejects_hyphens_and_short_ids() {
        assert!(!is_valid_identifier("abc-123-def4"));
        assert!(!is_valid_identifier("short1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("abc123def456 "));
        assert!(!is_valid_identifier("abc123def456; rm -rf /"));
    }

    #[test]
    fn test_validate_identifier_reports_kind() {
        let err = validate_identifier(ResourceKind::Network, "short1").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidIdentifier {
                kind: ResourceKind::Network,
                id: "short1".to_string()
            }
        );
    }

    #[test]
    fn test_validate_name_trims_and_rejects_blank() {
        assert_eq!(validate_name("image name", "  myapp:latest ").unwrap(), "myapp:latest");
        assert_eq!(
            validate_name("image name", "   ").unwrap_err(),
            ValidationError::EmptyName { field: "image name" }
        );
    }

    #[test]
    fn test_validate_project_name() {
        assert_eq!(validate_project_name(" webapp ").unwrap(), "webapp");
        assert!(validate_project_name("..").is_err());
        assert!(validate_project_name("a/b").is_err());
        assert!(validate_project_name("").is_err());
    }
}
