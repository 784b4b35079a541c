//! Shared-secret check for the mutating routes.

use subtle::ConstantTimeEq;

use crate::error::{PorticoError, Result};

/// Query parameter carrying the shared secret.
pub const ACCESS_KEY_PARAM: &str = "access-key";

/// Verify a supplied access key against the configured one.
///
/// With no key configured every request is rejected. The comparison is
/// constant-time in the length of the supplied key.
pub fn check_access_key(provided: Option<&str>, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected.filter(|k| !k.is_empty()) else {
        return Err(PorticoError::Unauthorized(
            "no access key is configured".into(),
        ));
    };
    let Some(provided) = provided else {
        return Err(PorticoError::Unauthorized("missing access key".into()));
    };
    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(PorticoError::Unauthorized("invalid access key".into()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_key() {
        assert!(check_access_key(Some("s3cret"), Some("s3cret")).is_ok());
    }

    #[test]
    fn test_wrong_or_missing_key() {
        assert!(matches!(
            check_access_key(Some("nope"), Some("s3cret")),
            Err(PorticoError::Unauthorized(_))
        ));
        assert!(check_access_key(Some("s3cre"), Some("s3cret")).is_err());
        assert!(check_access_key(None, Some("s3cret")).is_err());
        assert!(check_access_key(Some(""), Some("s3cret")).is_err());
    }

    #[test]
    fn test_unconfigured_key_rejects_everything() {
        assert!(check_access_key(Some(""), None).is_err());
        assert!(check_access_key(Some(""), Some("")).is_err());
        assert!(check_access_key(Some("anything"), None).is_err());
    }
}
