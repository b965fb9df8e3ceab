//! Argument checks run before a command handle is allocated.

use vcx_core::{BridgeError, BridgeResult};

fn invalid(name: &'static str, reason: &str) -> BridgeError {
    BridgeError::InvalidParameter {
        name,
        reason: reason.to_string(),
    }
}

/// `value` must contain something besides whitespace and no NUL byte.
pub fn not_blank(name: &'static str, value: &str) -> BridgeResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(name, "must not be blank"));
    }
    no_nul(name, value)
}

/// `value` may be empty but must be passable as a C string.
pub fn no_nul(name: &'static str, value: &str) -> BridgeResult<()> {
    if value.contains('\0') {
        return Err(invalid(name, "must not contain a NUL byte"));
    }
    Ok(())
}

/// Native handles are never zero.
pub fn not_zero(name: &'static str, handle: u32) -> BridgeResult<()> {
    if handle == 0 {
        return Err(invalid(name, "must not be zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings() {
        assert!(not_blank("config", r#"{"wallet_name":"w"}"#).is_ok());
        for value in ["", "   ", "\n\t"] {
            let err = not_blank("config", value).unwrap_err();
            assert!(matches!(err, BridgeError::InvalidParameter { name: "config", .. }));
        }
    }

    #[test]
    fn nul_bytes() {
        assert!(no_nul("source_id", "").is_ok());
        let err = not_blank("message", "a\0b").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid parameter `message`: must not contain a NUL byte"
        );
    }

    #[test]
    fn zero_handles() {
        assert!(not_zero("connection_handle", 7).is_ok());
        assert!(not_zero("connection_handle", 0).is_err());
    }
}
