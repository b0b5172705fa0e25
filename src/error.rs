//! Error taxonomy for the attendance engine
//!
//! Callers (the chat plugin, the operator CLI) are expected to tell these
//! kinds apart: validation and not-found errors become user-facing messages,
//! hardware errors become "try again later", persistence and authentication
//! failures abort the operation.

use std::io;
use std::path::PathBuf;

/// Result type for attendance operations
pub type AtndResult<T> = Result<T, AtndError>;

/// Attendance engine errors
#[derive(Debug, thiserror::Error)]
pub enum AtndError {
    #[error("Invalid member name: {0:?}")]
    InvalidName(String),

    /// The offending input is deliberately not carried: it may be a near-miss
    /// of a real address.
    #[error("Invalid hardware address: expected six colon-separated hex octets")]
    InvalidAddress,

    #[error("Member not found: {0:?}")]
    MemberNotFound(String),

    #[error("Probe utility not found: {0}")]
    ProbeUtilityMissing(String),

    #[error("Bluetooth adapter unavailable")]
    AdapterUnavailable,

    #[error("Stored address failed authentication (corrupted or encrypted under another key)")]
    AuthenticationFailure,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    #[error("Persistence failure at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cryptographic failure: {0}")]
    Crypto(String),
}

impl AtndError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AtndError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Stable, user-facing message for this error kind.
    ///
    /// One message per kind so the chat layer never has to fall back to a
    /// generic "something went wrong".
    pub fn user_message(&self) -> &'static str {
        match self {
            AtndError::InvalidName(_) => "That name can't be used.",
            AtndError::InvalidAddress => {
                "That doesn't look like a Bluetooth address (expected 01:23:45:67:89:ab)."
            }
            AtndError::MemberNotFound(_) => "No member is registered under that name.",
            AtndError::ProbeUtilityMissing(_) => {
                "The presence probe tool (l2ping) is not installed on the bot host."
            }
            AtndError::AdapterUnavailable => "The Bluetooth adapter is down.",
            AtndError::AuthenticationFailure => {
                "A stored address could not be decrypted; please register it again."
            }
            AtndError::Cancelled => "The attendance check was cancelled.",
            AtndError::DeadlineExceeded => "The attendance check took too long and was stopped.",
            AtndError::Persistence { .. } => "The member registry could not be saved or loaded.",
            AtndError::Crypto(_) => "An internal encryption error occurred.",
        }
    }

    /// Whether the same request may succeed if simply tried again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AtndError::AdapterUnavailable | AtndError::Cancelled | AtndError::DeadlineExceeded
        )
    }

    /// Whether this error came from the caller's cancellation signal or deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AtndError::Cancelled | AtndError::DeadlineExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_does_not_echo_input() {
        // The variant has no payload, so the message is fixed
        assert_eq!(
            AtndError::InvalidAddress.to_string(),
            "Invalid hardware address: expected six colon-separated hex octets"
        );
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let errors = [
            AtndError::InvalidName(String::new()),
            AtndError::InvalidAddress,
            AtndError::MemberNotFound("alice".to_string()),
            AtndError::ProbeUtilityMissing("l2ping".to_string()),
            AtndError::AdapterUnavailable,
            AtndError::AuthenticationFailure,
            AtndError::Cancelled,
            AtndError::DeadlineExceeded,
            AtndError::persistence("/tmp/x", io::Error::other("disk full")),
            AtndError::Crypto("rng".to_string()),
        ];

        let mut messages: Vec<&str> = errors.iter().map(|e| e.user_message()).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), errors.len());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AtndError::AdapterUnavailable.is_retryable());
        assert!(AtndError::DeadlineExceeded.is_retryable());
        assert!(!AtndError::InvalidAddress.is_retryable());
        assert!(!AtndError::MemberNotFound("bob".to_string()).is_retryable());
        assert!(!AtndError::AuthenticationFailure.is_retryable());
    }

    #[test]
    fn test_persistence_display_includes_path() {
        let err = AtndError::persistence("/data/atnd_config.json", io::Error::other("boom"));
        let msg = err.to_string();
        assert!(msg.contains("/data/atnd_config.json"));
        assert!(msg.contains("boom"));
    }
}
