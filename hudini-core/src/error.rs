use std::fmt;

/// Why a provider could not be handed out by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    NotRegistered,
    NotAuthenticated,
    NoProviders,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnavailableReason::NotRegistered => "not registered",
            UnavailableReason::NotAuthenticated => "not authenticated",
            UnavailableReason::NoProviders => "no providers registered",
        };
        f.write_str(text)
    }
}

/// Coarse classification of a [`PmsError`], handy for metrics labels and match arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AuthenticationFailed,
    SessionExpired,
    NotFound,
    Transport,
    VendorRejected,
    ProviderUnavailable,
    Configuration,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PmsError {
    #[error("Authentication failed for provider {provider}: {reason}")]
    AuthenticationFailed { provider: String, reason: String },

    #[error("Session expired for provider {0}")]
    SessionExpired(String),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// No definitive answer from the vendor (connect error, timeout, 5xx, unreadable body).
    #[error("Transport failure: {message}")]
    Transport { message: String, timed_out: bool },

    #[error("Vendor rejected request ({code}): {message}")]
    VendorRejected { code: String, message: String },

    #[error("PMS provider '{name}' unavailable: {reason}")]
    ProviderUnavailable { name: String, reason: UnavailableReason },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type PmsResult<T> = Result<T, PmsError>;

impl PmsError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        PmsError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        PmsError::Transport {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        PmsError::Transport {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn unavailable(name: impl Into<String>, reason: UnavailableReason) -> Self {
        PmsError::ProviderUnavailable {
            name: name.into(),
            reason,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PmsError::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            PmsError::SessionExpired(_) => ErrorKind::SessionExpired,
            PmsError::NotFound { .. } => ErrorKind::NotFound,
            PmsError::Transport { .. } => ErrorKind::Transport,
            PmsError::VendorRejected { .. } => ErrorKind::VendorRejected,
            PmsError::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            PmsError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, PmsError::Transport { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PmsError::Transport { timed_out: true, .. })
    }

    /// Errors an operator has to fix (wiring, credentials); retrying on behalf
    /// of the guest will not help.
    pub fn is_operator_actionable(&self) -> bool {
        matches!(
            self,
            PmsError::ProviderUnavailable { .. }
                | PmsError::Configuration(_)
                | PmsError::AuthenticationFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(PmsError::not_found("room", "999").kind(), ErrorKind::NotFound);
        assert_eq!(PmsError::transport("reset").kind(), ErrorKind::Transport);
        assert!(PmsError::timeout("30s elapsed").is_timeout());
        assert!(!PmsError::transport("reset").is_timeout());
    }

    #[test]
    fn test_operator_actionable() {
        assert!(PmsError::unavailable("opera", UnavailableReason::NotAuthenticated).is_operator_actionable());
        assert!(PmsError::Configuration("missing client_id".into()).is_operator_actionable());
        assert!(!PmsError::transport("reset").is_operator_actionable());
        assert!(!PmsError::VendorRejected {
            code: "LIMIT".into(),
            message: "credit limit".into()
        }
        .is_operator_actionable());
    }

    #[test]
    fn test_display_messages() {
        let err = PmsError::unavailable("opera", UnavailableReason::NotRegistered);
        assert_eq!(err.to_string(), "PMS provider 'opera' unavailable: not registered");

        let err = PmsError::not_found("room", "999");
        assert_eq!(err.to_string(), "room not found: 999");
    }
}
