/// Failure taxonomy shared by the catalog and mood classification clients.
///
/// Transport-level errors are always translated into one of these variants
/// before they leave a client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}

impl ServiceError {
    /// Classify a reqwest error that happened before a usable response arrived.
    pub fn from_transport(service: &str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ServiceError::ProtocolViolation(format!("{}: {}", service, err));
        }
        if let Some(status) = err.status() {
            return ServiceError::Upstream {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        ServiceError::NetworkUnreachable(format!("{}: {}", service, err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ServiceError::NetworkUnreachable("timeout".to_string()).to_string(),
            "Network unreachable: timeout"
        );
        assert_eq!(
            ServiceError::Upstream { status: 503, message: "down".to_string() }.to_string(),
            "Upstream error (503): down"
        );
    }
}
