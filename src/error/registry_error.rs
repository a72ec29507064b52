use thiserror::Error;

/// Errors raised by the engine registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Producer already registered for type: {0}")]
    DuplicateRegistration(String),
    #[error("No producer registered for type: {0}")]
    UnregisteredType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        assert_eq!(
            RegistryError::DuplicateRegistration("ON_FAIL".into()).to_string(),
            "Producer already registered for type: ON_FAIL"
        );
        assert_eq!(
            RegistryError::UnregisteredType("ON_SKIP".into()).to_string(),
            "No producer registered for type: ON_SKIP"
        );
    }
}
