use thiserror::Error;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("media-store is not configured: missing {missing}")]
    Configuration { missing: String },

    #[error("Blob not found: {name}")]
    NotFound { name: String },

    #[error("Blob already exists: {name}")]
    AlreadyExists { name: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Storage backend error (status {status:?}): {source}")]
    Backend {
        status: Option<u16>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            status: None,
            source: Box::new(error),
        }
    }

    /// Create a backend error carrying the remote HTTP status
    pub fn backend_status<E>(status: u16, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Backend {
            status: Some(status),
            source: error.into(),
        }
    }

    /// Create a configuration error listing the missing settings
    pub fn configuration<S: Into<String>>(missing: S) -> Self {
        Self::Configuration {
            missing: missing.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an error for a create-only write that found the name taken
    pub fn already_exists<S: Into<String>>(name: S) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Remote HTTP status, if the failure came from the service
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::AlreadyExists { .. } => Some(409),
            Self::Backend { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_names_missing_fields() {
        let err = StoreError::configuration("accessKey, container");
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "media-store is not configured: missing accessKey, container"
        );
    }

    #[test]
    fn status_is_reported_for_remote_failures() {
        assert_eq!(StoreError::not_found("a.png").status(), Some(404));
        assert_eq!(StoreError::backend_status(500, "boom").status(), Some(500));
        assert_eq!(StoreError::invalid("nope").status(), None);
    }

    #[test]
    fn already_exists_is_a_conflict() {
        let err = StoreError::already_exists("2024/01/x.png");
        assert!(err.is_already_exists());
        assert!(!err.is_not_found());
        assert_eq!(err.status(), Some(409));
    }
}
