//! Error types for gpusched

use thiserror::Error;

/// Main error type for gpusched
#[derive(Error, Debug)]
pub enum SchedError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A trace field could not be parsed
    #[error("Parse error: field '{field}' has invalid value '{value}'")]
    Parse { field: String, value: String },

    /// A required trace field is absent
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Policy error
    #[error("Policy error: {0}")]
    Policy(String),

    /// Learned policy error
    #[error("Agent error: {0}")]
    Agent(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for gpusched operations
pub type SchedResult<T> = Result<T, SchedError>;

impl SchedError {
    pub(crate) fn parse(field: &str, value: &str) -> Self {
        SchedError::Parse {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for SchedError {
    fn from(err: serde_json::Error) -> Self {
        SchedError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for SchedError {
    fn from(err: toml::de::Error) -> Self {
        SchedError::Config(err.to_string())
    }
}

impl From<csv::Error> for SchedError {
    fn from(err: csv::Error) -> Self {
        SchedError::Csv(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedError::Config("invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: invalid config");

        let err = SchedError::parse("duration", "abc");
        assert_eq!(
            err.to_string(),
            "Parse error: field 'duration' has invalid value 'abc'"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SchedError = io_err.into();
        assert!(matches!(err, SchedError::Io(_)));
    }

    #[test]
    fn test_error_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: SchedError = toml_err.into();
        assert!(matches!(err, SchedError::Config(_)));
    }
}
