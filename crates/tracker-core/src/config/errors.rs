use crate::errors::TrackerError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl TrackerError for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}
