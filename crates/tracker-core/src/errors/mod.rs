use std::error::Error;

/// Base trait for all tracker errors
pub trait TrackerError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling
    fn error_code(&self) -> &'static str;

    /// Whether this error is caused by user input rather than a failing
    /// collaborator
    fn is_user_error(&self) -> bool {
        false
    }
}
