use crate::errors::TrackerError;

/// The only error a producer ever sees from the loader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("refresh queue full (capacity {capacity})")]
    QueueFull { capacity: usize },
}

impl TrackerError for QueueError {
    fn error_code(&self) -> &'static str {
        match self {
            QueueError::QueueFull { .. } => "QUEUE_FULL",
        }
    }
}
