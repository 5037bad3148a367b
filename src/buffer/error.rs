use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BufferError {
    #[error("Partition {partition} is full: {details}")]
    CapacityExceeded { partition: usize, details: String },

    #[error("Malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("Invalid buffer configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Storage error in partition {partition}: {details}")]
    Storage { partition: usize, details: String },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Rotation into partition {partition} deferred for another {remaining:?}")]
    RotationDeferred { partition: usize, remaining: Duration },

    #[error("Partition {partition} is closed")]
    Closed { partition: usize },

    #[error("No writable archive accepted the record")]
    NoWritableArchive,
}

// Error recovery classification
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorRecovery {
    /// Retry the operation later, e.g. on the next scheduler tick
    Retry,
    /// Stop writing to this target and continue with the others
    Demote,
    /// Drop the offending input
    Skip,
    /// Fail permanently
    Fail,
}

impl BufferError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            BufferError::CapacityExceeded { .. }
            | BufferError::MalformedRecord { .. }
            | BufferError::Storage { .. }
            | BufferError::Io(_)
            | BufferError::RotationDeferred { .. }
            | BufferError::NoWritableArchive => true,
            BufferError::InvalidConfig { .. }
            | BufferError::Serialization(_)
            | BufferError::Closed { .. } => false,
        }
    }

    pub fn recovery_strategy(&self) -> ErrorRecovery {
        match self {
            BufferError::CapacityExceeded { .. } => ErrorRecovery::Demote,
            BufferError::MalformedRecord { .. } => ErrorRecovery::Skip,
            BufferError::Serialization(_) => ErrorRecovery::Skip,
            BufferError::Storage { .. } | BufferError::Io(_) => ErrorRecovery::Retry,
            BufferError::RotationDeferred { .. } => ErrorRecovery::Retry,
            BufferError::NoWritableArchive => ErrorRecovery::Retry,
            BufferError::InvalidConfig { .. } => ErrorRecovery::Fail,
            BufferError::Closed { .. } => ErrorRecovery::Fail,
        }
    }

    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, BufferError::CapacityExceeded { .. })
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        BufferError::MalformedRecord {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        BufferError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for BufferError {
    fn from(e: std::io::Error) -> Self {
        BufferError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for BufferError {
    fn from(e: serde_json::Error) -> Self {
        BufferError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_error_recovery_strategies() {
        let full = BufferError::CapacityExceeded {
            partition: 0,
            details: "quota".to_string(),
        };
        assert_eq!(full.recovery_strategy(), ErrorRecovery::Demote);
        assert!(full.is_recoverable());
        assert!(full.is_capacity_exceeded());

        let config = BufferError::invalid_config("zero partitions");
        assert_eq!(config.recovery_strategy(), ErrorRecovery::Fail);
        assert!(!config.is_recoverable());

        let deferred = BufferError::RotationDeferred {
            partition: 1,
            remaining: Duration::from_millis(10),
        };
        assert_eq!(deferred.recovery_strategy(), ErrorRecovery::Retry);
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let err = BufferError::malformed("missing timestamp");
        assert_eq!(err.recovery_strategy(), ErrorRecovery::Skip);
        assert_eq!(err.to_string(), "Malformed record: missing timestamp");
    }
}
