//! Error types for model building, solving, and extraction.
//!
//! Errors are local to a single (encoding, backend) pair: the orchestrator
//! records them in that pair's report and keeps the other pairs running.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, JsspError>;

/// Errors raised while turning a problem instance into a schedule.
#[derive(Debug, Error)]
pub enum JsspError {
    /// Malformed input: empty job list, empty job, non-positive duration,
    /// negative or non-contiguous machine ids, durations whose sum
    /// overflows.
    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    /// The horizon of a non-empty instance is not positive.
    #[error("unbounded horizon: horizon {horizon} must be positive")]
    UnboundedHorizon { horizon: i64 },

    /// A job does not fit into the horizon used by a time-indexed model.
    #[error("job {job} needs {required} time units but the horizon is {horizon}")]
    HorizonTooShort {
        job: usize,
        required: i64,
        horizon: i64,
    },

    /// A time-indexed model would exceed the slot-coverage limit.
    #[error("time-indexed model too large: {terms} slot terms exceed the limit of {limit}")]
    ModelTooLarge { terms: u64, limit: u64 },

    /// The solver result lacks a value for a variable the extractor reads.
    ///
    /// This is a contract violation between adapter and extractor, never an
    /// expected runtime condition.
    #[error("solver result has no value for variable '{variable}'")]
    MissingAssignment { variable: String },

    /// The engine behind an adapter rejected or failed on the model.
    #[error("solver failure: {0}")]
    Solver(String),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse instance: {0}")]
    Parse(#[from] serde_json::Error),
}

impl JsspError {
    /// Short, stable label for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInstance(_) => "InvalidInstance",
            Self::UnboundedHorizon { .. } => "UnboundedHorizon",
            Self::HorizonTooShort { .. } => "HorizonTooShort",
            Self::ModelTooLarge { .. } => "ModelTooLarge",
            Self::MissingAssignment { .. } => "MissingAssignment",
            Self::Solver(_) => "SolverFailure",
            Self::Io(_) => "Io",
            Self::Parse(_) => "Input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = JsspError::HorizonTooShort {
            job: 2,
            required: 9,
            horizon: 5,
        };
        assert_eq!(
            err.to_string(),
            "job 2 needs 9 time units but the horizon is 5"
        );
        assert_eq!(err.kind(), "HorizonTooShort");

        let err = JsspError::InvalidInstance("job list is empty".into());
        assert_eq!(err.to_string(), "invalid instance: job list is empty");
        assert_eq!(err.kind(), "InvalidInstance");
    }

    #[test]
    fn test_parse_error_conversion() {
        let parse = serde_json::from_str::<Vec<i64>>("[1,").unwrap_err();
        let err: JsspError = parse.into();
        assert_eq!(err.kind(), "Input");
        assert!(err.to_string().starts_with("failed to parse instance: "));
    }

    #[test]
    fn test_output_error_is_io() {
        // A JSON write failure surfaces as I/O, not as a parse failure.
        let write = serde_json::to_writer(FailingWriter, &[1, 2, 3]).unwrap_err();
        let err = JsspError::Io(write.into());
        assert_eq!(err.kind(), "Io");
        assert!(err.to_string().starts_with("I/O error: "), "{err}");
        assert!(!err.to_string().contains("parse"));
    }

    #[test]
    fn test_model_too_large_message() {
        let err = JsspError::ModelTooLarge {
            terms: 9_000_000,
            limit: 5_000_000,
        };
        assert_eq!(err.kind(), "ModelTooLarge");
        assert_eq!(
            err.to_string(),
            "time-indexed model too large: 9000000 slot terms exceed the limit of 5000000"
        );
    }

    struct FailingWriter;

    impl std::io::Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
