//! Error taxonomy for the workflow layer.
//!
//! Application errors carry a stable machine-readable kind so callers can
//! branch without parsing messages. Storage and codec failures are kept
//! separate from the application kinds.

#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument { field: &'static str, reason: String },
    #[error("caller is not authenticated")]
    Unauthenticated,
    #[error("caller is not permitted to act on this record")]
    PermissionDenied,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    FailedPrecondition(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("codec failure: {0}")]
    Codec(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    /// Stable kind string for machine consumption.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::FailedPrecondition(_) => "FAILED_PRECONDITION",
            Self::Storage(_) => "STORAGE",
            Self::Codec(_) => "CODEC",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(WorkflowError::Unauthenticated.kind(), "UNAUTHENTICATED");
        assert_eq!(WorkflowError::PermissionDenied.kind(), "PERMISSION_DENIED");
        assert_eq!(
            WorkflowError::invalid("adults", "must be at least 1").kind(),
            "INVALID_ARGUMENT"
        );
        assert_eq!(
            WorkflowError::NotFound("req_x".into()).kind(),
            "NOT_FOUND"
        );
    }

    #[test]
    fn invalid_argument_names_the_field() {
        let err = WorkflowError::invalid("checkIn", "must be formatted as YYYY-MM-DD");
        assert_eq!(
            err.to_string(),
            "invalid argument `checkIn`: must be formatted as YYYY-MM-DD"
        );
    }
}
