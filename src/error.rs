use serde::{Deserialize, Serialize};
use strum_macros::{Display, IntoStaticStr};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CrudError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("operation not supported: {0}")]
    OperationNotSupported(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("nothing matched: {0}")]
    NothingMatched(String),

    #[error("update conflict: {0}")]
    UpdateConflict(String),
}

/// The kind of a [`CrudError`], without its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, ToSchema)]
pub enum ErrorKind {
    AccessDenied,
    InputValidation,
    OperationNotSupported,
    OperationFailed,
    NothingMatched,
    UpdateConflict,
}

impl ErrorKind {
    /// The more general kind this one specializes, if any.
    pub fn parent(&self) -> Option<ErrorKind> {
        match self {
            ErrorKind::InputValidation | ErrorKind::NothingMatched | ErrorKind::UpdateConflict => {
                Some(ErrorKind::OperationFailed)
            }
            _ => None,
        }
    }

    /// True if `self` is `other` or one of its specializations.
    pub fn is_a(&self, other: ErrorKind) -> bool {
        let mut current = Some(*self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl CrudError {
    pub fn access_denied() -> Self {
        CrudError::AccessDenied("Access denied".to_string())
    }

    pub fn input_validation() -> Self {
        CrudError::InputValidation("Input for element requested is invalid".to_string())
    }

    pub fn nothing_matched() -> Self {
        CrudError::NothingMatched("Element requested has not been found".to_string())
    }

    pub fn update_conflict() -> Self {
        CrudError::UpdateConflict(
            "A concurrent update conflict prevented the requested operation".to_string(),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CrudError::AccessDenied(_) => ErrorKind::AccessDenied,
            CrudError::InputValidation(_) => ErrorKind::InputValidation,
            CrudError::OperationNotSupported(_) => ErrorKind::OperationNotSupported,
            CrudError::OperationFailed(_) => ErrorKind::OperationFailed,
            CrudError::NothingMatched(_) => ErrorKind::NothingMatched,
            CrudError::UpdateConflict(_) => ErrorKind::UpdateConflict,
        }
    }

    pub fn is_a(&self, kind: ErrorKind) -> bool {
        self.kind().is_a(kind)
    }

    pub fn message(&self) -> &str {
        match self {
            CrudError::AccessDenied(m)
            | CrudError::InputValidation(m)
            | CrudError::OperationNotSupported(m)
            | CrudError::OperationFailed(m)
            | CrudError::NothingMatched(m)
            | CrudError::UpdateConflict(m) => m,
        }
    }
}

/// Lower-level failures raised by entity implementations.
///
/// Converting into [`CrudError`] (usually through `?`) wraps each one into the
/// nearest CRUD kind.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("type mismatch: {0}")]
    Type(String),

    #[error("invalid value: {0}")]
    Value(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BackendError> for CrudError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotImplemented(_) | BackendError::Unsupported(_) => {
                CrudError::OperationNotSupported(err.to_string())
            }
            BackendError::Type(_) | BackendError::Value(_) => {
                CrudError::InputValidation(err.to_string())
            }
            BackendError::Io(_) => CrudError::OperationFailed(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CrudError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err).into()
    }
}

impl From<serde_json::Error> for CrudError {
    fn from(err: serde_json::Error) -> Self {
        CrudError::InputValidation(err.to_string())
    }
}
