use std::fmt::{self, Display};

use warp::reject::Rejection;

#[derive(Debug, Clone)]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &str {
        &self.info
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(e),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(String::from("Unknown error")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

#[derive(Debug, Clone)]
pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

/// A client-input defect scoped to one payload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ActionError {
    Validation(ValidationError),
    NotFound { entity: &'static str, info: String },
    Conflict(String),
    Forbidden(String),
    /// A multi-row write aborted; the whole operation has to be retried.
    Transaction(QueryError),
    /// The store could not answer a read or existence check.
    Storage(QueryError),
}

impl ActionError {
    pub fn not_found(entity: &'static str, info: &str) -> Self {
        Self::NotFound {
            entity,
            info: info.to_owned(),
        }
    }

    pub fn transaction(value: sqlx::Error) -> Self {
        Self::Transaction(QueryError::from(value))
    }

    /// True when the caller should retry rather than fix its input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transaction(_) | Self::Storage(_))
    }

    pub fn info(&self) -> String {
        match self {
            ActionError::Validation(e) => e.to_string(),
            ActionError::NotFound { info, .. } => info.to_owned(),
            ActionError::Conflict(info) => info.to_owned(),
            ActionError::Forbidden(info) => info.to_owned(),
            ActionError::Transaction(e) => format!("Transaction failed ({e})"),
            ActionError::Storage(e) => format!("Storage unavailable ({e})"),
        }
    }
}

impl From<sqlx::Error> for ActionError {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(e) = &value {
            if e.is_unique_violation() {
                return Self::Conflict(e.message().to_owned());
            }
        }
        Self::Storage(QueryError::from(value))
    }
}

impl From<ValidationError> for ActionError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info())
    }
}

impl std::error::Error for ActionError {}

impl From<ActionError> for potion::Error {
    fn from(value: ActionError) -> Self {
        let code = match &value {
            ActionError::Validation(_) => 400,
            ActionError::Forbidden(_) => 403,
            ActionError::NotFound { .. } => 404,
            ActionError::Conflict(_) => 409,
            ActionError::Transaction(_) | ActionError::Storage(_) => 503,
        };

        potion::Error {
            code,
            info: Some(value.info()),
            redirect: None,
        }
    }
}

impl From<ActionError> for Rejection {
    fn from(value: ActionError) -> Self {
        let error: potion::Error = value.into();
        error.into()
    }
}
