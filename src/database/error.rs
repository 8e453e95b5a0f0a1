use std::fmt::{self, Display};

use serde_json::{json, Value};
use warp::reject::Rejection;

use super::schema::Uuid;

/// Structural payload errors raised by the recipe validator. Always
/// recoverable by resubmitting corrected input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Ingredient list must not be empty")]
    MissingIngredients,
    #[error("Unknown ingredient ids: {0:?}")]
    UnknownIngredient(Vec<Uuid>),
    #[error("Ingredients must not repeat")]
    DuplicateIngredient,
    #[error("Tags must not repeat")]
    DuplicateTag,
    #[error("Ingredient amount must be at least 1")]
    InvalidAmount,
    #[error("Field cooking_time is required")]
    MissingCookingTime,
    #[error("Cooking time must be at least 1 minute")]
    InvalidCookingTime,
    #[error("Field image is required")]
    MissingImage,
    #[error("Tag list must not be empty")]
    MissingTags,
    #[error("Recipe name must be at least 4 characters")]
    NameTooShort,
}

impl ValidationError {
    /// The payload field the error is keyed by.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingIngredients | Self::UnknownIngredient(_) | Self::DuplicateIngredient => {
                "ingredients"
            }
            Self::DuplicateTag | Self::MissingTags => "tags",
            Self::InvalidAmount => "amount",
            Self::MissingCookingTime | Self::InvalidCookingTime => "cooking_time",
            Self::MissingImage => "image",
            Self::NameTooShort => "name",
        }
    }
}

/// Conflict outcomes of relationship-ledger mutations. Kept apart from
/// [`ValidationError`]: these describe the state of the relation, not the
/// shape of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Relation already exists")]
    AlreadyExists,
    #[error("Relation does not exist")]
    NotFound,
    #[error("Self-reference is not allowed")]
    SelfReferenceNotAllowed,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Shopping cart is empty")]
    EmptyCart,
    #[error("You don't have permission to perform this action")]
    Unauthorized,
    #[error("Invalid session")]
    InvalidSession,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Cache error: {0}")]
    Cache(String),
}

impl Error {
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::EmptyCart | Self::InvalidRequest(_) => 400,
            Self::Ledger(LedgerError::AlreadyExists) => 409,
            Self::Ledger(LedgerError::NotFound) => 404,
            Self::Ledger(LedgerError::SelfReferenceNotAllowed) => 400,
            Self::InvalidSession => 401,
            Self::Unauthorized => 403,
            Self::Database(_) | Self::Cache(_) => 500,
        }
    }

    /// Field-keyed JSON body for the HTTP layer.
    pub fn payload(&self) -> Value {
        match self {
            Self::Validation(e) => json!({ e.field(): [e.to_string()] }),
            Self::Ledger(e) => json!({ "errors": e.to_string() }),
            _ => json!({ "errors": self.to_string() }),
        }
    }
}

// warp's blanket impl derives `From<Error> for Rejection` from this.
impl warp::reject::Reject for Error {}

pub struct QueryError {
    info: String,
    unique_violation: bool,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.unique_violation
    }

    /// Re-reports a uniqueness violation that slipped past a pre-check as
    /// the domain conflict it stands for; everything else stays a storage
    /// error.
    pub fn into_conflict(self, conflict: Error) -> Error {
        if self.unique_violation {
            conflict
        } else {
            Error::from(self)
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self {
                info: format!("{e}"),
                unique_violation: e.is_unique_violation(),
            },
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new("RowNotFound".to_string()),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::AnyDriverError(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new("Pool timed out".to_string()),
            sqlx::Error::PoolClosed => Self::new("Pool closed".to_string()),
            sqlx::Error::WorkerCrashed => Self::new("Worker crashed".to_string()),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new("Unknown error".to_string()),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        Error::Database(value.info)
    }
}

pub struct CacheError {
    info: String,
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl From<CacheError> for Error {
    fn from(value: CacheError) -> Self {
        Error::Cache(value.info)
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        Error::InvalidRequest(value.info)
    }
}

impl From<TypeError> for Rejection {
    fn from(value: TypeError) -> Self {
        Rejection::from(Error::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_field_keyed() {
        let e = Error::from(ValidationError::MissingTags);
        assert_eq!(e.status(), 400);
        assert!(e.payload().get("tags").is_some());

        let e = Error::from(ValidationError::UnknownIngredient(vec![7, 9]));
        assert!(e.payload().get("ingredients").is_some());
    }

    #[test]
    fn ledger_conflicts_keep_their_own_statuses() {
        assert_eq!(Error::from(LedgerError::AlreadyExists).status(), 409);
        assert_eq!(Error::from(LedgerError::NotFound).status(), 404);
        assert_eq!(
            Error::from(LedgerError::SelfReferenceNotAllowed).status(),
            400
        );
    }

    #[test]
    fn unique_violation_is_reported_as_conflict() {
        let e = QueryError {
            info: "duplicate key value violates unique constraint".to_string(),
            unique_violation: true,
        };
        assert!(matches!(
            e.into_conflict(LedgerError::AlreadyExists.into()),
            Error::Ledger(LedgerError::AlreadyExists)
        ));

        let e = QueryError::new("connection reset".to_string());
        assert!(matches!(
            e.into_conflict(LedgerError::AlreadyExists.into()),
            Error::Database(_)
        ));
    }

    #[test]
    fn storage_and_cache_failures_wrap_as_internal() {
        let e = Error::from(QueryError::new("connection reset".to_string()));
        assert!(matches!(e, Error::Database(_)));
        assert_eq!(e.status(), 500);

        let e = Error::from(CacheError::new("redis down".to_string()));
        assert!(matches!(e, Error::Cache(_)));
        assert_eq!(e.status(), 500);

        let e = Error::from(TypeError::new("Invalid variant"));
        assert!(matches!(e, Error::InvalidRequest(_)));
    }

    #[test]
    fn errors_convert_into_recoverable_rejections() {
        let rejection = Rejection::from(Error::InvalidSession);
        assert!(rejection.find::<Error>().is_some());

        let rejection: Rejection = TypeError::new("Invalid variant").into();
        assert!(matches!(
            rejection.find::<Error>(),
            Some(Error::InvalidRequest(_))
        ));
    }
}
