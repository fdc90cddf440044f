use derive_more::{Display, Error};

pub mod access;
pub mod cart;
pub mod catalog;
pub mod order;

/// Failure of a service operation, as seen by the API layer.
#[derive(Debug, Display, Error)]
pub enum ServiceError {
    #[display("{entity} not found")]
    NotFound { entity: &'static str },
    #[display("Invalid field {field}: {msg}")]
    InvalidInput { field: &'static str, msg: String },
    #[error(ignore)]
    #[display("{_0}")]
    Store(anyhow::Error),
}

impl ServiceError {
    pub fn invalid<S: Into<String>>(field: &'static str, msg: S) -> Self {
        Self::InvalidInput {
            field,
            msg: msg.into(),
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
