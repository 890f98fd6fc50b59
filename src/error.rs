use actix_web::{http::StatusCode, ResponseError};
use log::error;
use sea_orm::{DbErr, SqlErr, TransactionError};
use thiserror::Error;

use crate::response::response_from_error;

/// Failures surfaced by the data store. Integrity violations are permanent
/// until the conflicting data changes; callers should not retry them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violation: {0}")]
    UniqueConstraintViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Db(DbErr),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => Self::UniqueConstraintViolation(msg),
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => Self::ForeignKeyViolation(msg),
            _ => match err {
                DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => Self::NotFound("record"),
                other => Self::Db(other),
            },
        }
    }
}

impl From<TransactionError<StoreError>> for StoreError {
    fn from(err: TransactionError<StoreError>) -> Self {
        match err {
            TransactionError::Connection(e) => e.into(),
            TransactionError::Transaction(e) => e,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{msg}")]
    Biz { code: i32, msg: String },
}

impl AppError {
    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::Biz { code: 1, msg: msg.into() }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self::Biz { code: 2, msg: msg.into() }
    }

    pub fn need_login() -> Self {
        Self::Biz { code: 3, msg: "please login first".to_string() }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::Biz { code: 4, msg: msg.into() }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Biz { code: 5, msg: msg.into() }
    }

    pub fn invalid_reference(msg: impl Into<String>) -> Self {
        Self::Biz { code: 6, msg: msg.into() }
    }

    pub fn system_exception() -> Self {
        Self::Biz { code: 99, msg: "system_exception".to_string() }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Biz { code, .. } => *code,
        }
    }

    pub fn msg(&self) -> &str {
        match self {
            Self::Biz { msg, .. } => msg,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueConstraintViolation(_) => Self::conflict("record already exists"),
            StoreError::ForeignKeyViolation(_) => Self::invalid_reference("referenced record does not exist"),
            StoreError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            StoreError::Db(e) => {
                error!("store failure: {}", e);
                Self::system_exception()
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        response_from_error(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_distinct_codes() {
        let codes: Vec<i32> = vec![
            StoreError::UniqueConstraintViolation("users.email".into()),
            StoreError::ForeignKeyViolation("posts.author_id".into()),
            StoreError::NotFound("post"),
            StoreError::Db(DbErr::Custom("boom".into())),
        ]
        .into_iter()
        .map(|e| AppError::from(e).code())
        .collect();
        assert_eq!(codes, vec![5, 6, 4, 99]);
    }

    #[test]
    fn record_not_updated_is_not_found() {
        assert!(matches!(StoreError::from(DbErr::RecordNotUpdated), StoreError::NotFound(_)));
    }
}
