pub mod domain;
pub mod onelink;
pub mod page;
pub mod schema;

use actix_http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use page_builder::schema::{FieldError, ValidationError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0:?}")]
    ActixWeb(actix_web::Error),

    #[error("{0:?}")]
    DbError(database::error::Error),

    #[error("{0:?}")]
    AnyError(anyhow::Error),

    #[error("UnAuthorized")]
    UnAuthorized {},

    #[error("NotFound: {msg}")]
    NotFound { msg: String },

    #[error("InvalidParams: {msg}")]
    InvalidParams { msg: String },

    #[error("Conflict: {msg}")]
    Conflict { msg: String },

    #[error("{0}")]
    Validation(ValidationError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [FieldError]>,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::ActixWeb(e) => e.error_response().status(),
            Error::AnyError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::DbError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::UnAuthorized {} => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidParams { .. } => StatusCode::BAD_REQUEST,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("{}", self);
        }

        let fields = match self {
            Error::Validation(v) => Some(v.errors.as_slice()),
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            fields,
        })
    }
}

impl From<actix_web::Error> for Error {
    fn from(error: actix_web::Error) -> Self {
        Self::ActixWeb(error)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::AnyError(e)
    }
}

impl From<database::error::Error> for Error {
    fn from(e: database::error::Error) -> Self {
        Self::DbError(e)
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Self::DbError(e.into())
    }
}

impl From<page_builder::Error> for Error {
    fn from(e: page_builder::Error) -> Self {
        use page_builder::Error as PageError;

        match e {
            PageError::Validation(v) => Self::Validation(v),
            PageError::UnsupportedBlockType { .. } | PageError::IndexOutOfRange { .. } => {
                Self::InvalidParams { msg: e.to_string() }
            }
            PageError::NotFound { .. } | PageError::PageNotFound { .. } => {
                Self::NotFound { msg: e.to_string() }
            }
            PageError::Conflict { .. } => Self::Conflict { msg: e.to_string() },
            PageError::Store { .. } | PageError::Lookup { .. } => {
                Self::AnyError(anyhow::anyhow!(e.to_string()))
            }
            PageError::AnyError(e) => Self::AnyError(e),
        }
    }
}

#[cfg(test)]
mod error_response {
    use super::*;
    use actix_web::body::to_bytes;
    use page_builder::schema::FieldErrorReason;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                page_builder::Error::unsupported("carousel"),
                StatusCode::BAD_REQUEST,
            ),
            (
                page_builder::Error::IndexOutOfRange { index: 5, len: 2 },
                StatusCode::BAD_REQUEST,
            ),
            (
                page_builder::Error::NotFound { id: Uuid::new_v4() },
                StatusCode::NOT_FOUND,
            ),
            (
                page_builder::Error::PageNotFound {
                    onelink: "alice".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                page_builder::Error::Conflict {
                    onelink: "alice".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                page_builder::Error::Store {
                    msg: "down".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (e, status) in cases {
            assert_eq!(Error::from(e).status_code(), status);
        }
    }

    #[actix_rt::test]
    async fn test_validation_body_lists_fields() {
        let e = Error::from(page_builder::Error::Validation(ValidationError::single(
            FieldError::new("label", FieldErrorReason::TooShort { min_length: 1 }),
        )));

        let res = e.error_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(res.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["fields"][0]["field"], "label");
        assert_eq!(body["fields"][0]["reason"], "too_short");
    }
}
