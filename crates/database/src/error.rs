use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("sqlx error: {0:?}")]
    SqlXError(sqlx::Error),

    #[error("var error: {0}")]
    VarError(std::env::VarError),

    #[error("migrate error: {0}")]
    MigrateError(sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Self::SqlXError(e)
    }
}

impl From<std::env::VarError> for Error {
    fn from(e: std::env::VarError) -> Self {
        Self::VarError(e)
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::MigrateError(e)
    }
}
