use crate::error::Error;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

pub type PostgresPool = Pool<Postgres>;

pub fn new_postgres_pool(env_var: &str) -> Result<PostgresPool, Error> {
    let url_from_env = std::env::var(env_var)?;

    Ok(PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(2))
        .connect_lazy(&url_from_env)?)
}

pub async fn run_migrations(pool: &PostgresPool) -> Result<(), Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
