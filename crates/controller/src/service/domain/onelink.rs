use crate::service::domain::Count;

use database::db::PostgresPool;
use page_builder::HandleLookup;

use async_trait::async_trait;
use sqlx::query_as;

/// A onelink is available while no profile row claims it.
#[derive(Clone)]
pub struct PgHandleLookup {
    app_db: PostgresPool,
}

impl PgHandleLookup {
    pub fn new(app_db: PostgresPool) -> Self {
        PgHandleLookup { app_db }
    }
}

pub(crate) async fn get_onelink_count(
    app_db: &PostgresPool,
    onelink: &str,
) -> Result<Count, sqlx::Error> {
    query_as::<_, Count>(
        "
                SELECT COUNT(id) as count
                FROM profile
                WHERE onelink = $1
            ",
    )
    .bind(onelink)
    .fetch_one(app_db)
    .await
}

#[async_trait]
impl HandleLookup for PgHandleLookup {
    async fn is_available(&self, handle: &str) -> Result<bool, page_builder::Error> {
        let count = get_onelink_count(&self.app_db, handle)
            .await
            .map_err(|e| page_builder::Error::Lookup { msg: e.to_string() })?;

        Ok(count.count == 0)
    }
}
