use crate::service::Error;

use database::db::PostgresPool;
use database::models::page::click::BlockClickCount;
use database::models::page::profile::{NewProfile, Profile};
use page_builder::{BlockId, Page, PageChanges, ProfileStore, StoredBlock, Theme};

use async_trait::async_trait;
use sqlx::{query, query_as};

fn store_error(e: impl std::fmt::Display) -> page_builder::Error {
    page_builder::Error::Store { msg: e.to_string() }
}

/// Postgres-backed profile store; one `profile` row per claimed onelink.
#[derive(Clone)]
pub struct PgProfileStore {
    app_db: PostgresPool,
}

impl PgProfileStore {
    pub fn new(app_db: PostgresPool) -> Self {
        PgProfileStore { app_db }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn load(&self, onelink: &str) -> Result<Page, page_builder::Error> {
        let profile = query_as::<_, Profile>(
            "
                SELECT *
                FROM profile
                WHERE onelink = $1
            ",
        )
        .bind(onelink)
        .fetch_optional(&self.app_db)
        .await
        .map_err(store_error)?
        .ok_or_else(|| page_builder::Error::PageNotFound {
            onelink: onelink.to_string(),
        })?;

        let blocks = StoredBlock::decode_list(profile.blocks);

        let theme = serde_json::from_value::<Theme>(profile.theme).unwrap_or_else(|e| {
            log::warn!("page {}: unreadable theme, using default: {}", onelink, e);
            Theme::default()
        });

        Ok(Page {
            onelink: profile.onelink,
            blocks,
            theme,
            revision: profile.revision,
        })
    }

    async fn save(
        &self,
        onelink: &str,
        revision: i64,
        changes: PageChanges<'_>,
    ) -> Result<i64, page_builder::Error> {
        let blocks = changes
            .blocks
            .map(serde_json::to_value)
            .transpose()
            .map_err(store_error)?;
        let theme = changes
            .theme
            .map(serde_json::to_value)
            .transpose()
            .map_err(store_error)?;

        // Columns without changes keep their stored value.
        let saved = query_as::<_, (i64,)>(
            "
                UPDATE profile
                    SET
                        blocks = COALESCE($1, blocks),
                        theme = COALESCE($2, theme),
                        revision = revision + 1,
                        last_edit_datetime = now()
                WHERE onelink = $3 AND revision = $4
                RETURNING revision
            ",
        )
        .bind(blocks)
        .bind(theme)
        .bind(onelink)
        .bind(revision)
        .fetch_optional(&self.app_db)
        .await
        .map_err(store_error)?;

        if let Some((revision,)) = saved {
            return Ok(revision);
        }

        let exists = query_as::<_, (i64,)>(
            "
                SELECT revision
                FROM profile
                WHERE onelink = $1
            ",
        )
        .bind(onelink)
        .fetch_optional(&self.app_db)
        .await
        .map_err(store_error)?;

        match exists {
            Some(_) => Err(page_builder::Error::Conflict {
                onelink: onelink.to_string(),
            }),
            None => Err(page_builder::Error::PageNotFound {
                onelink: onelink.to_string(),
            }),
        }
    }
}

/// Auth-checked and normalized onelink at upper layer
pub(crate) async fn claim_onelink(app_db: &PostgresPool, onelink: &str) -> Result<Page, Error> {
    let theme = Theme::default();
    let new_profile = NewProfile::new(
        onelink,
        serde_json::json!([]),
        serde_json::to_value(&theme).map_err(anyhow::Error::new)?,
    );

    let res = query(
        "
                INSERT INTO profile
                (onelink, blocks, theme) VALUES ($1, $2, $3)
                ON CONFLICT (onelink) DO NOTHING
             ",
    )
    .bind(&new_profile.onelink)
    .bind(&new_profile.blocks)
    .bind(&new_profile.theme)
    .execute(app_db)
    .await?;

    if res.rows_affected() == 0 {
        return Err(Error::Conflict {
            msg: format!("onelink {} is already claimed", onelink),
        });
    }

    Ok(Page {
        onelink: new_profile.onelink,
        blocks: Vec::new(),
        theme,
        revision: 0,
    })
}

pub(crate) async fn record_click(
    app_db: &PostgresPool,
    onelink: &str,
    block_id: BlockId,
) -> Result<(), Error> {
    query(
        "
                INSERT INTO block_click
                (onelink, block_id) VALUES ($1, $2)
             ",
    )
    .bind(onelink)
    .bind(block_id.to_string())
    .execute(app_db)
    .await?;

    Ok(())
}

pub(crate) async fn get_click_counts(
    app_db: &PostgresPool,
    onelink: &str,
) -> Result<Vec<BlockClickCount>, Error> {
    Ok(query_as::<_, BlockClickCount>(
        "
                SELECT block_id, COUNT(id) as clicks
                FROM block_click
                WHERE onelink = $1
                GROUP BY block_id
                ORDER BY clicks DESC
            ",
    )
    .bind(onelink)
    .fetch_all(app_db)
    .await?)
}
