use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BlockClick {
    pub id: i64,
    pub onelink: String,
    pub block_id: String,
    pub clicked_at: NaiveDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BlockClickCount {
    pub block_id: String,
    pub clicks: i64,
}
