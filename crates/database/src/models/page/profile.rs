use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::JsonValue;
use sqlx::FromRow;

/// One claimed onelink and its page. `blocks` holds the stored block list,
/// `theme` the page theme, both as JSON. `revision` counts saves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i32,
    pub onelink: String,
    pub blocks: JsonValue,
    pub theme: JsonValue,
    pub revision: i64,
    pub last_edit_datetime: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NewProfile {
    pub onelink: String,
    pub blocks: JsonValue,
    pub theme: JsonValue,
}

impl NewProfile {
    pub fn new(onelink: &str, blocks: JsonValue, theme: JsonValue) -> Self {
        NewProfile {
            onelink: onelink.to_string(),
            blocks,
            theme,
        }
    }
}
