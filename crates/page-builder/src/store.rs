use crate::block::{deserialize_stored_list, StoredBlock};
use crate::error::Error;
use crate::theme::Theme;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A page as the profile store holds it. `revision` increases with every
/// successful save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub onelink: String,
    #[serde(deserialize_with = "deserialize_stored_list")]
    pub blocks: Vec<StoredBlock>,
    pub theme: Theme,
    #[serde(default)]
    pub revision: i64,
}

/// The parts of a page one save writes; `None` leaves the stored value as is.
#[derive(Clone, Copy, Debug, Default)]
pub struct PageChanges<'a> {
    pub blocks: Option<&'a [StoredBlock]>,
    pub theme: Option<&'a Theme>,
}

impl PageChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_none() && self.theme.is_none()
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fails with `PageNotFound` when no page is claimed under `onelink`.
    async fn load(&self, onelink: &str) -> Result<Page, Error>;

    /// Writes `changes` only when the stored page is still at `revision` and
    /// returns the new revision. Fails with `Conflict` when another writer
    /// saved the page in between.
    async fn save(
        &self,
        onelink: &str,
        revision: i64,
        changes: PageChanges<'_>,
    ) -> Result<i64, Error>;
}
