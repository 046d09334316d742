use crate::block::{Block, BlockId, StoredBlock};
use crate::error::Error;
use crate::model::BlockList;
use crate::render::{render_page, RenderedUnit};
use crate::store::{PageChanges, ProfileStore};
use crate::theme::{Theme, ThemePatch};

use serde_json::{Map, Value};
use std::sync::Arc;

/// How often [`EditorSession::edit`] starts over after losing a save race.
pub const COMMIT_ATTEMPTS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DragState {
    pub block_id: BlockId,
    pub from_index: usize,
    pub over_index: usize,
}

/// A stored block the session cannot edit, kept so a commit writes it back.
/// `after` is the editable block it followed on load.
#[derive(Clone, Debug)]
struct DroppedBlock {
    after: Option<BlockId>,
    stored: StoredBlock,
}

/// Editing state of one page: the block list, theme, selection and an
/// in-progress drag. Changes stay local until [`commit`](Self::commit).
pub struct EditorSession<S> {
    store: Arc<S>,
    onelink: String,
    revision: i64,
    blocks: BlockList,
    theme: Theme,
    selected: Option<BlockId>,
    drag: Option<DragState>,
    blocks_dirty: bool,
    theme_dirty: bool,
    dropped: Vec<DroppedBlock>,
}

impl<S> EditorSession<S>
where
    S: ProfileStore,
{
    /// Loads the page. Blocks that no longer decode are not editable and are
    /// reported by [`dropped`](Self::dropped); commits write them back in place.
    pub async fn open(store: Arc<S>, onelink: &str) -> Result<Self, Error> {
        let page = store.load(onelink).await?;

        let mut blocks: Vec<Block> = Vec::with_capacity(page.blocks.len());
        let mut dropped = Vec::new();
        for stored in page.blocks {
            match Block::decode(stored.clone()) {
                Ok(block) => blocks.push(block),
                Err(e) => {
                    log::warn!("page {}: block {} not editable: {}", onelink, stored.id, e);
                    dropped.push(DroppedBlock {
                        after: blocks.last().map(Block::id),
                        stored,
                    });
                }
            }
        }

        Ok(EditorSession {
            store,
            onelink: page.onelink,
            revision: page.revision,
            blocks: BlockList::from_blocks(blocks)?,
            theme: page.theme,
            selected: None,
            drag: None,
            blocks_dirty: false,
            theme_dirty: false,
            dropped,
        })
    }

    /// Opens the page, applies `edit` and commits. When another writer saved
    /// the page in between, the edit is replayed on a fresh load, up to
    /// [`COMMIT_ATTEMPTS`] times.
    pub async fn edit<T, F>(store: Arc<S>, onelink: &str, mut edit: F) -> Result<(Self, T), Error>
    where
        F: FnMut(&mut Self) -> Result<T, Error>,
    {
        let mut attempt = 1;
        loop {
            let mut session = Self::open(store.clone(), onelink).await?;
            let output = edit(&mut session)?;

            match session.commit().await {
                Ok(_) => return Ok((session, output)),
                Err(Error::Conflict { .. }) if attempt < COMMIT_ATTEMPTS => {
                    log::debug!("page {}: save raced another writer, retry #{}", onelink, attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn onelink(&self) -> &str {
        &self.onelink
    }

    pub fn blocks(&self) -> &BlockList {
        &self.blocks
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn selected(&self) -> Option<&Block> {
        self.selected.and_then(|id| self.blocks.get(id))
    }

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.blocks_dirty || self.theme_dirty
    }

    pub fn dropped(&self) -> impl Iterator<Item = &StoredBlock> {
        self.dropped.iter().map(|d| &d.stored)
    }

    pub fn select(&mut self, id: BlockId) -> Result<(), Error> {
        if self.blocks.get(id).is_none() {
            return Err(Error::NotFound { id });
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Adds a block at the end of the page and selects it.
    pub fn add_block(&mut self, type_tag: &str, fields: Map<String, Value>) -> Result<&Block, Error> {
        let id = self.blocks.add_block(type_tag, fields)?.id();
        self.selected = Some(id);
        self.blocks_dirty = true;
        self.blocks.get(id).ok_or(Error::NotFound { id })
    }

    pub fn update_block(&mut self, id: BlockId, patch: Map<String, Value>) -> Result<&Block, Error> {
        self.blocks.update_block(id, patch)?;
        self.blocks_dirty = true;
        self.blocks.get(id).ok_or(Error::NotFound { id })
    }

    pub fn remove_block(&mut self, id: BlockId) -> Result<Block, Error> {
        let removed = self.blocks.remove_block(id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.drag.map(|d| d.block_id) == Some(id) {
            self.drag = None;
        }
        self.blocks_dirty = true;
        Ok(removed)
    }

    pub fn reorder(&mut self, id: BlockId, new_index: usize) -> Result<(), Error> {
        let before = self.blocks.position(id);
        self.blocks.reorder(id, new_index)?;
        if before != Some(new_index) {
            self.blocks_dirty = true;
        }
        Ok(())
    }

    pub fn begin_drag(&mut self, id: BlockId) -> Result<(), Error> {
        let from_index = self.blocks.position(id).ok_or(Error::NotFound { id })?;
        self.drag = Some(DragState {
            block_id: id,
            from_index,
            over_index: from_index,
        });
        Ok(())
    }

    /// Updates the hover position of the current drag; ignored when nothing is dragged.
    pub fn drag_over(&mut self, index: usize) -> Result<(), Error> {
        let len = self.blocks.len();
        if let Some(drag) = self.drag.as_mut() {
            if index >= len {
                return Err(Error::IndexOutOfRange { index, len });
            }
            drag.over_index = index;
        }
        Ok(())
    }

    /// Finishes the drag, moving the block to the hovered index.
    /// Returns the block's final index, or `None` when no drag was active.
    pub fn drop_drag(&mut self) -> Result<Option<usize>, Error> {
        let drag = match self.drag.take() {
            Some(drag) => drag,
            None => return Ok(None),
        };
        self.reorder(drag.block_id, drag.over_index)?;
        Ok(Some(drag.over_index))
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    pub fn apply_theme(&mut self, patch: &ThemePatch) -> &Theme {
        let merged = self.theme.merge(patch);
        if merged != self.theme {
            self.theme = merged;
            self.theme_dirty = true;
        }
        &self.theme
    }

    pub fn preview(&self) -> Vec<RenderedUnit> {
        render_page(self.blocks.as_slice(), &self.theme)
    }

    /// The block list as it is persisted: editable blocks in order, with the
    /// non-editable ones after the block they followed on load. Those whose
    /// predecessor was removed go last.
    pub fn stored_blocks(&self) -> Vec<StoredBlock> {
        let mut stored = Vec::with_capacity(self.blocks.len() + self.dropped.len());
        stored.extend(self.dropped_after(None));
        for block in &self.blocks {
            stored.push(block.to_stored());
            stored.extend(self.dropped_after(Some(block.id())));
        }
        stored.extend(
            self.dropped
                .iter()
                .filter(|d| matches!(d.after, Some(id) if self.blocks.get(id).is_none()))
                .map(|d| d.stored.clone()),
        );
        stored
    }

    fn dropped_after(&self, after: Option<BlockId>) -> impl Iterator<Item = StoredBlock> + '_ {
        self.dropped
            .iter()
            .filter(move |d| d.after == after)
            .map(|d| d.stored.clone())
    }

    /// Saves the changed parts of the page through the store. Returns whether
    /// anything was written; a failed save keeps the session dirty.
    ///
    /// Fails with `Conflict` when the page was saved by someone else since
    /// this session loaded it.
    pub async fn commit(&mut self) -> Result<bool, Error> {
        if !self.is_dirty() {
            return Ok(false);
        }

        let blocks = self.blocks_dirty.then(|| self.stored_blocks());
        let changes = PageChanges {
            blocks: blocks.as_deref(),
            theme: self.theme_dirty.then_some(&self.theme),
        };
        self.revision = self.store.save(&self.onelink, self.revision, changes).await?;

        self.blocks_dirty = false;
        self.theme_dirty = false;
        Ok(true)
    }
}

#[cfg(test)]
mod editor_session {
    use super::*;
    use crate::store::Page;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct MemoryStore {
        pages: Mutex<HashMap<String, Page>>,
        saves: Mutex<usize>,
        fail_saves: bool,
        /// Blocks another writer appends right before the next saves land.
        interleaved: Mutex<Vec<StoredBlock>>,
    }

    impl MemoryStore {
        fn with_page(page: Page) -> Self {
            let store = MemoryStore::default();
            store
                .pages
                .lock()
                .unwrap()
                .insert(page.onelink.clone(), page);
            store
        }

        fn page(&self, onelink: &str) -> Page {
            self.pages.lock().unwrap()[onelink].clone()
        }

        fn saves(&self) -> usize {
            *self.saves.lock().unwrap()
        }
    }

    #[async_trait]
    impl ProfileStore for MemoryStore {
        async fn load(&self, onelink: &str) -> Result<Page, Error> {
            self.pages
                .lock()
                .unwrap()
                .get(onelink)
                .cloned()
                .ok_or_else(|| Error::PageNotFound {
                    onelink: onelink.to_string(),
                })
        }

        async fn save(
            &self,
            onelink: &str,
            revision: i64,
            changes: PageChanges<'_>,
        ) -> Result<i64, Error> {
            if self.fail_saves {
                return Err(Error::Store {
                    msg: "db unavailable".to_string(),
                });
            }

            let mut pages = self.pages.lock().unwrap();
            let page = pages.get_mut(onelink).ok_or_else(|| Error::PageNotFound {
                onelink: onelink.to_string(),
            })?;

            if let Some(other) = self.interleaved.lock().unwrap().pop() {
                page.blocks.push(other);
                page.revision += 1;
            }
            if page.revision != revision {
                return Err(Error::Conflict {
                    onelink: onelink.to_string(),
                });
            }

            if let Some(blocks) = changes.blocks {
                page.blocks = blocks.to_vec();
            }
            if let Some(theme) = changes.theme {
                page.theme = theme.clone();
            }
            page.revision += 1;
            *self.saves.lock().unwrap() += 1;
            Ok(page.revision)
        }
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn empty_page(onelink: &str) -> Page {
        Page {
            onelink: onelink.to_string(),
            blocks: Vec::new(),
            theme: Theme::default(),
            revision: 0,
        }
    }

    fn stored(value: Value) -> StoredBlock {
        serde_json::from_value(value).unwrap()
    }

    fn tiktok() -> StoredBlock {
        stored(json!({
            "id": Uuid::new_v4(),
            "type": "media",
            "mediaType": "tiktok",
            "url": "https://tiktok.com/@alice"
        }))
    }

    fn night() -> ThemePatch {
        ThemePatch {
            name: Some("night".to_string()),
            ..Default::default()
        }
    }

    async fn open_with_three(store: &Arc<MemoryStore>) -> EditorSession<MemoryStore> {
        let mut session = EditorSession::open(store.clone(), "alice").await.unwrap();
        for content in ["one", "two", "three"] {
            session
                .add_block("text", fields(json!({ "content": content })))
                .unwrap();
        }
        session
    }

    fn contents(session: &EditorSession<MemoryStore>) -> Vec<String> {
        session
            .blocks()
            .iter()
            .map(|b| b.fields()["content"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_open_missing_page() {
        let store = Arc::new(MemoryStore::default());
        assert!(matches!(
            EditorSession::open(store, "nobody").await,
            Err(Error::PageNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_sets_aside_unknown_blocks() {
        let mut page = empty_page("alice");
        page.blocks.push(stored(
            json!({"id": Uuid::new_v4(), "type": "text", "content": "ok"}),
        ));
        page.blocks.push(tiktok());
        let store = Arc::new(MemoryStore::with_page(page));

        let session = EditorSession::open(store, "alice").await.unwrap();
        assert_eq!(session.blocks().len(), 1);
        assert_eq!(session.dropped().count(), 1);
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_commit_keeps_unknown_blocks_in_place() {
        let first = stored(json!({"id": Uuid::new_v4(), "type": "text", "content": "one"}));
        let second = stored(json!({"id": Uuid::new_v4(), "type": "text", "content": "two"}));
        let unknown = tiktok();

        let mut page = empty_page("alice");
        page.blocks = vec![first.clone(), unknown.clone(), second.clone()];
        let store = Arc::new(MemoryStore::with_page(page));

        let mut session = EditorSession::open(store.clone(), "alice").await.unwrap();
        session.reorder(second.id, 0).unwrap();
        session.commit().await.unwrap();
        assert_eq!(
            store.page("alice").blocks,
            vec![second.clone(), first.clone(), unknown.clone()]
        );

        let mut session = EditorSession::open(store.clone(), "alice").await.unwrap();
        session.remove_block(first.id).unwrap();
        session.commit().await.unwrap();
        assert_eq!(store.page("alice").blocks, vec![second, unknown]);
    }

    #[tokio::test]
    async fn test_add_selects_and_commit_saves() {
        let store = Arc::new(MemoryStore::with_page(empty_page("alice")));
        let mut session = open_with_three(&store).await;

        let last = session.blocks().as_slice()[2].id();
        assert_eq!(session.selected().map(Block::id), Some(last));
        assert!(session.is_dirty());

        assert!(session.commit().await.unwrap());
        assert!(!session.commit().await.unwrap());
        assert_eq!(store.saves(), 1);
        assert_eq!(session.revision(), 1);
        assert_eq!(store.page("alice").blocks, session.blocks().to_stored());
    }

    #[tokio::test]
    async fn test_stale_session_does_not_overwrite() {
        let store = Arc::new(MemoryStore::with_page(empty_page("alice")));
        let mut blocks_writer = EditorSession::open(store.clone(), "alice").await.unwrap();
        let mut theme_writer = EditorSession::open(store.clone(), "alice").await.unwrap();

        blocks_writer
            .add_block("text", fields(json!({"content": "hello"})))
            .unwrap();
        blocks_writer.commit().await.unwrap();

        theme_writer.apply_theme(&night());
        assert!(matches!(
            theme_writer.commit().await,
            Err(Error::Conflict { .. })
        ));
        assert!(theme_writer.is_dirty());

        let page = store.page("alice");
        assert_eq!(page.blocks.len(), 1);
        assert_eq!(page.theme.name, "default");
    }

    #[tokio::test]
    async fn test_edit_replays_after_concurrent_save() {
        let store = Arc::new(MemoryStore::with_page(empty_page("alice")));
        let other = stored(json!({"id": Uuid::new_v4(), "type": "text", "content": "other"}));
        store.interleaved.lock().unwrap().push(other.clone());

        let mut calls = 0;
        let (session, theme) = EditorSession::edit(store.clone(), "alice", |session| {
            calls += 1;
            Ok(session.apply_theme(&night()).clone())
        })
        .await
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(theme.name, "night");
        assert!(!session.is_dirty());

        let page = store.page("alice");
        assert_eq!(page.blocks, vec![other]);
        assert_eq!(page.theme.name, "night");
        assert_eq!(page.revision, 2);
    }

    #[tokio::test]
    async fn test_edit_gives_up_after_repeated_conflicts() {
        let store = Arc::new(MemoryStore::with_page(empty_page("alice")));
        for _ in 0..COMMIT_ATTEMPTS {
            store.interleaved.lock().unwrap().push(stored(
                json!({"id": Uuid::new_v4(), "type": "referral"}),
            ));
        }

        let res = EditorSession::edit(store.clone(), "alice", |session| {
            session.add_block("referral", Map::new()).map(|b| b.id())
        })
        .await;

        assert!(matches!(res, Err(Error::Conflict { .. })));
        assert_eq!(store.page("alice").blocks.len(), COMMIT_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_edit_stops_on_invalid_input() {
        let store = Arc::new(MemoryStore::with_page(empty_page("alice")));
        let res = EditorSession::edit(store.clone(), "alice", |session| {
            session
                .add_block("link", fields(json!({"platform": "github"})))
                .map(|b| b.id())
        })
        .await;

        assert!(matches!(res, Err(Error::Validation(_))));
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_drag_and_drop() {
        let store = Arc::new(MemoryStore::with_page(empty_page("alice")));
        let mut session = open_with_three(&store).await;
        let first = session.blocks().as_slice()[0].id();

        session.begin_drag(first).unwrap();
        session.drag_over(1).unwrap();
        assert!(matches!(
            session.drag_over(3),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
        session.drag_over(2).unwrap();
        assert_eq!(session.drop_drag().unwrap(), Some(2));

        assert_eq!(contents(&session), vec!["two", "three", "one"]);
        assert!(session.drag().is_none());
        assert_eq!(session.drop_drag().unwrap(), None);

        session.begin_drag(first).unwrap();
        session.drag_over(0).unwrap();
        session.cancel_drag();
        assert_eq!(contents(&session), vec!["two", "three", "one"]);
    }

    #[tokio::test]
    async fn test_remove_clears_selection() {
        let store = Arc::new(MemoryStore::with_page(empty_page("alice")));
        let mut session = open_with_three(&store).await;
        let second = session.blocks().as_slice()[1].id();

        session.select(second).unwrap();
        session.remove_block(second).unwrap();
        assert!(session.selected().is_none());
        assert!(matches!(
            session.select(second),
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_theme_and_failed_commit() {
        let store = Arc::new(MemoryStore {
            fail_saves: true,
            ..MemoryStore::with_page(empty_page("alice"))
        });
        let mut session = EditorSession::open(store.clone(), "alice").await.unwrap();

        session.apply_theme(&ThemePatch::default());
        assert!(!session.is_dirty());

        let theme = session.apply_theme(&ThemePatch {
            button_color: Some("#00ff00".to_string()),
            ..Default::default()
        });
        assert_eq!(theme.button_color, "#00ff00");
        assert_eq!(theme.name, "default");

        assert!(matches!(session.commit().await, Err(Error::Store { .. })));
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn test_preview_follows_order() {
        let store = Arc::new(MemoryStore::with_page(empty_page("alice")));
        let mut session = open_with_three(&store).await;
        let third = session.blocks().as_slice()[2].id();

        session.reorder(third, 0).unwrap();
        let preview = session.preview();
        assert!(
            matches!(&preview[0], RenderedUnit::Text(t) if t.content == "three" && t.block_id == third)
        );
    }

    #[test]
    fn test_page_decode_skips_malformed_blocks() {
        let page: Page = serde_json::from_value(json!({
            "onelink": "alice",
            "blocks": [
                {"id": Uuid::new_v4(), "type": "text", "content": "ok"},
                {"id": Uuid::new_v4(), "type": null, "content": "broken"}
            ],
            "theme": Theme::default()
        }))
        .unwrap();

        assert_eq!(page.blocks.len(), 1);
        assert_eq!(page.blocks[0].fields["content"], "ok");
        assert_eq!(page.revision, 0);
    }
}
