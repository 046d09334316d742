//! Block-based profile pages: block schema and validation, the ordered block
//! list, rendering dispatch, editor sessions and handle availability checks.

pub mod block;
pub mod error;
pub mod handle;
pub mod model;
pub mod render;
pub mod schema;
pub mod session;
pub mod store;
pub mod theme;

pub use crate::block::{Block, BlockContent, BlockId, BlockType, MediaType, Platform, StoredBlock};
pub use crate::error::Error;
pub use crate::handle::{
    is_equivalent_onelink, normalize_handle, AvailabilityChecker, CheckerConfig, HandleLookup,
    HandleStatus,
};
pub use crate::model::BlockList;
pub use crate::render::{render_block, render_page, render_stored, RenderedUnit};
pub use crate::session::EditorSession;
pub use crate::store::{Page, PageChanges, ProfileStore};
pub use crate::theme::{Theme, ThemePatch};
