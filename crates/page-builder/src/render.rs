//! Block → presentational unit dispatch.
//!
//! Dispatch is two-level: the outer match is on the block type, media blocks
//! are dispatched again on their media type in [`render_media`]. A new media
//! integration only adds a case to the inner match.

use crate::block::{
    Block, BlockContent, BlockId, LinkBlock, MediaBlock, MediaType, Platform, PoolBlock,
    StoredBlock, TextBlock,
};
use crate::theme::Theme;

use serde::Serialize;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitStyle {
    pub font_family: String,
    pub font_color: String,
    pub button_color: String,
}

impl From<&Theme> for UnitStyle {
    fn from(theme: &Theme) -> Self {
        UnitStyle {
            font_family: theme.font_family.clone(),
            font_color: theme.font_color.clone(),
            button_color: theme.button_color.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkUnit {
    pub block_id: BlockId,
    pub platform: Platform,
    pub href: String,
    pub label: String,
    pub style: UnitStyle,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextUnit {
    pub block_id: BlockId,
    pub content: String,
    pub style: UnitStyle,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolUnit {
    pub block_id: BlockId,
    pub address: String,
    pub short_address: String,
    pub label: String,
    pub style: UnitStyle,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralUnit {
    pub block_id: BlockId,
    pub style: UnitStyle,
}

/// An iframe-style embed of a third party page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedUnit {
    pub block_id: BlockId,
    pub source_url: String,
    pub embed_url: String,
    pub label: Option<String>,
    pub style: UnitStyle,
}

/// A live on-chain widget (price ticker, collection card, swap box).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetUnit {
    pub block_id: BlockId,
    pub url: String,
    pub label: Option<String>,
    pub content: Option<String>,
    pub style: UnitStyle,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "media", rename_all = "kebab-case")]
pub enum MediaUnit {
    Spotify(EmbedUnit),
    Instagram(EmbedUnit),
    Youtube(EmbedUnit),
    Twitter(EmbedUnit),
    Substack(EmbedUnit),
    TokenPrice(WidgetUnit),
    NftCollection(WidgetUnit),
    Uniswap(WidgetUnit),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "unit", rename_all = "lowercase")]
pub enum RenderedUnit {
    Link(LinkUnit),
    Media(MediaUnit),
    Text(TextUnit),
    Pool(PoolUnit),
    Referral(ReferralUnit),
}

pub fn render_block(block: &Block, theme: &Theme) -> RenderedUnit {
    let id = block.id();
    let style = UnitStyle::from(theme);

    match block.content() {
        BlockContent::Link(link) => RenderedUnit::Link(render_link(id, link, style)),
        BlockContent::Media(media) => RenderedUnit::Media(render_media(id, media, style)),
        BlockContent::Text(text) => RenderedUnit::Text(render_text(id, text, style)),
        BlockContent::Pool(pool) => RenderedUnit::Pool(render_pool(id, pool, style)),
        BlockContent::Referral => RenderedUnit::Referral(ReferralUnit {
            block_id: id,
            style,
        }),
    }
}

pub fn render_media(id: BlockId, media: &MediaBlock, style: UnitStyle) -> MediaUnit {
    match media.media_type {
        MediaType::Spotify => MediaUnit::Spotify(embed(id, media, spotify_embed_url, style)),
        MediaType::Instagram => MediaUnit::Instagram(embed(id, media, instagram_embed_url, style)),
        MediaType::Youtube => MediaUnit::Youtube(embed(id, media, youtube_embed_url, style)),
        MediaType::Twitter => MediaUnit::Twitter(embed(id, media, |u| Some(u.clone()), style)),
        MediaType::Substack => MediaUnit::Substack(embed(id, media, substack_embed_url, style)),
        MediaType::TokenPrice => MediaUnit::TokenPrice(widget(id, media, style)),
        MediaType::NftCollection => MediaUnit::NftCollection(widget(id, media, style)),
        MediaType::Uniswap => MediaUnit::Uniswap(widget(id, media, style)),
    }
}

pub fn render_page(blocks: &[Block], theme: &Theme) -> Vec<RenderedUnit> {
    blocks.iter().map(|b| render_block(b, theme)).collect()
}

/// Renders persisted blocks, skipping any that no longer decode
/// (unknown type, retired media integration) so the rest of the page survives.
pub fn render_stored(blocks: &[StoredBlock], theme: &Theme) -> Vec<RenderedUnit> {
    blocks
        .iter()
        .filter_map(|stored| match Block::decode(stored.clone()) {
            Ok(block) => Some(render_block(&block, theme)),
            Err(e) => {
                log::debug!("skip block {} while rendering: {}", stored.id, e);
                None
            }
        })
        .collect()
}

fn render_link(id: BlockId, link: &LinkBlock, style: UnitStyle) -> LinkUnit {
    LinkUnit {
        block_id: id,
        platform: link.platform,
        href: link.url.clone(),
        label: link.label.clone(),
        style,
    }
}

fn render_text(id: BlockId, text: &TextBlock, style: UnitStyle) -> TextUnit {
    TextUnit {
        block_id: id,
        content: text.content.clone(),
        style,
    }
}

fn render_pool(id: BlockId, pool: &PoolBlock, style: UnitStyle) -> PoolUnit {
    PoolUnit {
        block_id: id,
        address: pool.address.clone(),
        short_address: short_address(&pool.address),
        label: pool.label.clone(),
        style,
    }
}

fn embed(
    id: BlockId,
    media: &MediaBlock,
    to_embed: impl Fn(&Url) -> Option<Url>,
    style: UnitStyle,
) -> EmbedUnit {
    let embed_url = Url::parse(&media.url)
        .ok()
        .and_then(|u| to_embed(&u))
        .map(String::from)
        .unwrap_or_else(|| media.url.clone());

    EmbedUnit {
        block_id: id,
        source_url: media.url.clone(),
        embed_url,
        label: media.label.clone(),
        style,
    }
}

fn widget(id: BlockId, media: &MediaBlock, style: UnitStyle) -> WidgetUnit {
    WidgetUnit {
        block_id: id,
        url: media.url.clone(),
        label: media.label.clone(),
        content: media.content.clone(),
        style,
    }
}

fn host_matches(url: &Url, domain: &str) -> bool {
    url.host_str()
        .map(|h| h == domain || h.ends_with(&format!(".{}", domain)))
        .unwrap_or(false)
}

/// open.spotify.com/track/x → open.spotify.com/embed/track/x
fn spotify_embed_url(url: &Url) -> Option<Url> {
    if !host_matches(url, "spotify.com") {
        return None;
    }
    if url.path().starts_with("/embed/") {
        return Some(url.clone());
    }
    let mut embed = url.clone();
    embed.set_path(&format!("/embed{}", url.path()));
    embed.set_query(None);
    Some(embed)
}

fn youtube_embed_url(url: &Url) -> Option<Url> {
    let video_id: Option<String> = if host_matches(url, "youtu.be") {
        url.path_segments()?.next().map(str::to_string)
    } else if host_matches(url, "youtube.com") {
        let mut segments = url.path_segments()?;
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some("embed") | Some("shorts") => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        None
    };

    let video_id = video_id.filter(|v| !v.is_empty())?;
    Url::parse(&format!("https://www.youtube.com/embed/{}", video_id)).ok()
}

fn instagram_embed_url(url: &Url) -> Option<Url> {
    if !host_matches(url, "instagram.com") {
        return None;
    }
    let path = url.path().trim_end_matches('/');
    if path.ends_with("/embed") {
        return Some(url.clone());
    }
    let mut embed = url.clone();
    embed.set_path(&format!("{}/embed", path));
    embed.set_query(None);
    Some(embed)
}

fn substack_embed_url(url: &Url) -> Option<Url> {
    if !host_matches(url, "substack.com") {
        return None;
    }
    let mut embed = url.clone();
    embed.set_path("/embed");
    embed.set_query(None);
    Some(embed)
}

fn short_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}
