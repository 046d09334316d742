use crate::error::Error;
use crate::schema::{self, FieldError, FieldErrorReason, ValidationError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type BlockId = Uuid;

pub const TYPE_FIELD: &str = "type";
pub const MEDIA_TYPE_FIELD: &str = "mediaType";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Link,
    Media,
    Text,
    Pool,
    Referral,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Link => "link",
            BlockType::Media => "media",
            BlockType::Text => "text",
            BlockType::Pool => "pool",
            BlockType::Referral => "referral",
        }
    }
}

impl FromStr for BlockType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link" => Ok(BlockType::Link),
            "media" => Ok(BlockType::Media),
            "text" => Ok(BlockType::Text),
            "pool" => Ok(BlockType::Pool),
            "referral" => Ok(BlockType::Referral),
            _ => Err(Error::unsupported(s)),
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embeds and widgets a media block can stand for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    Spotify,
    Instagram,
    Youtube,
    Twitter,
    TokenPrice,
    NftCollection,
    Uniswap,
    Substack,
}

impl MediaType {
    pub const ALL: [MediaType; 8] = [
        MediaType::Spotify,
        MediaType::Instagram,
        MediaType::Youtube,
        MediaType::Twitter,
        MediaType::TokenPrice,
        MediaType::NftCollection,
        MediaType::Uniswap,
        MediaType::Substack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Spotify => "spotify",
            MediaType::Instagram => "instagram",
            MediaType::Youtube => "youtube",
            MediaType::Twitter => "twitter",
            MediaType::TokenPrice => "token-price",
            MediaType::NftCollection => "nft-collection",
            MediaType::Uniswap => "uniswap",
            MediaType::Substack => "substack",
        }
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaType::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::unsupported(&format!("media/{}", s)))
    }
}

/// Services a link block may point at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Instagram,
    Youtube,
    Tiktok,
    Discord,
    Telegram,
    Github,
    Linkedin,
    Facebook,
    Spotify,
    Twitch,
    Medium,
    Substack,
    Email,
    Custom,
}

impl Platform {
    pub const ALL: [Platform; 15] = [
        Platform::Twitter,
        Platform::Instagram,
        Platform::Youtube,
        Platform::Tiktok,
        Platform::Discord,
        Platform::Telegram,
        Platform::Github,
        Platform::Linkedin,
        Platform::Facebook,
        Platform::Spotify,
        Platform::Twitch,
        Platform::Medium,
        Platform::Substack,
        Platform::Email,
        Platform::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Discord => "discord",
            Platform::Telegram => "telegram",
            Platform::Github => "github",
            Platform::Linkedin => "linkedin",
            Platform::Facebook => "facebook",
            Platform::Spotify => "spotify",
            Platform::Twitch => "twitch",
            Platform::Medium => "medium",
            Platform::Substack => "substack",
            Platform::Email => "email",
            Platform::Custom => "custom",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkBlock {
    pub platform: Platform,
    pub url: String,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaBlock {
    #[serde(rename = "mediaType")]
    pub media_type: MediaType,
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBlock {
    pub address: String,
    pub label: String,
}

/// Typed payload of a block. The variant is fixed for the lifetime of the block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockContent {
    Link(LinkBlock),
    Media(MediaBlock),
    Text(TextBlock),
    Pool(PoolBlock),
    Referral,
}

impl BlockContent {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockContent::Link(_) => BlockType::Link,
            BlockContent::Media(_) => BlockType::Media,
            BlockContent::Text(_) => BlockType::Text,
            BlockContent::Pool(_) => BlockType::Pool,
            BlockContent::Referral => BlockType::Referral,
        }
    }
}

/// A validated block. Only constructed through [`Block::build`], so every
/// instance satisfies its type's field descriptors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    content: BlockContent,
}

impl Block {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn content(&self) -> &BlockContent {
        &self.content
    }

    pub fn block_type(&self) -> BlockType {
        self.content.block_type()
    }

    /// Validates `fields` against the descriptors of `type_tag` and builds a block.
    /// Null values are treated as absent.
    pub fn build(id: BlockId, type_tag: &str, mut fields: Map<String, Value>) -> Result<Self, Error> {
        let block_type: BlockType = type_tag.parse()?;

        if let Some(tag) = fields.remove(TYPE_FIELD) {
            if tag.as_str() != Some(block_type.as_str()) {
                return Err(
                    ValidationError::single(FieldError::new(TYPE_FIELD, FieldErrorReason::Immutable))
                        .into(),
                );
            }
        }
        fields.retain(|_, v| !v.is_null());

        let subtype = match block_type {
            BlockType::Media => fields.get(MEDIA_TYPE_FIELD).and_then(Value::as_str),
            _ => None,
        };
        schema::validate(type_tag, subtype, &fields)?;

        let content = match block_type {
            BlockType::Link => BlockContent::Link(from_fields(fields)?),
            BlockType::Media => BlockContent::Media(from_fields(fields)?),
            BlockType::Text => BlockContent::Text(from_fields(fields)?),
            BlockType::Pool => BlockContent::Pool(from_fields(fields)?),
            BlockType::Referral => BlockContent::Referral,
        };

        Ok(Block { id, content })
    }

    /// Decodes the persisted form. Unknown `type`/`mediaType` yields `UnsupportedBlockType`.
    pub fn decode(stored: StoredBlock) -> Result<Self, Error> {
        Self::build(stored.id, &stored.type_tag, stored.fields)
    }

    /// Field map without the `type` discriminator.
    pub fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        match &self.content {
            BlockContent::Link(link) => {
                fields.insert("platform".into(), link.platform.as_str().into());
                fields.insert("url".into(), link.url.clone().into());
                fields.insert("label".into(), link.label.clone().into());
            }
            BlockContent::Media(media) => {
                fields.insert(MEDIA_TYPE_FIELD.into(), media.media_type.as_str().into());
                fields.insert("url".into(), media.url.clone().into());
                if let Some(label) = &media.label {
                    fields.insert("label".into(), label.clone().into());
                }
                if let Some(content) = &media.content {
                    fields.insert("content".into(), content.clone().into());
                }
            }
            BlockContent::Text(text) => {
                fields.insert("content".into(), text.content.clone().into());
            }
            BlockContent::Pool(pool) => {
                fields.insert("address".into(), pool.address.clone().into());
                fields.insert("label".into(), pool.label.clone().into());
            }
            BlockContent::Referral => {}
        }
        fields
    }

    pub fn to_stored(&self) -> StoredBlock {
        StoredBlock {
            id: self.id,
            type_tag: self.block_type().as_str().to_string(),
            fields: self.fields(),
        }
    }
}

impl Serialize for Block {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_stored().serialize(serializer)
    }
}

/// Flat persisted/wire shape: `{ "id": .., "type": .., ...fields }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlock {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StoredBlock {
    /// Decodes a persisted block list one element at a time. Elements that are
    /// not block-shaped (missing or non-string `type`, bad id) are skipped so
    /// the rest of the page survives.
    pub fn decode_list(value: Value) -> Vec<StoredBlock> {
        let items = match value {
            Value::Array(items) => items,
            Value::Null => return Vec::new(),
            other => {
                log::warn!("stored blocks are not a list: {}", other);
                return Vec::new();
            }
        };

        items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(stored) => Some(stored),
                Err(e) => {
                    log::debug!("skip malformed stored block #{}: {}", index, e);
                    None
                }
            })
            .collect()
    }
}

pub(crate) fn deserialize_stored_list<'de, D>(deserializer: D) -> Result<Vec<StoredBlock>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(StoredBlock::decode_list(Value::deserialize(deserializer)?))
}

fn from_fields<T: DeserializeOwned>(fields: Map<String, Value>) -> Result<T, Error> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| Error::AnyError(anyhow::Error::new(e)))
}
