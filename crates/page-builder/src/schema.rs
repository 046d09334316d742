//! Field descriptors per block variant and the validation that runs against them.
//!
//! Descriptors are what an editor panel presents for a block type; validation
//! walks the same descriptors, so the two never drift apart.

use crate::block::{BlockType, MediaType, Platform, MEDIA_TYPE_FIELD};
use crate::error::Error;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

pub const HEX_ADDRESS_PATTERN: &str = "^0x[a-fA-F0-9]+$";

static HEX_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(HEX_ADDRESS_PATTERN).expect("hex address pattern compiles"));

/// Compiled form of a descriptor pattern; every `FieldKind::Pattern` in this
/// module must resolve here.
fn compiled(pattern: &str) -> Option<&'static Regex> {
    match pattern {
        HEX_ADDRESS_PATTERN => Some(&HEX_ADDRESS),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldKind {
    Enum { values: Vec<&'static str> },
    String { min_length: usize },
    Pattern { pattern: &'static str },
    Url,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub optional: bool,
}

impl FieldDescriptor {
    fn required(name: &'static str, kind: FieldKind) -> Self {
        FieldDescriptor {
            name,
            kind,
            optional: false,
        }
    }

    fn optional(name: &'static str, kind: FieldKind) -> Self {
        FieldDescriptor {
            name,
            kind,
            optional: true,
        }
    }

    /// Checks one field value. `None` and `null` both mean absent.
    pub fn check(&self, value: Option<&Value>) -> Result<(), FieldErrorReason> {
        let value = match value {
            None | Some(Value::Null) if self.optional => return Ok(()),
            None | Some(Value::Null) => return Err(FieldErrorReason::Missing),
            Some(v) => v,
        };
        let s = value.as_str().ok_or(FieldErrorReason::NotAString)?;

        match &self.kind {
            FieldKind::Enum { values } => {
                if values.iter().any(|v| *v == s) {
                    Ok(())
                } else {
                    Err(FieldErrorReason::NotInEnum {
                        values: values.clone(),
                    })
                }
            }
            // whitespace-only counts as empty
            FieldKind::String { min_length } => {
                if s.trim().chars().count() >= *min_length {
                    Ok(())
                } else {
                    Err(FieldErrorReason::TooShort {
                        min_length: *min_length,
                    })
                }
            }
            FieldKind::Pattern { pattern } => {
                let re = compiled(pattern).ok_or_else(|| {
                    log::error!("no compiled regex for pattern {}", pattern);
                    FieldErrorReason::PatternMismatch { pattern: *pattern }
                })?;
                if re.is_match(s) {
                    Ok(())
                } else {
                    Err(FieldErrorReason::PatternMismatch { pattern: *pattern })
                }
            }
            FieldKind::Url => url::Url::parse(s)
                .map(|_| ())
                .map_err(|_| FieldErrorReason::InvalidUrl),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FieldErrorReason {
    Missing,
    NotAString,
    TooShort { min_length: usize },
    PatternMismatch { pattern: &'static str },
    NotInEnum { values: Vec<&'static str> },
    InvalidUrl,
    Immutable,
    Duplicate,
}

impl fmt::Display for FieldErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldErrorReason::Missing => write!(f, "is required"),
            FieldErrorReason::NotAString => write!(f, "must be a string"),
            FieldErrorReason::TooShort { min_length } => {
                write!(f, "must be at least {} characters", min_length)
            }
            FieldErrorReason::PatternMismatch { pattern } => write!(f, "must match {}", pattern),
            FieldErrorReason::NotInEnum { values } => {
                write!(f, "must be one of {}", values.join(", "))
            }
            FieldErrorReason::InvalidUrl => write!(f, "must be a valid URL"),
            FieldErrorReason::Immutable => write!(f, "cannot be changed"),
            FieldErrorReason::Duplicate => write!(f, "must be unique"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    #[serde(flatten)]
    pub reason: FieldErrorReason,
}

impl FieldError {
    pub fn new(field: &str, reason: FieldErrorReason) -> Self {
        FieldError {
            field: field.to_string(),
            reason,
        }
    }
}

/// Every failing field of one validation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(error: FieldError) -> Self {
        ValidationError {
            errors: vec![error],
        }
    }

    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidationError:")?;
        for (i, e) in self.errors.iter().enumerate() {
            let sep = if i == 0 { " " } else { "; " };
            write!(f, "{}{} {}", sep, e.field, e.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn non_empty() -> FieldKind {
    FieldKind::String { min_length: 1 }
}

pub fn link_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::required(
            "platform",
            FieldKind::Enum {
                values: Platform::ALL.iter().map(Platform::as_str).collect(),
            },
        ),
        FieldDescriptor::required("url", FieldKind::Url),
        FieldDescriptor::required("label", non_empty()),
    ]
}

/// Without a subtype the `mediaType` field offers every integration.
pub fn media_fields(media_type: Option<MediaType>) -> Vec<FieldDescriptor> {
    let values = match media_type {
        Some(m) => vec![m.as_str()],
        None => MediaType::ALL.iter().map(MediaType::as_str).collect(),
    };

    vec![
        FieldDescriptor::required(MEDIA_TYPE_FIELD, FieldKind::Enum { values }),
        FieldDescriptor::required("url", FieldKind::Url),
        FieldDescriptor::optional("label", non_empty()),
        FieldDescriptor::optional("content", FieldKind::String { min_length: 0 }),
    ]
}

pub fn text_fields() -> Vec<FieldDescriptor> {
    vec![FieldDescriptor::optional(
        "content",
        FieldKind::String { min_length: 0 },
    )]
}

pub fn pool_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::required(
            "address",
            FieldKind::Pattern {
                pattern: HEX_ADDRESS_PATTERN,
            },
        ),
        FieldDescriptor::required("label", non_empty()),
    ]
}

pub fn referral_fields() -> Vec<FieldDescriptor> {
    Vec::new()
}

pub fn descriptors_for(block_type: BlockType, media_type: Option<MediaType>) -> Vec<FieldDescriptor> {
    match block_type {
        BlockType::Link => link_fields(),
        BlockType::Media => media_fields(media_type),
        BlockType::Text => text_fields(),
        BlockType::Pool => pool_fields(),
        BlockType::Referral => referral_fields(),
    }
}

/// Field descriptors for a type tag. The subtype is only consulted for `media`.
pub fn descriptors(type_tag: &str, subtype: Option<&str>) -> Result<Vec<FieldDescriptor>, Error> {
    let block_type: BlockType = type_tag.parse()?;
    let media_type = match (block_type, subtype) {
        (BlockType::Media, Some(s)) => Some(s.parse::<MediaType>()?),
        _ => None,
    };

    Ok(descriptors_for(block_type, media_type))
}

pub fn validate_against(
    descriptors: &[FieldDescriptor],
    fields: &Map<String, Value>,
) -> Result<(), ValidationError> {
    let errors: Vec<FieldError> = descriptors
        .iter()
        .filter_map(|d| {
            d.check(fields.get(d.name))
                .err()
                .map(|reason| FieldError::new(d.name, reason))
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { errors })
    }
}

pub fn validate(
    type_tag: &str,
    subtype: Option<&str>,
    fields: &Map<String, Value>,
) -> Result<(), Error> {
    let descriptors = descriptors(type_tag, subtype)?;
    Ok(validate_against(&descriptors, fields)?)
}

#[cfg(test)]
mod schema {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn failed_fields(type_tag: &str, subtype: Option<&str>, value: Value) -> Vec<String> {
        match validate(type_tag, subtype, &fields(value)) {
            Err(Error::Validation(v)) => v.errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type() {
        assert!(matches!(
            descriptors("carousel", None),
            Err(Error::UnsupportedBlockType { .. })
        ));
        assert!(matches!(
            descriptors("media", Some("tiktok")),
            Err(Error::UnsupportedBlockType { .. })
        ));
    }

    #[test]
    fn test_link_requires_label_and_url() {
        assert_eq!(
            failed_fields(
                "link",
                None,
                json!({"platform": "twitter", "url": "not a url", "label": ""})
            ),
            vec!["url", "label"]
        );
        assert!(validate(
            "link",
            None,
            &fields(json!({"platform": "twitter", "url": "https://x.com/alice", "label": "X"}))
        )
        .is_ok());
    }

    #[test]
    fn test_pool_address_pattern() {
        assert_eq!(
            failed_fields("pool", None, json!({"address": "0xZZ", "label": "Pool"})),
            vec!["address"]
        );
        assert!(validate(
            "pool",
            None,
            &fields(json!({"address": "0xabc123", "label": "Pool"}))
        )
        .is_ok());
    }

    #[test]
    fn test_media_subtype_pins_enum() {
        let descriptors = descriptors("media", Some("spotify")).unwrap();
        assert_eq!(
            descriptors[0].kind,
            FieldKind::Enum {
                values: vec!["spotify"]
            }
        );
        assert_eq!(
            failed_fields("media", None, json!({"url": "https://open.spotify.com/track/1"})),
            vec!["mediaType"]
        );
    }

    #[test]
    fn test_non_string_and_whitespace_label() {
        let err = validate_against(&pool_fields(), &fields(json!({"address": 12, "label": "  "})))
            .unwrap_err();
        assert_eq!(
            err.errors,
            vec![
                FieldError::new("address", FieldErrorReason::NotAString),
                FieldError::new("label", FieldErrorReason::TooShort { min_length: 1 }),
            ]
        );
    }

    #[test]
    fn test_descriptor_json() {
        let value = serde_json::to_value(&pool_fields()[0]).unwrap();
        assert_eq!(
            value,
            json!({"name": "address", "kind": "pattern", "pattern": "^0x[a-fA-F0-9]+$", "optional": false})
        );
    }

    #[test]
    fn test_every_pattern_is_compiled() {
        let types = [
            BlockType::Link,
            BlockType::Media,
            BlockType::Text,
            BlockType::Pool,
            BlockType::Referral,
        ];
        for block_type in types {
            for descriptor in descriptors_for(block_type, None) {
                if let FieldKind::Pattern { pattern } = descriptor.kind {
                    assert!(compiled(pattern).is_some(), "{} has no regex", pattern);
                }
            }
        }
        assert!(compiled("^[a-z]+$").is_none());
    }
}
