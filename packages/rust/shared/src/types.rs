//! Core domain types: links, payloads, and remote resource shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The single locale every field value is stored under.
pub const LOCALE: &str = "en-US";

// ---------------------------------------------------------------------------
// Localized
// ---------------------------------------------------------------------------

/// A value keyed by locale tag, serialized as `{"en-US": value}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Localized<T>(pub BTreeMap<String, T>);

impl<T> Localized<T> {
    /// Wrap `value` under [`LOCALE`].
    pub fn new(value: T) -> Self {
        let mut map = BTreeMap::new();
        map.insert(LOCALE.to_string(), value);
        Self(map)
    }

    /// The value stored under [`LOCALE`], if any.
    pub fn get(&self) -> Option<&T> {
        self.0.get(LOCALE)
    }

    /// All locale tags present.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// Kind of remote entity a [`Link`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    Entry,
    Asset,
}

/// `sys` block of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSys {
    /// Always `"Link"`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "linkType")]
    pub link_type: LinkType,
    pub id: String,
}

/// A typed reference to a created remote entry or asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub sys: LinkSys,
}

impl Link {
    fn new(link_type: LinkType, id: impl Into<String>) -> Self {
        Self {
            sys: LinkSys {
                kind: "Link".into(),
                link_type,
                id: id.into(),
            },
        }
    }

    /// Link to an entry.
    pub fn entry(id: impl Into<String>) -> Self {
        Self::new(LinkType::Entry, id)
    }

    /// Link to an asset.
    pub fn asset(id: impl Into<String>) -> Self {
        Self::new(LinkType::Asset, id)
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Entry payload: `{fields: {<field>: {"en-US": value}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryContent {
    pub fields: BTreeMap<String, Localized<Value>>,
}

/// Input for asset creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProps {
    /// Used as both the asset title and the file name.
    pub name: String,
    /// MIME type of the upload.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Publicly reachable URL the remote side fetches the file from.
    pub url: String,
}

/// File metadata of an asset payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFile {
    pub content_type: String,
    pub file_name: String,
    pub upload: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetFields {
    pub title: Localized<String>,
    pub file: Localized<AssetFile>,
}

/// Asset payload: `{fields: {title: {"en-US": ..}, file: {"en-US": {..}}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetContent {
    pub fields: AssetFields,
}

impl From<&AssetProps> for AssetContent {
    fn from(props: &AssetProps) -> Self {
        Self {
            fields: AssetFields {
                title: Localized::new(props.name.clone()),
                file: Localized::new(AssetFile {
                    content_type: props.content_type.clone(),
                    file_name: props.name.clone(),
                    upload: props.url.clone(),
                }),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Created
// ---------------------------------------------------------------------------

/// Outcome of a successful creation: a link to the remote entity, or the
/// assembled payload when running dry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Created<T> {
    Link(Link),
    Draft(T),
}

impl<T: Serialize> Created<T> {
    pub fn link(&self) -> Option<&Link> {
        match self {
            Self::Link(link) => Some(link),
            Self::Draft(_) => None,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }

    /// Convert into an untyped JSON value, e.g. to return from a resolver.
    pub fn to_value(&self) -> Value {
        // Both shapes are plain maps of strings; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Remote resources
// ---------------------------------------------------------------------------

/// `sys` block of a resource returned by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSys {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// An entry or asset as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntity {
    pub sys: RemoteSys,
    #[serde(default)]
    pub fields: Value,
}

impl RemoteEntity {
    pub fn id(&self) -> &str {
        &self.sys.id
    }

    /// Version to send with state-changing requests; unversioned resources
    /// count as version 1.
    pub fn version(&self) -> u64 {
        self.sys.version.unwrap_or(1)
    }
}

/// A resolved space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A resolved environment inside a space. This is the handle resolvers
/// receive in their capability bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub space_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn link_serializes_to_sys_shape() {
        let link = Link::entry("abc123");
        let value = serde_json::to_value(&link).expect("serialize");
        assert_eq!(
            value,
            json!({"sys": {"type": "Link", "linkType": "Entry", "id": "abc123"}})
        );
    }

    #[test]
    fn asset_payload_shape() {
        let props = AssetProps {
            name: "logo.png".into(),
            content_type: "image/png".into(),
            url: "https://x/logo.png".into(),
        };
        let value = serde_json::to_value(AssetContent::from(&props)).expect("serialize");
        assert_eq!(
            value,
            json!({
                "fields": {
                    "title": {"en-US": "logo.png"},
                    "file": {"en-US": {
                        "contentType": "image/png",
                        "fileName": "logo.png",
                        "upload": "https://x/logo.png"
                    }}
                }
            })
        );
    }

    #[test]
    fn asset_props_use_type_key() {
        let props: AssetProps =
            serde_json::from_value(json!({"name": "a.jpg", "type": "image/jpeg", "url": "u"}))
                .expect("deserialize");
        assert_eq!(props.content_type, "image/jpeg");
    }

    #[test]
    fn created_serializes_untagged() {
        let created: Created<EntryContent> = Created::Link(Link::asset("a1"));
        assert_eq!(created.to_value()["sys"]["linkType"], "Asset");

        let mut content = EntryContent::default();
        content
            .fields
            .insert("title".into(), Localized::new(json!("Hi")));
        let draft = Created::Draft(content);
        assert!(draft.is_draft());
        assert_eq!(draft.to_value(), json!({"fields": {"title": {"en-US": "Hi"}}}));
    }

    #[test]
    fn remote_entity_defaults() {
        let entity: RemoteEntity =
            serde_json::from_value(json!({"sys": {"id": "e1"}})).expect("deserialize");
        assert_eq!(entity.id(), "e1");
        assert_eq!(entity.version(), 1);
        assert!(entity.fields.is_null());
    }
}
