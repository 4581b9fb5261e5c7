//! Declarative template files (TOML or JSON).
//!
//! ```toml
//! [post]
//! title = "headline"
//! kind = { value = "article" }
//! author = { entry = "person", from = "author" }
//! reviewers = { entries = "person", from = "reviewers" }
//! hero = { asset = { name = "image_name", type = "image_type", url = "image_url" } }
//!
//! [person]
//! name = "name"
//! ```
//!
//! Field order in the file is the evaluation order.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde_json::Value;
use tracing::debug;

use contentseed_shared::{ContentSeedError, Result};

use crate::resolvers::{AssetKeys, ConstantResolver, NestedAsset, NestedEntries, NestedEntry};
use crate::templates::{EntryTemplate, FieldSource, TemplateMap};

/// One field declaration in a template file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    /// Literal data key.
    Key(String),
    /// Constant value.
    Value { value: Value },
    /// Related entry from `data[from]`, or from the record itself.
    Entry {
        entry: String,
        #[serde(default)]
        from: Option<String>,
    },
    /// Related entries, one per element of `data[from]`.
    Entries { entries: String, from: String },
    /// Related asset built from three data keys.
    Asset { asset: AssetKeys },
}

impl FieldSpec {
    /// Content type this field creates entries of, if any.
    pub fn references(&self) -> Option<&str> {
        match self {
            Self::Entry { entry, .. } => Some(entry.as_str()),
            Self::Entries { entries, .. } => Some(entries.as_str()),
            _ => None,
        }
    }

    fn into_source(self) -> FieldSource {
        match self {
            Self::Key(key) => FieldSource::Literal(key),
            Self::Value { value } => FieldSource::resolver(ConstantResolver::new(value)),
            Self::Entry { entry, from } => FieldSource::resolver(NestedEntry::new(entry, from)),
            Self::Entries { entries, from } => {
                FieldSource::resolver(NestedEntries::new(entries, from))
            }
            Self::Asset { asset } => FieldSource::resolver(NestedAsset::new(asset)),
        }
    }
}

/// Field declarations of one content type, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateSpec {
    pub fields: Vec<(String, FieldSpec)>,
}

impl<'de> Deserialize<'de> for TemplateSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedFields;

        impl<'de> Visitor<'de> for OrderedFields {
            type Value = TemplateSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of field declarations")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<TemplateSpec, A::Error> {
                let mut fields = Vec::new();
                while let Some((name, spec)) = map.next_entry::<String, FieldSpec>()? {
                    fields.push((name, spec));
                }
                Ok(TemplateSpec { fields })
            }
        }

        deserializer.deserialize_map(OrderedFields)
    }
}

/// A whole template file: content type → declarations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct TemplateFile {
    pub content_types: std::collections::BTreeMap<String, TemplateSpec>,
}

impl TemplateFile {
    /// Check that every `entry`/`entries` field names a declared content type,
    /// and that no content type nests itself through `entry` fields without
    /// `from`. Such a chain hands the same record down forever.
    pub fn validate(&self) -> Result<()> {
        for (content_type, spec) in &self.content_types {
            for (field, decl) in &spec.fields {
                if let Some(target) = decl.references() {
                    if !self.content_types.contains_key(target) {
                        return Err(ContentSeedError::validation(format!(
                            "{content_type}.{field} references unknown content type '{target}'"
                        )));
                    }
                }
            }
        }

        if let Some(cycle) = self.inline_cycle() {
            return Err(ContentSeedError::validation(format!(
                "content types nest the same record without end: {}",
                cycle.join(" -> ")
            )));
        }
        Ok(())
    }

    /// First cycle among `entry` fields that pass the whole record down.
    fn inline_cycle(&self) -> Option<Vec<&str>> {
        let mut done = BTreeSet::new();
        for content_type in self.content_types.keys() {
            let mut path = Vec::new();
            if let Some(cycle) = self.walk_inline(content_type, &mut path, &mut done) {
                return Some(cycle);
            }
        }
        None
    }

    fn walk_inline<'a>(
        &'a self,
        content_type: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut BTreeSet<&'a str>,
    ) -> Option<Vec<&'a str>> {
        if let Some(start) = path.iter().position(|seen| *seen == content_type) {
            let mut cycle = path[start..].to_vec();
            cycle.push(content_type);
            return Some(cycle);
        }
        if done.contains(content_type) {
            return None;
        }

        path.push(content_type);
        if let Some(spec) = self.content_types.get(content_type) {
            for (_, decl) in &spec.fields {
                if let FieldSpec::Entry { entry, from: None } = decl {
                    if let Some(cycle) = self.walk_inline(entry, path, done) {
                        return Some(cycle);
                    }
                }
            }
        }
        path.pop();
        done.insert(content_type);
        None
    }

    /// Compile into a runnable [`TemplateMap`].
    pub fn into_templates(self) -> TemplateMap {
        let mut map = TemplateMap::new();
        for (content_type, spec) in self.content_types {
            let mut template = EntryTemplate::new();
            for (field, decl) in spec.fields {
                template.insert(field, decl.into_source());
            }
            map.insert(content_type, template);
        }
        map
    }
}

/// Parse a TOML template document.
pub fn parse_toml(content: &str) -> Result<TemplateFile> {
    toml::from_str(content).map_err(|e| ContentSeedError::parse(format!("invalid templates: {e}")))
}

/// Parse a JSON template document.
pub fn parse_json(content: &str) -> Result<TemplateFile> {
    serde_json::from_str(content)
        .map_err(|e| ContentSeedError::parse(format!("invalid templates: {e}")))
}

/// Read, parse, and validate a template file. The format follows the
/// extension: `.json` is JSON, anything else is TOML.
pub fn load_template_file(path: &Path) -> Result<TemplateFile> {
    let content = std::fs::read_to_string(path).map_err(|e| ContentSeedError::io(path, e))?;

    let file = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&content),
        _ => parse_toml(&content),
    }
    .map_err(|e| match e {
        ContentSeedError::Parse { message } => {
            ContentSeedError::parse(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;

    file.validate()?;
    debug!(?path, content_types = file.content_types.len(), "templates loaded");
    Ok(file)
}

/// Load a template file straight into a [`TemplateMap`].
pub fn load_templates(path: &Path) -> Result<TemplateMap> {
    Ok(load_template_file(path)?.into_templates())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BLOG: &str = r#"
[post]
title = "headline"
kind = { value = "article" }
author = { entry = "person", from = "author" }
reviewers = { entries = "person", from = "reviewers" }
hero = { asset = { name = "image_name", type = "image_type", url = "image_url" } }

[person]
name = "name"
"#;

    #[test]
    fn toml_keeps_field_order() {
        let file = parse_toml(BLOG).unwrap();
        let names: Vec<&str> = file.content_types["post"]
            .fields
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, vec!["title", "kind", "author", "reviewers", "hero"]);
    }

    #[test]
    fn toml_field_kinds() {
        let file = parse_toml(BLOG).unwrap();
        let fields = &file.content_types["post"].fields;
        assert_eq!(fields[0].1, FieldSpec::Key("headline".into()));
        assert_eq!(
            fields[1].1,
            FieldSpec::Value {
                value: json!("article")
            }
        );
        assert_eq!(
            fields[2].1,
            FieldSpec::Entry {
                entry: "person".into(),
                from: Some("author".into())
            }
        );
        assert_eq!(fields[3].1.references(), Some("person"));
        assert!(matches!(&fields[4].1, FieldSpec::Asset { asset } if asset.url == "image_url"));
    }

    #[test]
    fn json_keeps_field_order() {
        let file = parse_json(
            r#"{"post": {"z": "a", "m": {"entry": "post", "from": "parent"}, "b": "c"}}"#,
        )
        .unwrap();
        let names: Vec<&str> = file.content_types["post"]
            .fields
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, vec!["z", "m", "b"]);
        assert!(file.validate().is_ok());
    }

    #[test]
    fn unknown_reference_fails_validation() {
        let file = parse_toml("[post]\nauthor = { entry = \"person\" }\n").unwrap();
        let err = file.validate().unwrap_err();
        assert!(err.to_string().contains("post.author"));
        assert!(err.to_string().contains("'person'"));
    }

    #[test]
    fn self_nesting_entry_fails_validation() {
        let file = parse_toml("[post]\ntitle = \"headline\"\nrelated = { entry = \"post\" }\n")
            .unwrap();
        let err = file.validate().unwrap_err();
        assert!(matches!(err, ContentSeedError::Validation { .. }));
        assert!(err.to_string().contains("post -> post"));
    }

    #[test]
    fn nesting_cycle_across_types_fails_validation() {
        let file = parse_toml(
            r#"
[author]
name = "name"
profile = { entry = "profile" }

[profile]
bio = "bio"
owner = { entry = "author" }
"#,
        )
        .unwrap();
        let err = file.validate().unwrap_err();
        assert!(err.to_string().contains("author -> profile -> author"));
    }

    #[test]
    fn nesting_through_sub_records_is_allowed() {
        let file = parse_toml(
            r#"
[comment]
body = "body"
parent = { entry = "comment", from = "parent" }
replies = { entries = "comment", from = "replies" }
"#,
        )
        .unwrap();
        assert!(file.validate().is_ok());
    }

    #[test]
    fn malformed_field_is_parse_error() {
        let err = parse_toml("[post]\ntitle = 42\n").unwrap_err();
        assert!(err.to_string().starts_with("parse error"));
    }

    #[test]
    fn compiles_to_template_map() {
        let map = parse_toml(BLOG).unwrap().into_templates();
        assert_eq!(map.len(), 2);
        let post = map.get("post").unwrap();
        assert!(matches!(post.get("title"), Some(FieldSource::Literal(k)) if k == "headline"));
        assert!(matches!(post.get("author"), Some(FieldSource::Resolver(_))));
    }

    #[test]
    fn load_from_disk_by_extension() {
        let dir = std::env::temp_dir().join(format!("cs-templates-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let toml_path = dir.join("templates.toml");
        std::fs::write(&toml_path, BLOG).unwrap();
        assert_eq!(load_templates(&toml_path).unwrap().len(), 2);

        let json_path = dir.join("templates.json");
        std::fs::write(&json_path, r#"{"post": {"title": "headline"}}"#).unwrap();
        assert!(load_templates(&json_path).unwrap().contains("post"));

        let missing = load_templates(&dir.join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ContentSeedError::Io { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
