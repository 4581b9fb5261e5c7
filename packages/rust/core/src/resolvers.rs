//! Built-in field resolvers.
//!
//! The nested resolvers create related content through the capability bundle
//! and yield whatever the nested call returns: a link, or the draft payload
//! when running dry.

use async_trait::async_trait;
use serde_json::Value;

use contentseed_shared::{AssetProps, ContentSeedError, Result};

use crate::factory::ResolverContext;
use crate::templates::FieldResolver;

/// Always yields the same value.
#[derive(Debug, Clone)]
pub struct ConstantResolver {
    value: Value,
}

impl ConstantResolver {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

#[async_trait]
impl FieldResolver for ConstantResolver {
    async fn resolve(&self, _data: &Value, _ctx: &ResolverContext<'_>) -> Result<Value> {
        Ok(self.value.clone())
    }
}

/// Wraps a synchronous closure over the record.
pub struct ComputedResolver<F> {
    f: F,
}

impl<F> ComputedResolver<F>
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> FieldResolver for ComputedResolver<F>
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    async fn resolve(&self, data: &Value, _ctx: &ResolverContext<'_>) -> Result<Value> {
        Ok((self.f)(data))
    }
}

/// Select the sub-record under `from`, or the whole record.
fn sub_record<'a>(data: &'a Value, from: Option<&str>) -> &'a Value {
    match from {
        Some(key) => data.get(key).unwrap_or(&Value::Null),
        None => data,
    }
}

/// Creates one related entry from a sub-record.
///
/// A missing or null sub-record yields null without creating anything.
#[derive(Debug, Clone)]
pub struct NestedEntry {
    content_type: String,
    from: Option<String>,
}

impl NestedEntry {
    pub fn new(content_type: impl Into<String>, from: Option<String>) -> Self {
        Self {
            content_type: content_type.into(),
            from,
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

#[async_trait]
impl FieldResolver for NestedEntry {
    async fn resolve(&self, data: &Value, ctx: &ResolverContext<'_>) -> Result<Value> {
        let record = sub_record(data, self.from.as_deref());
        if record.is_null() {
            return Ok(Value::Null);
        }
        let created = ctx.create_entry(&self.content_type, record).await?;
        Ok(created.to_value())
    }
}

/// Creates one related entry per element of an array, in array order.
#[derive(Debug, Clone)]
pub struct NestedEntries {
    content_type: String,
    from: String,
}

impl NestedEntries {
    pub fn new(content_type: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            from: from.into(),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

#[async_trait]
impl FieldResolver for NestedEntries {
    async fn resolve(&self, data: &Value, ctx: &ResolverContext<'_>) -> Result<Value> {
        let records = match data.get(&self.from) {
            None | Some(Value::Null) => return Ok(Value::Array(Vec::new())),
            Some(Value::Array(records)) => records,
            Some(_) => {
                return Err(ContentSeedError::resolver(format!(
                    "'{}' is not an array",
                    self.from
                )));
            }
        };

        let mut links = Vec::with_capacity(records.len());
        for record in records {
            let created = ctx.create_entry(&self.content_type, record).await?;
            links.push(created.to_value());
        }
        Ok(Value::Array(links))
    }
}

/// Data keys holding an asset's name, MIME type, and source URL.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct AssetKeys {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub url: String,
}

/// Creates a related asset from three data keys.
#[derive(Debug, Clone)]
pub struct NestedAsset {
    keys: AssetKeys,
}

impl NestedAsset {
    pub fn new(keys: AssetKeys) -> Self {
        Self { keys }
    }
}

fn string_at(data: &Value, key: &str) -> Result<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ContentSeedError::resolver(format!("'{key}' is missing or not a string")))
}

#[async_trait]
impl FieldResolver for NestedAsset {
    async fn resolve(&self, data: &Value, ctx: &ResolverContext<'_>) -> Result<Value> {
        let props = AssetProps {
            name: string_at(data, &self.keys.name)?,
            content_type: string_at(data, &self.keys.content_type)?,
            url: string_at(data, &self.keys.url)?,
        };
        let created = ctx.create_asset(&props).await?;
        Ok(created.to_value())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::factory::ContentFactory;
    use crate::templates::{EntryTemplate, FieldSource, TemplateMap};
    use contentseed_client::{ClientCall, ClientOp, MockManagementClient};
    use contentseed_shared::{FactoryOptions, FailureKind};
    use serde_json::json;

    async fn factory(templates: TemplateMap, dry_run: bool) -> (ContentFactory, MockManagementClient) {
        let mock = MockManagementClient::new();
        let factory = ContentFactory::connect(
            Arc::new(mock.clone()),
            FactoryOptions::new("sp1").dry_run(dry_run),
            templates,
        )
        .await
        .expect("connect");
        (factory, mock)
    }

    fn blog_templates() -> TemplateMap {
        TemplateMap::new()
            .with("person", EntryTemplate::new().literal("name", "name"))
            .with(
                "post",
                EntryTemplate::new()
                    .literal("title", "headline")
                    .field(
                        "author",
                        FieldSource::resolver(NestedEntry::new("person", Some("author".into()))),
                    )
                    .field(
                        "tags",
                        FieldSource::resolver(NestedEntries::new("person", "reviewers")),
                    ),
            )
    }

    #[tokio::test]
    async fn nested_entry_yields_draft_in_dry_run() {
        let (factory, mock) = factory(blog_templates(), true).await;
        let data = json!({"headline": "Hi", "author": {"name": "Ada"}});

        let created = factory.create_entry("post", &data).await.unwrap();
        assert_eq!(
            created.to_value(),
            json!({"fields": {
                "title": {"en-US": "Hi"},
                "author": {"en-US": {"fields": {"name": {"en-US": "Ada"}}}},
                "tags": {"en-US": []}
            }})
        );
        assert_eq!(mock.ops(), vec![ClientOp::GetSpace, ClientOp::GetEnvironment]);
    }

    #[tokio::test]
    async fn nested_entries_link_in_array_order() {
        let (factory, mock) = factory(blog_templates(), false).await;
        let data = json!({
            "headline": "Hi",
            "reviewers": [{"name": "Grace"}, {"name": "Linus"}]
        });

        let created = factory.create_entry("post", &data).await.unwrap();
        // Author is absent, so the reviewers take the first ids.
        assert_eq!(created.link().unwrap().id(), "entry-3");

        let mut people = Vec::new();
        let mut post = None;
        for call in mock.calls() {
            if let ClientCall::CreateEntry {
                content_type,
                content,
            } = call
            {
                match content_type.as_str() {
                    "person" => people.push(content.fields["name"].get().cloned()),
                    "post" => post = Some(content),
                    _ => {}
                }
            }
        }
        assert_eq!(people, vec![Some(json!("Grace")), Some(json!("Linus"))]);

        let post = post.expect("post created");
        assert_eq!(
            post.fields["tags"].get(),
            Some(&json!([
                {"sys": {"type": "Link", "linkType": "Entry", "id": "entry-1"}},
                {"sys": {"type": "Link", "linkType": "Entry", "id": "entry-2"}}
            ]))
        );
    }

    #[tokio::test]
    async fn nested_entries_rejects_non_array() {
        let (factory, _mock) = factory(blog_templates(), true).await;
        let data = json!({"headline": "Hi", "reviewers": "Grace"});

        let err = factory.create_entry("post", &data).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Resolver);
        assert!(err.to_string().contains("'tags'"));
    }

    #[tokio::test]
    async fn nested_asset_reads_keys() {
        let templates = TemplateMap::new().with(
            "post",
            EntryTemplate::new().field(
                "hero",
                FieldSource::resolver(NestedAsset::new(AssetKeys {
                    name: "image_name".into(),
                    content_type: "image_type".into(),
                    url: "image_url".into(),
                })),
            ),
        );
        let (factory, mock) = factory(templates, false).await;
        let data = json!({
            "image_name": "logo.png",
            "image_type": "image/png",
            "image_url": "https://x/logo.png"
        });

        factory.create_entry("post", &data).await.unwrap();
        assert_eq!(
            mock.ops()[2..],
            [
                ClientOp::CreateAsset,
                ClientOp::ProcessAsset,
                ClientOp::PublishAsset,
                ClientOp::CreateEntry,
                ClientOp::PublishEntry,
            ]
        );
    }

    #[tokio::test]
    async fn nested_asset_missing_key_is_resolver_error() {
        let templates = TemplateMap::new().with(
            "post",
            EntryTemplate::new().field(
                "hero",
                FieldSource::resolver(NestedAsset::new(AssetKeys {
                    name: "n".into(),
                    content_type: "t".into(),
                    url: "u".into(),
                })),
            ),
        );
        let (factory, _mock) = factory(templates, true).await;

        let err = factory
            .create_entry("post", &json!({"n": "a.png", "t": "image/png"}))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "resolver error in field 'hero': 'u' is missing or not a string"
        );
    }
}
