//! Template model: which data key or resolver produces each output field.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use contentseed_shared::Result;

use crate::factory::ResolverContext;
use crate::resolvers::{ComputedResolver, ConstantResolver};

/// Computes a field value from the input record.
///
/// Resolvers receive the full record and the capability bundle, so they can
/// create related entries and assets and return their links.
#[async_trait]
pub trait FieldResolver: Send + Sync {
    async fn resolve(&self, data: &Value, ctx: &ResolverContext<'_>) -> Result<Value>;
}

/// Where a field's value comes from.
#[derive(Clone)]
pub enum FieldSource {
    /// Copy `data[key]`.
    Literal(String),
    /// Run a resolver.
    Resolver(Arc<dyn FieldResolver>),
}

impl FieldSource {
    pub fn literal(key: impl Into<String>) -> Self {
        Self::Literal(key.into())
    }

    pub fn resolver(resolver: impl FieldResolver + 'static) -> Self {
        Self::Resolver(Arc::new(resolver))
    }

    /// A constant value, independent of the record.
    pub fn constant(value: Value) -> Self {
        Self::resolver(ConstantResolver::new(value))
    }

    /// A synchronous computation over the record.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self::resolver(ComputedResolver::new(f))
    }
}

impl fmt::Debug for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(key) => f.debug_tuple("Literal").field(key).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Ordered field map for one content type. Fields resolve in this order.
#[derive(Debug, Clone, Default)]
pub struct EntryTemplate {
    fields: Vec<(String, FieldSource)>,
}

impl EntryTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, or replace an existing one in place.
    pub fn field(mut self, name: impl Into<String>, source: FieldSource) -> Self {
        self.insert(name, source);
        self
    }

    /// Shorthand for `field(name, FieldSource::literal(key))`.
    pub fn literal(self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.field(name, FieldSource::literal(key))
    }

    pub fn insert(&mut self, name: impl Into<String>, source: FieldSource) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = source,
            None => self.fields.push((name, source)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSource> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, source)| source)
    }

    /// Fields in evaluation order.
    pub fn fields(&self) -> &[(String, FieldSource)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Content type name → template.
#[derive(Debug, Clone, Default)]
pub struct TemplateMap {
    templates: BTreeMap<String, EntryTemplate>,
}

impl TemplateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, content_type: impl Into<String>, template: EntryTemplate) -> Self {
        self.insert(content_type, template);
        self
    }

    pub fn insert(&mut self, content_type: impl Into<String>, template: EntryTemplate) {
        self.templates.insert(content_type.into(), template);
    }

    pub fn get(&self, content_type: &str) -> Option<&EntryTemplate> {
        self.templates.get(content_type)
    }

    pub fn contains(&self, content_type: &str) -> bool {
        self.templates.contains_key(content_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryTemplate)> {
        self.templates.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_keep_insertion_order() {
        let template = EntryTemplate::new()
            .literal("title", "headline")
            .literal("slug", "slug")
            .field("kind", FieldSource::constant(json!("post")))
            .literal("body", "text");

        let names: Vec<&str> = template.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["title", "slug", "kind", "body"]);
    }

    #[test]
    fn replacing_a_field_keeps_its_position() {
        let template = EntryTemplate::new()
            .literal("title", "headline")
            .literal("body", "text")
            .literal("title", "name");

        assert_eq!(template.len(), 2);
        assert_eq!(template.fields()[0].0, "title");
        assert!(matches!(template.get("title"), Some(FieldSource::Literal(k)) if k == "name"));
    }

    #[test]
    fn template_map_lookup() {
        let map = TemplateMap::new().with("post", EntryTemplate::new().literal("title", "t"));
        assert!(map.contains("post"));
        assert!(map.get("author").is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn field_source_debug_hides_resolver() {
        let source = FieldSource::computed(|_| Value::Null);
        assert_eq!(format!("{source:?}"), "Resolver(..)");
    }
}
