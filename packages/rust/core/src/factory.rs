//! The content factory: creates entries and assets from templates.
//!
//! Field resolution is a strict left-to-right walk over the template. Each
//! resolver is awaited before the next field starts, so resolvers that create
//! related content observe the side effects of earlier fields.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

use contentseed_client::{HttpManagementClient, ManagementClient};
use contentseed_shared::{
    AssetContent, AssetProps, ClientConfig, ContentSeedError, Created, EntryContent, Environment,
    FactoryOptions, Link, Localized, Result,
};

use crate::templates::{EntryTemplate, FieldSource, TemplateMap};

/// Boxed future returned by the creators. Boxing lets resolvers call back
/// into the factory recursively.
pub type CreateFuture<'a, T> = Pin<Box<dyn Future<Output = Result<Created<T>>> + Send + 'a>>;

/// Deepest chain of entries a resolver may create from inside another entry.
pub const MAX_NESTING_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// ContentFactory
// ---------------------------------------------------------------------------

/// Creates entries and assets in one resolved environment.
pub struct ContentFactory {
    client: Arc<dyn ManagementClient>,
    environment: Environment,
    templates: TemplateMap,
    dry_run: bool,
    publish: bool,
}

impl ContentFactory {
    /// Resolve the space and environment, then return a factory bound to them.
    ///
    /// The environment is resolved even when running dry so resolvers always
    /// see a real handle.
    #[instrument(skip_all, fields(space_id = %options.space_id, environment = %options.environment))]
    pub async fn connect(
        client: Arc<dyn ManagementClient>,
        options: FactoryOptions,
        templates: TemplateMap,
    ) -> Result<Self> {
        if options.space_id.is_empty() {
            return Err(ContentSeedError::config("a space id is required"));
        }

        let space = client.get_space(&options.space_id).await?;
        let environment = client.get_environment(&space, &options.environment).await?;

        info!(
            dry_run = options.dry_run,
            publish = options.publishes(),
            content_types = templates.len(),
            "content factory ready"
        );

        Ok(Self {
            client,
            environment,
            templates,
            dry_run: options.dry_run,
            publish: options.publishes(),
        })
    }

    /// [`connect`](Self::connect) through the HTTP client.
    pub async fn connect_http(
        config: &ClientConfig,
        options: FactoryOptions,
        templates: TemplateMap,
    ) -> Result<Self> {
        let client = HttpManagementClient::new(config)?;
        Self::connect(Arc::new(client), options, templates).await
    }

    /// The resolved environment handle.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn templates(&self) -> &TemplateMap {
        &self.templates
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn publishes(&self) -> bool {
        self.publish
    }

    /// The capability bundle handed to resolvers.
    pub fn context(&self) -> ResolverContext<'_> {
        ResolverContext {
            factory: self,
            depth: 0,
        }
    }

    /// Create an entry of `content_type` from `data`.
    ///
    /// Returns the link to the created entry, or the assembled payload in dry
    /// run. A failure after the remote entry exists (publishing) still fails
    /// the whole call.
    pub fn create_entry<'a>(
        &'a self,
        content_type: &'a str,
        data: &'a Value,
    ) -> CreateFuture<'a, EntryContent> {
        self.create_entry_at(content_type, data, 0)
    }

    fn create_entry_at<'a>(
        &'a self,
        content_type: &'a str,
        data: &'a Value,
        depth: usize,
    ) -> CreateFuture<'a, EntryContent> {
        let span = info_span!("create_entry", content_type, depth, dry_run = self.dry_run);
        Box::pin(self.submit_entry(content_type, data, depth).instrument(span))
    }

    /// Create an asset from `props`.
    ///
    /// Live runs create the asset, process its file for all locales, and only
    /// then publish.
    pub fn create_asset<'a>(&'a self, props: &'a AssetProps) -> CreateFuture<'a, AssetContent> {
        let span = info_span!("create_asset", name = %props.name, dry_run = self.dry_run);
        Box::pin(self.submit_asset(props).instrument(span))
    }

    /// Like [`create_entry`](Self::create_entry), but logs any failure and
    /// returns `None` instead.
    pub async fn create_entry_or_none(&self, content_type: &str, data: &Value) -> Option<Value> {
        match self.create_entry(content_type, data).await {
            Ok(created) => Some(created.to_value()),
            Err(e) => {
                error!(content_type, kind = %e.kind(), error = %e, "entry creation failed");
                None
            }
        }
    }

    /// Like [`create_asset`](Self::create_asset), but logs any failure and
    /// returns `None` instead.
    pub async fn create_asset_or_none(&self, props: &AssetProps) -> Option<Value> {
        match self.create_asset(props).await {
            Ok(created) => Some(created.to_value()),
            Err(e) => {
                error!(name = %props.name, kind = %e.kind(), error = %e, "asset creation failed");
                None
            }
        }
    }

    async fn submit_entry(
        &self,
        content_type: &str,
        data: &Value,
        depth: usize,
    ) -> Result<Created<EntryContent>> {
        if depth > MAX_NESTING_DEPTH {
            return Err(ContentSeedError::resolver(format!(
                "'{content_type}' is nested more than {MAX_NESTING_DEPTH} entries deep"
            )));
        }

        let template = self
            .templates
            .get(content_type)
            .ok_or_else(|| ContentSeedError::UnknownContentType(content_type.to_string()))?;

        let content = self.resolve_fields(template, data, depth).await?;

        if self.dry_run {
            debug!(fields = content.fields.len(), "dry run, entry not submitted");
            return Ok(Created::Draft(content));
        }

        let entry = self
            .client
            .create_entry(&self.environment, content_type, &content)
            .await?;

        if self.publish {
            self.client
                .publish_entry(&self.environment, &entry)
                .await
                .inspect_err(|e| {
                    warn!(entry_id = %entry.id(), error = %e, "entry created but not published");
                })?;
        }

        info!(entry_id = %entry.id(), published = self.publish, "entry created");
        Ok(Created::Link(Link::entry(entry.id())))
    }

    async fn submit_asset(&self, props: &AssetProps) -> Result<Created<AssetContent>> {
        let content = AssetContent::from(props);

        if self.dry_run {
            debug!("dry run, asset not submitted");
            return Ok(Created::Draft(content));
        }

        let asset = self.client.create_asset(&self.environment, &content).await?;

        let processed = self
            .client
            .process_asset_for_all_locales(&self.environment, &asset)
            .await
            .inspect_err(|e| {
                warn!(asset_id = %asset.id(), error = %e, "asset created but not processed");
            })?;

        if self.publish {
            self.client
                .publish_asset(&self.environment, &processed)
                .await
                .inspect_err(|e| {
                    warn!(asset_id = %asset.id(), error = %e, "asset processed but not published");
                })?;
        }

        info!(asset_id = %processed.id(), published = self.publish, "asset created");
        Ok(Created::Link(Link::asset(processed.id())))
    }

    async fn resolve_fields(
        &self,
        template: &EntryTemplate,
        data: &Value,
        depth: usize,
    ) -> Result<EntryContent> {
        let ctx = ResolverContext {
            factory: self,
            depth,
        };
        let mut content = EntryContent::default();

        for (field, source) in template.fields() {
            let value = match source {
                // A missing key becomes null rather than dropping the field.
                FieldSource::Literal(key) => data.get(key).cloned().unwrap_or(Value::Null),
                FieldSource::Resolver(resolver) => resolver
                    .resolve(data, &ctx)
                    .await
                    .map_err(|e| e.in_field(field))?,
            };
            content.fields.insert(field.clone(), Localized::new(value));
        }

        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// ResolverContext
// ---------------------------------------------------------------------------

/// Capability bundle passed to every resolver: both creators plus the
/// environment handle.
#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    factory: &'a ContentFactory,
    depth: usize,
}

impl<'a> ResolverContext<'a> {
    /// Create a related entry one level below the current one. See
    /// [`ContentFactory::create_entry`].
    pub fn create_entry<'b>(
        &'b self,
        content_type: &'b str,
        data: &'b Value,
    ) -> CreateFuture<'b, EntryContent> {
        self.factory.create_entry_at(content_type, data, self.depth + 1)
    }

    /// How many entries enclose the one being resolved.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Create a related asset. See [`ContentFactory::create_asset`].
    pub fn create_asset<'b>(&'b self, props: &'b AssetProps) -> CreateFuture<'b, AssetContent> {
        self.factory.create_asset(props)
    }

    pub fn environment(&self) -> &'a Environment {
        &self.factory.environment
    }

    pub fn is_dry_run(&self) -> bool {
        self.factory.dry_run
    }
}
