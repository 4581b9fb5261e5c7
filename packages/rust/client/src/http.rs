//! HTTP implementation of [`ManagementClient`] against the Content Management API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use contentseed_shared::{
    AssetContent, ClientConfig, ContentSeedError, EntryContent, Environment, LOCALE,
    RemoteEntity, RemoteSys, Result, Space,
};

use crate::ManagementClient;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("contentseed/", env!("CARGO_PKG_VERSION"));

/// Media type of every request body.
const CONTENT_TYPE: &str = "application/vnd.contentful.management.v1+json";

const CONTENT_TYPE_HEADER: &str = "X-Contentful-Content-Type";
const VERSION_HEADER: &str = "X-Contentful-Version";

/// Space and environment lookups return a resource with an optional name.
#[derive(Debug, Deserialize)]
struct NamedResource {
    sys: RemoteSys,
    #[serde(default)]
    name: Option<String>,
}

/// reqwest-backed management client.
pub struct HttpManagementClient {
    http: Client,
    base_url: Url,
    access_token: String,
    check_wait: Duration,
    check_retries: u32,
}

impl HttpManagementClient {
    /// Build a client from runtime configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ContentSeedError::config(format!("invalid base URL '{}': {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ContentSeedError::config(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }

        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            ContentSeedError::Network(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            base_url,
            access_token: config.access_token.clone(),
            check_wait: config.processing_check_wait,
            check_retries: config.processing_check_retries,
        })
    }

    /// Resolve path segments against the base URL, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn environment_endpoint(&self, environment: &Environment, rest: &[&str]) -> Url {
        let mut segments = vec![
            "spaces",
            environment.space_id.as_str(),
            "environments",
            environment.id.as_str(),
        ];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = send(request, what).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ContentSeedError::parse(format!("{what}: invalid response body: {e}")))
    }

    async fn get_asset(&self, environment: &Environment, id: &str) -> Result<RemoteEntity> {
        let url = self.environment_endpoint(environment, &["assets", id]);
        self.fetch(self.request(reqwest::Method::GET, url), "get asset")
            .await
    }
}

/// Send a request and map transport and status failures.
///
/// Throttling and server errors are network failures; every other
/// non-success status means the API rejected the request.
async fn send(request: RequestBuilder, what: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| ContentSeedError::Network(format!("{what}: {e}")))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Err(ContentSeedError::Network(format!(
            "{what}: HTTP {status}: {body}"
        )))
    } else {
        Err(ContentSeedError::validation(format!(
            "{what}: HTTP {status}: {body}"
        )))
    }
}

/// Locales present in an asset's `fields.file`.
fn file_locales(asset: &RemoteEntity) -> Vec<String> {
    let locales: Vec<String> = asset
        .fields
        .get("file")
        .and_then(|file| file.as_object())
        .map(|file| file.keys().cloned().collect())
        .unwrap_or_default();

    if locales.is_empty() {
        vec![LOCALE.to_string()]
    } else {
        locales
    }
}

/// An asset is processed once every locale's file has a `url`.
fn is_processed(asset: &RemoteEntity, locales: &[String]) -> bool {
    locales.iter().all(|locale| {
        asset
            .fields
            .get("file")
            .and_then(|file| file.get(locale))
            .and_then(|file| file.get("url"))
            .is_some()
    })
}

#[async_trait]
impl ManagementClient for HttpManagementClient {
    #[instrument(skip(self))]
    async fn get_space(&self, space_id: &str) -> Result<Space> {
        let url = self.endpoint(&["spaces", space_id]);
        let resource: NamedResource = self
            .fetch(self.request(reqwest::Method::GET, url), "get space")
            .await?;
        Ok(Space {
            id: resource.sys.id,
            name: resource.name,
        })
    }

    #[instrument(skip(self, space), fields(space_id = %space.id))]
    async fn get_environment(&self, space: &Space, environment_id: &str) -> Result<Environment> {
        let url = self.endpoint(&["spaces", space.id.as_str(), "environments", environment_id]);
        let resource: NamedResource = self
            .fetch(self.request(reqwest::Method::GET, url), "get environment")
            .await?;
        Ok(Environment {
            id: resource.sys.id,
            space_id: space.id.clone(),
            name: resource.name,
        })
    }

    #[instrument(skip(self, environment, content), fields(environment_id = %environment.id))]
    async fn create_entry(
        &self,
        environment: &Environment,
        content_type: &str,
        content: &EntryContent,
    ) -> Result<RemoteEntity> {
        let url = self.environment_endpoint(environment, &["entries"]);
        let request = self
            .request(reqwest::Method::POST, url)
            .header(CONTENT_TYPE_HEADER, content_type)
            .json(content);
        let entry: RemoteEntity = self.fetch(request, "create entry").await?;
        debug!(entry_id = %entry.id(), "entry created");
        Ok(entry)
    }

    #[instrument(skip_all, fields(environment_id = %environment.id))]
    async fn create_asset(
        &self,
        environment: &Environment,
        content: &AssetContent,
    ) -> Result<RemoteEntity> {
        let url = self.environment_endpoint(environment, &["assets"]);
        let request = self.request(reqwest::Method::POST, url).json(content);
        let asset: RemoteEntity = self.fetch(request, "create asset").await?;
        debug!(asset_id = %asset.id(), "asset created");
        Ok(asset)
    }

    #[instrument(skip_all, fields(asset_id = %asset.id()))]
    async fn process_asset_for_all_locales(
        &self,
        environment: &Environment,
        asset: &RemoteEntity,
    ) -> Result<RemoteEntity> {
        let locales = file_locales(asset);
        let version = asset.version().to_string();

        for locale in &locales {
            let url = self.environment_endpoint(
                environment,
                &["assets", asset.id(), "files", locale.as_str(), "process"],
            );
            let request = self
                .request(reqwest::Method::PUT, url)
                .header(VERSION_HEADER, &version);
            send(request, "process asset").await?;
        }

        // At least one status check, even with a zero retry budget.
        for attempt in 1..=self.check_retries.max(1) {
            tokio::time::sleep(self.check_wait).await;
            let current = self.get_asset(environment, asset.id()).await?;
            if is_processed(&current, &locales) {
                debug!(attempt, "asset processed");
                return Ok(current);
            }
            debug!(attempt, "asset still processing");
        }

        Err(ContentSeedError::Network(format!(
            "asset {} is taking longer than expected to process",
            asset.id()
        )))
    }

    #[instrument(skip_all, fields(entry_id = %entry.id()))]
    async fn publish_entry(
        &self,
        environment: &Environment,
        entry: &RemoteEntity,
    ) -> Result<RemoteEntity> {
        let url = self.environment_endpoint(environment, &["entries", entry.id(), "published"]);
        let request = self
            .request(reqwest::Method::PUT, url)
            .header(VERSION_HEADER, entry.version().to_string());
        self.fetch(request, "publish entry").await
    }

    #[instrument(skip_all, fields(asset_id = %asset.id()))]
    async fn publish_asset(
        &self,
        environment: &Environment,
        asset: &RemoteEntity,
    ) -> Result<RemoteEntity> {
        let url = self.environment_endpoint(environment, &["assets", asset.id(), "published"]);
        let request = self
            .request(reqwest::Method::PUT, url)
            .header(VERSION_HEADER, asset.version().to_string());
        self.fetch(request, "publish asset").await
    }
}
