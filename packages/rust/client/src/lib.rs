//! Content Management API client.
//!
//! This crate provides:
//! - [`ManagementClient`] — the remote operations the content factory relies on
//! - [`HttpManagementClient`] — reqwest implementation against the Content Management API
//! - [`MockManagementClient`] — in-memory implementation that records calls for tests

pub mod http;
pub mod mock;

use async_trait::async_trait;
use contentseed_shared::{AssetContent, EntryContent, Environment, RemoteEntity, Result, Space};

pub use http::HttpManagementClient;
pub use mock::{ClientCall, ClientOp, MockManagementClient};

/// Remote operations needed to create and publish entries and assets.
///
/// Authentication and transport are the implementation's concern; callers
/// only see resolved handles and returned entities.
#[async_trait]
pub trait ManagementClient: Send + Sync {
    /// Look up a space by id.
    async fn get_space(&self, space_id: &str) -> Result<Space>;

    /// Look up an environment inside `space`.
    async fn get_environment(&self, space: &Space, environment_id: &str) -> Result<Environment>;

    /// Create a draft entry of `content_type`.
    async fn create_entry(
        &self,
        environment: &Environment,
        content_type: &str,
        content: &EntryContent,
    ) -> Result<RemoteEntity>;

    /// Create a draft asset. The file is not processed yet.
    async fn create_asset(
        &self,
        environment: &Environment,
        content: &AssetContent,
    ) -> Result<RemoteEntity>;

    /// Process the asset's file for every locale it carries and wait until
    /// processing finished. Returns the asset at its new version.
    async fn process_asset_for_all_locales(
        &self,
        environment: &Environment,
        asset: &RemoteEntity,
    ) -> Result<RemoteEntity>;

    /// Publish an entry.
    async fn publish_entry(
        &self,
        environment: &Environment,
        entry: &RemoteEntity,
    ) -> Result<RemoteEntity>;

    /// Publish an asset.
    async fn publish_asset(
        &self,
        environment: &Environment,
        asset: &RemoteEntity,
    ) -> Result<RemoteEntity>;
}
