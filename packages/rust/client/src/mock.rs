//! In-memory [`ManagementClient`] for tests and offline development.
//!
//! Records every call in order and can be told to fail specific operations.
//! Thread-safe via `Arc<Mutex<>>`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use contentseed_shared::{
    AssetContent, ContentSeedError, EntryContent, Environment, FailureKind, RemoteEntity,
    RemoteSys, Result, Space,
};

use crate::ManagementClient;

/// Operation selector for [`MockManagementClient::fail_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOp {
    GetSpace,
    GetEnvironment,
    CreateEntry,
    CreateAsset,
    ProcessAsset,
    PublishEntry,
    PublishAsset,
}

/// A recorded remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    GetSpace { space_id: String },
    GetEnvironment { environment_id: String },
    CreateEntry { content_type: String, content: EntryContent },
    CreateAsset { content: AssetContent },
    ProcessAsset { id: String },
    PublishEntry { id: String, version: u64 },
    PublishAsset { id: String, version: u64 },
}

impl ClientCall {
    pub fn op(&self) -> ClientOp {
        match self {
            Self::GetSpace { .. } => ClientOp::GetSpace,
            Self::GetEnvironment { .. } => ClientOp::GetEnvironment,
            Self::CreateEntry { .. } => ClientOp::CreateEntry,
            Self::CreateAsset { .. } => ClientOp::CreateAsset,
            Self::ProcessAsset { .. } => ClientOp::ProcessAsset,
            Self::PublishEntry { .. } => ClientOp::PublishEntry,
            Self::PublishAsset { .. } => ClientOp::PublishAsset,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<ClientCall>,
    failures: HashMap<ClientOp, FailureKind>,
    next_entry: u64,
    next_asset: u64,
}

/// Mock management client that records calls for test assertions.
#[derive(Debug, Clone, Default)]
pub struct MockManagementClient {
    state: Arc<Mutex<MockState>>,
}

impl MockManagementClient {
    /// Create a new mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future `op` call fail with an error of `kind`.
    pub fn fail_on(&self, op: ClientOp, kind: FailureKind) {
        self.lock().failures.insert(op, kind);
    }

    /// Return all recorded calls in order.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock().calls.clone()
    }

    /// Return the recorded operations in order.
    pub fn ops(&self) -> Vec<ClientOp> {
        self.lock().calls.iter().map(ClientCall::op).collect()
    }

    /// Clear recorded calls and configured failures.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.calls.clear();
        state.failures.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .expect("mock state lock poisoned by a panicking test")
    }

    /// Record `call` and return the configured failure for it, if any.
    fn record(&self, call: ClientCall) -> Result<()> {
        let op = call.op();
        let mut state = self.lock();
        tracing::debug!(?op, "Mock client: recording call");
        state.calls.push(call);
        match state.failures.get(&op) {
            Some(kind) => Err(injected_error(op, *kind)),
            None => Ok(()),
        }
    }

    fn next_id(&self, op: ClientOp) -> String {
        let mut state = self.lock();
        match op {
            ClientOp::CreateAsset => {
                state.next_asset += 1;
                format!("asset-{}", state.next_asset)
            }
            _ => {
                state.next_entry += 1;
                format!("entry-{}", state.next_entry)
            }
        }
    }
}

fn injected_error(op: ClientOp, kind: FailureKind) -> ContentSeedError {
    let message = format!("mock failure in {op:?}");
    match kind {
        FailureKind::Validation => ContentSeedError::validation(message),
        FailureKind::Resolver => ContentSeedError::resolver(message),
        FailureKind::UnknownContentType => ContentSeedError::UnknownContentType(message),
        FailureKind::Network | FailureKind::Other => ContentSeedError::Network(message),
    }
}

fn entity(id: String, version: u64, kind: &str, fields: Value) -> RemoteEntity {
    RemoteEntity {
        sys: RemoteSys {
            id,
            version: Some(version),
            kind: Some(kind.to_string()),
        },
        fields,
    }
}

#[async_trait]
impl ManagementClient for MockManagementClient {
    async fn get_space(&self, space_id: &str) -> Result<Space> {
        self.record(ClientCall::GetSpace {
            space_id: space_id.to_string(),
        })?;
        Ok(Space {
            id: space_id.to_string(),
            name: None,
        })
    }

    async fn get_environment(&self, space: &Space, environment_id: &str) -> Result<Environment> {
        self.record(ClientCall::GetEnvironment {
            environment_id: environment_id.to_string(),
        })?;
        Ok(Environment {
            id: environment_id.to_string(),
            space_id: space.id.clone(),
            name: None,
        })
    }

    async fn create_entry(
        &self,
        _environment: &Environment,
        content_type: &str,
        content: &EntryContent,
    ) -> Result<RemoteEntity> {
        self.record(ClientCall::CreateEntry {
            content_type: content_type.to_string(),
            content: content.clone(),
        })?;
        let fields = serde_json::to_value(&content.fields).unwrap_or(Value::Null);
        Ok(entity(self.next_id(ClientOp::CreateEntry), 1, "Entry", fields))
    }

    async fn create_asset(
        &self,
        _environment: &Environment,
        content: &AssetContent,
    ) -> Result<RemoteEntity> {
        self.record(ClientCall::CreateAsset {
            content: content.clone(),
        })?;
        let fields = serde_json::to_value(&content.fields).unwrap_or(Value::Null);
        Ok(entity(self.next_id(ClientOp::CreateAsset), 1, "Asset", fields))
    }

    async fn process_asset_for_all_locales(
        &self,
        _environment: &Environment,
        asset: &RemoteEntity,
    ) -> Result<RemoteEntity> {
        self.record(ClientCall::ProcessAsset {
            id: asset.id().to_string(),
        })?;
        let mut fields = asset.fields.clone();
        if let Some(file) = fields.get_mut("file").and_then(Value::as_object_mut) {
            for localized in file.values_mut() {
                localized["url"] = json!(format!("//assets.mock/{}", asset.id()));
            }
        }
        Ok(entity(asset.id().to_string(), asset.version() + 1, "Asset", fields))
    }

    async fn publish_entry(
        &self,
        _environment: &Environment,
        entry: &RemoteEntity,
    ) -> Result<RemoteEntity> {
        self.record(ClientCall::PublishEntry {
            id: entry.id().to_string(),
            version: entry.version(),
        })?;
        let mut published = entry.clone();
        published.sys.version = Some(entry.version() + 1);
        Ok(published)
    }

    async fn publish_asset(
        &self,
        _environment: &Environment,
        asset: &RemoteEntity,
    ) -> Result<RemoteEntity> {
        self.record(ClientCall::PublishAsset {
            id: asset.id().to_string(),
            version: asset.version(),
        })?;
        let mut published = asset.clone();
        published.sys.version = Some(asset.version() + 1);
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentseed_shared::{AssetProps, Localized};

    fn environment() -> Environment {
        Environment {
            id: "master".into(),
            space_id: "sp1".into(),
            name: None,
        }
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let mock = MockManagementClient::new();
        let env = environment();
        let first = mock
            .create_entry(&env, "post", &EntryContent::default())
            .await
            .unwrap();
        let second = mock
            .create_entry(&env, "post", &EntryContent::default())
            .await
            .unwrap();
        assert_eq!(first.id(), "entry-1");
        assert_eq!(second.id(), "entry-2");
    }

    #[tokio::test]
    async fn processing_bumps_version_and_sets_url() {
        let mock = MockManagementClient::new();
        let env = environment();
        let props = AssetProps {
            name: "a.png".into(),
            content_type: "image/png".into(),
            url: "https://x/a.png".into(),
        };
        let asset = mock
            .create_asset(&env, &AssetContent::from(&props))
            .await
            .unwrap();
        let processed = mock
            .process_asset_for_all_locales(&env, &asset)
            .await
            .unwrap();
        assert_eq!(processed.version(), 2);
        assert!(processed.fields["file"]["en-US"]["url"].is_string());
    }

    #[tokio::test]
    async fn injected_failures_are_recorded() {
        let mock = MockManagementClient::new();
        mock.fail_on(ClientOp::CreateEntry, FailureKind::Validation);

        let mut content = EntryContent::default();
        content
            .fields
            .insert("title".into(), Localized::new(json!("x")));
        let err = mock
            .create_entry(&environment(), "post", &content)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Validation);
        assert_eq!(mock.ops(), vec![ClientOp::CreateEntry]);

        mock.reset();
        assert!(mock.calls().is_empty());
        assert!(
            mock.create_entry(&environment(), "post", &content)
                .await
                .is_ok()
        );
    }
}
