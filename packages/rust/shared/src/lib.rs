//! Shared types, error model, and configuration for contentseed.
//!
//! This crate is the foundation depended on by all other contentseed crates.
//! It provides:
//! - [`ContentSeedError`] — the unified error type, classified by [`FailureKind`]
//! - Domain types ([`Link`], [`EntryContent`], [`AssetContent`], [`RemoteEntity`])
//! - Configuration ([`AppConfig`], [`FactoryOptions`], [`ClientConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClientConfig, ContentfulConfig, DEFAULT_BASE_URL, DEFAULT_ENVIRONMENT,
    DefaultsConfig, FactoryOptions, ProcessingConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_access_token,
};
pub use error::{ContentSeedError, FailureKind, Result};
pub use types::{
    AssetContent, AssetFields, AssetFile, AssetProps, Created, EntryContent, Environment, LOCALE,
    Link, LinkSys, LinkType, Localized, RemoteEntity, RemoteSys, Space,
};
