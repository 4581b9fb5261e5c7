//! Template-driven content creation.
//!
//! This crate provides:
//! - [`templates`] — the template model ([`FieldSource`], [`EntryTemplate`], [`TemplateMap`])
//! - [`resolvers`] — built-in resolvers, including nested entry and asset creation
//! - [`loader`] — declarative TOML/JSON template files
//! - [`factory`] — [`ContentFactory`] and the resolver capability bundle

pub mod factory;
pub mod loader;
pub mod resolvers;
pub mod templates;

pub use factory::{ContentFactory, CreateFuture, MAX_NESTING_DEPTH, ResolverContext};
pub use loader::{FieldSpec, TemplateFile, TemplateSpec, load_template_file, load_templates};
pub use templates::{EntryTemplate, FieldResolver, FieldSource, TemplateMap};
