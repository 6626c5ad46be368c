//! Shared types, error model, and configuration for dynrepo.
//!
//! This crate is the foundation depended on by all other dynrepo crates.
//! It provides:
//! - [`DynRepoError`]: the unified error type
//! - Domain types ([`CatalogRecord`], [`GeoExtent`], [`Constraint`], [`QueryOptions`])
//! - The [`RecordProvider`] trait the enrichment layer wraps
//! - Configuration ([`AppConfig`], config loading with env interpolation)

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_ENV_VAR, DynamicConfig, RepositoryConfig, config_path_from_env,
    init_config, interpolate_env, load_config, load_config_from,
};
pub use error::{DynRepoError, Result};
pub use provider::RecordProvider;
pub use types::{
    CatalogRecord, Constraint, DEFAULT_MAX_RECORDS, DescriptionTag, DocumentationEntry, GeoExtent,
    QueryOptions, SortBy, SortOrder, Variable,
};
