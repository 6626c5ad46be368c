//! Record enrichment for the dynamic catalog repository.
//!
//! This crate wraps a record provider so every record it returns carries the
//! ISO 19139 schema identity and a rendered `gmd:MD_Metadata` document.

pub mod enrichment;
pub mod mapping;
pub mod render;
pub mod repository;

pub use enrichment::{Enricher, SCHEMA_URI, TYPENAME, add_fixed_fields};
pub use mapping::{DataType, Document, TemplateVariables};
pub use render::{FileTemplateRenderer, TemplateRenderer};
pub use repository::DynRepository;
