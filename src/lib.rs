//! OpenSASE Variants
//!
//! Variant matrix engine for the OpenSASE seller back office.
//!
//! ## Features
//! - Attribute catalog resolution (category + custom attributes, `brand` reserved)
//! - Cartesian variant generation
//! - Idempotent attribute reconciliation
//! - Deterministic SKU assignment with a configurable regeneration policy
//! - Derived stock totals
//! - Concurrent per-variant image compression

pub mod config;
pub mod domain;

pub use config::{EngineConfig, MediaConfig};
pub use domain::aggregates::{
    AttributeCatalog, AttributeDefinition, AttributeInstance, AttributeOrigin, CatalogState, ProductVariants,
    ProductVariantsError, VariantImage, VariantRecord, VariantStatus,
};
pub use domain::events::{DomainEvent, VariantEvent};
pub use domain::services::{
    generate, generate_for_catalog, parse_values, reconcile, resolve, stock::total as total_stock, GenerationRequest,
    MediaError, SkuAssigner, SkuContext, SkuRegenerationPolicy, VariantMediaPipeline,
};
pub use domain::value_objects::{AttributeName, Price, Sku, Stock};

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum VariantError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Variant matrix too large: {requested} variants requested, limit is {limit}")]
    TooManyVariants { requested: String, limit: usize },
}

pub type Result<T> = std::result::Result<T, VariantError>;
