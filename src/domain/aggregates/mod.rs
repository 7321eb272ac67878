//! Aggregates module
pub mod catalog;
pub mod variant;
pub mod product;

pub use catalog::{AttributeCatalog, AttributeDefinition, AttributeOrigin, CatalogState};
pub use variant::{AttributeInstance, VariantImage, VariantRecord, VariantStatus};
pub use product::{ProductVariants, ProductVariantsError};
