//! Variant engine services
//!
//! Everything here except `media` is synchronous and pure, safe to call on
//! every form change.
pub mod resolver;
pub mod reconciler;
pub mod generator;
pub mod sku;
pub mod stock;
pub mod media;

pub use generator::{generate, generate_for_catalog, parse_values, AttributeValues, GenerationRequest};
pub use media::{ImageCompressor, JpegCompressor, MediaError, NormalizedImage, RawImageInput, VariantMediaPipeline};
pub use reconciler::{reconcile, reconcile_attributes, reconcile_variant};
pub use resolver::resolve;
pub use sku::{Clock, FixedClock, SkuAssigner, SkuContext, SkuRegenerationPolicy, SystemClock};
