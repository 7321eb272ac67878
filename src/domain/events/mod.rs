//! Domain events
use crate::domain::value_objects::Sku;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Variant(VariantEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum VariantEvent {
    MatrixGenerated { product_id: String, count: usize, replaced: usize },
    VariantAppended { product_id: String, index: usize, sku: Sku },
    VariantRemoved { product_id: String, index: usize, sku: Sku },
    AttributesReconciled { product_id: String, changed: usize },
    SkuRegenerated { product_id: String, index: usize, previous: Sku, sku: Sku },
    CustomAttributeAdded { product_id: String, name: String },
    CustomAttributeRemoved { product_id: String, name: String },
}
