//! Attribute reconciliation
//!
//! Brings a variant's attribute list in line with the current catalog without
//! losing values the seller already entered. The result is a fixed point:
//! reconciling an already reconciled list against the same catalog returns it
//! unchanged, so callers can re-run it on every catalog change.

use tracing::debug;
use crate::domain::aggregates::catalog::AttributeCatalog;
use crate::domain::aggregates::variant::{AttributeInstance, VariantRecord};
use crate::domain::value_objects::{is_reserved, same_name};

/// Catalog entries first (existing values kept, missing ones added empty),
/// then out-of-catalog entries that appear in `previously_selected`, in their
/// prior order. Everything else, and any `brand` key, is dropped. Duplicate
/// keys collapse to their first occurrence.
pub fn reconcile(catalog: &AttributeCatalog, variant: &VariantRecord, previously_selected: &[AttributeInstance]) -> Vec<AttributeInstance> {
    reconcile_attributes(catalog, &variant.attributes, previously_selected)
}

pub fn reconcile_attributes(catalog: &AttributeCatalog, current: &[AttributeInstance], previously_selected: &[AttributeInstance]) -> Vec<AttributeInstance> {
    let mut result: Vec<AttributeInstance> = Vec::with_capacity(catalog.len());
    for definition in catalog.iter() {
        let instance = current.iter().find(|a| definition.name.matches(&a.key)).cloned()
            .unwrap_or_else(|| AttributeInstance::empty(definition.name.as_str()));
        result.push(instance);
    }
    for instance in current {
        if is_reserved(&instance.key) || catalog.contains(&instance.key) { continue; }
        if !previously_selected.iter().any(|s| same_name(&s.key, &instance.key)) { continue; }
        if result.iter().any(|r| same_name(&r.key, &instance.key)) { continue; }
        result.push(instance.clone());
    }
    result
}

/// Reconciles in place; returns whether the attribute list changed.
pub fn reconcile_variant(catalog: &AttributeCatalog, variant: &mut VariantRecord) -> bool {
    let next = reconcile(catalog, variant, &variant.selected_attributes);
    if next == variant.attributes { return false; }
    debug!(before = variant.attributes.len(), after = next.len(), sku = %variant.sku, "Reconciled variant attributes");
    variant.attributes = next;
    true
}
