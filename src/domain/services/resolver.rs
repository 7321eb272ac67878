//! Active attribute set resolution

use crate::domain::aggregates::catalog::{AttributeCatalog, AttributeDefinition};
use crate::domain::value_objects::AttributeName;

/// Inherited category attributes first, then session custom attributes in
/// the order they were added. Blank, reserved (`brand`) and duplicate names
/// are dropped; the first occurrence of a name wins.
pub fn resolve<S: AsRef<str>>(category_attributes: &[AttributeDefinition], custom_attributes: &[S]) -> AttributeCatalog {
    let mut resolved: Vec<AttributeDefinition> = Vec::with_capacity(category_attributes.len() + custom_attributes.len());
    let inherited = category_attributes.iter().filter_map(|d| AttributeName::new(d.name.as_str()).map(AttributeDefinition::predefined));
    let custom = custom_attributes.iter().filter_map(|c| AttributeName::new(c.as_ref()).map(AttributeDefinition::custom));
    for definition in inherited.chain(custom) {
        if definition.name.is_reserved() || resolved.iter().any(|d| d.name == definition.name) { continue; }
        resolved.push(definition);
    }
    AttributeCatalog::from_resolved(resolved)
}
