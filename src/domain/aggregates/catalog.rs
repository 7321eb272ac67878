//! Attribute catalog: the ordered variant dimensions active for a product

use serde::{Deserialize, Serialize};
use crate::domain::services::resolver;
use crate::domain::value_objects::AttributeName;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeOrigin { #[default] Predefined, Custom }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: AttributeName,
    #[serde(default)]
    pub origin: AttributeOrigin,
}

impl AttributeDefinition {
    pub fn predefined(name: AttributeName) -> Self { Self { name, origin: AttributeOrigin::Predefined } }
    pub fn custom(name: AttributeName) -> Self { Self { name, origin: AttributeOrigin::Custom } }
}

/// Ordered attribute set with unique, non-reserved names.
///
/// Only the resolver builds catalogs, so the uniqueness and `brand`
/// exclusion hold for every instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeCatalog(Vec<AttributeDefinition>);

impl AttributeCatalog {
    pub(crate) fn from_resolved(definitions: Vec<AttributeDefinition>) -> Self { Self(definitions) }

    pub fn definitions(&self) -> &[AttributeDefinition] { &self.0 }
    pub fn iter(&self) -> impl Iterator<Item = &AttributeDefinition> { self.0.iter() }
    pub fn names(&self) -> impl Iterator<Item = &str> { self.0.iter().map(|d| d.name.as_str()) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn contains(&self, name: &str) -> bool { self.position(name).is_some() }
    pub fn position(&self, name: &str) -> Option<usize> { self.0.iter().position(|d| d.name.matches(name)) }
}

/// Session-scoped catalog inputs owned by the calling context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogState {
    category_attributes: Vec<AttributeDefinition>,
    custom_attributes: Vec<String>,
}

impl CatalogState {
    pub fn new(category_attributes: Vec<AttributeDefinition>) -> Self {
        Self { category_attributes, custom_attributes: vec![] }
    }

    pub fn category_attributes(&self) -> &[AttributeDefinition] { &self.category_attributes }
    pub fn custom_attributes(&self) -> &[String] { &self.custom_attributes }

    /// Replaces the inherited attributes after a category change; custom
    /// attributes survive.
    pub fn set_category_attributes(&mut self, attributes: Vec<AttributeDefinition>) {
        self.category_attributes = attributes;
    }

    /// Returns `false` for blank, reserved or duplicate names; the catalog is
    /// unchanged in that case.
    pub fn add_custom(&mut self, name: &str) -> bool {
        let Some(name) = AttributeName::new(name) else { return false };
        if name.is_reserved() || self.catalog().contains(name.as_str()) { return false; }
        self.custom_attributes.push(name.as_str().to_string());
        true
    }

    pub fn remove_custom(&mut self, name: &str) -> bool {
        let before = self.custom_attributes.len();
        self.custom_attributes.retain(|c| !crate::domain::value_objects::same_name(c, name));
        self.custom_attributes.len() != before
    }

    pub fn catalog(&self) -> AttributeCatalog {
        resolver::resolve(&self.category_attributes, &self.custom_attributes)
    }
}
