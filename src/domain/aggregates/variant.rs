//! Variant record: one sellable configuration of a product

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{same_name, Price, Sku, Stock};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInstance {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl AttributeInstance {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self { Self { key: key.into(), value: value.into() } }
    pub fn empty(key: impl Into<String>) -> Self { Self::new(key, "") }
    pub fn is_blank(&self) -> bool { self.value.trim().is_empty() }
}

/// Looks up an attribute value by case-insensitive key.
pub fn find_value<'a>(attributes: &'a [AttributeInstance], key: &str) -> Option<&'a str> {
    attributes.iter().find(|a| same_name(&a.key, key)).map(|a| a.value.as_str())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantStatus { #[default] Active, Inactive }

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantImage { pub url: String, pub alt: Option<String>, pub position: u32 }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Absent until the persistence collaborator stores the record.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeInstance>,
    /// Instances the seller set explicitly; these survive catalog changes.
    #[serde(default)]
    pub selected_attributes: Vec<AttributeInstance>,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub discount: Price,
    #[serde(default)]
    pub stock: Stock,
    #[serde(default)]
    pub sku: Sku,
    #[serde(default)]
    pub status: VariantStatus,
    #[serde(default)]
    pub images: Vec<VariantImage>,
}

impl VariantRecord {
    /// Fresh skeleton: zero price, discount and stock, active, no images.
    pub fn skeleton(attributes: Vec<AttributeInstance>, sku: Sku) -> Self {
        Self {
            id: None, attributes, selected_attributes: vec![], price: Price::ZERO, discount: Price::ZERO,
            stock: Stock::default(), sku, status: VariantStatus::Active, images: vec![],
        }
    }

    pub fn value_of(&self, key: &str) -> Option<&str> { find_value(&self.attributes, key) }

    /// Human-readable combination, e.g. `Red / M`.
    pub fn title(&self) -> String {
        self.attributes.iter().filter(|a| !a.is_blank()).map(|a| a.value.trim()).collect::<Vec<_>>().join(" / ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_defaults() {
        let v = VariantRecord::skeleton(vec![AttributeInstance::new("Color", "Red"), AttributeInstance::empty("Size")], Sku::blank());
        assert_eq!(v.stock.value(), 0);
        assert_eq!(v.price, Price::ZERO);
        assert_eq!(v.status, VariantStatus::Active);
        assert_eq!(v.value_of("color"), Some("Red"));
        assert_eq!(v.title(), "Red");
    }

    #[test]
    fn test_deserialize_form_payload() {
        let v: VariantRecord = serde_json::from_str(r#"{"attributes":[{"key":"Size","value":"M"}],"price":"12.50","stock":"abc","sku":"X-1","status":"inactive"}"#).unwrap();
        assert_eq!(v.stock.value(), 0);
        assert_eq!(v.status, VariantStatus::Inactive);
        assert!(v.id.is_none());
        assert!(v.images.is_empty());
    }
}
