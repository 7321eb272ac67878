//! Cartesian variant generation

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::domain::aggregates::catalog::AttributeCatalog;
use crate::domain::aggregates::variant::{AttributeInstance, VariantRecord};
use crate::domain::services::sku::{Clock, SkuAssigner, SkuContext};
use crate::domain::value_objects::{is_reserved, same_name, AttributeName};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValues {
    pub attribute_name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Ordered `(attribute, candidate values)` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationRequest(Vec<AttributeValues>);

impl GenerationRequest {
    pub fn new() -> Self { Self::default() }

    pub fn with_values<S: Into<String>>(mut self, attribute_name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        self.0.push(AttributeValues { attribute_name: attribute_name.into(), values: values.into_iter().map(Into::into).collect() });
        self
    }

    /// Values typed as comma-separated free text.
    pub fn with_free_text(self, attribute_name: impl Into<String>, text: &str) -> Self {
        self.with_values(attribute_name, parse_values(text))
    }

    pub fn attributes(&self) -> &[AttributeValues] { &self.0 }

    /// Number of variants `generate` will produce; `None` when it does not
    /// fit in `usize`.
    pub fn expected_count(&self) -> Option<usize> {
        let axes = axes(self.0.iter());
        if axes.iter().all(|a| a.values.is_empty()) { return Some(0); }
        axes.iter().filter(|a| !a.values.is_empty()).try_fold(1usize, |acc, a| acc.checked_mul(a.values.len()))
    }

    /// Whether the matrix stays within `limit` variants.
    pub fn fits_within(&self, limit: usize) -> bool { self.expected_count().is_some_and(|n| n <= limit) }
}

impl From<Vec<AttributeValues>> for GenerationRequest {
    fn from(attributes: Vec<AttributeValues>) -> Self { Self(attributes) }
}

/// Splits on commas, trims, drops empty entries and exact repeats.
pub fn parse_values(text: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in text.split(',').map(str::trim).filter(|v| !v.is_empty()) {
        if !values.iter().any(|v| v == value) { values.push(value.to_string()); }
    }
    values
}

/// Blank, reserved and repeated attribute names are ignored; the first
/// occurrence of a name wins.
fn axes<'a>(attributes: impl Iterator<Item = &'a AttributeValues>) -> Vec<&'a AttributeValues> {
    let mut axes: Vec<&AttributeValues> = Vec::new();
    for attribute in attributes {
        let Some(name) = AttributeName::new(attribute.attribute_name.as_str()) else { continue };
        if name.is_reserved() || axes.iter().any(|a| name.matches(&a.attribute_name)) { continue; }
        axes.push(attribute);
    }
    axes
}

/// Expands the request into every value combination, in attribute order.
///
/// Attributes without candidate values are skipped rather than zeroing the
/// product; when no attribute has values the result is empty. Every record is
/// a fresh skeleton, so this replaces whatever the caller had before.
pub fn generate<C: Clock>(request: &GenerationRequest, context: &SkuContext, category_code: &str, assigner: &SkuAssigner<C>) -> Vec<VariantRecord> {
    let axes = axes(request.0.iter());
    let columns: Vec<&str> = axes.iter().map(|a| a.attribute_name.trim()).collect();
    build(&axes, &columns, context, category_code, assigner)
}

/// Like [`generate`], but attributes follow catalog order: catalog entries
/// missing from the request are filled with `""` and request attributes
/// outside the catalog are ignored.
pub fn generate_for_catalog<C: Clock>(catalog: &AttributeCatalog, request: &GenerationRequest, context: &SkuContext, category_code: &str, assigner: &SkuAssigner<C>) -> Vec<VariantRecord> {
    let mut axes = axes(request.0.iter());
    axes.retain(|a| {
        let known = catalog.contains(&a.attribute_name);
        if !known { debug!(attribute = %a.attribute_name, "Ignoring attribute outside the catalog"); }
        known
    });
    axes.sort_by_key(|a| catalog.position(&a.attribute_name));
    let columns: Vec<&str> = catalog.names().collect();
    build(&axes, &columns, context, category_code, assigner)
}

fn build<C: Clock>(axes: &[&AttributeValues], columns: &[&str], context: &SkuContext, category_code: &str, assigner: &SkuAssigner<C>) -> Vec<VariantRecord> {
    if axes.iter().all(|a| a.values.is_empty()) {
        info!(attributes = axes.len(), "No attribute has values; generated no variants");
        return vec![];
    }
    let mut combinations: Vec<Vec<(&str, &str)>> = vec![vec![]];
    for axis in axes.iter().copied().filter(|a| !a.values.is_empty()) {
        let mut next = Vec::with_capacity(combinations.len() * axis.values.len());
        for partial in &combinations {
            for value in &axis.values {
                let mut combination = partial.clone();
                combination.push((axis.attribute_name.as_str(), value.as_str()));
                next.push(combination);
            }
        }
        combinations = next;
    }
    let variants: Vec<VariantRecord> = combinations.iter().map(|combination| {
        let attributes: Vec<AttributeInstance> = columns.iter().map(|column| {
            let value = combination.iter().find(|(name, _)| same_name(name, column)).map(|(_, v)| *v).unwrap_or("");
            AttributeInstance::new(*column, value)
        }).collect();
        let sku = assigner.assign(context, category_code, &attributes);
        let mut variant = VariantRecord::skeleton(attributes, sku);
        variant.selected_attributes = variant.attributes.iter().filter(|a| !a.is_blank() && !is_reserved(&a.key)).cloned().collect();
        variant
    }).collect();
    info!(variants = variants.len(), attributes = axes.len(), "Generated variant matrix");
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::catalog::AttributeDefinition;
    use crate::domain::aggregates::variant::VariantStatus;
    use crate::domain::services::resolver::resolve;
    use crate::domain::services::sku::FixedClock;
    use crate::domain::value_objects::Price;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn assigner() -> SkuAssigner<FixedClock> { SkuAssigner::with_clock(FixedClock(1_700_000_004_321)) }

    #[test]
    fn test_color_size_matrix() {
        let request = GenerationRequest::new().with_values("Color", ["Red", "Blue"]).with_values("Size", ["S", "M", "L"]);
        let variants = generate(&request, &SkuContext::default(), "", &assigner());
        assert_eq!(variants.len(), 6);
        assert!(variants.iter().all(|v| v.stock.is_zero() && v.price == Price::ZERO && v.status == VariantStatus::Active && v.images.is_empty()));
        let combos: HashSet<(String, String)> = variants.iter().map(|v| (v.value_of("Color").unwrap().to_string(), v.value_of("Size").unwrap().to_string())).collect();
        assert_eq!(combos.len(), 6);
        assert_eq!(variants[0].attributes, vec![AttributeInstance::new("Color", "Red"), AttributeInstance::new("Size", "S")]);
        assert_eq!(variants[0].sku.as_str(), "UNK-UNK-RED-4321");
        assert_eq!(variants[3].sku.as_str(), "UNK-UNK-BLU-4321");
    }

    #[test]
    fn test_empty_attribute_is_skipped() {
        let request = GenerationRequest::new().with_values("Color", ["Red", "Blue"]).with_values("Size", Vec::<String>::new());
        let variants = generate(&request, &SkuContext::default(), "", &assigner());
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[1].attributes, vec![AttributeInstance::new("Color", "Blue"), AttributeInstance::empty("Size")]);
    }

    #[test]
    fn test_all_empty_yields_nothing() {
        let request = GenerationRequest::new().with_free_text("Color", " , ,").with_values("Size", Vec::<String>::new());
        assert_eq!(request.expected_count(), Some(0));
        assert!(generate(&request, &SkuContext::default(), "", &assigner()).is_empty());
        assert!(generate(&GenerationRequest::new(), &SkuContext::default(), "", &assigner()).is_empty());
    }

    #[test]
    fn test_brand_and_duplicate_axes_ignored() {
        let request = GenerationRequest::new().with_values("Brand", ["Acme", "Other"]).with_values("Color", ["Red"]).with_values("color", ["Blue", "Green"]);
        let variants = generate(&request, &SkuContext::default(), "", &assigner());
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].attributes, vec![AttributeInstance::new("Color", "Red")]);
    }

    #[test]
    fn test_expected_count_overflow() {
        let request = (0..50).fold(GenerationRequest::new(), |req, i| req.with_values(format!("attr{i}"), ["x", "y", "z"]));
        assert_eq!(request.expected_count(), None);
        assert!(!request.fits_within(10_000));
        let small = GenerationRequest::new().with_values("Color", ["Red", "Blue"]).with_values("Size", ["S", "M", "L"]);
        assert_eq!(small.expected_count(), Some(6));
        assert!(small.fits_within(6));
        assert!(!small.fits_within(5));
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_values(" Red, Blue,,Green ,Red"), vec!["Red", "Blue", "Green"]);
        assert!(parse_values("  ").is_empty());
    }

    #[test]
    fn test_generate_for_catalog_orders_by_catalog() {
        let defs: Vec<_> = ["Size", "Color", "Material"].into_iter().filter_map(AttributeName::new).map(AttributeDefinition::predefined).collect();
        let catalog = resolve::<&str>(&defs, &[]);
        let request = GenerationRequest::new().with_values("Color", ["Red"]).with_values("Size", ["S", "M"]).with_values("Pattern", ["Dots"]);
        let variants = generate_for_catalog(&catalog, &request, &SkuContext::new("acct077", "tops"), "", &assigner());
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[1].attributes, vec![AttributeInstance::new("Size", "M"), AttributeInstance::new("Color", "Red"), AttributeInstance::empty("Material")]);
        assert_eq!(variants[1].sku.as_str(), "077-TOP-M-R-4321");
        assert_eq!(variants[1].selected_attributes.len(), 2);
    }

    fn arb_request() -> impl Strategy<Value = GenerationRequest> {
        prop::collection::vec(prop::collection::vec("[a-z]{1,4}", 0..4), 0..4).prop_map(|lists| {
            lists.into_iter().enumerate().fold(GenerationRequest::new(), |req, (i, values)| req.with_values(format!("attr{i}"), values))
        })
    }

    proptest! {
        #[test]
        fn cardinality_matches_product_of_non_empty(request in arb_request()) {
            let non_empty: Vec<usize> = request.attributes().iter().map(|a| a.values.len()).filter(|n| *n > 0).collect();
            let expected = if non_empty.is_empty() { 0 } else { non_empty.iter().product() };
            let variants = generate(&request, &SkuContext::default(), "", &assigner());
            prop_assert_eq!(variants.len(), expected);
            prop_assert_eq!(request.expected_count(), Some(expected));
        }
    }
}
