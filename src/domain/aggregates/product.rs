//! Product Variants Aggregate
//!
//! Owns a product's attribute catalog state and its variant list. All
//! mutation of the variant list in the back-office form goes through here,
//! and every derived figure (stock total, SKUs needing correction) is
//! computed from the current records on read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;
use crate::domain::aggregates::catalog::{AttributeCatalog, AttributeDefinition, CatalogState};
use crate::domain::aggregates::variant::{AttributeInstance, VariantImage, VariantRecord, VariantStatus};
use crate::domain::events::{DomainEvent, VariantEvent};
use crate::domain::services::generator::{self, GenerationRequest};
use crate::domain::services::reconciler;
use crate::domain::services::sku::{Clock, SkuAssigner, SkuContext, SkuRegenerationPolicy, SystemClock};
use crate::domain::services::stock;
use crate::domain::value_objects::{same_name, Price, Sku, SkuError, Stock};

#[derive(Clone)]
pub struct ProductVariants<C: Clock = SystemClock> {
    product_id: String,
    sku_context: SkuContext,
    policy: SkuRegenerationPolicy,
    catalog_state: CatalogState,
    /// Catalog the variants were last reconciled against.
    synced_catalog: Option<AttributeCatalog>,
    variants: Vec<VariantRecord>,
    assigner: SkuAssigner<C>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

impl ProductVariants<SystemClock> {
    pub fn new(product_id: impl Into<String>, sku_context: SkuContext, policy: SkuRegenerationPolicy) -> Self {
        Self::with_clock(product_id, sku_context, policy, SystemClock)
    }

    /// Product not yet persisted; gets a time-ordered draft id.
    pub fn draft(sku_context: SkuContext, policy: SkuRegenerationPolicy) -> Self {
        Self::new(Uuid::now_v7().to_string(), sku_context, policy)
    }
}

impl<C: Clock> ProductVariants<C> {
    pub fn with_clock(product_id: impl Into<String>, sku_context: SkuContext, policy: SkuRegenerationPolicy, clock: C) -> Self {
        Self {
            product_id: product_id.into(), sku_context, policy, catalog_state: CatalogState::default(),
            synced_catalog: None, variants: vec![], assigner: SkuAssigner::with_clock(clock),
            updated_at: Utc::now(), events: vec![],
        }
    }

    /// Existing records from the persistence collaborator. They are
    /// reconciled on the next `sync_attributes`.
    pub fn with_variants(mut self, variants: Vec<VariantRecord>) -> Self {
        self.variants = variants;
        self.synced_catalog = None;
        self
    }

    pub fn product_id(&self) -> &str { &self.product_id }
    pub fn policy(&self) -> SkuRegenerationPolicy { self.policy }
    pub fn sku_context(&self) -> &SkuContext { &self.sku_context }
    pub fn catalog_state(&self) -> &CatalogState { &self.catalog_state }
    pub fn catalog(&self) -> AttributeCatalog { self.catalog_state.catalog() }
    pub fn variants(&self) -> &[VariantRecord] { &self.variants }
    pub fn variant(&self, index: usize) -> Option<&VariantRecord> { self.variants.get(index) }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn into_variants(self) -> Vec<VariantRecord> { self.variants }

    pub fn total_stock(&self) -> u64 { stock::total(&self.variants) }

    /// Indices of variants whose SKU fell back to `ERR-` and needs correcting.
    pub fn fallback_skus(&self) -> Vec<usize> {
        self.variants.iter().enumerate().filter(|(_, v)| v.sku.is_fallback()).map(|(i, _)| i).collect()
    }

    pub fn set_category_attributes(&mut self, attributes: Vec<AttributeDefinition>) {
        self.catalog_state.set_category_attributes(attributes);
        self.touch();
    }

    pub fn set_category_code(&mut self, category_code: impl Into<String>) {
        self.sku_context.category_code = category_code.into();
        self.touch();
    }

    /// Blank, reserved or duplicate names are silently ignored.
    pub fn add_custom_attribute(&mut self, name: &str) -> bool {
        if !self.catalog_state.add_custom(name) { return false; }
        self.touch();
        self.raise_event(DomainEvent::Variant(VariantEvent::CustomAttributeAdded { product_id: self.product_id.clone(), name: name.trim().to_string() }));
        true
    }

    pub fn remove_custom_attribute(&mut self, name: &str) -> bool {
        if !self.catalog_state.remove_custom(name) { return false; }
        self.touch();
        self.raise_event(DomainEvent::Variant(VariantEvent::CustomAttributeRemoved { product_id: self.product_id.clone(), name: name.trim().to_string() }));
        true
    }

    /// Reconciles every variant, but only when the catalog differs from the
    /// one last synced. Reconciled variants go through the SKU regeneration
    /// policy like a manual edit. Returns whether any variant changed.
    pub fn sync_attributes(&mut self) -> bool {
        let catalog = self.catalog();
        if self.synced_catalog.as_ref() == Some(&catalog) { return false; }
        let mut changed = 0;
        let mut regenerated = vec![];
        for (index, variant) in self.variants.iter_mut().enumerate() {
            let before = variant.attributes.clone();
            if !reconciler::reconcile_variant(&catalog, variant) { continue; }
            changed += 1;
            if self.policy.should_regenerate(&variant.sku, &before, &variant.attributes) {
                let previous = std::mem::replace(&mut variant.sku, self.assigner.assign(&self.sku_context, "", &variant.attributes));
                regenerated.push(VariantEvent::SkuRegenerated { product_id: self.product_id.clone(), index, previous, sku: variant.sku.clone() });
            }
        }
        debug!(product_id = %self.product_id, attributes = catalog.len(), changed, regenerated = regenerated.len(), "Synced variant attributes");
        self.synced_catalog = Some(catalog);
        if changed == 0 { return false; }
        self.touch();
        self.raise_event(DomainEvent::Variant(VariantEvent::AttributesReconciled { product_id: self.product_id.clone(), changed }));
        for event in regenerated { self.raise_event(DomainEvent::Variant(event)); }
        true
    }

    /// Replaces every variant with fresh skeletons for the request. Prices,
    /// stock, SKUs and images entered so far are discarded; confirming that
    /// with the seller is the caller's job.
    pub fn regenerate(&mut self, request: &GenerationRequest) -> usize {
        let catalog = self.catalog();
        let variants = generator::generate_for_catalog(&catalog, request, &self.sku_context, "", &self.assigner);
        let replaced = std::mem::replace(&mut self.variants, variants).len();
        self.synced_catalog = Some(catalog);
        self.touch();
        let count = self.variants.len();
        self.raise_event(DomainEvent::Variant(VariantEvent::MatrixGenerated { product_id: self.product_id.clone(), count, replaced }));
        count
    }

    /// Adds one variant aligned to the current catalog. Non-blank values in
    /// `values` count as explicitly selected.
    pub fn append_variant(&mut self, values: Vec<AttributeInstance>) -> usize {
        let catalog = self.catalog();
        let selected: Vec<AttributeInstance> = values.iter().filter(|a| !a.is_blank()).cloned().collect();
        let attributes = reconciler::reconcile_attributes(&catalog, &values, &selected);
        let sku = self.assigner.assign(&self.sku_context, "", &attributes);
        let mut variant = VariantRecord::skeleton(attributes, sku.clone());
        variant.selected_attributes = selected.into_iter().filter(|s| variant.attributes.iter().any(|a| same_name(&a.key, &s.key))).collect();
        self.variants.push(variant);
        let index = self.variants.len() - 1;
        self.touch();
        self.raise_event(DomainEvent::Variant(VariantEvent::VariantAppended { product_id: self.product_id.clone(), index, sku }));
        index
    }

    pub fn remove_variant(&mut self, index: usize) -> Result<VariantRecord, ProductVariantsError> {
        if index >= self.variants.len() { return Err(ProductVariantsError::VariantNotFound(index)); }
        let removed = self.variants.remove(index);
        self.touch();
        self.raise_event(DomainEvent::Variant(VariantEvent::VariantRemoved { product_id: self.product_id.clone(), index, sku: removed.sku.clone() }));
        Ok(removed)
    }

    /// Sets one attribute value and applies the SKU regeneration policy.
    /// Returns whether the SKU was regenerated.
    pub fn set_attribute_value(&mut self, index: usize, key: &str, value: &str) -> Result<bool, ProductVariantsError> {
        let variant = self.variants.get_mut(index).ok_or(ProductVariantsError::VariantNotFound(index))?;
        let before = variant.attributes.clone();
        let instance = variant.attributes.iter_mut().find(|a| same_name(&a.key, key))
            .ok_or_else(|| ProductVariantsError::UnknownAttribute(key.to_string()))?;
        instance.value = value.trim().to_string();
        let updated = instance.clone();

        variant.selected_attributes.retain(|s| !same_name(&s.key, &updated.key));
        if !updated.is_blank() { variant.selected_attributes.push(updated); }

        let regenerate = self.policy.should_regenerate(&variant.sku, &before, &variant.attributes);
        if regenerate {
            let previous = std::mem::replace(&mut variant.sku, self.assigner.assign(&self.sku_context, "", &variant.attributes));
            debug!(index, policy = %self.policy, previous = %previous, sku = %variant.sku, "Regenerated SKU");
            let sku = variant.sku.clone();
            self.raise_event(DomainEvent::Variant(VariantEvent::SkuRegenerated { product_id: self.product_id.clone(), index, previous, sku }));
        }
        self.touch();
        Ok(regenerate)
    }

    /// Manual SKU entry. A blank entry is allowed and is filled in on the
    /// next attribute change.
    pub fn set_sku(&mut self, index: usize, raw: &str) -> Result<(), ProductVariantsError> {
        let sku = Sku::new(raw).map_err(ProductVariantsError::InvalidSku)?;
        self.variant_mut(index)?.sku = sku;
        self.touch();
        Ok(())
    }

    pub fn set_price(&mut self, index: usize, amount: Decimal) -> Result<(), ProductVariantsError> {
        let price = Price::new(amount).map_err(|_| ProductVariantsError::NegativeAmount)?;
        self.variant_mut(index)?.price = price;
        self.touch();
        Ok(())
    }

    pub fn set_discount(&mut self, index: usize, amount: Decimal) -> Result<(), ProductVariantsError> {
        let discount = Price::new(amount).map_err(|_| ProductVariantsError::NegativeAmount)?;
        self.variant_mut(index)?.discount = discount;
        self.touch();
        Ok(())
    }

    pub fn set_stock(&mut self, index: usize, stock: u32) -> Result<(), ProductVariantsError> {
        self.variant_mut(index)?.stock = Stock::new(stock);
        self.touch();
        Ok(())
    }

    pub fn set_status(&mut self, index: usize, status: VariantStatus) -> Result<(), ProductVariantsError> {
        self.variant_mut(index)?.status = status;
        self.touch();
        Ok(())
    }

    /// Replaces a variant's gallery; positions follow the given order.
    pub fn set_images(&mut self, index: usize, images: Vec<VariantImage>) -> Result<(), ProductVariantsError> {
        let variant = self.variant_mut(index)?;
        variant.images = images;
        renumber(&mut variant.images);
        self.touch();
        Ok(())
    }

    /// Appends an image to a variant's gallery and returns its position.
    pub fn attach_image(&mut self, index: usize, image: VariantImage) -> Result<u32, ProductVariantsError> {
        let variant = self.variant_mut(index)?;
        variant.images.push(image);
        renumber(&mut variant.images);
        let position = (variant.images.len() - 1) as u32;
        self.touch();
        Ok(position)
    }

    pub fn remove_image(&mut self, index: usize, position: u32) -> Result<VariantImage, ProductVariantsError> {
        let variant = self.variant_mut(index)?;
        let at = variant.images.iter().position(|i| i.position == position)
            .ok_or(ProductVariantsError::ImageNotFound { index, position })?;
        let removed = variant.images.remove(at);
        renumber(&mut variant.images);
        self.touch();
        Ok(removed)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn variant_mut(&mut self, index: usize) -> Result<&mut VariantRecord, ProductVariantsError> {
        self.variants.get_mut(index).ok_or(ProductVariantsError::VariantNotFound(index))
    }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn renumber(images: &mut [VariantImage]) {
    for (position, image) in images.iter_mut().enumerate() { image.position = position as u32; }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductVariantsError { VariantNotFound(usize), UnknownAttribute(String), InvalidSku(SkuError), NegativeAmount, ImageNotFound { index: usize, position: u32 } }
impl std::error::Error for ProductVariantsError {}
impl std::fmt::Display for ProductVariantsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VariantNotFound(i) => write!(f, "Variant {i} not found"),
            Self::UnknownAttribute(k) => write!(f, "Unknown attribute: {k}"),
            Self::InvalidSku(e) => write!(f, "Invalid SKU: {e}"),
            Self::NegativeAmount => write!(f, "Amount must not be negative"),
            Self::ImageNotFound { index, position } => write!(f, "Variant {index} has no image at position {position}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::sku::FixedClock;
    use crate::domain::value_objects::AttributeName;

    fn defs(names: &[&str]) -> Vec<AttributeDefinition> {
        names.iter().filter_map(|n| AttributeName::new(*n)).map(AttributeDefinition::predefined).collect()
    }

    fn product(policy: SkuRegenerationPolicy) -> ProductVariants<FixedClock> {
        let mut p = ProductVariants::with_clock("P1", SkuContext::new("seller042", "tshirts"), policy, FixedClock(1_700_000_001_234));
        p.set_category_attributes(defs(&["Color", "Size", "Brand"]));
        p
    }

    fn color_size() -> GenerationRequest {
        GenerationRequest::new().with_free_text("Color", "Red, Blue").with_free_text("Size", "S,M,L")
    }

    #[test]
    fn test_regenerate_replaces_variants() {
        let mut p = product(SkuRegenerationPolicy::PreserveManual);
        assert_eq!(p.regenerate(&color_size()), 6);
        p.set_stock(0, 5).unwrap();
        p.set_price(0, Decimal::new(1999, 2)).unwrap();
        assert_eq!(p.total_stock(), 5);
        assert_eq!(p.regenerate(&GenerationRequest::new().with_values("Color", ["Green"])), 1);
        assert_eq!(p.total_stock(), 0);
        assert_eq!(p.variants()[0].attributes, vec![AttributeInstance::new("Color", "Green"), AttributeInstance::empty("Size")]);
        assert_eq!(p.variants()[0].sku.as_str(), "042-TSH-GRE-1234");
        let events = p.take_events();
        assert!(matches!(events.last(), Some(DomainEvent::Variant(VariantEvent::MatrixGenerated { count: 1, replaced: 6, .. }))));
    }

    #[test]
    fn test_sync_runs_once_per_catalog_change() {
        let mut p = product(SkuRegenerationPolicy::PreserveManual);
        p.regenerate(&color_size());
        assert!(!p.sync_attributes());
        assert!(p.add_custom_attribute("Material"));
        assert!(p.sync_attributes());
        assert!(!p.sync_attributes());
        assert!(p.variants().iter().all(|v| v.value_of("Material") == Some("")));

        assert!(p.remove_custom_attribute("material"));
        assert!(p.sync_attributes());
        assert!(p.variants().iter().all(|v| v.value_of("Material").is_none()));
    }

    #[test]
    fn test_selected_values_survive_catalog_removal() {
        let mut p = product(SkuRegenerationPolicy::PreserveManual);
        p.add_custom_attribute("Fit");
        p.sync_attributes();
        let i = p.append_variant(vec![AttributeInstance::new("Color", "Red")]);
        p.set_attribute_value(i, "fit", "Slim").unwrap();
        p.append_variant(vec![AttributeInstance::new("Color", "Blue")]);
        p.remove_custom_attribute("Fit");
        assert!(p.sync_attributes());
        assert_eq!(p.variants()[0].value_of("Fit"), Some("Slim"));
        assert_eq!(p.variants()[1].value_of("Fit"), None);
    }

    #[test]
    fn test_loaded_variants_reconciled_on_first_sync() {
        let legacy = VariantRecord::skeleton(vec![AttributeInstance::new("Brand", "Acme"), AttributeInstance::new("Size", "M")], Sku::new("OLD-1").unwrap());
        let mut p = product(SkuRegenerationPolicy::PreserveManual).with_variants(vec![legacy]);
        assert!(p.sync_attributes());
        assert_eq!(p.variants()[0].attributes, vec![AttributeInstance::empty("Color"), AttributeInstance::new("Size", "M")]);
        assert_eq!(p.variants()[0].sku.as_str(), "OLD-1");
    }

    #[test]
    fn test_always_fresh_regenerates_on_sync() {
        let legacy = VariantRecord::skeleton(vec![AttributeInstance::new("Color", "Red"), AttributeInstance::new("Fit", "Slim")], Sku::new("OLD-2").unwrap());
        let untouched = VariantRecord::skeleton(vec![AttributeInstance::new("Color", "Blue"), AttributeInstance::empty("Size")], Sku::new("OLD-3").unwrap());
        let mut p = product(SkuRegenerationPolicy::AlwaysFresh).with_variants(vec![legacy, untouched]);
        assert!(p.sync_attributes());
        assert_eq!(p.variants()[0].attributes, vec![AttributeInstance::new("Color", "Red"), AttributeInstance::empty("Size")]);
        assert_eq!(p.variants()[0].sku.as_str(), "042-TSH-RED-1234");
        assert_eq!(p.variants()[1].sku.as_str(), "OLD-3");
        let events = p.take_events();
        assert!(matches!(events.last(), Some(DomainEvent::Variant(VariantEvent::SkuRegenerated { index: 0, .. }))));

        // Adding an attribute only appends blanks, which leaves the combination alone.
        p.add_custom_attribute("Material");
        assert!(p.sync_attributes());
        assert_eq!(p.variants()[0].sku.as_str(), "042-TSH-RED-1234");
        assert!(!p.take_events().iter().any(|e| matches!(e, DomainEvent::Variant(VariantEvent::SkuRegenerated { .. }))));
    }

    #[test]
    fn test_image_edits() {
        let mut p = product(SkuRegenerationPolicy::PreserveManual);
        p.regenerate(&color_size());
        let image = |url: &str| VariantImage { url: url.into(), alt: None, position: 99 };
        p.set_images(0, vec![image("a.jpg"), image("b.jpg")]).unwrap();
        assert_eq!(p.variants()[0].images.iter().map(|i| i.position).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(p.attach_image(0, image("c.jpg")), Ok(2));
        assert_eq!(p.remove_image(0, 0).unwrap().url, "a.jpg");
        assert_eq!(p.variants()[0].images, vec![
            VariantImage { url: "b.jpg".into(), alt: None, position: 0 },
            VariantImage { url: "c.jpg".into(), alt: None, position: 1 },
        ]);
        assert_eq!(p.remove_image(0, 5), Err(ProductVariantsError::ImageNotFound { index: 0, position: 5 }));
        assert_eq!(p.attach_image(9, image("d.jpg")), Err(ProductVariantsError::VariantNotFound(9)));
        assert_eq!(p.set_images(9, vec![]), Err(ProductVariantsError::VariantNotFound(9)));
        assert!(p.variants()[1].images.is_empty());
    }

    #[test]
    fn test_preserve_manual_keeps_typed_sku() {
        let mut p = product(SkuRegenerationPolicy::PreserveManual);
        p.regenerate(&color_size());
        p.set_sku(0, "my-shirt-01").unwrap();
        assert!(!p.set_attribute_value(0, "Color", "Black").unwrap());
        assert_eq!(p.variants()[0].sku.as_str(), "MY-SHIRT-01");

        p.set_sku(1, "  ").unwrap();
        assert!(p.set_attribute_value(1, "Color", "Black").unwrap());
        assert_eq!(p.variants()[1].sku.as_str(), "042-TSH-BLA-1234");
    }

    #[test]
    fn test_always_fresh_overwrites_typed_sku() {
        let mut p = product(SkuRegenerationPolicy::AlwaysFresh);
        p.regenerate(&color_size());
        p.set_sku(0, "my-shirt-01").unwrap();
        assert!(!p.set_attribute_value(0, "Color", "Red").unwrap());
        assert_eq!(p.variants()[0].sku.as_str(), "MY-SHIRT-01");
        assert!(p.set_attribute_value(0, "Color", "White").unwrap());
        assert_eq!(p.variants()[0].sku.as_str(), "042-TSH-WHI-1234");
        let events = p.take_events();
        assert!(matches!(events.last(), Some(DomainEvent::Variant(VariantEvent::SkuRegenerated { index: 0, .. }))));
    }

    #[test]
    fn test_edit_errors() {
        let mut p = product(SkuRegenerationPolicy::PreserveManual);
        p.regenerate(&color_size());
        assert_eq!(p.set_stock(9, 1), Err(ProductVariantsError::VariantNotFound(9)));
        assert_eq!(p.set_attribute_value(0, "Weight", "1kg"), Err(ProductVariantsError::UnknownAttribute("Weight".into())));
        assert_eq!(p.set_price(0, Decimal::new(-5, 0)), Err(ProductVariantsError::NegativeAmount));
        assert_eq!(p.set_sku(0, &"X".repeat(60)), Err(ProductVariantsError::InvalidSku(SkuError::TooLong)));
        assert!(p.remove_variant(6).is_err());
        assert_eq!(p.remove_variant(5).unwrap().value_of("Size"), Some("L"));
        assert_eq!(p.variants().len(), 5);
    }

    #[test]
    fn test_fallback_skus_flagged() {
        let mut p = ProductVariants::with_clock("P2", SkuContext::new("bad\u{1}id", "x"), SkuRegenerationPolicy::PreserveManual, FixedClock(42));
        p.append_variant(vec![]);
        p.set_status(0, VariantStatus::Inactive).unwrap();
        assert_eq!(p.variants()[0].sku.as_str(), "ERR-0042");
        assert_eq!(p.fallback_skus(), vec![0]);
    }

    #[test]
    fn test_draft_has_id() {
        let p = ProductVariants::draft(SkuContext::default(), SkuRegenerationPolicy::default());
        assert!(Uuid::parse_str(p.product_id()).is_ok());
        assert_eq!(p.total_stock(), 0);
    }
}
