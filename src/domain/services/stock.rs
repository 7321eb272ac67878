//! Derived stock totals

use crate::domain::aggregates::variant::VariantRecord;

/// Sum of every variant's stock. Always derived, never stored.
pub fn total(variants: &[VariantRecord]) -> u64 {
    variants.iter().map(|v| u64::from(v.stock.value())).sum()
}
