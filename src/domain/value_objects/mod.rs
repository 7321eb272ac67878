//! Value Objects for the variant engine

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Attribute name reserved for the product-level brand field.
pub const RESERVED_BRAND: &str = "brand";

/// Attribute name with case-insensitive identity
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeName(String);

impl AttributeName {
    /// Trims the input; returns `None` for blank names.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() { return None; }
        Some(Self(trimmed.to_string()))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_reserved(&self) -> bool { is_reserved(&self.0) }
    pub fn matches(&self, other: &str) -> bool { same_name(&self.0, other) }
}

impl PartialEq for AttributeName {
    fn eq(&self, other: &Self) -> bool { same_name(&self.0, &other.0) }
}
impl Eq for AttributeName {}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Case-insensitive attribute identity.
pub fn same_name(a: &str, b: &str) -> bool { a.trim().to_lowercase() == b.trim().to_lowercase() }

pub fn is_reserved(name: &str) -> bool { same_name(name, RESERVED_BRAND) }

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    pub const FALLBACK_PREFIX: &'static str = "ERR-";

    /// Manually typed SKU, trimmed and upper-cased.
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.len() > 50 { return Err(SkuError::TooLong); }
        if value.chars().any(char::is_control) { return Err(SkuError::ControlCharacter); }
        Ok(Self(value))
    }
    /// Assigned SKUs are already normalized.
    pub(crate) fn assigned(value: String) -> Self { Self(value) }
    pub fn blank() -> Self { Self(String::new()) }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_blank(&self) -> bool { self.0.trim().is_empty() }
    /// SKUs produced by the degraded path need manual correction.
    pub fn is_fallback(&self) -> bool { self.0.starts_with(Self::FALLBACK_PREFIX) }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SkuError { TooLong, ControlCharacter }
impl std::error::Error for SkuError {}
impl fmt::Display for SkuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::TooLong => write!(f, "SKU too long"), Self::ControlCharacter => write!(f, "SKU contains control characters") }
    }
}

/// Non-negative decimal amount used for price and discount
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(PriceError::Negative); }
        Ok(Self(amount))
    }
    pub fn amount(&self) -> Decimal { self.0 }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Price::new(amount).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PriceError { Negative }
impl std::error::Error for PriceError {}
impl fmt::Display for PriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Amount must not be negative") }
}

/// Stock quantity of a single variant
///
/// Deserialization is lenient: form input arrives as numbers, numeric
/// strings, `null` or garbage, and anything that is not a non-negative
/// integer counts as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Stock(u32);

impl Stock {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn is_zero(&self) -> bool { self.0 == 0 }

    /// Parses free-text form input.
    pub fn parse_lenient(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(n) = raw.parse::<u32>() { return Self(n); }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() && f > 0.0 => Self(f.trunc().min(u32::MAX as f64) as u32),
            _ => Self(0),
        }
    }

    fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => match (n.as_u64(), n.as_f64()) {
                (Some(u), _) => Self(u.min(u64::from(u32::MAX)) as u32),
                (None, Some(f)) if f.is_finite() && f > 0.0 => Self(f.trunc().min(u32::MAX as f64) as u32),
                _ => Self(0),
            },
            serde_json::Value::String(s) => Self::parse_lenient(s),
            _ => Self(0),
        }
    }
}

impl<'de> Deserialize<'de> for Stock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

impl From<u32> for Stock { fn from(value: u32) -> Self { Self(value) } }
