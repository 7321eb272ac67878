//! SKU assignment
//!
//! SKUs have the shape `{seller}-{category}-{variant}-{time}`:
//!
//! - seller: last 3 characters of the seller id, `UNK` when absent
//! - category: first 3 characters of the category code upper-cased, `UNK` when absent
//! - variant: non-empty attribute values joined with `-`, whitespace removed,
//!   upper-cased and cut to 3 characters, `DEF` when nothing is left
//! - time: last 4 digits of the millisecond timestamp
//!
//! Assignment never fails. Malformed input degrades to `ERR-{time}`, which
//! callers flag for manual correction. The 3-character variant segment means
//! distinct combinations can share a segment (`Red/S` and `Red/M` both give
//! `RED`); uniqueness is only encouraged by the time suffix.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use crate::domain::aggregates::variant::AttributeInstance;
use crate::domain::value_objects::Sku;

const UNKNOWN: &str = "UNK";
const DEFAULT_VARIANT: &str = "DEF";
const SEGMENT_LEN: usize = 3;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuContext {
    #[serde(default)]
    pub seller_id: String,
    #[serde(default)]
    pub category_code: String,
}

impl SkuContext {
    pub fn new(seller_id: impl Into<String>, category_code: impl Into<String>) -> Self {
        Self { seller_id: seller_id.into(), category_code: category_code.into() }
    }
}

/// Millisecond time source for the SKU suffix.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 { Utc::now().timestamp_millis() }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 { self.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentError { ControlCharacter(&'static str) }
impl std::error::Error for SegmentError {}
impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::ControlCharacter(segment) => write!(f, "control character in {segment} segment input") }
    }
}

/// When an existing variant gets a new SKU after its attribute values change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkuRegenerationPolicy {
    /// Only fill in a blank SKU; manual SKUs are never overwritten.
    #[default]
    PreserveManual,
    /// Any change to the attribute combination replaces the SKU.
    AlwaysFresh,
}

impl SkuRegenerationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self { Self::PreserveManual => "preserve-manual", Self::AlwaysFresh => "always-fresh" }
    }

    /// A blank SKU is always filled in. Beyond that, `AlwaysFresh` regenerates
    /// whenever the combination differs from `before`.
    pub fn should_regenerate(&self, current: &Sku, before: &[AttributeInstance], after: &[AttributeInstance]) -> bool {
        if current.is_blank() { return true; }
        match self {
            Self::PreserveManual => false,
            Self::AlwaysFresh => combination_key(before) != combination_key(after),
        }
    }
}

impl fmt::Display for SkuRegenerationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SkuRegenerationPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "preserve-manual" => Ok(Self::PreserveManual),
            "always-fresh" => Ok(Self::AlwaysFresh),
            other => Err(format!("unknown SKU regeneration policy: {other}")),
        }
    }
}

fn combination_key(attributes: &[AttributeInstance]) -> Vec<(String, String)> {
    let mut key: Vec<_> = attributes.iter().filter(|a| !a.is_blank())
        .map(|a| (a.key.trim().to_lowercase(), a.value.trim().to_string())).collect();
    key.sort();
    key
}

#[derive(Clone)]
pub struct SkuAssigner<C: Clock = SystemClock> { clock: C }

impl Default for SkuAssigner<SystemClock> {
    fn default() -> Self { Self { clock: SystemClock } }
}

impl<C: Clock> SkuAssigner<C> {
    pub fn with_clock(clock: C) -> Self { Self { clock } }

    /// A non-empty `category_code` takes precedence over the context's.
    pub fn assign(&self, context: &SkuContext, category_code: &str, attribute_values: &[AttributeInstance]) -> Sku {
        let millis = self.clock.now_millis();
        let time = time_segment(millis);
        let category = if category_code.trim().is_empty() { context.category_code.as_str() } else { category_code };
        match compose(&context.seller_id, category, attribute_values, &time) {
            Ok(sku) => {
                debug!(sku = %sku, "Assigned SKU");
                Sku::assigned(sku)
            }
            Err(e) => {
                warn!(error = %e, seller_id = %context.seller_id, "SKU assignment degraded to fallback");
                Sku::assigned(format!("{}{time}", Sku::FALLBACK_PREFIX))
            }
        }
    }
}

fn compose(seller_id: &str, category_code: &str, attribute_values: &[AttributeInstance], time: &str) -> Result<String, SegmentError> {
    let user = seller_segment(seller_id)?;
    let category = category_segment(category_code)?;
    let variant = variant_segment(attribute_values)?;
    Ok(format!("{user}-{category}-{variant}-{time}"))
}

fn reject_control(input: &str, segment: &'static str) -> Result<(), SegmentError> {
    if input.chars().any(char::is_control) { return Err(SegmentError::ControlCharacter(segment)); }
    Ok(())
}

fn seller_segment(seller_id: &str) -> Result<String, SegmentError> {
    reject_control(seller_id, "seller")?;
    let seller_id = seller_id.trim();
    if seller_id.is_empty() { return Ok(UNKNOWN.to_string()); }
    let chars: Vec<char> = seller_id.chars().collect();
    Ok(chars[chars.len().saturating_sub(SEGMENT_LEN)..].iter().collect())
}

fn category_segment(category_code: &str) -> Result<String, SegmentError> {
    reject_control(category_code, "category")?;
    let category_code = category_code.trim();
    if category_code.is_empty() { return Ok(UNKNOWN.to_string()); }
    Ok(category_code.chars().take(SEGMENT_LEN).collect::<String>().to_uppercase())
}

fn variant_segment(attribute_values: &[AttributeInstance]) -> Result<String, SegmentError> {
    let values: Vec<&str> = attribute_values.iter().map(|a| a.value.trim()).filter(|v| !v.is_empty()).collect();
    for value in &values { reject_control(value, "variant")?; }
    let joined: String = values.join("-").chars().filter(|c| !c.is_whitespace()).collect();
    let segment: String = joined.to_uppercase().chars().take(SEGMENT_LEN).collect();
    Ok(if segment.is_empty() { DEFAULT_VARIANT.to_string() } else { segment })
}

fn time_segment(millis: i64) -> String { format!("{:04}", millis.rem_euclid(10_000)) }
