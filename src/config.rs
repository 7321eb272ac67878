//! Runtime configuration
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | PORT | 8084 | HTTP port of the back-office adapter |
//! | SKU_REGENERATION_POLICY | preserve-manual | `preserve-manual` or `always-fresh` |
//! | MAX_VARIANTS | 10000 | Largest variant matrix one generation may produce |
//! | MEDIA_MAX_CONCURRENCY | 4 | Parallel image compressions |
//! | MEDIA_JPEG_QUALITY | 85 | JPEG quality, 1-100 |
//! | MEDIA_MAX_DIMENSION | 1920 | Longest edge after downscaling, in pixels |

use std::str::FromStr;
use tracing::warn;
use crate::domain::services::sku::SkuRegenerationPolicy;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaConfig {
    pub max_concurrency: usize,
    pub jpeg_quality: u8,
    pub max_dimension: u32,
}

impl Default for MediaConfig {
    fn default() -> Self { Self { max_concurrency: 4, jpeg_quality: 85, max_dimension: 1920 } }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub port: u16,
    pub sku_policy: SkuRegenerationPolicy,
    pub max_variants: usize,
    pub media: MediaConfig,
}

impl Default for EngineConfig {
    fn default() -> Self { Self { port: 8084, sku_policy: SkuRegenerationPolicy::default(), max_variants: 10_000, media: MediaConfig::default() } }
}

impl EngineConfig {
    /// Reads the process environment; `.env` is loaded by the binary first.
    pub fn from_env() -> Self { Self::from_lookup(|key| std::env::var(key).ok()) }

    /// Unset or unparseable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let media = MediaConfig {
            max_concurrency: parse_or(&lookup, "MEDIA_MAX_CONCURRENCY", defaults.media.max_concurrency).max(1),
            jpeg_quality: parse_or(&lookup, "MEDIA_JPEG_QUALITY", defaults.media.jpeg_quality).clamp(1, 100),
            max_dimension: parse_or(&lookup, "MEDIA_MAX_DIMENSION", defaults.media.max_dimension).max(1),
        };
        Self {
            port: parse_or(&lookup, "PORT", defaults.port),
            sku_policy: parse_or(&lookup, "SKU_REGENERATION_POLICY", defaults.sku_policy),
            max_variants: parse_or(&lookup, "MAX_VARIANTS", defaults.max_variants).max(1),
            media,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring unparseable configuration value");
            default
        }),
    }
}
