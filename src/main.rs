//! OpenSASE Variants - back-office adapter for the variant matrix engine

use anyhow::Result;
use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use opensase_variants::domain::services::generator::{parse_values, AttributeValues};
use opensase_variants::domain::services::media::{NormalizedImage, RawImageInput};
use opensase_variants::domain::services::reconciler::reconcile_variant;
use opensase_variants::{
    resolve, total_stock, AttributeCatalog, AttributeDefinition, AttributeInstance, EngineConfig, GenerationRequest, ProductVariants,
    SkuAssigner, SkuContext, VariantError, VariantMediaPipeline, VariantRecord,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

#[derive(Clone)] pub struct AppState { pub config: Arc<EngineConfig>, pub media: Arc<VariantMediaPipeline>, pub assigner: SkuAssigner }

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = EngineConfig::from_env();
    let state = AppState { media: Arc::new(VariantMediaPipeline::from_config(&config.media)), config: Arc::new(config), assigner: SkuAssigner::default() };
    let port = state.config.port;
    tracing::info!(sku_policy = %state.config.sku_policy, "🚀 OpenSASE Variants listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app(state)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-variants"})) }))
        .route("/api/v1/catalog/resolve", post(resolve_catalog))
        .route("/api/v1/variants/generate", post(generate_variants))
        .route("/api/v1/variants/reconcile", post(reconcile_variants))
        .route("/api/v1/variants/stock", post(stock_total))
        .route("/api/v1/sku", post(assign_sku))
        .route("/api/v1/media/normalize", post(normalize_media))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

fn reject(e: VariantError) -> (StatusCode, String) {
    let status = match &e { VariantError::InvalidRequest(_) | VariantError::TooManyVariants { .. } => StatusCode::UNPROCESSABLE_ENTITY };
    (status, e.to_string())
}

fn validated<T: Validate>(body: T) -> opensase_variants::Result<T> {
    body.validate().map_err(|e| VariantError::InvalidRequest(e.to_string()))?;
    Ok(body)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CatalogRequest {
    #[serde(default)] #[validate(length(max = 50))] pub category_attributes: Vec<AttributeDefinition>,
    #[serde(default)] #[validate(length(max = 50))] pub custom_attributes: Vec<String>,
}

impl CatalogRequest { fn catalog(&self) -> AttributeCatalog { resolve(&self.category_attributes, &self.custom_attributes) } }

async fn resolve_catalog(Json(r): Json<CatalogRequest>) -> Result<Json<AttributeCatalog>, (StatusCode, String)> {
    let r = validated(r).map_err(reject)?;
    Ok(Json(r.catalog()))
}

#[derive(Debug, Serialize, Deserialize)] pub struct AttributeInput { pub attribute_name: String, #[serde(default)] pub values: Vec<String>, pub text: Option<String> }

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    pub product_id: Option<String>,
    #[serde(default)] pub sku_context: SkuContext,
    #[serde(default)] #[validate(length(max = 50))] pub category_attributes: Vec<AttributeDefinition>,
    #[serde(default)] #[validate(length(max = 50))] pub custom_attributes: Vec<String>,
    #[validate(length(max = 50))] pub attributes: Vec<AttributeInput>,
}

fn within_limit(request: &GenerationRequest, limit: usize) -> opensase_variants::Result<()> {
    if request.fits_within(limit) { return Ok(()); }
    let requested = request.expected_count().map_or_else(|| "more than usize::MAX".to_string(), |n| n.to_string());
    Err(VariantError::TooManyVariants { requested, limit })
}

#[derive(Debug, Serialize)] pub struct VariantsResponse { pub variants: Vec<VariantRecord>, pub total_stock: u64, pub fallback_skus: Vec<usize> }

async fn generate_variants(State(s): State<AppState>, Json(r): Json<GenerateRequest>) -> Result<Json<VariantsResponse>, (StatusCode, String)> {
    let r = validated(r).map_err(reject)?;
    let request: GenerationRequest = r.attributes.into_iter().map(|a| AttributeValues { values: match a.text { Some(t) => parse_values(&t), None => a.values }, attribute_name: a.attribute_name }).collect::<Vec<_>>().into();
    within_limit(&request, s.config.max_variants).map_err(reject)?;
    let mut product = match r.product_id { Some(id) => ProductVariants::new(id, r.sku_context, s.config.sku_policy), None => ProductVariants::draft(r.sku_context, s.config.sku_policy) };
    product.set_category_attributes(r.category_attributes);
    for name in &r.custom_attributes { product.add_custom_attribute(name); }
    product.regenerate(&request);
    Ok(Json(VariantsResponse { total_stock: product.total_stock(), fallback_skus: product.fallback_skus(), variants: product.into_variants() }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReconcileRequest {
    #[serde(flatten)] #[validate] pub catalog: CatalogRequest,
    #[validate(length(max = 10000))] pub variants: Vec<VariantRecord>,
}

#[derive(Debug, Serialize)] pub struct ReconcileResponse { pub variants: Vec<VariantRecord>, pub changed: usize }

async fn reconcile_variants(Json(r): Json<ReconcileRequest>) -> Result<Json<ReconcileResponse>, (StatusCode, String)> {
    let mut r = validated(r).map_err(reject)?;
    let catalog = r.catalog.catalog();
    let changed = r.variants.iter_mut().map(|v| reconcile_variant(&catalog, v)).filter(|c| *c).count();
    Ok(Json(ReconcileResponse { variants: r.variants, changed }))
}

async fn stock_total(Json(variants): Json<Vec<VariantRecord>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({"total": total_stock(&variants), "variants": variants.len()}))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SkuRequest {
    #[serde(default)] pub sku_context: SkuContext,
    #[serde(default)] #[validate(length(max = 64))] pub category_code: String,
    #[serde(default)] #[validate(length(max = 50))] pub attributes: Vec<AttributeInstance>,
}

async fn assign_sku(State(s): State<AppState>, Json(r): Json<SkuRequest>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let r = validated(r).map_err(reject)?;
    let sku = s.assigner.assign(&r.sku_context, &r.category_code, &r.attributes);
    Ok(Json(serde_json::json!({"sku": sku, "needs_correction": sku.is_fallback()})))
}

#[derive(Debug, Deserialize, Validate)] pub struct MediaRequest { #[validate(length(max = 20))] pub images: Vec<RawImageInput> }

async fn normalize_media(State(s): State<AppState>, Json(r): Json<MediaRequest>) -> Result<Json<Vec<NormalizedImage>>, (StatusCode, String)> {
    let r = validated(r).map_err(reject)?;
    Ok(Json(s.media.normalize(r.images).await))
}
