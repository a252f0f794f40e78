//! Tool trait and registry.
//!
//! Every catalog operation is exposed as a [`Tool`]: a named, self-describing
//! function taking a JSON object and returning a JSON value. The HTTP server
//! routes `POST /tools/{name}` to the registry and the MCP bridge lists and
//! calls the same registry, so both transports expose identical behavior.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  ┌──────────────────┐ ┌───────────────┐  │
//! │  │ Built-in catalog │ │ Custom (Rust) │  │
//! │  │ load/search/...  │ │    Tools      │  │
//! │  └──────────────────┘ └───────────────┘  │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!     run_server() / run_stdio()
//! ```
//!
//! # Usage
//!
//! ```rust
//! use dealer_catalog::traits::ToolRegistry;
//!
//! let mut tools = ToolRegistry::with_builtins();
//! // tools.register(Box::new(MyTool::new()));
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::{CatalogConfig, Config};
use crate::query::{Page, SearchCriteria, DEFAULT_LIMIT, MAX_LIMIT};
use crate::service::{CatalogService, LoadRequest};

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A tool that agents can discover and call.
///
/// Tools are registered at server startup and exposed via
/// `GET /tools/list` for discovery and `POST /tools/{name}` for invocation.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use dealer_catalog::traits::{Tool, ToolContext};
///
/// pub struct CountTool;
///
/// #[async_trait]
/// impl Tool for CountTool {
///     fn name(&self) -> &str { "count_products" }
///     fn description(&self) -> &str { "Count loaded products" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({ "type": "object", "properties": {} })
///     }
///
///     async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
///         Ok(json!({ "count": ctx.catalog().len() }))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Lowercase identifier with underscores; used as the route path.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// Built-in tools are marked with `"builtin": true` in `GET /tools/list`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// Whether the tool leaves the catalog untouched. Reported to MCP
    /// clients as a tool annotation.
    fn read_only(&self) -> bool {
        true
    }

    /// JSON Schema for the parameters object.
    fn parameters_schema(&self) -> Value;

    /// Execute with a JSON object of parameters. The returned value is
    /// wrapped in `{ "result": ... }` by the HTTP server.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Shared state handed to every tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    config: Arc<Config>,
    catalog: Arc<CatalogService>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>, catalog: Arc<CatalogService>) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    /// Run a load on the blocking pool; file reads and parsing are synchronous.
    pub async fn load(&self, request: LoadRequest) -> Result<usize> {
        let catalog = Arc::clone(&self.catalog);
        let loaded = tokio::task::spawn_blocking(move || catalog.load_files(&request))
            .await
            .context("load task failed")??;
        Ok(loaded)
    }
}

/// Decode a tool's parameter object into its typed form.
pub fn decode_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| anyhow::anyhow!("invalid parameters: {e}"))
}

fn required(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("invalid {field}: must not be empty");
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DealerParams {
    dealer_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionalDealerParams {
    #[serde(default)]
    dealer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkuParams {
    sku: String,
    #[serde(default)]
    dealer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    #[serde(flatten)]
    criteria: SearchCriteria,
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

/// `load_files` arguments. Omitted dealer settings fall back to `[catalog]`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadFilesParams {
    paths: Vec<String>,
    #[serde(default)]
    dealer_id: Option<String>,
    #[serde(default)]
    infer_dealer_from_filename: Option<bool>,
    #[serde(default)]
    clear_before_load: bool,
}

impl LoadFilesParams {
    fn into_request(self, defaults: &CatalogConfig) -> LoadRequest {
        LoadRequest {
            paths: self.paths,
            dealer_id: self.dealer_id.or_else(|| defaults.dealer_id.clone()),
            infer_dealer_from_filename: self
                .infer_dealer_from_filename
                .unwrap_or(defaults.infer_dealer_from_filename),
            clear_before_load: self.clear_before_load,
        }
    }
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

fn dealer_property() -> Value {
    json!({ "type": "string", "description": "Dealer id" })
}

/// Load product files matching path patterns.
pub struct LoadFilesTool;

#[async_trait]
impl Tool for LoadFilesTool {
    fn name(&self) -> &str {
        "load_files"
    }

    fn description(&self) -> &str {
        "Load dealer product export files (JSON or JSONL, glob patterns allowed)"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn read_only(&self) -> bool {
        false
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": { "type": "array", "items": { "type": "string" }, "description": "File paths or glob patterns" },
                "dealerId": { "type": "string", "description": "Explicit dealer id for every loaded record" },
                "inferDealerFromFilename": { "type": "boolean", "description": "Take the dealer from products-<dealer>-* file names (defaults to the server setting, normally true)" },
                "clearBeforeLoad": { "type": "boolean", "default": false }
            },
            "required": ["paths"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let params: LoadFilesParams = decode_params(params)?;
        let request = params.into_request(&ctx.config().catalog);
        let loaded = ctx.load(request).await?;
        Ok(json!({ "loaded": loaded, "total": ctx.catalog().len() }))
    }
}

/// Reset the catalog to empty.
pub struct ClearCatalogTool;

#[async_trait]
impl Tool for ClearCatalogTool {
    fn name(&self) -> &str {
        "clear_catalog"
    }

    fn description(&self) -> &str {
        "Remove every loaded product"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn read_only(&self) -> bool {
        false
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        ctx.catalog().clear();
        Ok(json!({ "cleared": true }))
    }
}

pub struct ListDealersTool;

#[async_trait]
impl Tool for ListDealersTool {
    fn name(&self) -> &str {
        "list_dealers"
    }

    fn description(&self) -> &str {
        "List dealer ids in first-seen order"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        Ok(json!({ "dealers": ctx.catalog().list_dealers() }))
    }
}

pub struct DealerInfoTool;

#[async_trait]
impl Tool for DealerInfoTool {
    fn name(&self) -> &str {
        "get_dealer_info"
    }

    fn description(&self) -> &str {
        "Product count, status counts, distribution centers and source files for one dealer"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "dealerId": dealer_property() },
            "required": ["dealerId"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let params: DealerParams = decode_params(params)?;
        required(&params.dealer_id, "dealerId")?;
        Ok(serde_json::to_value(ctx.catalog().dealer_summary(&params.dealer_id))?)
    }
}

pub struct DealerProductCountTool;

#[async_trait]
impl Tool for DealerProductCountTool {
    fn name(&self) -> &str {
        "get_dealer_product_count"
    }

    fn description(&self) -> &str {
        "Number of products loaded for one dealer"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "dealerId": dealer_property() },
            "required": ["dealerId"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let params: DealerParams = decode_params(params)?;
        required(&params.dealer_id, "dealerId")?;
        Ok(serde_json::to_value(
            ctx.catalog().dealer_product_count(&params.dealer_id),
        )?)
    }
}

pub struct ProductBySkuTool;

#[async_trait]
impl Tool for ProductBySkuTool {
    fn name(&self) -> &str {
        "get_product_by_sku"
    }

    fn description(&self) -> &str {
        "Look up the first product with a SKU, optionally scoped to a dealer"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sku": { "type": "string", "description": "Product SKU" },
                "dealerId": dealer_property()
            },
            "required": ["sku"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let params: SkuParams = decode_params(params)?;
        required(&params.sku, "sku")?;
        let product = ctx
            .catalog()
            .product_by_sku(&params.sku, params.dealer_id.as_deref());
        Ok(json!({ "product": product }))
    }
}

pub struct SearchProductsTool;

#[async_trait]
impl Tool for SearchProductsTool {
    fn name(&self) -> &str {
        "search_products"
    }

    fn description(&self) -> &str {
        "Filter products by dealer, text, identifiers, status and DC/region availability"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dealerId": dealer_property(),
                "query": { "type": "string", "description": "Case-insensitive text across identifiers, names and descriptions" },
                "sku": { "type": "string" },
                "mpn": { "type": "string" },
                "upc": { "type": "string" },
                "status": { "type": "string" },
                "dcCode": { "type": "string", "description": "Distribution center code" },
                "region": { "type": "string", "description": "Region code, e.g. US or CA" },
                "offset": { "type": "integer", "minimum": 0, "default": 0 },
                "limit": { "type": "integer", "minimum": 1, "maximum": MAX_LIMIT, "default": DEFAULT_LIMIT }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let params: SearchParams = decode_params(params)?;
        let page = Page::new(params.offset, params.limit)?;
        Ok(serde_json::to_value(ctx.catalog().search(&params.criteria, page))?)
    }
}

pub struct DistributionCentersTool;

#[async_trait]
impl Tool for DistributionCentersTool {
    fn name(&self) -> &str {
        "get_distribution_centers"
    }

    fn description(&self) -> &str {
        "Count products per distribution center, optionally for one dealer"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "dealerId": dealer_property() }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let params: OptionalDealerParams = decode_params(params)?;
        let counts = ctx
            .catalog()
            .distribution_center_counts(params.dealer_id.as_deref());
        Ok(json!({ "distributionCenters": counts }))
    }
}

pub struct SummarizeCatalogTool;

#[async_trait]
impl Tool for SummarizeCatalogTool {
    fn name(&self) -> &str {
        "summarize_catalog"
    }

    fn description(&self) -> &str {
        "Totals by dealer, status and distribution center plus sample SKUs"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        Ok(serde_json::to_value(ctx.catalog().catalog_summary())?)
    }
}

pub struct LoadedFilesTool;

#[async_trait]
impl Tool for LoadedFilesTool {
    fn name(&self) -> &str {
        "list_loaded_files"
    }

    fn description(&self) -> &str {
        "Source files that contributed products, grouped by dealer"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        Ok(json!({ "files": ctx.catalog().loaded_files() }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry for built-in and custom tools.
///
/// Use [`ToolRegistry::with_builtins`] for a registry pre-loaded with every
/// catalog operation, then optionally [`register`](ToolRegistry::register)
/// custom ones.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(LoadFilesTool));
        registry.register(Box::new(ClearCatalogTool));
        registry.register(Box::new(ListDealersTool));
        registry.register(Box::new(DealerInfoTool));
        registry.register(Box::new(DealerProductCountTool));
        registry.register(Box::new(ProductBySkuTool));
        registry.register(Box::new(SearchProductsTool));
        registry.register(Box::new(DistributionCentersTool));
        registry.register(Box::new(SummarizeCatalogTool));
        registry.register(Box::new(LoadedFilesTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
