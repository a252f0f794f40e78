//! Query engine over the catalog's product sequence.
//!
//! Stateless functions: criteria filtering (logical AND, order-preserving),
//! offset/limit pagination, and the two aggregation summaries.
//!
//! # Match rules
//!
//! | Criterion | Rule |
//! |-----------|------|
//! | `dealerId`, `sku`, `mpn`, `upc`, `status` | case-sensitive equality, absent field compares as `""` |
//! | `query` | case-insensitive substring over sku, mpn, upc, productType, slug, externalRef, name and description values |
//! | `dcCode` | record has a `dc_availability` entry for the code |
//! | `dcCode` + `region` | that entry's region flag is numerically `1` |
//! | `region` alone | any DC has the region flag numerically `1` |
//!
//! An empty string criterion is treated as not supplied.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::models::{LocaleMap, ProductRecord};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

/// Bucket for records without a status in [`summarize_statuses`].
pub const UNKNOWN_STATUS: &str = "unknown";

/// Search criteria. Every field is optional; supplied fields are ANDed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub dealer_id: Option<String>,
    pub query: Option<String>,
    pub sku: Option<String>,
    pub mpn: Option<String>,
    pub upc: Option<String>,
    pub status: Option<String>,
    pub dc_code: Option<String>,
    pub region: Option<String>,
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    /// Validate caller input; out-of-range values are rejected, not clamped.
    pub fn new(offset: i64, limit: i64) -> Result<Self, CatalogError> {
        if offset < 0 {
            return Err(CatalogError::validation("offset", "must be >= 0"));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(CatalogError::validation(
                "limit",
                format!("must be between 1 and {MAX_LIMIT}"),
            ));
        }
        Ok(Self {
            offset: offset as usize,
            limit: limit as usize,
        })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT as usize,
        }
    }
}

/// One page of search results plus the pre-slice match count.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub results: Vec<Arc<ProductRecord>>,
}

fn supplied(criterion: &Option<String>) -> Option<&str> {
    criterion.as_deref().filter(|c| !c.is_empty())
}

fn exact(field: Option<&str>, criterion: &Option<String>) -> bool {
    supplied(criterion).is_none_or(|wanted| field.unwrap_or("") == wanted)
}

fn contains_ci(hay: Option<&str>, needle: &str) -> bool {
    hay.is_some_and(|h| h.to_lowercase().contains(needle))
}

fn locale_contains(map: Option<&LocaleMap>, needle: &str) -> bool {
    map.is_some_and(|m| m.values().any(|v| v.to_lowercase().contains(needle)))
}

fn text_matches(p: &ProductRecord, query: &str) -> bool {
    let needle = query.to_lowercase();
    contains_ci(Some(p.sku.as_str()), &needle)
        || contains_ci(p.mpn.as_deref(), &needle)
        || contains_ci(p.upc_ean.as_deref(), &needle)
        || contains_ci(p.product_type.as_deref(), &needle)
        || contains_ci(p.slug.as_deref(), &needle)
        || contains_ci(p.external_ref.as_deref(), &needle)
        || locale_contains(p.name.as_ref(), &needle)
        || locale_contains(p.description.as_ref(), &needle)
}

fn availability_matches(p: &ProductRecord, dc_code: Option<&str>, region: Option<&str>) -> bool {
    let dcs = p.dc_availability.as_ref();
    match (dc_code, region) {
        (None, None) => true,
        (Some(dc), None) => dcs.is_some_and(|d| d.contains_key(dc)),
        (Some(dc), Some(region)) => dcs
            .and_then(|d| d.get(dc))
            .and_then(|flags| flags.get(region))
            .is_some_and(|flag| flag.is_one()),
        (None, Some(region)) => dcs.is_some_and(|d| {
            d.values()
                .any(|flags| flags.get(region).is_some_and(|flag| flag.is_one()))
        }),
    }
}

/// Does one record satisfy every supplied criterion?
pub fn matches(p: &ProductRecord, criteria: &SearchCriteria) -> bool {
    if !exact(p.dealer_id.as_deref(), &criteria.dealer_id)
        || !exact(Some(p.sku.as_str()), &criteria.sku)
        || !exact(p.mpn.as_deref(), &criteria.mpn)
        || !exact(p.upc_ean.as_deref(), &criteria.upc)
        || !exact(p.status.as_deref(), &criteria.status)
    {
        return false;
    }

    let query = criteria.query.as_deref().map(str::trim).unwrap_or("");
    if !query.is_empty() && !text_matches(p, query) {
        return false;
    }

    availability_matches(p, supplied(&criteria.dc_code), supplied(&criteria.region))
}

/// Matching records, in their original order.
pub fn filter_products<'a>(
    products: &'a [Arc<ProductRecord>],
    criteria: &SearchCriteria,
) -> Vec<&'a Arc<ProductRecord>> {
    products.iter().filter(|p| matches(p, criteria)).collect()
}

/// Filter, then slice by `page`, reporting the pre-slice total.
pub fn search(
    products: &[Arc<ProductRecord>],
    criteria: &SearchCriteria,
    page: Page,
) -> SearchPage {
    let matched = filter_products(products, criteria);
    let total = matched.len();
    let results = matched
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .cloned()
        .collect();
    SearchPage {
        total,
        offset: page.offset,
        limit: page.limit,
        results,
    }
}

/// Count records per status; absent statuses land in `"unknown"`.
pub fn summarize_statuses(products: &[Arc<ProductRecord>]) -> IndexMap<String, usize> {
    let mut out = IndexMap::new();
    for p in products {
        let status = p.status.as_deref().unwrap_or(UNKNOWN_STATUS);
        *out.entry(status.to_string()).or_insert(0) += 1;
    }
    out
}

/// Count records per DC code present in `dc_availability`, whatever the flags.
pub fn summarize_distribution_centers(products: &[Arc<ProductRecord>]) -> IndexMap<String, usize> {
    let mut out = IndexMap::new();
    for dcs in products.iter().filter_map(|p| p.dc_availability.as_ref()) {
        for code in dcs.keys() {
            *out.entry(code.clone()).or_insert(0) += 1;
        }
    }
    out
}
