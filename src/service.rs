//! Catalog service: the operation facade shared by the CLI, tools and servers.
//!
//! Owns the [`Catalog`] behind one read/write lock. Loads take the write
//! lock once per parsed file; every query runs under a read lock and so sees
//! a consistent point-in-time view.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::loader::{self, LoadOptions};
use crate::models::ProductRecord;
use crate::query::{self, Page, SearchCriteria, SearchPage};

const SAMPLE_SKU_COUNT: usize = 10;

fn default_true() -> bool {
    true
}

/// Arguments of a load call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    pub paths: Vec<String>,
    #[serde(default)]
    pub dealer_id: Option<String>,
    #[serde(default = "default_true")]
    pub infer_dealer_from_filename: bool,
    #[serde(default)]
    pub clear_before_load: bool,
}

impl LoadRequest {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            paths,
            dealer_id: None,
            infer_dealer_from_filename: true,
            clear_before_load: false,
        }
    }

    fn options(&self) -> LoadOptions {
        LoadOptions {
            dealer_id: self.dealer_id.clone(),
            infer_dealer_from_filename: self.infer_dealer_from_filename,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerSummary {
    pub dealer_id: String,
    pub product_count: usize,
    pub status_counts: IndexMap<String, usize>,
    pub distribution_centers: Vec<String>,
    pub source_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerProductCount {
    pub dealer_id: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub total_products: usize,
    pub by_dealer: IndexMap<String, usize>,
    pub by_status: IndexMap<String, usize>,
    pub by_dc: IndexMap<String, usize>,
    pub sample_skus: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CatalogService {
    catalog: RwLock<Catalog>,
}

impl CatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Expand, parse and append. Returns the number of records this call added.
    pub fn load_files(&self, request: &LoadRequest) -> Result<usize, CatalogError> {
        if request.paths.iter().all(|p| p.trim().is_empty()) {
            return Err(CatalogError::validation(
                "paths",
                "at least one path pattern is required",
            ));
        }
        if request.clear_before_load {
            self.clear();
        }
        loader::load_files(&self.catalog, &request.paths, &request.options())
    }

    pub fn clear(&self) {
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!("catalog cleared");
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn list_dealers(&self) -> Vec<String> {
        self.read().dealers().map(str::to_string).collect()
    }

    /// Counts and provenance for one dealer. An unknown dealer yields a
    /// zero-count summary rather than an error.
    pub fn dealer_summary(&self, dealer_id: &str) -> DealerSummary {
        let catalog = self.read();
        let products = catalog.dealer_products(dealer_id);
        DealerSummary {
            dealer_id: dealer_id.to_string(),
            product_count: products.len(),
            status_counts: query::summarize_statuses(products),
            distribution_centers: query::summarize_distribution_centers(products)
                .into_keys()
                .collect(),
            source_files: catalog
                .dealer_files(dealer_id)
                .into_iter()
                .map(PathBuf::from)
                .collect(),
        }
    }

    pub fn dealer_product_count(&self, dealer_id: &str) -> DealerProductCount {
        DealerProductCount {
            dealer_id: dealer_id.to_string(),
            count: self.read().dealer_products(dealer_id).len(),
        }
    }

    /// First record in ingestion order with this SKU, optionally scoped to a dealer.
    pub fn product_by_sku(&self, sku: &str, dealer_id: Option<&str>) -> Option<Arc<ProductRecord>> {
        let catalog = self.read();
        let scope = match dealer_id.filter(|d| !d.is_empty()) {
            Some(dealer) => catalog.dealer_products(dealer),
            None => catalog.products(),
        };
        scope.iter().find(|p| p.sku == sku).cloned()
    }

    pub fn search(&self, criteria: &SearchCriteria, page: Page) -> SearchPage {
        query::search(self.read().products(), criteria, page)
    }

    pub fn distribution_center_counts(&self, dealer_id: Option<&str>) -> IndexMap<String, usize> {
        let catalog = self.read();
        match dealer_id.filter(|d| !d.is_empty()) {
            Some(dealer) => query::summarize_distribution_centers(catalog.dealer_products(dealer)),
            None => query::summarize_distribution_centers(catalog.products()),
        }
    }

    pub fn catalog_summary(&self) -> CatalogSummary {
        let catalog = self.read();
        let products = catalog.products();
        CatalogSummary {
            total_products: products.len(),
            by_dealer: catalog
                .products_by_dealer()
                .iter()
                .map(|(dealer, items)| (dealer.clone(), items.len()))
                .collect(),
            by_status: query::summarize_statuses(products),
            by_dc: query::summarize_distribution_centers(products),
            sample_skus: products
                .iter()
                .take(SAMPLE_SKU_COUNT)
                .map(|p| p.sku.clone())
                .collect(),
        }
    }

    pub fn loaded_files(&self) -> IndexMap<String, Vec<PathBuf>> {
        self.read()
            .files_by_dealer()
            .iter()
            .map(|(dealer, files)| (dealer.clone(), files.iter().cloned().collect()))
            .collect()
    }
}
