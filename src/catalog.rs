//! In-memory product catalog.
//!
//! An append log of normalized records plus two derived indexes: records per
//! dealer and contributing source files per dealer. All three are updated
//! together in [`Catalog::add`], which takes `&mut self`, so a reader holding
//! a shared borrow (or a read lock, see [`CatalogService`](crate::service::CatalogService))
//! never observes a half-appended record.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::models::ProductRecord;

#[derive(Debug, Default)]
pub struct Catalog {
    products: Vec<Arc<ProductRecord>>,
    by_dealer: IndexMap<String, Vec<Arc<ProductRecord>>>,
    files_by_dealer: IndexMap<String, IndexSet<PathBuf>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and update both indexes.
    pub fn add(&mut self, product: ProductRecord) {
        let product = Arc::new(product);
        let dealer = product.dealer_key().to_string();
        self.files_by_dealer
            .entry(dealer.clone())
            .or_default()
            .insert(product.source_file.clone());
        self.by_dealer
            .entry(dealer)
            .or_default()
            .push(Arc::clone(&product));
        self.products.push(product);
    }

    /// Reset all three structures together.
    pub fn clear(&mut self) {
        self.products.clear();
        self.by_dealer.clear();
        self.files_by_dealer.clear();
    }

    /// All records in ingestion order.
    pub fn products(&self) -> &[Arc<ProductRecord>] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Dealer keys in first-seen order. Records without a dealer appear
    /// under [`UNKNOWN_DEALER`](crate::models::UNKNOWN_DEALER).
    pub fn dealers(&self) -> impl Iterator<Item = &str> {
        self.by_dealer.keys().map(String::as_str)
    }

    /// One dealer's records in ingestion order; empty for unknown dealers.
    pub fn dealer_products(&self, dealer: &str) -> &[Arc<ProductRecord>] {
        self.by_dealer
            .get(dealer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Per-dealer record lists, keyed like [`dealers`](Self::dealers).
    pub fn products_by_dealer(&self) -> &IndexMap<String, Vec<Arc<ProductRecord>>> {
        &self.by_dealer
    }

    /// Distinct source files that contributed records for one dealer.
    pub fn dealer_files(&self, dealer: &str) -> Vec<&Path> {
        self.files_by_dealer
            .get(dealer)
            .map(|files| files.iter().map(PathBuf::as_path).collect())
            .unwrap_or_default()
    }

    pub fn files_by_dealer(&self) -> &IndexMap<String, IndexSet<PathBuf>> {
        &self.files_by_dealer
    }
}
