//! Terminal output for the `dcat` commands.
//!
//! Each `run_*` function prints one operation's result to stdout. Nothing
//! persists between invocations, so every command works on a catalog that
//! [`preload`] has just filled.

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::loader::LoadOptions;
use crate::models::{LocaleMap, ProductRecord};
use crate::query::{Page, SearchCriteria};
use crate::service::{CatalogService, LoadRequest};

/// Load-time overrides taken from global CLI flags.
#[derive(Debug, Default, Clone)]
pub struct LoadOverrides {
    pub paths: Vec<String>,
    pub dealer_id: Option<String>,
    pub no_infer_dealer: bool,
}

/// Resolve the effective patterns and dealer options.
///
/// `--path` replaces the configured (or environment) preload list;
/// `--as-dealer` and `--no-infer-dealer` override `[catalog]`.
pub fn load_request(config: &Config, overrides: &LoadOverrides) -> LoadRequest {
    let paths = if overrides.paths.is_empty() {
        config.catalog.preload_patterns()
    } else {
        overrides.paths.clone()
    };
    let LoadOptions {
        dealer_id,
        infer_dealer_from_filename,
    } = config.catalog.load_options();

    LoadRequest {
        paths,
        dealer_id: overrides.dealer_id.clone().or(dealer_id),
        infer_dealer_from_filename: infer_dealer_from_filename && !overrides.no_infer_dealer,
        clear_before_load: false,
    }
}

/// Fill a fresh catalog. With `strict`, a failed load is returned as an
/// error; otherwise it is logged and whatever loaded before it is kept.
pub fn preload(request: &LoadRequest, strict: bool) -> Result<Arc<CatalogService>> {
    let catalog = CatalogService::shared();
    if request.paths.is_empty() {
        info!("no preload patterns configured; starting with an empty catalog");
        return Ok(catalog);
    }
    match catalog.load_files(request) {
        Ok(count) => info!(records = count, "preload complete"),
        Err(e) if strict => return Err(e.into()),
        Err(e) => error!(error = %e, loaded = catalog.len(), "preload failed"),
    }
    Ok(catalog)
}

/// Best display name: English if present, else the first locale.
fn display_name(name: Option<&LocaleMap>) -> &str {
    name.and_then(|m| m.get("en").or_else(|| m.values().next()))
        .map(String::as_str)
        .unwrap_or("")
}

fn print_product_row(p: &ProductRecord) {
    println!(
        "  {:<20} {:<16} {:<12} {}",
        p.sku,
        p.dealer_key(),
        p.status.as_deref().unwrap_or("-"),
        display_name(p.name.as_ref())
    );
}

pub fn run_load(catalog: &CatalogService) -> Result<()> {
    println!("Loaded {} products.", catalog.len());
    for (dealer, files) in catalog.loaded_files() {
        println!();
        println!("  {} ({} files)", dealer, files.len());
        for file in files {
            println!("    {}", file.display());
        }
    }
    Ok(())
}

pub fn run_search(
    catalog: &CatalogService,
    criteria: &SearchCriteria,
    offset: i64,
    limit: i64,
) -> Result<()> {
    let page = Page::new(offset, limit)?;
    let found = catalog.search(criteria, page);

    if found.results.is_empty() {
        println!("No results. ({} matching)", found.total);
        return Ok(());
    }

    println!(
        "Showing {}-{} of {} matching products",
        found.offset + 1,
        found.offset + found.results.len(),
        found.total
    );
    println!();
    println!("  {:<20} {:<16} {:<12} {}", "SKU", "DEALER", "STATUS", "NAME");
    println!("  {}", "-".repeat(72));
    for p in &found.results {
        print_product_row(p);
    }
    Ok(())
}

pub fn run_get(catalog: &CatalogService, sku: &str, dealer_id: Option<&str>) -> Result<()> {
    let Some(product) = catalog.product_by_sku(sku, dealer_id) else {
        match dealer_id {
            Some(dealer) => bail!("product not found: {} (dealer {})", sku, dealer),
            None => bail!("product not found: {}", sku),
        }
    };
    println!("{}", serde_json::to_string_pretty(&*product)?);
    Ok(())
}

pub fn run_dealers(catalog: &CatalogService) -> Result<()> {
    let dealers = catalog.list_dealers();
    if dealers.is_empty() {
        println!("No dealers loaded.");
        return Ok(());
    }
    println!("  {:<24} {:>8}", "DEALER", "PRODUCTS");
    println!("  {}", "-".repeat(33));
    for dealer in dealers {
        let count = catalog.dealer_product_count(&dealer).count;
        println!("  {:<24} {:>8}", dealer, count);
    }
    Ok(())
}

pub fn run_dealer(catalog: &CatalogService, dealer_id: &str) -> Result<()> {
    let summary = catalog.dealer_summary(dealer_id);
    println!("Dealer: {}", summary.dealer_id);
    println!("  Products:   {}", summary.product_count);
    println!(
        "  DCs:        {}",
        if summary.distribution_centers.is_empty() {
            "-".to_string()
        } else {
            summary.distribution_centers.join(", ")
        }
    );
    if !summary.status_counts.is_empty() {
        println!();
        println!("  By status:");
        for (status, count) in &summary.status_counts {
            println!("    {:<16} {:>6}", status, count);
        }
    }
    if !summary.source_files.is_empty() {
        println!();
        println!("  Source files:");
        for file in &summary.source_files {
            println!("    {}", file.display());
        }
    }
    Ok(())
}

pub fn run_dcs(catalog: &CatalogService, dealer_id: Option<&str>) -> Result<()> {
    let counts = catalog.distribution_center_counts(dealer_id);
    if counts.is_empty() {
        println!("No distribution centers.");
        return Ok(());
    }
    println!("  {:<12} {:>8}", "DC", "PRODUCTS");
    println!("  {}", "-".repeat(21));
    for (dc, count) in counts {
        println!("  {:<12} {:>8}", dc, count);
    }
    Ok(())
}

pub fn run_summary(catalog: &CatalogService) -> Result<()> {
    let summary = catalog.catalog_summary();
    println!("Dealer Catalog Summary");
    println!("======================");
    println!();
    println!("  Products:    {}", summary.total_products);
    println!("  Dealers:     {}", summary.by_dealer.len());
    println!("  DCs:         {}", summary.by_dc.len());

    let sections = [
        ("By dealer", &summary.by_dealer),
        ("By status", &summary.by_status),
        ("By DC", &summary.by_dc),
    ];
    for (title, counts) in sections {
        if counts.is_empty() {
            continue;
        }
        println!();
        println!("  {}:", title);
        for (key, count) in counts {
            println!("    {:<24} {:>6}", key, count);
        }
    }

    if !summary.sample_skus.is_empty() {
        println!();
        println!("  Sample SKUs: {}", summary.sample_skus.join(", "));
    }
    println!();
    Ok(())
}

pub fn run_files(catalog: &CatalogService) -> Result<()> {
    let files = catalog.loaded_files();
    if files.is_empty() {
        println!("No files loaded.");
        return Ok(());
    }
    for (dealer, paths) in files {
        for path in paths {
            println!("{}\t{}", dealer, path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_path_flag_replaces_preload() {
        let config = parse_config("[catalog]\npreload = [\"a/*.json\"]\ndealer_id = \"acme\"\n").unwrap();
        let overrides = LoadOverrides {
            paths: vec!["b.jsonl".into()],
            dealer_id: None,
            no_infer_dealer: true,
        };
        let request = load_request(&config, &overrides);
        assert_eq!(request.paths, vec!["b.jsonl"]);
        assert_eq!(request.dealer_id.as_deref(), Some("acme"));
        assert!(!request.infer_dealer_from_filename);
    }

    #[test]
    fn test_as_dealer_overrides_config() {
        let config = parse_config("[catalog]\ndealer_id = \"acme\"\n").unwrap();
        let overrides = LoadOverrides {
            paths: vec!["x.json".into()],
            dealer_id: Some("bolt".into()),
            no_infer_dealer: false,
        };
        let request = load_request(&config, &overrides);
        assert_eq!(request.dealer_id.as_deref(), Some("bolt"));
        assert!(request.infer_dealer_from_filename);
    }

    #[test]
    fn test_display_name_prefers_english() {
        let mut map = LocaleMap::new();
        map.insert("fr".into(), "Marteau".into());
        assert_eq!(display_name(Some(&map)), "Marteau");
        map.insert("en".into(), "Hammer".into());
        assert_eq!(display_name(Some(&map)), "Hammer");
        assert_eq!(display_name(None), "");
    }

    #[test]
    fn test_preload_without_patterns_is_empty() {
        let catalog = preload(&LoadRequest::new(vec![]), true).unwrap();
        assert!(catalog.is_empty());
    }
}
