use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn dcat_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("dcat");
    path
}

const ACME: &str = r#"// acme nightly export
{"sku": "HW-100", "mpn": "M-100", "status": "active", "name": [{"locale": "en", "value": "Claw Hammer"}, {"locale": "fr", "value": "Marteau"}], "attributes": [{"templateAttributes": [{"fieldSlug": "dc_availability", "value": "{\"10\": {\"US\": 1, \"CA\": 0}}"}]}]}
{"sku": "HW-200", "status": "active", "name": "Tape Measure", "attributes": [{"templateAttributes": [{"fieldSlug": "dc_availability", "value": "{\"20\": {\"CA\": 1}}"}]}]}

{"sku": "HW-300", "status": "discontinued", "description": {"en": "Steel claw bar"}}
"#;

const BOLT: &str = r#"[
  /* bolt weekly export */
  {"sku": "HW-100", "mpn": "B-1", "upc_ean": "0001112223334", "status": "active"},
  {"sku": "BT-9", "name": [{"locale": "en", "value": "Bolt Cutter"}]}
]"#;

fn setup_test_env() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("products-acme-2024.jsonl"), ACME).unwrap();
    fs::write(data.join("products-bolt-01.json"), BOLT).unwrap();
    tmp
}

fn data_glob(root: &Path) -> String {
    format!("{}/data/*", root.display())
}

fn run_dcat(args: &[&str]) -> (String, String, bool) {
    let binary = dcat_binary();
    let output = Command::new(&binary)
        .env_remove("CATALOG_PRELOAD_GLOBS")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run dcat binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_with_data(root: &Path, args: &[&str]) -> (String, String, bool) {
    let glob = data_glob(root);
    let mut full = vec!["--path", glob.as_str()];
    full.extend_from_slice(args);
    run_dcat(&full)
}

#[test]
fn test_load_reports_counts_and_files() {
    let tmp = setup_test_env();
    let (stdout, stderr, success) = run_with_data(tmp.path(), &["load"]);
    assert!(success, "load failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Loaded 5 products."));
    assert!(stdout.contains("acme (1 files)"));
    assert!(stdout.contains("bolt (1 files)"));
    assert!(stdout.contains("products-acme-2024.jsonl"));
}

#[test]
fn test_dealers_inferred_from_filenames() {
    let tmp = setup_test_env();
    let (stdout, _, success) = run_with_data(tmp.path(), &["dealers"]);
    assert!(success);
    let acme = stdout.find("acme").unwrap();
    let bolt = stdout.find("bolt").unwrap();
    assert!(acme < bolt, "dealers should be listed in first-seen order");
}

#[test]
fn test_as_dealer_and_no_infer() {
    let tmp = setup_test_env();
    let (stdout, _, success) = run_with_data(tmp.path(), &["--as-dealer", "central", "dealers"]);
    assert!(success);
    assert!(stdout.contains("central"));
    assert!(!stdout.contains("acme"));

    let (stdout, _, success) = run_with_data(tmp.path(), &["--no-infer-dealer", "dealers"]);
    assert!(success);
    assert!(stdout.contains("unknown"));
    assert!(!stdout.contains("bolt"));
}

#[test]
fn test_search_text_and_filters() {
    let tmp = setup_test_env();

    let (stdout, stderr, success) = run_with_data(tmp.path(), &["search", "claw"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("of 2 matching products"));
    assert!(stdout.contains("HW-100"));
    assert!(stdout.contains("HW-300"));

    let (stdout, _, success) =
        run_with_data(tmp.path(), &["search", "--dc-code", "10", "--region", "CA"]);
    assert!(success);
    assert!(stdout.contains("No results."));

    let (stdout, _, success) = run_with_data(tmp.path(), &["search", "--region", "US"]);
    assert!(success);
    assert!(stdout.contains("of 1 matching products"));
    assert!(stdout.contains("Claw Hammer"));

    let (stdout, _, success) =
        run_with_data(tmp.path(), &["search", "--sku", "HW-100", "--dealer-id", "bolt"]);
    assert!(success);
    assert!(stdout.contains("of 1 matching products"));
}

#[test]
fn test_search_pagination_and_limit_validation() {
    let tmp = setup_test_env();
    let (stdout, _, success) =
        run_with_data(tmp.path(), &["search", "--status", "active", "--offset", "2", "--limit", "1"]);
    assert!(success);
    assert!(stdout.contains("Showing 3-3 of 3 matching products"));

    let (_, stderr, success) = run_with_data(tmp.path(), &["search", "--limit", "201"]);
    assert!(!success);
    assert!(stderr.contains("invalid limit"));

    let (_, stderr, success) = run_with_data(tmp.path(), &["search", "--offset", "-1"]);
    assert!(!success);
    assert!(stderr.contains("invalid offset"));
}

#[test]
fn test_get_product_json() {
    let tmp = setup_test_env();
    let (stdout, stderr, success) =
        run_with_data(tmp.path(), &["get", "HW-100", "--dealer-id", "bolt"]);
    assert!(success, "get failed: {}", stderr);
    let product: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(product["mpn"], "B-1");
    assert_eq!(product["upc_ean"], "0001112223334");
    assert_eq!(product["dealerId"], "bolt");
    assert!(product.get("name").is_none());
    assert!(product["sourceFile"].as_str().unwrap().ends_with("products-bolt-01.json"));

    let (stdout, _, success) = run_with_data(tmp.path(), &["get", "HW-100"]);
    assert!(success);
    let product: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(product["dealerId"], "acme");
    assert_eq!(product["name"]["fr"], "Marteau");
    assert_eq!(product["dc_availability"]["10"]["US"], 1);

    let (_, stderr, success) = run_with_data(tmp.path(), &["get", "NOPE"]);
    assert!(!success);
    assert!(stderr.contains("product not found"));
}

#[test]
fn test_dealer_dcs_summary_files() {
    let tmp = setup_test_env();

    let (stdout, _, success) = run_with_data(tmp.path(), &["dealer", "acme"]);
    assert!(success);
    assert!(stdout.contains("Products:   3"));
    assert!(stdout.contains("DCs:        10, 20"));
    assert!(stdout.contains("discontinued"));

    let (stdout, _, success) = run_with_data(tmp.path(), &["dcs", "--dealer-id", "bolt"]);
    assert!(success);
    assert!(stdout.contains("No distribution centers."));

    let (stdout, _, success) = run_with_data(tmp.path(), &["summary"]);
    assert!(success);
    assert!(stdout.contains("Products:    5"));
    assert!(stdout.contains("Dealers:     2"));
    assert!(stdout.contains("Sample SKUs: HW-100, HW-200, HW-300, HW-100, BT-9"));

    let (stdout, _, success) = run_with_data(tmp.path(), &["files"]);
    assert!(success);
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn test_malformed_file_fails_load() {
    let tmp = setup_test_env();
    fs::write(tmp.path().join("data/zz-broken.json"), "[{\"sku\": \"X\"},").unwrap();
    let (_, stderr, success) = run_with_data(tmp.path(), &["load"]);
    assert!(!success, "a malformed file must fail the load");
    assert!(stderr.contains("failed to parse"));
    assert!(stderr.contains("zz-broken.json"));
}

#[test]
fn test_malformed_record_still_loaded() {
    let tmp = TempDir::new().unwrap();
    let good = r#"{"sku": "OK", "attributes": [{"templateAttributes": [{"fieldSlug": "dc_availability", "value": "{\"10\": {\"US\": 1}}"}]}]}"#;
    let bad = r#"{"sku": "BAD", "attributes": [{"templateAttributes": [{"fieldSlug": "dc_availability", "value": "{oops"}]}]}"#;
    let content = [good, good, bad, good, good].join("\n");
    let file = tmp.path().join("products-acme-x.jsonl");
    fs::write(&file, content).unwrap();

    let path = file.display().to_string();
    let (stdout, _, success) = run_dcat(&["--path", &path, "load"]);
    assert!(success);
    assert!(stdout.contains("Loaded 5 products."));

    let (stdout, _, success) = run_dcat(&["--path", &path, "get", "BAD"]);
    assert!(success);
    let product: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(product.get("dc_availability").is_none());
}

#[test]
fn test_config_file_preload() {
    let tmp = setup_test_env();
    let config_path = tmp.path().join("dcat.toml");
    fs::write(
        &config_path,
        format!(
            "[catalog]\npreload = [\"{}\"]\n\n[logging]\nlevel = \"warn\"\n",
            data_glob(tmp.path())
        ),
    )
    .unwrap();

    let (stdout, stderr, success) =
        run_dcat(&["--config", config_path.to_str().unwrap(), "summary"]);
    assert!(success, "summary failed: {}", stderr);
    assert!(stdout.contains("Products:    5"));
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("dcat.toml");
    fs::write(&config_path, "[server]\nbind = \"\"\n").unwrap();
    let (_, stderr, success) = run_dcat(&["--config", config_path.to_str().unwrap(), "summary"]);
    assert!(!success);
    assert!(stderr.contains("server.bind"));
}
