//! Ingestion driver.
//!
//! Expands path patterns into files, classifies each file as line-delimited
//! or whole-document JSON, parses it (after stripping `//` and `/* */`
//! comments), normalizes every top-level record and appends the results to
//! the catalog.
//!
//! A file that cannot be read or parsed aborts the whole call. Files loaded
//! earlier in the same call stay in the catalog, and the failing file
//! contributes nothing: it is fully parsed before the first append.

use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use globset::{GlobBuilder, GlobMatcher};
use indexmap::IndexSet;
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::models::{ProductRecord, UNKNOWN_DEALER};
use crate::normalize::{normalize_record, resolve_dealer_id};

const LINE_DELIMITED_EXTENSIONS: &[&str] = &["jsonl", "ndjson", "jsonlines"];

/// How a file's records are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// One JSON value per non-blank line.
    JsonLines,
    /// A single JSON document; an array holds many records, anything else one.
    JsonDocument,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if LINE_DELIMITED_EXTENSIONS.contains(&ext.as_str()) {
            FileFormat::JsonLines
        } else {
            FileFormat::JsonDocument
        }
    }
}

/// Dealer attribution for one load call.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub dealer_id: Option<String>,
    pub infer_dealer_from_filename: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            dealer_id: None,
            infer_dealer_from_filename: true,
        }
    }
}

/// Load every file matched by `patterns` into `catalog`.
///
/// Returns the number of records appended by this call.
pub fn load_files(
    catalog: &RwLock<Catalog>,
    patterns: &[String],
    options: &LoadOptions,
) -> Result<usize, CatalogError> {
    let files = expand_patterns(patterns)?;
    let mut loaded = 0;

    for file in &files {
        let dealer_id = resolve_dealer_id(
            file,
            options.dealer_id.as_deref(),
            options.infer_dealer_from_filename,
        );
        let records: Vec<ProductRecord> = read_records(file)?
            .iter()
            .map(|raw| normalize_record(raw, dealer_id.as_deref(), file))
            .collect();
        let count = records.len();

        {
            let mut guard = catalog.write().unwrap_or_else(PoisonError::into_inner);
            for record in records {
                guard.add(record);
            }
        }

        info!(
            file = %file.display(),
            dealer = dealer_id.as_deref().unwrap_or(UNKNOWN_DEALER),
            records = count,
            "loaded product file"
        );
        loaded += count;
    }

    Ok(loaded)
}

/// Read and parse one file into raw records, choosing the format by extension.
pub fn read_records(path: &Path) -> Result<Vec<Value>, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match FileFormat::from_path(path) {
        FileFormat::JsonLines => parse_json_lines(path, &content),
        FileFormat::JsonDocument => {
            let data: Value = serde_json::from_str(&strip_comments(&content)).map_err(|source| {
                CatalogError::Parse {
                    path: path.to_path_buf(),
                    line: None,
                    source,
                }
            })?;
            Ok(match data {
                Value::Array(items) => items,
                other => vec![other],
            })
        }
    }
}

fn parse_json_lines(path: &Path, content: &str) -> Result<Vec<Value>, CatalogError> {
    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let stripped = strip_comments(line);
        if stripped.trim().is_empty() {
            warn!(file = %path.display(), line = idx + 1, "skipping comment-only line");
            continue;
        }
        let value = serde_json::from_str(&stripped).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            line: Some(idx + 1),
            source,
        })?;
        records.push(value);
    }
    Ok(records)
}

/// Remove `//` and `/* */` comments outside string literals.
///
/// Line breaks inside block comments are kept so parser positions still
/// point at the right line.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                while chars.next_if(|&n| n != '\n').is_some() {}
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    if n == '\n' {
                        out.push('\n');
                    }
                    prev = n;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Expand patterns into a de-duplicated list of regular files.
///
/// Patterns are resolved against the working directory. A pattern without
/// wildcards names a file directly; a pattern that matches nothing is not an
/// error.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>, CatalogError> {
    let cwd = std::env::current_dir().map_err(|source| CatalogError::Io {
        path: PathBuf::from("."),
        source,
    })?;

    let mut files = IndexSet::new();
    for pattern in patterns {
        let before = files.len();
        expand_pattern(pattern, &cwd, &mut files)?;
        if files.len() == before {
            warn!(pattern = %pattern, "pattern matched no new files");
        } else {
            debug!(pattern = %pattern, matched = files.len() - before, "expanded pattern");
        }
    }
    Ok(files.into_iter().collect())
}

fn expand_pattern(
    pattern: &str,
    cwd: &Path,
    out: &mut IndexSet<PathBuf>,
) -> Result<(), CatalogError> {
    let (base, rest) = split_glob_base(&normalize_lexically(&cwd.join(pattern)));

    if rest.is_empty() {
        if base.is_file() {
            out.insert(base);
        }
        return Ok(());
    }
    if !base.is_dir() {
        return Ok(());
    }

    let matcher = build_matcher(pattern, &base, &rest)?;
    let max_depth = if rest.iter().any(|c| c.contains("**")) {
        usize::MAX
    } else {
        rest.len()
    };

    let walker = WalkDir::new(&base)
        .follow_links(true)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !is_hidden(e) || names_dot_entry(&rest, e.depth())
        });
    for entry in walker {
        let entry = entry.map_err(|source| CatalogError::Walk {
            pattern: pattern.to_string(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.is_match(entry.path()) {
            out.insert(entry.into_path());
        }
    }
    Ok(())
}

fn build_matcher(pattern: &str, base: &Path, rest: &[String]) -> Result<GlobMatcher, CatalogError> {
    let mut glob = base.to_string_lossy().into_owned();
    for part in rest {
        if !glob.ends_with('/') {
            glob.push('/');
        }
        glob.push_str(part);
    }
    let glob = GlobBuilder::new(&glob)
        .literal_separator(true)
        .build()
        .map_err(|source| CatalogError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
    Ok(glob.compile_matcher())
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// Split a path into its literal directory prefix and the remaining
/// components, starting at the first one containing a wildcard.
fn split_glob_base(path: &Path) -> (PathBuf, Vec<String>) {
    let mut base = PathBuf::new();
    let mut rest = Vec::new();
    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        if !rest.is_empty() || (matches!(component, Component::Normal(_)) && has_glob_meta(&text)) {
            rest.push(text.into_owned());
        } else {
            base.push(component);
        }
    }
    (base, rest)
}

/// Resolve `.` and `..` without touching the filesystem, so two spellings
/// of one path compare equal.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Whether the glob component matched at `depth` spells out a leading dot.
/// Below a `**` the depth is ambiguous, so any dotted component counts.
fn names_dot_entry(rest: &[String], depth: usize) -> bool {
    if rest.iter().any(|c| c.contains("**")) {
        rest.iter().any(|c| c.starts_with('.'))
    } else {
        rest.get(depth.wrapping_sub(1)).is_some_and(|c| c.starts_with('.'))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn pattern(dir: &Path, glob: &str) -> String {
        format!("{}/{}", dir.display(), glob)
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.jsonl")), FileFormat::JsonLines);
        assert_eq!(FileFormat::from_path(Path::new("a.NDJSON")), FileFormat::JsonLines);
        assert_eq!(FileFormat::from_path(Path::new("a.jsonlines")), FileFormat::JsonLines);
        assert_eq!(FileFormat::from_path(Path::new("a.json")), FileFormat::JsonDocument);
        assert_eq!(FileFormat::from_path(Path::new("a")), FileFormat::JsonDocument);
    }

    #[test]
    fn test_strip_comments() {
        let input = "{\"a\": \"http://x\", // trailing\n \"b\": /* inline */ 2, \"c\": \"/* kept */\"}";
        let v: Value = serde_json::from_str(&strip_comments(input)).unwrap();
        assert_eq!(v["a"], "http://x");
        assert_eq!(v["b"], 2);
        assert_eq!(v["c"], "/* kept */");
    }

    #[test]
    fn test_strip_comments_keeps_lines_and_escapes() {
        let input = "/* one\ntwo */{\"q\": \"say \\\"hi\\\" // no\"}";
        let out = strip_comments(input);
        assert_eq!(out.lines().count(), 2);
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["q"], "say \"hi\" // no");
    }

    #[test]
    fn test_split_glob_base() {
        let (base, rest) = split_glob_base(Path::new("/data/exports/*.json"));
        assert_eq!(base, PathBuf::from("/data/exports"));
        assert_eq!(rest, vec!["*.json".to_string()]);

        let (base, rest) = split_glob_base(Path::new("/data/./**/products-*.jsonl"));
        assert_eq!(base, PathBuf::from("/data"));
        assert_eq!(rest, vec!["**".to_string(), "products-*.jsonl".to_string()]);

        let (base, rest) = split_glob_base(Path::new("/data/file.json"));
        assert_eq!(base, PathBuf::from("/data/file.json"));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_expand_patterns() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        write(dir, "b.json", "[]");
        write(dir, "a.jsonl", "");
        write(dir, ".hidden.json", "[]");
        write(dir, "nested/c.json", "[]");
        fs::create_dir_all(dir.join("dir.json")).unwrap();

        let files = expand_patterns(&[pattern(dir, "*.json*")]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jsonl", "b.json"]);

        let files = expand_patterns(&[pattern(dir, "**/*.json")]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.ends_with("nested/c.json")));
    }

    #[test]
    fn test_expand_deduplicates_and_accepts_literal_paths() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let a = write(dir, "a.json", "[]");
        let files = expand_patterns(&[
            a.display().to_string(),
            pattern(dir, "*.json"),
            pattern(dir, "missing/*.json"),
            pattern(dir, "nope.json"),
        ])
        .unwrap();
        assert_eq!(files, vec![a]);
    }

    #[test]
    fn test_parent_segments_resolve_to_one_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let a = write(dir, "data/a.json", "[]");
        fs::create_dir_all(dir.join("sub")).unwrap();

        let files = expand_patterns(&[
            pattern(dir, "data/*.json"),
            pattern(dir, "sub/../data/*.json"),
            pattern(dir, "sub/../data/./a.json"),
        ])
        .unwrap();
        assert_eq!(files, vec![a]);
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/x/sub/../data/./a.json")),
            PathBuf::from("/x/data/a.json")
        );
        assert_eq!(normalize_lexically(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_match_wildcards() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let real = write(dir, "real/products-acme-1.json", "[{\"sku\": \"A\"}]");
        fs::create_dir_all(dir.join("data")).unwrap();
        let link = dir.join("data/products-acme-1.json");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let literal = expand_patterns(&[link.display().to_string()]).unwrap();
        let wildcard = expand_patterns(&[pattern(dir, "data/*.json")]).unwrap();
        assert_eq!(literal, vec![link.clone()]);
        assert_eq!(wildcard, literal);
    }

    #[test]
    fn test_explicit_dot_pattern_matches_hidden_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let hidden = write(dir, "data/.staged.json", "[]");
        write(dir, "data/visible.json", "[]");
        write(dir, ".cache/c.json", "[]");

        assert_eq!(expand_patterns(&[pattern(dir, "data/.*.json")]).unwrap(), vec![hidden]);
        assert_eq!(expand_patterns(&[pattern(dir, "data/*.json")]).unwrap().len(), 1);
        assert_eq!(expand_patterns(&[pattern(dir, ".*/*.json")]).unwrap().len(), 1);
        assert_eq!(expand_patterns(&[pattern(dir, "*/*.json")]).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_glob_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = expand_patterns(&[pattern(tmp.path(), "[*.json")]).unwrap_err();
        assert!(matches!(err, CatalogError::Pattern { .. }));
    }

    #[test]
    fn test_read_document_and_single_object() {
        let tmp = TempDir::new().unwrap();
        let arr = write(tmp.path(), "arr.json", "// fixture\n[{\"sku\": \"A\"}, {\"sku\": \"B\"}]");
        let one = write(tmp.path(), "one.json", "{\"sku\": \"C\"}");
        assert_eq!(read_records(&arr).unwrap().len(), 2);
        let single = read_records(&one).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0]["sku"], "C");
    }

    #[test]
    fn test_read_json_lines() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            tmp.path(),
            "p.jsonl",
            "{\"sku\": \"A\"}\r\n\n// note\n{\"sku\": \"B\"} /* tail */\n   \n",
        );
        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["sku"], "B");
    }

    #[test]
    fn test_parse_error_reports_line() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "bad.jsonl", "{\"sku\": \"A\"}\n{oops\n");
        match read_records(&path).unwrap_err() {
            CatalogError::Parse { line, .. } => assert_eq!(line, Some(2)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_files_counts_and_infers_dealer() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "products-acme-1.jsonl",
            "{\"sku\": \"A\"}\n{\"sku\": \"B\"}\n",
        );
        write(tmp.path(), "catalog.json", "[{\"sku\": \"C\"}]");
        let catalog = RwLock::new(Catalog::new());

        let loaded = load_files(&catalog, &[pattern(tmp.path(), "*")], &LoadOptions::default()).unwrap();
        assert_eq!(loaded, 3);

        let catalog = catalog.read().unwrap();
        assert_eq!(catalog.dealer_products("acme").len(), 2);
        assert_eq!(catalog.dealer_products(UNKNOWN_DEALER).len(), 1);
        assert!(catalog.products()[0].source_file.is_absolute());
    }

    #[test]
    fn test_load_failure_keeps_earlier_files() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.json", "[{\"sku\": \"A\"}]");
        write(tmp.path(), "b.json", "[{\"sku\": \"B\"}, {oops}]");
        let catalog = RwLock::new(Catalog::new());

        let err = load_files(&catalog, &[pattern(tmp.path(), "*.json")], &LoadOptions::default());
        assert!(matches!(err, Err(CatalogError::Parse { .. })));
        let catalog = catalog.read().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.products()[0].sku, "A");
    }

    #[test]
    fn test_malformed_record_does_not_abort() {
        let tmp = TempDir::new().unwrap();
        let bad_dc = r#"{"sku": "X", "attributes": [{"templateAttributes": [{"fieldSlug": "dc_availability", "value": "{broken"}]}]}"#;
        let good_dc = r#"{"sku": "Y", "attributes": [{"templateAttributes": [{"fieldSlug": "dc_availability", "value": "{\"10\": {\"US\": 1}}"}]}]}"#;
        let content = format!("{good_dc}\n{bad_dc}\n{good_dc}\n{good_dc}\n{good_dc}\n");
        write(tmp.path(), "p.jsonl", &content);
        let catalog = RwLock::new(Catalog::new());

        let loaded = load_files(&catalog, &[pattern(tmp.path(), "p.jsonl")], &LoadOptions::default()).unwrap();
        assert_eq!(loaded, 5);
        let catalog = catalog.read().unwrap();
        assert!(catalog.products()[1].dc_availability.is_none());
        assert_eq!(
            catalog
                .products()
                .iter()
                .filter(|p| p.dc_availability.is_some())
                .count(),
            4
        );
    }

    #[test]
    fn test_explicit_dealer_overrides_filename() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "products-acme-1.json", "[{\"sku\": \"A\"}]");
        let catalog = RwLock::new(Catalog::new());
        let options = LoadOptions {
            dealer_id: Some("bolt".into()),
            infer_dealer_from_filename: true,
        };
        load_files(&catalog, &[pattern(tmp.path(), "*.json")], &options).unwrap();
        assert_eq!(catalog.read().unwrap().dealers().collect::<Vec<_>>(), vec!["bolt"]);
    }
}
