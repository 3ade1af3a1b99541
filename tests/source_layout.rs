//! Source tree conventions: every module opens with a `//!` doc and no
//! line runs past rustfmt's 100-column limit.

use std::fs;
use std::path::{Path, PathBuf};

fn rust_files(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_files(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            out.push(path);
        }
    }
}

fn sources(subdir: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    rust_files(&Path::new(env!("CARGO_MANIFEST_DIR")).join(subdir), &mut files);
    assert!(!files.is_empty());
    files
}

#[test]
fn test_every_module_has_a_module_doc() {
    let missing: Vec<_> = sources("src")
        .into_iter()
        .filter(|p| !fs::read_to_string(p).unwrap().starts_with("//!"))
        .collect();
    assert!(missing.is_empty(), "no module doc: {missing:?}");
}

#[test]
fn test_lines_fit_in_100_columns() {
    let mut long = Vec::new();
    for path in sources("src").into_iter().chain(sources("tests")) {
        let text = fs::read_to_string(&path).unwrap();
        for (i, line) in text.lines().enumerate() {
            if line.chars().count() > 100 {
                long.push(format!("{}:{}", path.display(), i + 1));
            }
        }
    }
    assert!(long.is_empty(), "lines over 100 columns: {long:?}");
}

#[test]
fn test_missing_docs_lint_is_on() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/lib.rs");
    let lib = fs::read_to_string(path).unwrap();
    assert!(lib.contains("#![warn(missing_docs)]"));
}
