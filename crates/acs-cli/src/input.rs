//! Submission documents on disk
//!
//! `.json` files are parsed as JSON, everything else as YAML. Several files
//! are merged in order; later definitions replace earlier ones by name.

use acs_model::ResourceSubmission;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Parse one submission document
pub fn load(path: &Path) -> Result<ResourceSubmission> {
    let document = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let submission = if is_json(path) {
        serde_json::from_str(&document)
            .with_context(|| format!("parsing {} as JSON", path.display()))?
    } else {
        serde_yaml::from_str(&document)
            .with_context(|| format!("parsing {} as YAML", path.display()))?
    };
    Ok(submission)
}

/// Parse and merge several submission documents
pub fn load_all(paths: &[PathBuf]) -> Result<ResourceSubmission> {
    let Some((first, rest)) = paths.split_first() else {
        bail!("no submission files given");
    };
    let mut merged = load(first)?;
    for path in rest {
        let next = load(path)?;
        merged
            .merge(Some(&next))
            .with_context(|| format!("merging {}", path.display()))?;
    }
    Ok(merged)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}
