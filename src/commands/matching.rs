use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::MatchArgs;
use crate::engine::matcher::{classify, match_client_files};

pub fn run(args: MatchArgs) -> Result<()> {
    let filenames = list_files(&args.dir, |name| name.to_ascii_lowercase().ends_with(".pdf"))?;
    let candidates = match_client_files(&args.client, &filenames);

    if candidates.is_empty() {
        warn!(
            client = %args.client,
            dir = %args.dir.display(),
            scanned = filenames.len(),
            "no source files match client"
        );
    } else {
        info!(
            client = %args.client,
            matched = candidates.len(),
            confidence = candidates[0].confidence.as_str(),
            "matched source files"
        );
    }

    for filename in &filenames {
        if candidates.iter().any(|candidate| &candidate.filename == filename) {
            continue;
        }
        debug!(
            file = %filename,
            confidence = classify(&args.client, filename).as_str(),
            "file not selected"
        );
    }

    let rendered =
        serde_json::to_string_pretty(&candidates).context("failed to serialize match results")?;
    println!("{rendered}");
    Ok(())
}

/// Sorted names of regular files in `dir` accepted by `keep`. A missing
/// directory lists as empty.
pub fn list_files<F>(dir: &Path, keep: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to stat {}", entry.path().display()))?;
        if !file_type.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            warn!(path = %entry.path().display(), "skipping non UTF-8 filename");
            continue;
        };
        if keep(&name) {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}
