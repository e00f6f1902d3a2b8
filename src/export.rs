//! Result output: CSV export and console rendering.

use crate::error::Result;
use crate::parse::ParsedArticle;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory exports go to unless the caller picks another
pub const DEFAULT_OUTPUT_DIR: &str = "pubscout_output";

/// File name used when no destination name is given
pub const DEFAULT_OUTPUT_FILE: &str = "output.csv";

/// Width of the separator line between rendered records
const RECORD_SEPARATOR_WIDTH: usize = 50;

/// Where an export lands: `output_dir/filename`, or `filename` itself when
/// it is absolute. A blank `filename` means [`DEFAULT_OUTPUT_FILE`].
pub fn resolve_output_path(output_dir: &Path, filename: Option<&str>) -> PathBuf {
    let name = filename
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_OUTPUT_FILE);
    output_dir.join(name)
}

/// Write `records` to `path` as CSV with a header row.
///
/// The header comes from the serialized field names. An empty slice writes
/// nothing and returns `Ok(false)`. Missing parent directories are created.
pub fn save_csv<T: Serialize>(path: &Path, records: &[T]) -> Result<bool> {
    if records.is_empty() {
        info!(path = %path.display(), "No records to export");
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    debug!(count = records.len(), path = %path.display(), "Writing CSV");

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush()?;
    info!(count = records.len(), path = %path.display(), "Exported records");
    Ok(true)
}

/// Render articles as `Field: value` lines, one block per article.
pub fn render_articles<W: Write>(out: &mut W, articles: &[ParsedArticle]) -> std::io::Result<()> {
    for article in articles {
        for (name, value) in article.fields() {
            writeln!(out, "{}: {}", name, value)?;
        }
        writeln!(out, "{}", "-".repeat(RECORD_SEPARATOR_WIDTH))?;
    }
    Ok(())
}
