//! Search → fetch → parse → output pipeline.
//!
//! Runs the stages strictly in sequence for one query. Empty intermediate
//! results end the run early with an informational [`Outcome`]; only
//! validation, transport and export failures are errors.

use crate::error::Result;
use crate::eutils::EutilsClient;
use crate::export::{render_articles, resolve_output_path, save_csv};
use crate::parse::{parse_records, ParsedArticle};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What to do with the parsed articles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Render every article to the output stream
    Console,
    /// Export to `output_dir/filename` (default file name when `None`)
    Csv {
        output_dir: PathBuf,
        filename: Option<String>,
    },
    /// Render every article, then export to the default file in `output_dir`
    ConsoleAndCsv { output_dir: PathBuf },
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The search matched nothing
    NoMatches,
    /// Records were fetched but none could be parsed
    NoArticles,
    /// Articles were rendered to the output stream
    Displayed { count: usize },
    /// Articles were written to a CSV file
    Exported { count: usize, path: PathBuf },
    /// Articles were rendered and also written to a CSV file
    DisplayedAndExported { count: usize, path: PathBuf },
}

/// Query pipeline over an E-utilities client.
pub struct Pipeline {
    client: EutilsClient,
}

impl Pipeline {
    pub fn new(client: EutilsClient) -> Self {
        Self { client }
    }

    /// Run one query end to end.
    ///
    /// Progress messages and console output go to `out`.
    pub async fn run<W: Write>(
        &self,
        query: &str,
        max_results: i64,
        destination: &Destination,
        out: &mut W,
    ) -> Result<Outcome> {
        info!(query = query, max_results = max_results, "Starting pipeline");
        writeln!(out, "Running query: {}", query)?;

        // Stage 1: PMIDs
        debug!("Stage 1: searching for PMIDs");
        let search = self.client.search(query, max_results).await?;
        writeln!(
            out,
            "Search results for query '{}': {} results found.",
            query, search.count
        )?;

        if search.ids.is_empty() {
            warn!(query = query, "No search results found");
            writeln!(out, "No results found for the given query.")?;
            return Ok(Outcome::NoMatches);
        }
        writeln!(out, "Found {} results for query '{}'.", search.ids.len(), query)?;

        // Stage 2: full records
        debug!("Stage 2: fetching article details");
        writeln!(out, "Fetching article details...")?;
        let document = self.client.fetch_records(&search.ids).await?;

        // Stage 3: parse
        debug!("Stage 3: parsing article details");
        let articles = parse_records(Some(&document))?;
        writeln!(out, "Fetched details for {} articles.", articles.len())?;

        if articles.is_empty() {
            warn!("No articles parsed from response");
            writeln!(out, "No articles could be parsed from the response.")?;
            return Ok(Outcome::NoArticles);
        }

        // Stage 4: output
        let count = articles.len();
        let outcome = match destination {
            Destination::Console => {
                render_articles(out, &articles)?;
                Outcome::Displayed { count }
            }
            Destination::Csv {
                output_dir,
                filename,
            } => {
                let path = export(out, &articles, output_dir, filename.as_deref())?;
                Outcome::Exported { count, path }
            }
            Destination::ConsoleAndCsv { output_dir } => {
                render_articles(out, &articles)?;
                let path = export(out, &articles, output_dir, None)?;
                Outcome::DisplayedAndExported { count, path }
            }
        };

        info!(count = count, "Pipeline complete");
        Ok(outcome)
    }
}

fn export<W: Write>(
    out: &mut W,
    articles: &[ParsedArticle],
    output_dir: &Path,
    filename: Option<&str>,
) -> Result<PathBuf> {
    let path = resolve_output_path(output_dir, filename);
    save_csv(&path, articles)?;
    writeln!(out, "Exported {} articles to {}.", articles.len(), path.display())?;
    Ok(path)
}
