//! # pubscout
//!
//! PubMed literature pipeline that flags papers with biotech/pharma
//! (non-academic) author affiliations.
//!
//! ## Modules
//!
//! - [`eutils`] - NCBI E-utilities client (esearch + efetch)
//! - [`xml`] - Owned XML element tree with descendant lookups
//! - [`parse`] - PubmedArticle → flat record parser
//! - [`affiliation`] - Company-affiliation and email heuristics
//! - [`export`] - CSV export and console rendering
//! - [`pipeline`] - Stage orchestration for one query
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pubscout::eutils::{EutilsClient, EutilsConfig};
//! use pubscout::pipeline::{Destination, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::new(EutilsClient::new(EutilsConfig::default())?);
//!     let outcome = pipeline
//!         .run("cancer AND therapeutics", 10, &Destination::Console, &mut std::io::stdout())
//!         .await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod affiliation;
pub mod error;
pub mod eutils;
pub mod export;
pub mod parse;
pub mod pipeline;
pub mod xml;

pub use error::{Result, ScoutError};
pub use parse::ParsedArticle;
