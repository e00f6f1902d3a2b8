//! PubMed EFetch document parser.
//!
//! Walks a fetched `PubmedArticleSet` tree and turns every `PubmedArticle`
//! into a flat [`ParsedArticle`], keeping only authors whose affiliation
//! looks commercial (see [`crate::affiliation`]).
//!
//! Failure granularity is two-tier: a missing document is a hard error,
//! while a broken record is logged and skipped so its siblings still parse.

use crate::affiliation::{extract_emails, is_company_affiliation};
use crate::error::{Result, ScoutError};
use crate::xml::XmlNode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Placeholder used when a record has no `ArticleTitle`
pub const NO_TITLE: &str = "No title available";

/// Placeholder used when a record has no usable `PubDate`
pub const NO_DATE: &str = "No publication date available";

/// Placeholder used when no email was found in company affiliations
pub const NO_EMAIL: &str = "NO-EMAIL";

/// Separator for the joined set fields
pub const FIELD_SEPARATOR: &str = "; ";

/// Column names, in export order
pub const ARTICLE_FIELDS: [&str; 6] = [
    "PubmedID",
    "Title",
    "Publication Date",
    "Non-Academic Authors",
    "Company Affiliations",
    "Corresponding Author Email",
];

/// One parsed record, ready for display or CSV export.
///
/// The three joined fields come from unordered sets; the order of their
/// `"; "`-separated items is not stable. The join is lossy: an item that
/// itself contains `"; "` (common in affiliations) cannot be told apart
/// from two items, so the `*_list` accessors are approximate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedArticle {
    #[serde(rename = "PubmedID")]
    pub pubmed_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Publication Date")]
    pub publication_date: String,
    #[serde(rename = "Non-Academic Authors")]
    pub non_academic_authors: String,
    #[serde(rename = "Company Affiliations")]
    pub company_affiliations: String,
    #[serde(rename = "Corresponding Author Email")]
    pub corresponding_author_email: String,
}

impl ParsedArticle {
    /// `(column name, value)` pairs in export order.
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            (ARTICLE_FIELDS[0], &self.pubmed_id),
            (ARTICLE_FIELDS[1], &self.title),
            (ARTICLE_FIELDS[2], &self.publication_date),
            (ARTICLE_FIELDS[3], &self.non_academic_authors),
            (ARTICLE_FIELDS[4], &self.company_affiliations),
            (ARTICLE_FIELDS[5], &self.corresponding_author_email),
        ]
    }

    /// Items of the `Non-Academic Authors` field, split on `"; "`.
    pub fn author_list(&self) -> Vec<&str> {
        split_joined(&self.non_academic_authors)
    }

    /// Items of the `Company Affiliations` field, split on `"; "`.
    ///
    /// An affiliation containing `"; "` comes back as several items.
    pub fn affiliation_list(&self) -> Vec<&str> {
        split_joined(&self.company_affiliations)
    }

    /// Items of the `Corresponding Author Email` field; empty for the placeholder.
    pub fn email_list(&self) -> Vec<&str> {
        if self.corresponding_author_email == NO_EMAIL {
            return Vec::new();
        }
        split_joined(&self.corresponding_author_email)
    }
}

fn split_joined(value: &str) -> Vec<&str> {
    value
        .split(FIELD_SEPARATOR)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Why a single record was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RecordError {
    MissingPmid,
    EmptyPmid,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MissingPmid => write!(f, "article has no PMID"),
            RecordError::EmptyPmid => write!(f, "article has an empty PMID"),
        }
    }
}

/// Parse every `PubmedArticle` in `root`.
///
/// `None` means the fetch stage produced no document and is rejected with
/// a validation error. Records without a PMID are skipped with a warning.
/// An empty result is a success.
pub fn parse_records(root: Option<&XmlNode>) -> Result<Vec<ParsedArticle>> {
    let root = root.ok_or_else(|| {
        ScoutError::Validation("No data to parse - document root is missing".to_string())
    })?;

    let records: Vec<&XmlNode> = root.iter().filter(|n| n.name == "PubmedArticle").collect();
    debug!(count = records.len(), "Found articles to parse");

    let mut articles = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        match parse_article(record) {
            Ok(article) => {
                debug!(pmid = %article.pubmed_id, "Parsed article");
                articles.push(article);
            }
            Err(e) => {
                warn!(index = index, reason = %e, "Skipping article");
            }
        }
    }

    info!(count = articles.len(), "Parsed articles");
    Ok(articles)
}

/// Parse one `PubmedArticle` node.
fn parse_article(record: &XmlNode) -> std::result::Result<ParsedArticle, RecordError> {
    let pmid = record.find("PMID").ok_or(RecordError::MissingPmid)?;
    let pmid = pmid.text.trim();
    if pmid.is_empty() {
        return Err(RecordError::EmptyPmid);
    }

    let title = record
        .find("ArticleTitle")
        .map(|t| t.text_content().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let publication_date = format_pub_date(record.find("PubDate"));

    let mut non_academic_authors: HashSet<String> = HashSet::new();
    let mut company_affiliations: HashSet<String> = HashSet::new();
    let mut emails: HashSet<String> = HashSet::new();

    for author in record.find_path(&["AuthorList", "Author"]) {
        let last_name = author.child_text("LastName");
        if last_name.is_empty() {
            continue;
        }
        let first_name = author.child_text("ForeName");
        let name = format!("{} {}", first_name, last_name).trim().to_string();

        for info in author.find_all("AffiliationInfo") {
            let Some(affiliation) = info.find("Affiliation") else {
                continue;
            };
            let text = affiliation.text_content();
            if !is_company_affiliation(&text) {
                continue;
            }

            non_academic_authors.insert(name.clone());
            company_affiliations.insert(text.trim().to_string());
            emails.extend(extract_emails(&text));
        }
    }

    let corresponding_author_email = if emails.is_empty() {
        NO_EMAIL.to_string()
    } else {
        join_set(&emails)
    };

    Ok(ParsedArticle {
        pubmed_id: pmid.to_string(),
        title,
        publication_date,
        non_academic_authors: join_set(&non_academic_authors),
        company_affiliations: join_set(&company_affiliations),
        corresponding_author_email,
    })
}

/// "Year Month Day" from whichever parts are present.
fn format_pub_date(pub_date: Option<&XmlNode>) -> String {
    let Some(pub_date) = pub_date else {
        return NO_DATE.to_string();
    };

    let parts: Vec<&str> = ["Year", "Month", "Day"]
        .iter()
        .map(|part| pub_date.child_text(part))
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        NO_DATE.to_string()
    } else {
        parts.join(" ")
    }
}

fn join_set(items: &HashSet<String>) -> String {
    items
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    const VALID_XML: &str = r#"
        <PubmedArticleSet>
            <PubmedArticle>
                <MedlineCitation Status="Publisher" Owner="NLM">
                <PMID Version="1">12345</PMID>
                <DateRevised>
                    <Year>2025</Year>
                    <Month>07</Month>
                    <Day>31</Day>
                </DateRevised>
                <Article PubModel="Print">
                    <Journal>
                    <ISSN IssnType="Print">1234-5678</ISSN>
                    <JournalIssue CitedMedium="Print">
                        <Volume>10</Volume>
                        <Issue>3</Issue>
                        <PubDate>
                        <Year>2025</Year>
                        <Month>Jul</Month>
                        <Day>30</Day>
                        </PubDate>
                    </JournalIssue>
                    <Title>Journal of Sample Research</Title>
                    </Journal>
                    <ArticleTitle>Sample Study on BioTech Innovations</ArticleTitle>
                    <AuthorList CompleteYN="Y">
                    <Author ValidYN="Y">
                        <LastName>Doe</LastName>
                        <ForeName>John</ForeName>
                        <Initials>J</Initials>
                        <AffiliationInfo>
                        <Affiliation>BioTech Corp, San Francisco, CA, USA. john@biotech.com.</Affiliation>
                        </AffiliationInfo>
                    </Author>
                    </AuthorList>
                    <Language>eng</Language>
                </Article>
                </MedlineCitation>
            </PubmedArticle>
        </PubmedArticleSet>
    "#;

    fn parse_str(xml: &str) -> Result<Vec<ParsedArticle>> {
        let root = parse_document(xml)?;
        parse_records(Some(&root))
    }

    fn record(pmid: &str, authors: &str) -> String {
        format!(
            "<PubmedArticle><MedlineCitation><PMID>{pmid}</PMID><Article>\
             <ArticleTitle>Title {pmid}</ArticleTitle>\
             <AuthorList>{authors}</AuthorList></Article></MedlineCitation></PubmedArticle>"
        )
    }

    fn author(fore: &str, last: &str, affiliations: &[&str]) -> String {
        let infos: String = affiliations
            .iter()
            .map(|a| format!("<AffiliationInfo><Affiliation>{a}</Affiliation></AffiliationInfo>"))
            .collect();
        format!("<Author><LastName>{last}</LastName><ForeName>{fore}</ForeName>{infos}</Author>")
    }

    #[test]
    fn test_parse_valid_xml() -> Result<()> {
        let articles = parse_str(VALID_XML)?;
        assert_eq!(articles.len(), 1);

        let article = &articles[0];
        assert_eq!(article.pubmed_id, "12345");
        assert_eq!(article.title, "Sample Study on BioTech Innovations");
        assert!(article.publication_date.contains("2025 Jul 30"));
        assert!(article.non_academic_authors.contains("John Doe"));
        assert!(article.company_affiliations.contains("BioTech Corp"));
        assert_eq!(article.email_list(), vec!["john@biotech.com"]);
        Ok(())
    }

    #[test]
    fn test_parse_none_root() {
        let err = parse_records(None).expect_err("missing root must fail");
        assert!(err.is_validation());
    }

    #[test]
    fn test_parse_empty_xml() -> Result<()> {
        let articles = parse_str("<PubmedArticleSet></PubmedArticleSet>")?;
        assert!(articles.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_pmid_skipped_siblings_kept() -> Result<()> {
        let xml = format!(
            "<PubmedArticleSet>{}<PubmedArticle><MedlineCitation><Article>\
             <ArticleTitle>No id</ArticleTitle></Article></MedlineCitation></PubmedArticle>\
             <PubmedArticle><MedlineCitation><PMID>  </PMID></MedlineCitation></PubmedArticle>{}\
             </PubmedArticleSet>",
            record("1", ""),
            record("2", "")
        );
        let articles = parse_str(&xml)?;
        let ids: Vec<&str> = articles.iter().map(|a| a.pubmed_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        Ok(())
    }

    #[test]
    fn test_academic_author_contributes_nothing() -> Result<()> {
        let xml = format!(
            "<PubmedArticleSet>{}</PubmedArticleSet>",
            record("7", &author("Jane", "Roe", &["Harvard Medical School, Boston, MA. jane@hms.edu"]))
        );
        let articles = parse_str(&xml)?;
        assert_eq!(articles.len(), 1);

        let article = &articles[0];
        assert_eq!(article.non_academic_authors, "");
        assert_eq!(article.company_affiliations, "");
        assert_eq!(article.corresponding_author_email, NO_EMAIL);
        assert!(article.email_list().is_empty());
        Ok(())
    }

    #[test]
    fn test_author_without_last_name_ignored() -> Result<()> {
        let xml = format!(
            "<PubmedArticleSet>{}</PubmedArticleSet>",
            record(
                "8",
                "<Author><CollectiveName>Acme Pharma Consortium</CollectiveName>\
                 <AffiliationInfo><Affiliation>Acme Pharma Inc. team@acme.com</Affiliation></AffiliationInfo>\
                 </Author>"
            )
        );
        let articles = parse_str(&xml)?;
        assert_eq!(articles[0].non_academic_authors, "");
        assert_eq!(articles[0].corresponding_author_email, NO_EMAIL);
        Ok(())
    }

    #[test]
    fn test_sets_are_deduplicated() -> Result<()> {
        let shared = "Genentech Inc., South San Francisco. lab@gene.com";
        let authors = format!(
            "{}{}{}",
            author("Ann", "Lee", &[shared, "Stanford University"]),
            author("Bo", "Kim", &[shared, "Kim Therapeutics LLC. bo@kimtx.com"]),
            author("Ann", "Lee", &[shared])
        );
        let xml = format!("<PubmedArticleSet>{}</PubmedArticleSet>", record("9", &authors));
        let articles = parse_str(&xml)?;
        let article = &articles[0];

        let mut names = article.author_list();
        names.sort();
        assert_eq!(names, vec!["Ann Lee", "Bo Kim"]);

        let affiliations: HashSet<&str> = article.affiliation_list().into_iter().collect();
        assert_eq!(affiliations.len(), 2);
        assert!(affiliations.contains(shared));
        assert!(!affiliations.contains("Stanford University"));

        let emails: HashSet<&str> = article.email_list().into_iter().collect();
        assert_eq!(emails, HashSet::from(["lab@gene.com", "bo@kimtx.com"]));
        Ok(())
    }

    #[test]
    fn test_author_with_only_last_name() -> Result<()> {
        let xml = format!(
            "<PubmedArticleSet>{}</PubmedArticleSet>",
            record("10", "<Author><LastName>Solo</LastName><AffiliationInfo><Affiliation>Solo Biotech</Affiliation></AffiliationInfo></Author>")
        );
        let articles = parse_str(&xml)?;
        assert_eq!(articles[0].non_academic_authors, "Solo");
        Ok(())
    }

    #[test]
    fn test_missing_title_and_date_placeholders() -> Result<()> {
        let xml = "<PubmedArticleSet><PubmedArticle><MedlineCitation><PMID>5</PMID>\
                   <Article><Journal><JournalIssue><PubDate><MedlineDate>2019 Winter</MedlineDate></PubDate>\
                   </JournalIssue></Journal></Article></MedlineCitation></PubmedArticle></PubmedArticleSet>";
        let articles = parse_str(xml)?;
        assert_eq!(articles[0].title, NO_TITLE);
        assert_eq!(articles[0].publication_date, NO_DATE);

        let xml = "<PubmedArticleSet><PubmedArticle><PMID>6</PMID><ArticleTitle/></PubmedArticle></PubmedArticleSet>";
        let articles = parse_str(xml)?;
        assert_eq!(articles[0].title, NO_TITLE);
        assert_eq!(articles[0].publication_date, NO_DATE);
        Ok(())
    }

    #[test]
    fn test_partial_publication_date() -> Result<()> {
        let xml = "<PubmedArticleSet><PubmedArticle><PMID>3</PMID>\
                   <PubDate><Year>2024</Year><Day>2</Day></PubDate></PubmedArticle></PubmedArticleSet>";
        let articles = parse_str(xml)?;
        assert_eq!(articles[0].publication_date, "2024 2");
        Ok(())
    }

    #[test]
    fn test_title_with_inline_markup() -> Result<()> {
        let xml = "<PubmedArticleSet><PubmedArticle><PMID>4</PMID>\
                   <ArticleTitle>Role of <i>TP53</i> in tumours.</ArticleTitle></PubmedArticle></PubmedArticleSet>";
        let articles = parse_str(xml)?;
        assert_eq!(articles[0].title, "Role of TP53 in tumours.");
        Ok(())
    }

    #[test]
    fn test_first_pmid_is_the_record_id() -> Result<()> {
        let xml = "<PubmedArticleSet><PubmedArticle><MedlineCitation><PMID>100</PMID></MedlineCitation>\
                   <PubmedData><ReferenceList><Reference><ArticleIdList>\
                   <ArticleId IdType=\"pubmed\">999</ArticleId></ArticleIdList></Reference></ReferenceList>\
                   </PubmedData></PubmedArticle></PubmedArticleSet>";
        let articles = parse_str(xml)?;
        assert_eq!(articles[0].pubmed_id, "100");
        Ok(())
    }

    #[test]
    fn test_fields_order_matches_columns() -> Result<()> {
        let articles = parse_str(VALID_XML)?;
        let names: Vec<&str> = articles[0].fields().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ARTICLE_FIELDS.to_vec());
        Ok(())
    }

    #[test]
    fn test_affiliation_with_separator_splits_in_list() -> Result<()> {
        let affiliation = "Acme Pharma Inc.; Oncology Unit, Basel";
        let xml = format!(
            "<PubmedArticleSet>{}</PubmedArticleSet>",
            record("11", &author("Eva", "Roth", &[affiliation]))
        );
        let articles = parse_str(&xml)?;
        let article = &articles[0];

        assert_eq!(article.company_affiliations, affiliation);
        assert_eq!(
            article.affiliation_list(),
            vec!["Acme Pharma Inc.", "Oncology Unit, Basel"]
        );
        Ok(())
    }
}
