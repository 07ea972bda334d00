//! Corpus-wide page ranking.
//!
//! Scans every PDF in the corpus directory, scores each page against the
//! query keywords, and returns the globally ranked top pages. File-to-file
//! encounter order follows directory iteration order and is not guaranteed
//! stable across platforms; only the score ordering is guaranteed (stable
//! sort, so ties keep encounter order).

use std::path::Path;

use walkdir::WalkDir;

use crate::models::ScoredPage;
use crate::pdf;
use crate::score::{extract_excerpts, relevance_score, DEFAULT_EXCERPT_LENGTH};

/// Minimum score for a page to be considered relevant at all.
pub const RELEVANCE_THRESHOLD: usize = 1;

/// Maximum number of pages a ranking returns.
pub const MAX_RANKED_PAGES: usize = 5;

/// Ranking error. Callers must distinguish "no corpus" from "no matches";
/// the latter is an empty `Ok` result, never an error.
#[derive(Debug)]
pub enum RankError {
    /// The corpus directory does not exist.
    CorpusNotFound(std::path::PathBuf),
    /// The keyword set was empty (callers should have validated the query).
    EmptyQuery,
}

impl std::fmt::Display for RankError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankError::CorpusNotFound(dir) => {
                write!(f, "corpus directory not found: {}", dir.display())
            }
            RankError::EmptyQuery => write!(f, "query keywords must not be empty"),
        }
    }
}

impl std::error::Error for RankError {}

/// Rank every page of every PDF in `corpus_dir` against `keywords`.
///
/// Pages yielding empty text are skipped; pages scoring below
/// [`RELEVANCE_THRESHOLD`] are dropped. The result is sorted descending by
/// score (stable, so ties keep encounter order) and truncated to
/// [`MAX_RANKED_PAGES`]. An empty result from a present corpus means "no
/// matches" — distinct from [`RankError::CorpusNotFound`].
///
/// Unreadable or unparseable files are logged and skipped; a single bad
/// document never aborts the scan.
pub fn rank_corpus(corpus_dir: &Path, keywords: &[String]) -> Result<Vec<ScoredPage>, RankError> {
    if keywords.is_empty() {
        return Err(RankError::EmptyQuery);
    }
    if !corpus_dir.is_dir() {
        return Err(RankError::CorpusNotFound(corpus_dir.to_path_buf()));
    }

    let mut relevant: Vec<ScoredPage> = Vec::new();

    for entry in WalkDir::new(corpus_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();

        let pages = match pdf::extract_page_texts(path) {
            Ok(pages) => pages,
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", file_name, e);
                continue;
            }
        };

        for (idx, page_text) in pages.iter().enumerate() {
            if page_text.trim().is_empty() {
                continue;
            }
            let score = relevance_score(page_text, keywords);
            if score >= RELEVANCE_THRESHOLD {
                relevant.push(ScoredPage {
                    score,
                    source: file_name.clone(),
                    page: idx + 1,
                });
            }
        }
    }

    Ok(sort_and_truncate(relevant))
}

/// Sort pages descending by score (stable) and keep the top
/// [`MAX_RANKED_PAGES`].
fn sort_and_truncate(mut pages: Vec<ScoredPage>) -> Vec<ScoredPage> {
    pages.sort_by(|a, b| b.score.cmp(&a.score));
    pages.truncate(MAX_RANKED_PAGES);
    pages
}

/// Tokenize a raw query into lowercase whitespace-separated keywords.
pub fn query_keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// CLI entry point: rank the corpus for a query and print the results with
/// highlighted excerpts. No network, no rendering — pure inspection.
pub fn run_rank(config: &crate::config::Config, query: &str) -> anyhow::Result<()> {
    let keywords = query_keywords(query);
    if keywords.is_empty() {
        println!("Please provide a query to search the knowledge base.");
        return Ok(());
    }

    let ranked = match rank_corpus(&config.corpus.dir, &keywords) {
        Ok(ranked) => ranked,
        Err(RankError::CorpusNotFound(dir)) => {
            println!("Error: Study notes folder not found ({})", dir.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if ranked.is_empty() {
        println!("No relevant information found for your query.");
        return Ok(());
    }

    for (i, page) in ranked.iter().enumerate() {
        println!(
            "{}. [score {}] {} page {}",
            i + 1,
            page.score,
            page.source,
            page.page
        );

        // Re-extract the page text to show where the keywords hit.
        let path = config.corpus.dir.join(&page.source);
        if let Ok(pages) = pdf::extract_page_texts(&path) {
            if let Some(text) = pages.get(page.page - 1) {
                for excerpt in extract_excerpts(text, &keywords, DEFAULT_EXCERPT_LENGTH)
                    .iter()
                    .take(3)
                {
                    println!("    excerpt: \"{}\"", excerpt.replace('\n', " "));
                }
            }
        }
        println!();
    }

    Ok(())
}
